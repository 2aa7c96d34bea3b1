// Local HTTP surface: the same lookups as the terminal form, as JSON over GET

use crate::error::LookupError;
use crate::export::{export_csv, EXPORT_FILE_NAME};
use crate::juso::AddressSearchResponse;
use crate::record::{ColumnSet, TITLE_COLUMNS};
use crate::registry::{FullInfo, RegistryPage, RegistryQuery};
use crate::services::Services;
use crate::VERSION;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error body: always a message, plus whatever upstream context is known
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_msg: Option<String>,
}

impl ErrorBody {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

pub struct ApiError(LookupError);

impl From<LookupError> for ApiError {
    fn from(e: LookupError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            LookupError::Validation(_) => StatusCode::BAD_REQUEST,
            LookupError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LookupError::NotFound(_) => StatusCode::NOT_FOUND,
            LookupError::Transport { .. }
            | LookupError::Parse { .. }
            | LookupError::Upstream { .. }
            | LookupError::Http(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let upstream_status = self.0.upstream_status();
        let message = self.0.to_string();
        let body = match self.0 {
            LookupError::Transport { status, body, request_url, .. }
            | LookupError::Parse { status, body, request_url, .. } => ErrorBody {
                message,
                status: Some(status),
                body: Some(body),
                request_url: Some(request_url),
                ..ErrorBody::default()
            },
            LookupError::Upstream {
                status,
                result_code,
                result_msg,
                body,
                request_url,
            } => ErrorBody {
                message,
                status: Some(status),
                body: Some(body),
                request_url: Some(request_url),
                result_code: Some(result_code),
                result_msg: Some(result_msg),
            },
            LookupError::Http(_) => ErrorBody {
                status: upstream_status,
                ..ErrorBody::message(message)
            },
            _ => ErrorBody::message(message),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), message = %body.message, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), message = %body.message, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AddressParams {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerParams {
    #[serde(default)]
    pub sigungu_cd: String,
    #[serde(default)]
    pub bjdong_cd: String,
    #[serde(default)]
    pub plat_gb_cd: String,
    #[serde(default)]
    pub bun: String,
    #[serde(default)]
    pub ji: String,
    #[serde(default)]
    pub mgm_bldrgst_pk: String,
}

impl OwnerParams {
    fn query(&self) -> RegistryQuery {
        RegistryQuery {
            sigungu_cd: self.sigungu_cd.clone(),
            bjdong_cd: self.bjdong_cd.clone(),
            plat_gb_cd: self.plat_gb_cd.clone(),
            bun: self.bun.clone(),
            ji: self.ji.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "ok", version: VERSION })
}

/// GET / - Serve the lookup form
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

/// GET /address-search?keyword=
async fn address_search(
    State(state): State<AppState>,
    Query(params): Query<AddressParams>,
) -> ApiResult<Json<AddressSearchResponse>> {
    let response = state.services.address.search(&params.keyword).await?;
    Ok(Json(response))
}

/// GET /building-register - title records from the hub service
async fn building_register(
    State(state): State<AppState>,
    Query(query): Query<RegistryQuery>,
) -> ApiResult<Json<RegistryPage>> {
    let page = state.services.registry.title(&query).await?;
    Ok(Json(page))
}

/// GET /building-owner - owner records for one management key
async fn building_owner(
    State(state): State<AppState>,
    Query(params): Query<OwnerParams>,
) -> ApiResult<Json<RegistryPage>> {
    let page = state
        .services
        .registry
        .owner(&params.query(), &params.mgm_bldrgst_pk)
        .await?;
    Ok(Json(page))
}

/// GET /building-full-info - title, unit and owner records
async fn building_full_info(
    State(state): State<AppState>,
    Query(query): Query<RegistryQuery>,
) -> ApiResult<Json<FullInfo>> {
    let info = state.services.registry.full_info(&query).await?;
    Ok(Json(info))
}

/// GET /building-register.csv - title records as a CSV download
async fn building_register_csv(
    State(state): State<AppState>,
    Query(query): Query<RegistryQuery>,
) -> Result<Response, ApiError> {
    let page = state.services.registry.title(&query).await?;
    let columns = ColumnSet::Curated(TITLE_COLUMNS).keys(&page.items);

    let bytes = match export_csv(&page.items, &columns) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            return Ok((StatusCode::NOT_FOUND, Json(ErrorBody::message("Nothing to export."))).into_response())
        }
        Err(e) => {
            tracing::error!(error = %e, "CSV export failed");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::message(format!("CSV export failed: {e}"))),
            )
                .into_response());
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody::message("Method Not Allowed")),
    )
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorBody::message("Not Found")))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index).fallback(method_not_allowed))
        .route("/health", get(health_check).fallback(method_not_allowed))
        .route("/address-search", get(address_search).fallback(method_not_allowed))
        .route("/building-register", get(building_register).fallback(method_not_allowed))
        .route("/building-owner", get(building_owner).fallback(method_not_allowed))
        .route("/building-full-info", get(building_full_info).fallback(method_not_allowed))
        .route("/building-register.csv", get(building_register_csv).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::test_support::{gaepo_title_record, juso_payload, registry_payload, FakeUpstream};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(config: &AppConfig) -> Router {
        router(AppState::new(Services::from_config(config)))
    }

    fn configured(juso: &str, registry: &str) -> AppConfig {
        AppConfig {
            juso_api_key: Some("juso-key".into()),
            building_api_service_key: Some("service-key".into()),
            juso_base_url: juso.to_string(),
            hub_base_url: registry.to_string(),
            v2_base_url: registry.to_string(),
            ..AppConfig::default()
        }
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec(), disposition)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let (status, bytes, _) = send(app, "GET", uri).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app(&AppConfig::default()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], VERSION);
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let (status, bytes, _) = send(app(&AppConfig::default()), "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(bytes).unwrap();
        assert!(html.contains("address-search"));
        // record values are inserted as text and export waits for a shown result
        assert!(!html.contains("innerHTML"));
        assert!(html.contains("textContent"));
        assert!(html.contains(r#"<button id="csv-btn" disabled>"#));
    }

    #[tokio::test]
    async fn test_non_get_is_405() {
        let (status, bytes, _) = send(app(&AppConfig::default()), "POST", "/address-search").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_empty_keyword_is_400_without_upstream_call() {
        let juso = FakeUpstream::json(juso_payload(vec![])).await;
        let config = configured(&juso.url(), "http://127.0.0.1:9");
        let (status, body) = get_json(app(&config), "/address-search?keyword=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
        assert_eq!(juso.hits(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_is_500() {
        let (status, body) = get_json(
            app(&AppConfig::default()),
            "/building-register?sigunguCd=11680&bjdongCd=10300",
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "BUILDING_API_SERVICE_KEY is not configured");
    }

    #[tokio::test]
    async fn test_address_search_returns_codes() {
        let juso = FakeUpstream::json(juso_payload(vec![json!({
            "roadAddr": "서울특별시 강남구 개포로 311",
            "jibunAddr": "서울특별시 강남구 개포동 12",
            "admCd": "1168010300",
            "lnbrMnnm": "12",
            "lnbrSlno": "0",
            "mtYn": "0"
        })]))
        .await;
        let config = configured(&juso.url(), "http://127.0.0.1:9");
        let (status, body) = get_json(
            app(&config),
            "/address-search?keyword=%EA%B0%9C%ED%8F%AC%EB%8F%99%2012-0",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sigunguCd"], "11680");
        assert_eq!(body["bjdongCd"], "10300");
        assert_eq!(body["bun"], "0012");
        assert_eq!(body["ji"], "0000");
        assert_eq!(body["item"]["admCd"], "1168010300");
        assert_eq!(juso.last_query()["keyword"], "개포동 12-0");
    }

    #[tokio::test]
    async fn test_address_without_results_is_200_message() {
        let juso = FakeUpstream::json(juso_payload(vec![])).await;
        let config = configured(&juso.url(), "http://127.0.0.1:9");
        let (status, body) = get_json(app(&config), "/address-search?keyword=nowhere").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
        assert!(body.get("sigunguCd").is_none());
    }

    #[tokio::test]
    async fn test_upstream_result_code_is_502() {
        let registry = FakeUpstream::json(registry_payload("30", json!(null))).await;
        let config = configured("http://127.0.0.1:9", &registry.url());
        let (status, body) = get_json(
            app(&config),
            "/building-register?sigunguCd=11680&bjdongCd=10300",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["resultCode"], "30");
        assert!(!body["requestUrl"].as_str().unwrap().contains("service-key"));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_502_without_key() {
        let config = configured("http://127.0.0.1:1", "http://127.0.0.1:1");
        let (status, bytes, _) = send(
            app(&config),
            "GET",
            "/building-register?sigunguCd=11680&bjdongCd=10300",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("service-key"), "{text}");
        let body: Value = serde_json::from_str(&text).unwrap();
        assert!(body["message"].as_str().unwrap().starts_with("HTTP request failed"));

        let (status, bytes, _) = send(app(&config), "GET", "/address-search?keyword=x").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!String::from_utf8(bytes).unwrap().contains("juso-key"));
    }

    #[tokio::test]
    async fn test_building_register_lists_items() {
        let registry = FakeUpstream::json(registry_payload("00", gaepo_title_record())).await;
        let config = configured("http://127.0.0.1:9", &registry.url());
        let (status, body) = get_json(
            app(&config),
            "/building-register?sigunguCd=11680&bjdongCd=10300&platGbCd=0&bun=12&ji=0",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["platPlc"], "서울특별시 강남구 개포동 12번지");
        assert_eq!(registry.last_query()["bun"], "0012");
    }

    #[tokio::test]
    async fn test_owner_requires_management_key() {
        let registry = FakeUpstream::json(registry_payload("00", json!([]))).await;
        let config = configured("http://127.0.0.1:9", &registry.url());
        let (status, _) = get_json(
            app(&config),
            "/building-owner?sigunguCd=11680&bjdongCd=10300",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(registry.hits(), 0);
    }

    #[tokio::test]
    async fn test_full_info_not_found_is_404() {
        let registry = FakeUpstream::json(registry_payload("00", json!(""))).await;
        let config = configured("http://127.0.0.1:9", &registry.url());
        let (status, body) = get_json(
            app(&config),
            "/building-full-info?sigunguCd=11680&bjdongCd=10300",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_csv_download() {
        let registry = FakeUpstream::json(registry_payload("00", gaepo_title_record())).await;
        let config = configured("http://127.0.0.1:9", &registry.url());
        let (status, bytes, disposition) = send(
            app(&config),
            "GET",
            "/building-register.csv?sigunguCd=11680&bjdongCd=10300",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(disposition.unwrap().contains(EXPORT_FILE_NAME));

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        assert_eq!(&reader.headers().unwrap()[0], "platPlc");
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "서울특별시 강남구 개포동 12번지");
    }

    #[tokio::test]
    async fn test_csv_download_empty_is_404() {
        let registry = FakeUpstream::json(registry_payload("00", json!(null))).await;
        let config = configured("http://127.0.0.1:9", &registry.url());
        let (status, _, _) = send(
            app(&config),
            "GET",
            "/building-register.csv?sigunguCd=11680&bjdongCd=10300",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
