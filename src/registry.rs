// Registry Fetcher - administrative codes -> building registry API -> records

use crate::codes::{normalize_bjdong, normalize_sigungu, pad_lot, PlatGb};
use crate::config::{AppConfig, BUILDING_API_SERVICE_KEY_ENV};
use crate::error::{LookupError, LookupResult};
use crate::record::{flatten_items, RegistryRecord};
use crate::upstream::{scalar_text, UpstreamReply};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SECRET_PARAM: &str = "serviceKey";
const SUCCESS_CODE: &str = "00";
const NUM_OF_ROWS: &str = "100";
const PAGE_NO: &str = "1";

// ============================================================================
// ENDPOINTS
// ============================================================================

/// The registry is published twice: the newer hub service and the v2 service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Hub,
    V2,
}

impl Service {
    /// The hub service always sends a header and must say "00";
    /// v2 is only held to it when a header is present
    fn requires_result_code(&self) -> bool {
        matches!(self, Service::Hub)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// 표제부 - building title info
    TitleInfo,
    /// 전유공용면적 - unit / shared area info
    ExposPubuseAreaInfo,
    /// 소유자 - owner info
    OwnerInfo,
}

impl Operation {
    pub fn path(&self) -> &'static str {
        match self {
            Operation::TitleInfo => "getBrTitleInfo",
            Operation::ExposPubuseAreaInfo => "getBrExposPubuseAreaInfo",
            Operation::OwnerInfo => "getBrOwnerInfo",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::TitleInfo => "title info",
            Operation::ExposPubuseAreaInfo => "unit area info",
            Operation::OwnerInfo => "owner info",
        }
    }
}

// ============================================================================
// QUERY
// ============================================================================

/// Codes as typed by the user or filled in from an address.
/// Empty strings mean "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryQuery {
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
}

/// A query ready for the wire: 5-digit codes, 4-digit lot numbers or empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub sigungu_cd: String,
    pub bjdong_cd: String,
    pub plat_gb: PlatGb,
    pub bun: String,
    pub ji: String,
}

impl RegistryQuery {
    pub fn normalize(&self) -> LookupResult<NormalizedQuery> {
        if self.sigungu_cd.trim().is_empty() || self.bjdong_cd.trim().is_empty() {
            return Err(LookupError::validation("sigunguCd and bjdongCd are required"));
        }

        let plat_gb = if self.plat_gb_cd.trim().is_empty() {
            PlatGb::Plot
        } else {
            PlatGb::from_code(&self.plat_gb_cd).ok_or_else(|| {
                LookupError::validation(format!(
                    "platGbCd must be 0, 1 or 2 (got {})",
                    self.plat_gb_cd.trim()
                ))
            })?
        };

        Ok(NormalizedQuery {
            sigungu_cd: normalize_sigungu(&self.sigungu_cd),
            bjdong_cd: normalize_bjdong(&self.bjdong_cd),
            plat_gb,
            bun: pad_lot(&self.bun),
            ji: pad_lot(&self.ji),
        })
    }
}

impl NormalizedQuery {
    fn params<'a>(&'a self, service_key: &'a str, mgm_bldrgst_pk: Option<&'a str>) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![
            (SECRET_PARAM, service_key),
            ("sigunguCd", self.sigungu_cd.as_str()),
            ("bjdongCd", self.bjdong_cd.as_str()),
            ("platGbCd", self.plat_gb.code()),
        ];
        if !self.bun.is_empty() {
            params.push(("bun", self.bun.as_str()));
        }
        if !self.ji.is_empty() {
            params.push(("ji", self.ji.as_str()));
        }
        if let Some(pk) = mgm_bldrgst_pk {
            params.push(("mgmBldrgstPk", pk));
        }
        params.push(("numOfRows", NUM_OF_ROWS));
        params.push(("pageNo", PAGE_NO));
        params.push(("_type", "json"));
        params
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Body of `/building-register` and `/building-owner`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryPage {
    pub items: Vec<RegistryRecord>,
    pub raw: Value,
}

/// Body of `/building-full-info`. Secondary lists are empty when their call failed;
/// the failure is described in `warnings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullInfo {
    pub title_info: Vec<RegistryRecord>,
    pub expos_info: Vec<RegistryRecord>,
    pub owner_info: Vec<RegistryRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    hub_base_url: String,
    v2_base_url: String,
    service_key: Option<String>,
}

impl RegistryClient {
    pub fn new(
        client: reqwest::Client,
        hub_base_url: impl Into<String>,
        v2_base_url: impl Into<String>,
        service_key: Option<String>,
    ) -> Self {
        Self {
            client,
            hub_base_url: hub_base_url.into(),
            v2_base_url: v2_base_url.into(),
            service_key,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &AppConfig) -> Self {
        Self::new(
            client,
            config.hub_base_url.clone(),
            config.v2_base_url.clone(),
            config.service_key().map(str::to_string),
        )
    }

    fn service_key(&self) -> LookupResult<&str> {
        self.service_key
            .as_deref()
            .ok_or(LookupError::Config(BUILDING_API_SERVICE_KEY_ENV))
    }

    fn endpoint(&self, service: Service, operation: Operation) -> String {
        let base = match service {
            Service::Hub => &self.hub_base_url,
            Service::V2 => &self.v2_base_url,
        };
        format!("{}/{}", base.trim_end_matches('/'), operation.path())
    }

    /// One registry call. Inputs are assumed validated; the credential is checked here.
    pub async fn fetch(
        &self,
        service: Service,
        operation: Operation,
        query: &NormalizedQuery,
        mgm_bldrgst_pk: Option<&str>,
    ) -> LookupResult<RegistryPage> {
        let service_key = self.service_key()?;
        let url = self.endpoint(service, operation);

        let request = self
            .client
            .get(&url)
            .query(&query.params(service_key, mgm_bldrgst_pk));
        let reply = UpstreamReply::fetch(request, SECRET_PARAM).await?;
        tracing::info!(operation = operation.name(), url = %reply.request_url, status = reply.status.as_u16(), "registry request");

        if !reply.is_success() {
            tracing::error!(status = reply.status.as_u16(), body = %reply.body, "registry HTTP error");
            return Err(reply.transport_error("building registry API call failed"));
        }

        let raw = reply.json()?;

        let header = raw.pointer("/response/header");
        let result_code = scalar_text(header.and_then(|h| h.get("resultCode")));
        let failed = match (&result_code, service.requires_result_code()) {
            (Some(code), _) => code != SUCCESS_CODE,
            (None, strict) => strict,
        };
        if failed {
            let result_msg =
                scalar_text(header.and_then(|h| h.get("resultMsg"))).unwrap_or_default();
            tracing::error!(result_code = ?result_code, result_msg = %result_msg, "registry result code");
            return Err(reply.upstream_error(result_code.unwrap_or_default(), result_msg));
        }

        let items = flatten_items(&raw);
        tracing::info!(operation = operation.name(), count = items.len(), "registry records");
        Ok(RegistryPage { items, raw })
    }

    /// Title records from the hub service
    pub async fn title(&self, query: &RegistryQuery) -> LookupResult<RegistryPage> {
        let query = query.normalize()?;
        self.fetch(Service::Hub, Operation::TitleInfo, &query, None).await
    }

    /// Owner records for one building, keyed by its management key
    pub async fn owner(&self, query: &RegistryQuery, mgm_bldrgst_pk: &str) -> LookupResult<RegistryPage> {
        let mgm_bldrgst_pk = mgm_bldrgst_pk.trim();
        if mgm_bldrgst_pk.is_empty() {
            return Err(LookupError::validation(
                "sigunguCd, bjdongCd and mgmBldrgstPk are required",
            ));
        }
        let query = query.normalize()?;
        self.fetch(Service::V2, Operation::OwnerInfo, &query, Some(mgm_bldrgst_pk))
            .await
    }

    /// Title info, then unit and owner info for the first building.
    /// Only the title call can fail the whole lookup.
    pub async fn full_info(&self, query: &RegistryQuery) -> LookupResult<FullInfo> {
        let query = query.normalize()?;
        self.service_key()?;

        let title = self
            .fetch(Service::V2, Operation::TitleInfo, &query, None)
            .await?;
        let first = title
            .items
            .first()
            .ok_or_else(|| LookupError::NotFound("no building registry record found".to_string()))?;
        let mgm_bldrgst_pk = first
            .management_key()
            .ok_or_else(|| LookupError::validation("title record has no mgmBldrgstPk"))?;

        let (expos, owner) = tokio::join!(
            self.fetch(Service::V2, Operation::ExposPubuseAreaInfo, &query, Some(mgm_bldrgst_pk.as_str())),
            self.fetch(Service::V2, Operation::OwnerInfo, &query, Some(mgm_bldrgst_pk.as_str())),
        );

        let mut warnings = Vec::new();
        let expos_info = secondary(Operation::ExposPubuseAreaInfo, expos, &mut warnings);
        let owner_info = secondary(Operation::OwnerInfo, owner, &mut warnings);

        Ok(FullInfo {
            title_info: title.items,
            expos_info,
            owner_info,
            warnings,
        })
    }
}

fn secondary(
    operation: Operation,
    result: LookupResult<RegistryPage>,
    warnings: &mut Vec<String>,
) -> Vec<RegistryRecord> {
    match result {
        Ok(page) => page.items,
        Err(e) => {
            tracing::warn!(operation = operation.name(), error = %e, "secondary registry lookup failed");
            warnings.push(format!("{} lookup failed: {}", operation.name(), e));
            Vec::new()
        }
    }
}
