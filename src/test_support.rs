// Fake upstream services for tests: a tiny axum app on an ephemeral port

use axum::{
    extract::{Query, State},
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeState {
    /// path -> (status, body); "*" answers anything unmatched
    replies: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<(String, HashMap<String, String>)>>,
}

pub struct FakeUpstream {
    addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeUpstream {
    pub async fn json(body: Value) -> Self {
        Self::with_status(200, body.to_string()).await
    }

    pub async fn with_status(status: u16, body: String) -> Self {
        Self::routes(vec![("*", status, body)]).await
    }

    pub async fn routes(routes: Vec<(&str, u16, String)>) -> Self {
        let replies = routes
            .into_iter()
            .map(|(path, status, body)| (path.to_string(), (status, body)))
            .collect();
        let state = Arc::new(FakeState {
            replies,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(reply).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    pub fn hits_for(&self, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .count()
    }

    pub fn last_query(&self) -> HashMap<String, String> {
        self.state
            .requests
            .lock()
            .unwrap()
            .last()
            .map(|(_, q)| q.clone())
            .unwrap_or_default()
    }

    pub fn query_for(&self, path: &str) -> Option<HashMap<String, String>> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, q)| q.clone())
    }
}

async fn reply(
    State(state): State<Arc<FakeState>>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push((path.clone(), query));

    let (status, body) = state
        .replies
        .get(&path)
        .or_else(|| state.replies.get("*"))
        .cloned()
        .unwrap_or((404, "{}".to_string()));

    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json;charset=UTF-8")],
        body,
    )
}

pub fn juso_payload(juso: Vec<Value>) -> Value {
    json!({
        "results": {
            "common": {
                "errorCode": "0",
                "errorMessage": "정상",
                "totalCount": juso.len().to_string(),
                "currentPage": "1",
                "countPerPage": "5"
            },
            "juso": juso
        }
    })
}

pub fn registry_payload(result_code: &str, item: Value) -> Value {
    json!({
        "response": {
            "header": { "resultCode": result_code, "resultMsg": "NORMAL SERVICE." },
            "body": {
                "items": { "item": item },
                "numOfRows": 100,
                "pageNo": 1,
                "totalCount": 1
            }
        }
    })
}

/// A title record for 서울 강남구 개포동 12
pub fn gaepo_title_record() -> Value {
    json!({
        "platPlc": "서울특별시 강남구 개포동 12번지",
        "sigunguCd": "11680",
        "bjdongCd": "10300",
        "platGbCd": "0",
        "bun": "0012",
        "ji": "0000",
        "mgmBldrgstPk": "11680-100186290",
        "mainPurpsCdNm": "공동주택",
        "totArea": 35210.14,
        "bcRat": 18.47,
        "vlRat": 249.87,
        "grndFlrCnt": 15,
        "ugrndFlrCnt": 2,
        "useAprDay": "19830228"
    })
}
