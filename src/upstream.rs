// Raw GET round-trip shared by the Juso and registry clients

use crate::error::{LookupError, LookupResult};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde_json::Value;

/// A finished upstream call: status, redacted URL and the body as text.
/// Nothing has been interpreted yet.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub request_url: String,
    pub body: String,
}

impl UpstreamReply {
    /// reqwest errors carry the full URL in their message, so it is stripped
    /// and only the redacted form is logged
    pub async fn fetch(request: RequestBuilder, secret_param: &str) -> LookupResult<Self> {
        let (client, request) = request.build_split();
        let request = request.map_err(|e| LookupError::Http(e.without_url()))?;
        let request_url = redact_url(request.url(), secret_param);

        let response = client.execute(request).await.map_err(|e| {
            let e = e.without_url();
            tracing::warn!(url = %request_url, error = %e, "upstream request failed");
            LookupError::Http(e)
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| LookupError::Http(e.without_url()))?;

        tracing::debug!(url = %request_url, status = status.as_u16(), bytes = body.len(), "upstream reply");

        Ok(Self {
            status,
            request_url,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json(&self) -> LookupResult<Value> {
        serde_json::from_str(&self.body).map_err(|e| LookupError::Parse {
            status: self.status.as_u16(),
            message: e.to_string(),
            body: self.body.clone(),
            request_url: self.request_url.clone(),
        })
    }

    pub fn transport_error(&self, message: impl Into<String>) -> LookupError {
        LookupError::Transport {
            status: self.status.as_u16(),
            message: message.into(),
            body: self.body.clone(),
            request_url: self.request_url.clone(),
        }
    }

    pub fn upstream_error(&self, result_code: String, result_msg: String) -> LookupError {
        LookupError::Upstream {
            status: self.status.as_u16(),
            result_code,
            result_msg,
            body: self.body.clone(),
            request_url: self.request_url.clone(),
        }
    }
}

/// Replace the credential's value so URLs can be logged and echoed back
pub fn redact_url(url: &Url, secret_param: &str) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == secret_param { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();

    if pairs.is_empty() {
        return url.to_string();
    }

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// String view of a JSON scalar; upstream mixes "00" and 0 for codes
pub fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
