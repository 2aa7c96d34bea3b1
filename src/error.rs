// Lookup errors shared by the address resolver and the registry fetcher

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    /// Required input missing; raised before any network call
    #[error("{0}")]
    Validation(String),

    /// Credential or other setting missing; raised before any network call
    #[error("{0} is not configured")]
    Config(&'static str),

    #[error("upstream returned HTTP {status}: {message}")]
    Transport {
        status: u16,
        message: String,
        body: String,
        request_url: String,
    },

    #[error("upstream response could not be parsed: {message}")]
    Parse {
        status: u16,
        message: String,
        body: String,
        request_url: String,
    },

    /// Well-formed response whose header carries a non-success result code
    #[error("upstream error {result_code}: {result_msg}")]
    Upstream {
        status: u16,
        result_code: String,
        result_msg: String,
        body: String,
        request_url: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl LookupError {
    pub fn validation(message: impl Into<String>) -> Self {
        LookupError::Validation(message.into())
    }

    /// True for the conditions a caller should treat as "nothing there"
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound(_))
    }

    /// Upstream HTTP status, when the failure came from a response
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            LookupError::Transport { status, .. }
            | LookupError::Parse { status, .. }
            | LookupError::Upstream { status, .. } => Some(*status),
            LookupError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type LookupResult<T> = Result<T, LookupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_message_names_the_setting() {
        let err = LookupError::Config("JUSO_API_KEY");
        assert_eq!(err.to_string(), "JUSO_API_KEY is not configured");
        assert_eq!(err.upstream_status(), None);
    }

    #[test]
    fn test_upstream_status_is_exposed() {
        let err = LookupError::Upstream {
            status: 200,
            result_code: "03".to_string(),
            result_msg: "NODATA_ERROR".to_string(),
            body: String::new(),
            request_url: String::new(),
        };
        assert_eq!(err.upstream_status(), Some(200));
        assert!(err.to_string().contains("NODATA_ERROR"));
        assert!(!err.is_not_found());
    }
}
