// Address Resolver - keyword -> Juso address API -> administrative codes

use crate::codes::{pad_lot, split_adm_cd, PlatGb};
use crate::config::{AppConfig, JUSO_API_KEY_ENV};
use crate::error::{LookupError, LookupResult};
use crate::record::as_list;
use crate::upstream::{scalar_text, UpstreamReply};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const SECRET_PARAM: &str = "confmKey";
pub const NO_RESULTS_MESSAGE: &str = "No address matched the keyword.";

// ============================================================================
// TYPES
// ============================================================================

/// One row of `results.juso`. Fields we don't read are kept in `extra`
/// so the item can be handed back to callers untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressCandidate {
    #[serde(rename = "roadAddr", default, deserialize_with = "lenient_string")]
    pub road_addr: String,

    #[serde(rename = "jibunAddr", default, deserialize_with = "lenient_string")]
    pub jibun_addr: String,

    #[serde(rename = "zipNo", default, deserialize_with = "lenient_string")]
    pub zip_no: String,

    /// 10-digit administrative code: sigungu (5) + legal-dong (5)
    #[serde(rename = "admCd", default, deserialize_with = "lenient_string")]
    pub adm_cd: String,

    #[serde(rename = "lnbrMnnm", default, deserialize_with = "lenient_string")]
    pub lnbr_mnnm: String,

    #[serde(rename = "lnbrSlno", default, deserialize_with = "lenient_string")]
    pub lnbr_slno: String,

    #[serde(rename = "mtYn", default, deserialize_with = "lenient_string")]
    pub mt_yn: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Juso sends everything as strings, but nulls and bare numbers do show up
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(scalar_text(value.as_ref()).unwrap_or_default())
}

/// Codes derived from a candidate. Empty strings mean "not derivable";
/// the form keeps its previous value for those.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCodes {
    pub sigungu_cd: String,
    pub bjdong_cd: String,
    pub plat_gb: PlatGb,
    pub bun: String,
    pub ji: String,
}

impl ResolvedCodes {
    pub fn from_candidate(candidate: &AddressCandidate) -> Self {
        let (sigungu_cd, bjdong_cd) = split_adm_cd(&candidate.adm_cd).unwrap_or_default();
        let mt_yn = candidate.mt_yn.trim();
        Self {
            sigungu_cd,
            bjdong_cd,
            plat_gb: PlatGb::from_mt_yn(Some(mt_yn).filter(|m| !m.is_empty())),
            bun: pad_lot(&candidate.lnbr_mnnm),
            ji: pad_lot(&candidate.lnbr_slno),
        }
    }

    pub fn has_codes(&self) -> bool {
        !self.sigungu_cd.is_empty() && !self.bjdong_cd.is_empty()
    }
}

/// Body of `GET /address-search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSearchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sigungu_cd: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bjdong_cd: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bun: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ji: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plat_gb_cd: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Value>,

    #[serde(default)]
    pub raw: Value,
}

impl AddressSearchResponse {
    pub fn found(candidate: &AddressCandidate, raw: Value) -> Self {
        let codes = ResolvedCodes::from_candidate(candidate);
        Self {
            message: None,
            sigungu_cd: codes.sigungu_cd,
            bjdong_cd: codes.bjdong_cd,
            bun: codes.bun,
            ji: codes.ji,
            plat_gb_cd: Some(codes.plat_gb.code().to_string()),
            item: serde_json::to_value(candidate).ok(),
            raw,
        }
    }

    pub fn no_results(raw: Value) -> Self {
        Self {
            message: Some(NO_RESULTS_MESSAGE.to_string()),
            raw,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddressPage {
    pub candidates: Vec<AddressCandidate>,
    pub raw: Value,
}

// ============================================================================
// RESOLVER
// ============================================================================

#[derive(Debug, Clone)]
pub struct AddressResolver {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    page_size: u32,
    first_sort_road: bool,
}

impl AddressResolver {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            page_size: 5,
            first_sort_road: false,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &AppConfig) -> Self {
        let mut resolver = Self::new(
            client,
            config.juso_base_url.clone(),
            config.juso_key().map(str::to_string),
        );
        resolver.page_size = config.page_size();
        resolver.first_sort_road = config.first_sort_road;
        resolver
    }

    /// One page of candidates for the caller to choose from
    pub async fn candidates(&self, keyword: &str) -> LookupResult<AddressPage> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(LookupError::validation("keyword is required"));
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LookupError::Config(JUSO_API_KEY_ENV))?;

        let page_size = self.page_size.to_string();
        let mut params = vec![
            (SECRET_PARAM, api_key),
            ("currentPage", "1"),
            ("countPerPage", page_size.as_str()),
            ("keyword", keyword),
            ("resultType", "json"),
        ];
        if self.first_sort_road {
            params.push(("firstSort", "road"));
        }

        let request = self.client.get(&self.base_url).query(&params);
        let reply = UpstreamReply::fetch(request, SECRET_PARAM).await?;
        tracing::info!(keyword, url = %reply.request_url, status = reply.status.as_u16(), "address search");

        let raw = reply.json()?;

        if !reply.is_success() {
            let message = scalar_text(raw.pointer("/results/common/errorMessage"))
                .or_else(|| scalar_text(raw.get("message")))
                .unwrap_or_else(|| format!("Juso API error (status: {})", reply.status.as_u16()));
            return Err(reply.transport_error(message));
        }

        // Juso reports key/keyword problems with HTTP 200 and a non-zero errorCode
        if let Some(code) = scalar_text(raw.pointer("/results/common/errorCode")) {
            if code != "0" {
                let message = scalar_text(raw.pointer("/results/common/errorMessage")).unwrap_or_default();
                return Err(reply.upstream_error(code, message));
            }
        }

        let candidates = as_list(raw.pointer("/results/juso"))
            .into_iter()
            .map(serde_json::from_value::<AddressCandidate>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LookupError::Parse {
                status: reply.status.as_u16(),
                message: e.to_string(),
                body: reply.body.clone(),
                request_url: reply.request_url.clone(),
            })?;

        tracing::info!(keyword, count = candidates.len(), "address candidates");
        Ok(AddressPage { candidates, raw })
    }

    /// First candidate's codes, or a "no results" answer that is not an error
    pub async fn search(&self, keyword: &str) -> LookupResult<AddressSearchResponse> {
        let page = self.candidates(keyword).await?;
        let response = match page.candidates.first() {
            Some(first) => {
                let response = AddressSearchResponse::found(first, page.raw.clone());
                tracing::info!(
                    sigungu_cd = %response.sigungu_cd,
                    bjdong_cd = %response.bjdong_cd,
                    bun = %response.bun,
                    ji = %response.ji,
                    jibun_addr = %first.jibun_addr,
                    road_addr = %first.road_addr,
                    "address resolved"
                );
                response
            }
            None => AddressSearchResponse::no_results(page.raw),
        };
        Ok(response)
    }
}
