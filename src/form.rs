// Form state - everything the lookup screen shows, changed only through the handlers below

use crate::codes::PlatGb;
use crate::error::LookupResult;
use crate::export::save_csv;
use crate::juso::{AddressCandidate, AddressSearchResponse, ResolvedCodes, NO_RESULTS_MESSAGE};
use crate::record::{ColumnSet, RegistryRecord, TITLE_COLUMNS};
use crate::registry::{FullInfo, RegistryQuery};
use crate::services::{LookupKind, RegisterOutcome};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Sample address the form opens with
pub const SAMPLE_KEYWORD: &str = "강남구 개포동 12-0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Keyword,
    SigunguCd,
    BjdongCd,
    PlatGbCd,
    Bun,
    Ji,
    Results,
}

impl Field {
    const ORDER: [Field; 7] = [
        Field::Keyword,
        Field::SigunguCd,
        Field::BjdongCd,
        Field::PlatGbCd,
        Field::Bun,
        Field::Ji,
        Field::Results,
    ];

    pub fn next(&self) -> Self {
        let i = Self::ORDER.iter().position(|f| f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    pub fn previous(&self) -> Self {
        let i = Self::ORDER.iter().position(|f| f == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Keyword => "주소",
            Field::SigunguCd => "시군구코드",
            Field::BjdongCd => "법정동코드",
            Field::PlatGbCd => "대지구분",
            Field::Bun => "번 (bun)",
            Field::Ji => "지 (ji)",
            Field::Results => "조회 결과",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultView {
    #[default]
    Title,
    Expos,
    Owner,
}

impl ResultView {
    pub const ALL: [ResultView; 3] = [ResultView::Title, ResultView::Expos, ResultView::Owner];

    pub fn title(&self) -> &'static str {
        match self {
            ResultView::Title => "표제부",
            ResultView::Expos => "전유부",
            ResultView::Owner => "소유자",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ResultView::Title => ResultView::Expos,
            ResultView::Expos => ResultView::Owner,
            ResultView::Owner => ResultView::Title,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            ResultView::Title => ResultView::Owner,
            ResultView::Expos => ResultView::Title,
            ResultView::Owner => ResultView::Expos,
        }
    }

    /// Title rows use the curated columns; the others show whatever keys came back
    pub fn columns(&self) -> ColumnSet {
        match self {
            ResultView::Title => ColumnSet::Curated(TITLE_COLUMNS),
            ResultView::Expos | ResultView::Owner => ColumnSet::Observed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub keyword: String,
    pub sigungu_cd: String,
    pub bjdong_cd: String,
    pub plat_gb: PlatGb,
    pub bun: String,
    pub ji: String,
    pub focus: Field,
    pub kind: LookupKind,

    pub address_loading: bool,
    pub address_error: Option<String>,
    /// Informational line under the address box (matched address, no results)
    pub address_notice: Option<String>,

    pub loading: bool,
    pub error: Option<String>,
    pub notice: Option<String>,

    pub results: FullInfo,
    pub view: ResultView,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

impl FormState {
    /// Opens on the 개포동 sample so a first lookup works out of the box
    pub fn new() -> Self {
        Self {
            keyword: SAMPLE_KEYWORD.to_string(),
            sigungu_cd: "11680".to_string(),
            bjdong_cd: "10300".to_string(),
            plat_gb: PlatGb::Plot,
            bun: "0012".to_string(),
            ji: "0000".to_string(),
            focus: Field::Keyword,
            kind: LookupKind::Title,
            address_loading: false,
            address_error: None,
            address_notice: None,
            loading: false,
            error: None,
            notice: None,
            results: FullInfo::default(),
            view: ResultView::Title,
        }
    }

    pub fn empty() -> Self {
        Self {
            keyword: String::new(),
            sigungu_cd: String::new(),
            bjdong_cd: String::new(),
            bun: String::new(),
            ji: String::new(),
            ..Self::new()
        }
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    pub fn field_value(&self, field: Field) -> String {
        match field {
            Field::Keyword => self.keyword.clone(),
            Field::SigunguCd => self.sigungu_cd.clone(),
            Field::BjdongCd => self.bjdong_cd.clone(),
            Field::PlatGbCd => format!("{} - {}", self.plat_gb.code(), self.plat_gb.label()),
            Field::Bun => self.bun.clone(),
            Field::Ji => self.ji.clone(),
            Field::Results => String::new(),
        }
    }

    fn text_field_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Keyword => Some(&mut self.keyword),
            Field::SigunguCd => Some(&mut self.sigungu_cd),
            Field::BjdongCd => Some(&mut self.bjdong_cd),
            Field::Bun => Some(&mut self.bun),
            Field::Ji => Some(&mut self.ji),
            Field::PlatGbCd | Field::Results => None,
        }
    }

    pub fn set_field(&mut self, field: Field, value: &str) {
        if field == Field::PlatGbCd {
            if let Some(gb) = PlatGb::from_code(value) {
                self.plat_gb = gb;
            }
        } else if let Some(text) = self.text_field_mut(field) {
            *text = value.to_string();
        }
    }

    /// Typing into the focused field; the lot classification cycles instead
    pub fn input_char(&mut self, c: char) {
        let focus = self.focus;
        if focus == Field::PlatGbCd {
            match PlatGb::from_code(&c.to_string()) {
                Some(gb) => self.plat_gb = gb,
                None if c == ' ' => self.plat_gb = self.plat_gb.next(),
                None => {}
            }
        } else if let Some(text) = self.text_field_mut(focus) {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        let focus = self.focus;
        if let Some(text) = self.text_field_mut(focus) {
            text.pop();
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    pub fn toggle_kind(&mut self) {
        if !self.loading {
            self.kind = self.kind.toggle();
        }
    }

    pub fn query(&self) -> RegistryQuery {
        RegistryQuery {
            sigungu_cd: self.sigungu_cd.trim().to_string(),
            bjdong_cd: self.bjdong_cd.trim().to_string(),
            plat_gb_cd: self.plat_gb.code().to_string(),
            bun: self.bun.trim().to_string(),
            ji: self.ji.trim().to_string(),
        }
    }

    // ========================================================================
    // ADDRESS SEARCH
    // ========================================================================

    /// Returns the keyword to search for, or None when the action is unavailable
    /// (already running, or nothing typed - the latter sets an inline error)
    pub fn begin_address_search(&mut self) -> Option<String> {
        if self.address_loading {
            return None;
        }
        let keyword = self.keyword.trim();
        if keyword.is_empty() {
            self.address_error = Some("Enter an address to search for.".to_string());
            return None;
        }
        let keyword = keyword.to_string();
        self.address_loading = true;
        self.address_error = None;
        self.address_notice = None;
        Some(keyword)
    }

    pub fn finish_address_search(&mut self, result: LookupResult<AddressSearchResponse>) {
        self.address_loading = false;
        match result {
            Ok(response) => {
                if let Err(message) = self.apply_address_response(&response) {
                    self.address_error = Some(message);
                }
            }
            Err(e) => self.address_error = Some(e.to_string()),
        }
    }

    /// Direct `sigunguCd`/`bjdongCd` fields win. The raw Juso payload is only
    /// consulted when they are empty. Lot numbers the answer lacks keep their
    /// current values.
    pub fn apply_address_response(&mut self, response: &AddressSearchResponse) -> Result<(), String> {
        if !response.sigungu_cd.is_empty() && !response.bjdong_cd.is_empty() {
            self.sigungu_cd = response.sigungu_cd.clone();
            self.bjdong_cd = response.bjdong_cd.clone();
            if !response.bun.is_empty() {
                self.bun = response.bun.clone();
            }
            if !response.ji.is_empty() {
                self.ji = response.ji.clone();
            }
            if let Some(gb) = response.plat_gb_cd.as_deref().and_then(PlatGb::from_code) {
                self.plat_gb = gb;
            }
            self.address_notice = response.item.as_ref().and_then(describe_item);
            return Ok(());
        }

        let first = response
            .raw
            .pointer("/results/juso/0")
            .cloned()
            .and_then(|v| serde_json::from_value::<AddressCandidate>(v).ok());

        let Some(candidate) = first else {
            let message = response
                .message
                .clone()
                .unwrap_or_else(|| NO_RESULTS_MESSAGE.to_string());
            self.address_notice = Some(message);
            return Ok(());
        };

        let codes = ResolvedCodes::from_candidate(&candidate);
        if !codes.has_codes() {
            return Err(format!(
                "Administrative code (admCd) could not be interpreted: {:?}",
                candidate.adm_cd
            ));
        }
        self.sigungu_cd = codes.sigungu_cd;
        self.bjdong_cd = codes.bjdong_cd;
        if !codes.bun.is_empty() {
            self.bun = codes.bun;
        }
        if !codes.ji.is_empty() {
            self.ji = codes.ji;
        }
        self.plat_gb = codes.plat_gb;
        self.address_notice = Some(address_line(&candidate));
        Ok(())
    }

    // ========================================================================
    // REGISTRY LOOKUP
    // ========================================================================

    pub fn begin_register_search(&mut self) -> Option<(LookupKind, RegistryQuery)> {
        if self.loading {
            return None;
        }
        if self.sigungu_cd.trim().is_empty() || self.bjdong_cd.trim().is_empty() {
            self.error = Some("시군구코드 and 법정동코드 are required.".to_string());
            return None;
        }
        self.loading = true;
        self.error = None;
        self.notice = None;
        Some((self.kind, self.query()))
    }

    pub fn finish_register_search(&mut self, result: LookupResult<RegisterOutcome>) {
        self.loading = false;
        self.view = ResultView::Title;
        match result {
            Ok(outcome) => {
                self.results = outcome.into_full_info();
                if self.results.title_info.is_empty() {
                    self.notice = Some("No building registry record found.".to_string());
                } else if !self.results.warnings.is_empty() {
                    self.notice = Some(self.results.warnings.join("; "));
                }
            }
            Err(e) if e.is_not_found() => {
                self.results = FullInfo::default();
                self.notice = Some(e.to_string());
            }
            Err(e) => {
                self.results = FullInfo::default();
                self.error = Some(e.to_string());
            }
        }
    }

    // ========================================================================
    // RESULTS
    // ========================================================================

    pub fn records(&self, view: ResultView) -> &[RegistryRecord] {
        match view {
            ResultView::Title => &self.results.title_info,
            ResultView::Expos => &self.results.expos_info,
            ResultView::Owner => &self.results.owner_info,
        }
    }

    pub fn current_records(&self) -> &[RegistryRecord] {
        self.records(self.view)
    }

    pub fn has_result(&self) -> bool {
        !self.current_records().is_empty()
    }

    /// (key, label) pairs for the current table
    pub fn columns(&self) -> Vec<(String, String)> {
        self.view.columns().resolve(self.current_records())
    }

    pub fn next_view(&mut self) {
        self.view = self.view.next();
    }

    pub fn previous_view(&mut self) {
        self.view = self.view.previous();
    }

    /// Export the visible table; nothing is written when it is empty
    pub fn export_csv(&mut self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let records = self.current_records();
        let columns = self.view.columns().keys(records);
        let saved = save_csv(records, &columns, dir)?;
        self.notice = Some(match &saved {
            Some(path) => format!("Saved {}", path.display()),
            None => "Nothing to export.".to_string(),
        });
        Ok(saved)
    }
}

fn address_line(candidate: &AddressCandidate) -> String {
    match (candidate.jibun_addr.is_empty(), candidate.road_addr.is_empty()) {
        (false, false) => format!("{} ({})", candidate.jibun_addr, candidate.road_addr),
        (false, true) => candidate.jibun_addr.clone(),
        _ => candidate.road_addr.clone(),
    }
}

fn describe_item(item: &serde_json::Value) -> Option<String> {
    serde_json::from_value::<AddressCandidate>(item.clone())
        .ok()
        .map(|c| address_line(&c))
        .filter(|line| !line.is_empty())
}
