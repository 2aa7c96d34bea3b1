// Application configuration: optional TOML file, environment overrides for credentials

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "building-register.toml";

pub const JUSO_API_KEY_ENV: &str = "JUSO_API_KEY";
pub const BUILDING_API_SERVICE_KEY_ENV: &str = "BUILDING_API_SERVICE_KEY";

pub const JUSO_BASE_URL: &str = "https://business.juso.go.kr/addrlink/addrLinkApi.do";
pub const HUB_BASE_URL: &str = "https://apis.data.go.kr/1613000/BldRgstHubService";
pub const V2_BASE_URL: &str = "http://apis.data.go.kr/1613000/BldRgstService_v2";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// confmKey for the Juso address API
    #[serde(default)]
    pub juso_api_key: Option<String>,

    /// serviceKey for the building registry API (decoded form)
    #[serde(default)]
    pub building_api_service_key: Option<String>,

    #[serde(default = "default_juso_base_url")]
    pub juso_base_url: String,

    #[serde(default = "default_hub_base_url")]
    pub hub_base_url: String,

    #[serde(default = "default_v2_base_url")]
    pub v2_base_url: String,

    #[serde(default = "default_count_per_page")]
    pub count_per_page: u32,

    #[serde(default)]
    pub first_sort_road: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_juso_base_url() -> String {
    JUSO_BASE_URL.to_string()
}

fn default_hub_base_url() -> String {
    HUB_BASE_URL.to_string()
}

fn default_v2_base_url() -> String {
    V2_BASE_URL.to_string()
}

fn default_count_per_page() -> u32 {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            juso_api_key: None,
            building_api_service_key: None,
            juso_base_url: default_juso_base_url(),
            hub_base_url: default_hub_base_url(),
            v2_base_url: default_v2_base_url(),
            count_per_page: default_count_per_page(),
            first_sort_road: false,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Explicit path must exist; otherwise the default file is used when present.
    /// Credentials from the environment always win over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Environment lookup is injected so tests don't touch process state
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = non_blank(lookup(JUSO_API_KEY_ENV)) {
            self.juso_api_key = Some(key);
        }
        if let Some(key) = non_blank(lookup(BUILDING_API_SERVICE_KEY_ENV)) {
            self.building_api_service_key = Some(key);
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Juso accepts 5-10 results per page here
    pub fn page_size(&self) -> u32 {
        self.count_per_page.clamp(5, 10)
    }

    pub fn juso_key(&self) -> Option<&str> {
        self.juso_api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn service_key(&self) -> Option<&str> {
        self.building_api_service_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
