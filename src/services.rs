// The two upstream clients bundled for the UI and the server

use crate::config::AppConfig;
use crate::error::LookupResult;
use crate::juso::AddressResolver;
use crate::registry::{FullInfo, RegistryClient, RegistryPage, RegistryQuery};

/// Which registry sections a lookup should bring back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupKind {
    /// 표제부 only (hub service)
    #[default]
    Title,
    /// 표제부 + 전유부 + 소유자 (v2 service)
    Full,
}

impl LookupKind {
    pub fn label(&self) -> &'static str {
        match self {
            LookupKind::Title => "표제부",
            LookupKind::Full => "표제부 + 전유부 + 소유자",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            LookupKind::Title => LookupKind::Full,
            LookupKind::Full => LookupKind::Title,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    Title(RegistryPage),
    Full(FullInfo),
}

impl RegisterOutcome {
    pub fn into_full_info(self) -> FullInfo {
        match self {
            RegisterOutcome::Title(page) => FullInfo {
                title_info: page.items,
                ..FullInfo::default()
            },
            RegisterOutcome::Full(info) => info,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Services {
    pub address: AddressResolver,
    pub registry: RegistryClient,
}

impl Services {
    /// One HTTP client shared by both upstreams
    pub fn from_config(config: &AppConfig) -> Self {
        let client = reqwest::Client::new();
        Self {
            address: AddressResolver::from_config(client.clone(), config),
            registry: RegistryClient::from_config(client, config),
        }
    }

    pub async fn lookup(&self, kind: LookupKind, query: &RegistryQuery) -> LookupResult<RegisterOutcome> {
        match kind {
            LookupKind::Title => self.registry.title(query).await.map(RegisterOutcome::Title),
            LookupKind::Full => self.registry.full_info(query).await.map(RegisterOutcome::Full),
        }
    }
}
