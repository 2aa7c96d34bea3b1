// Building Register Lookup - Core Library
// Address -> administrative codes -> building registry records -> table / CSV

pub mod config;
pub mod logging;
pub mod error;
pub mod codes;     // Administrative code splitting and padding
pub mod record;    // Registry records, list flattening, column sets
pub mod upstream;  // Shared upstream response handling
pub mod juso;      // Address resolver (Juso API)
pub mod registry;  // Building registry fetcher (data.go.kr)
pub mod export;
pub mod services;
pub mod form;      // Form state driven by the terminal UI

// Only compile the HTTP surface when the server feature is enabled
#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{LookupError, LookupResult};
pub use codes::{split_adm_cd, zero_pad, PlatGb};
pub use record::{as_list, flatten_items, Column, ColumnSet, FieldValue, RegistryRecord, TITLE_COLUMNS};
pub use juso::{AddressCandidate, AddressPage, AddressResolver, AddressSearchResponse, ResolvedCodes};
pub use registry::{FullInfo, Operation, RegistryClient, RegistryPage, RegistryQuery, Service};
pub use export::{export_csv, save_csv, EXPORT_FILE_NAME};
pub use services::{LookupKind, RegisterOutcome, Services};
pub use form::{Field, FormState, ResultView};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
