//! # Domain Lookup Library
//!
//! Resolve domain registration data over RDAP with WHOIS fallback, and
//! normalize whatever the registries return into one record shape.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_lookup_lib::{lookup_domain, LookupOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = lookup_domain("example.com", LookupOptions::default()).await?;
//!     if let Some(record) = result.record {
//!         println!("{} registered: {} (via {})", record.domain, record.is_registered, record.source);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **RDAP first**: IANA bootstrap discovery, related-link following
//! - **WHOIS fallback**: registry discovery through IANA, registrar referrals
//! - **Normalization**: one `DomainRecord` shape for both protocols
//! - **Pluggable**: WHOIS transport, server table and availability phrases
//!   can all be replaced

// Re-export main public API types and functions
pub use config::{
    load_env_config, load_env_config_from, parse_timeout_string, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig,
};
pub use error::DomainLookupError;
pub use lookup::DomainLookup;
pub use normalize::{AvailabilityClassifier, PhraseClassifier};
pub use protocols::whois::{TcpWhoisTransport, WhoisTransport};
pub use protocols::whois_servers::WhoisServerTable;
pub use types::{
    Contact, ContactRole, DnssecInfo, DomainRecord, DsRecord, LookupOptions, LookupResult,
    Nameserver, RecordSource, RegistrarInfo, StatusEvent, WhoisQueryResult,
    DEFAULT_RDAP_LINK_RELS,
};
pub use utils::DomainName;

// Building blocks, public for callers that want a single step
pub mod normalize;
pub mod protocols;

mod config;
mod error;
mod lookup;
mod types;
mod utils;

/// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainLookupError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Look up one domain and wrap the outcome in a [`LookupResult`].
///
/// Operational failures (unreachable servers, no WHOIS server, exhausted
/// RDAP, cancellation) come back as `Ok` with `ok: false` and a message.
/// Only caller mistakes such as an unparseable domain, conflicting options or
/// a malformed bootstrap document are returned as `Err`.
pub async fn lookup_domain(domain: &str, options: LookupOptions) -> Result<LookupResult> {
    let engine = DomainLookup::with_options(options);
    lookup_with(&engine, domain).await
}

/// Like [`lookup_domain`] but reuses an existing engine.
pub async fn lookup_with(engine: &DomainLookup, domain: &str) -> Result<LookupResult> {
    match engine.lookup(domain).await {
        Ok(record) => Ok(LookupResult::success(record)),
        Err(e) if e.is_configuration_error() => Err(e),
        Err(e) => {
            tracing::warn!(domain, error = %e, "Lookup failed");
            Ok(LookupResult::failure(e.to_string()))
        }
    }
}
