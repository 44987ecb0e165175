//! # WHOIS Fallback Library
//!
//! Resilient WHOIS lookups that keep working when a network path is blocked.
//!
//! A query is tried through up to three transports in order: a delegated
//! lookup that follows registrar referrals, a direct socket to the registry
//! server, and the same socket relayed through a SOCKS5 proxy. The first
//! transport that returns a parseable reply wins. Replies are parsed into
//! ordered key/value records and can be summarized into registrar, owner,
//! expiration and name-server fields.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whois_fallback_lib::{ConnectionOptions, Resolver, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = Resolver::new(ResolverConfig::default())?;
//!
//!     let record = resolver.query("google.com", &ConnectionOptions::new()).await?;
//!     println!("{}", record);
//!
//!     let summary = resolver.lookup("google.com", &ConnectionOptions::new()).await?;
//!     println!("Expires: {:?}", summary.domain_expiration_date);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Transport fallback**: default, alternative and proxy strategies
//! - **Referral following**: thin registries hand off to the registrar
//! - **Tolerant parsing**: HTML entities, duplicate keys, odd delimiters
//! - **Semantic extraction**: registrar, contacts, expiration, name servers
//! - **Configurable**: TOML files, environment variables, server overrides

// Re-export main public API types and functions
pub use config::{
    load_env_config, parse_duration_string, ConfigManager, DefaultsConfig, EnvConfig, FileConfig,
    LookupBackend, ResolverConfig, ServerEntry,
};
pub use dates::parse_date;
pub use domain::{is_fully_qualified_domain_name, sanitize, tld_of};
pub use error::LookupError;
pub use extract::{extract, extract_record};
pub use parser::{normalize_key, parse, ParsedRecord};
pub use protocols::{
    is_whois_available, DirectTransport, FetchRequest, ReferralClient, ServerDirectory,
    SocksTransport, SystemWhois, Transport, Transports,
};
pub use proxies::{default_proxy_file, ProxyList, DEFAULT_SOURCE_URL};
pub use resolver::Resolver;
pub use types::{
    AuthorityRecord, ConnectionOptions, ProxyDescriptor, RawHop, RegistrarInfo, Resolution,
    ServerDescriptor, Strategy, WhoisResponse, DEFAULT_QUERY, FALLBACK_SERVER, WHOIS_PORT,
};

/// Proxy list download and storage
pub mod proxies;

// Internal modules - their public items are re-exported above
mod config;
mod dates;
mod domain;
mod error;
mod extract;
mod parser;
mod protocols;
mod resolver;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LookupError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub features: Vec<&'static str>,
}

/// Get list of enabled features at compile time
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "proxy")]
    features.push("proxy");

    #[cfg(feature = "system-whois")]
    features.push("system-whois");

    features
}
