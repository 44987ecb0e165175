//! Core data types for WHOIS lookups.
//!
//! This module defines the descriptors handed to transports, the per-query
//! options, the transport outputs and the structured summary returned to
//! callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LookupError;
use crate::parser::ParsedRecord;

/// Standard WHOIS port (RFC 3912).
pub const WHOIS_PORT: u16 = 43;

/// Placeholder replaced by the domain in a query template.
pub const QUERY_PLACEHOLDER: &str = "$addr";

/// Query template used when a server doesn't define its own.
pub const DEFAULT_QUERY: &str = "$addr\r\n";

/// Registry used when the directory has no entry for a TLD.
pub const FALLBACK_SERVER: &str = "whois.verisign-grs.com";

/// SOCKS protocol version spoken by the proxied transport.
pub const SOCKS_VERSION: u8 = 5;

/// Transport path used to reach a WHOIS server.
///
/// The set is closed: the resolver matches on it to pick the transport
/// instead of building handler names at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Delegated lookup (referral-following client or system `whois`)
    Default,

    /// Direct TCP socket to the WHOIS server
    Alternative,

    /// TCP socket relayed through a SOCKS5 proxy
    Proxy,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Default => "default",
            Strategy::Alternative => "alternative",
            Strategy::Proxy => "proxy",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Strategy::Default),
            "alternative" => Ok(Strategy::Alternative),
            "proxy" => Ok(Strategy::Proxy),
            other => Err(LookupError::config(format!(
                "Unknown strategy '{}', expected default, alternative or proxy",
                other
            ))),
        }
    }
}

fn default_port() -> u16 {
    WHOIS_PORT
}

fn default_query() -> String {
    DEFAULT_QUERY.to_string()
}

/// Where and how to ask a WHOIS server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Server hostname (e.g., "whois.verisign-grs.com")
    pub host: String,

    /// TCP port, 43 unless the registry says otherwise
    #[serde(default = "default_port")]
    pub port: u16,

    /// Query template containing one `$addr` placeholder
    #[serde(default = "default_query")]
    pub query: String,
}

impl ServerDescriptor {
    /// Create a descriptor with the default port and query template.
    pub fn new<H: Into<String>>(host: H) -> Self {
        Self {
            host: host.into(),
            port: WHOIS_PORT,
            query: default_query(),
        }
    }

    /// The registry consulted when nothing better is known.
    pub fn fallback() -> Self {
        Self::new(FALLBACK_SERVER)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the query template. A blank template resets to the default.
    pub fn with_query<Q: Into<String>>(mut self, query: Q) -> Self {
        let query = query.into();
        self.query = if query.is_empty() {
            default_query()
        } else {
            query
        };
        self
    }

    /// Build the wire query for `domain` by substituting the placeholder.
    pub fn render_query(&self, domain: &str) -> String {
        let template = if self.query.is_empty() {
            DEFAULT_QUERY
        } else {
            self.query.as_str()
        };
        template.replacen(QUERY_PLACEHOLDER, domain, 1)
    }

    /// `host:port` form, suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerDescriptor {
    type Err = LookupError;

    /// Parse `host` or `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = split_host_port(s)?;
        Ok(Self::new(host).with_port(port.unwrap_or(WHOIS_PORT)))
    }
}

/// A SOCKS5 proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    /// Proxy IP address or hostname
    #[serde(alias = "ip", alias = "ipaddress")]
    pub address: String,

    /// Proxy port
    pub port: u16,

    /// SOCKS protocol version, always 5
    #[serde(default = "default_socks_version")]
    pub version: u8,
}

fn default_socks_version() -> u8 {
    SOCKS_VERSION
}

impl ProxyDescriptor {
    pub fn new<A: Into<String>>(address: A, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            version: SOCKS_VERSION,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// A usable descriptor has both an address and a non-zero port.
    pub fn is_usable(&self) -> bool {
        !self.address.trim().is_empty() && self.port != 0
    }
}

impl FromStr for ProxyDescriptor {
    type Err = LookupError;

    /// Parse `host:port`; the port is mandatory for proxies.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split_host_port(s)? {
            (host, Some(port)) => Ok(Self::new(host, port)),
            (_, None) => Err(LookupError::config(format!(
                "Proxy '{}' must be given as host:port",
                s
            ))),
        }
    }
}

fn split_host_port(s: &str) -> Result<(String, Option<u16>), LookupError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(LookupError::config("Address cannot be empty"));
    }

    match s.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.contains(':') => {
            let port = port
                .parse::<u16>()
                .map_err(|_| LookupError::config(format!("Invalid port in '{}'", s)))?;
            Ok((host.to_string(), Some(port)))
        }
        _ => Ok((s.to_string(), None)),
    }
}

/// Per-query options.
///
/// Everything is optional: an empty set of options resolves the server from
/// the directory and tries the default and alternative strategies.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    /// Server to query instead of the directory entry
    pub server: Option<ServerDescriptor>,

    /// SOCKS5 proxy for the proxied strategy
    pub proxy: Option<ProxyDescriptor>,

    /// Run only this strategy
    pub strategy: Option<Strategy>,

    /// Add the proxied strategy using a proxy from the free list
    pub wants_free_proxy: bool,

    /// Budget for the whole fallback sequence (overrides the config)
    pub deadline: Option<Duration>,
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, server: ServerDescriptor) -> Self {
        self.server = Some(server);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyDescriptor) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_free_proxy(mut self, enabled: bool) -> Self {
        self.wants_free_proxy = enabled;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Whether the caller supplied a usable proxy.
    pub fn has_proxy(&self) -> bool {
        self.proxy.as_ref().is_some_and(ProxyDescriptor::is_usable)
    }

    /// The ordered list of strategies to attempt.
    pub fn strategy_order(&self) -> Vec<Strategy> {
        if let Some(strategy) = self.strategy {
            return vec![strategy];
        }

        let mut order = vec![Strategy::Default, Strategy::Alternative];
        if self.wants_free_proxy || self.has_proxy() {
            order.push(Strategy::Proxy);
        }
        order
    }
}

/// Raw text returned by one WHOIS authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHop {
    /// Server that produced the text
    pub authority: String,

    /// Reply body, decoded
    pub text: String,
}

impl RawHop {
    pub fn new<A: Into<String>, T: Into<String>>(authority: A, text: T) -> Self {
        Self {
            authority: authority.into(),
            text: text.into(),
        }
    }
}

/// Parsed reply of one WHOIS authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityRecord {
    pub authority: String,
    pub record: ParsedRecord,
}

impl AuthorityRecord {
    pub fn new<A: Into<String>>(authority: A, record: ParsedRecord) -> Self {
        Self {
            authority: authority.into(),
            record,
        }
    }
}

/// Outcome of a successful fallback run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// The sanitized domain that was queried
    pub domain: String,

    /// Strategy that produced the records
    pub strategy: Strategy,

    /// Records in referral order, registry first; non-empty when built by the resolver
    pub authorities: Vec<AuthorityRecord>,
}

impl Resolution {
    /// Record of the most specific authority consulted.
    pub fn record(&self) -> Option<&ParsedRecord> {
        self.authorities.last().map(|authority| &authority.record)
    }

    pub fn into_record(mut self) -> ParsedRecord {
        self.authorities
            .pop()
            .map(|authority| authority.record)
            .unwrap_or_default()
    }
}

/// Registrar block of a [`WhoisResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrarInfo {
    pub name: Option<String>,
    pub url: Option<String>,
    pub owner: Option<String>,
    pub tech: Option<String>,
}

/// Fixed-shape summary derived from parsed WHOIS records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoisResponse {
    /// Always "whois"
    pub origin: String,

    /// When the registration expires, if a parseable date was found
    pub domain_expiration_date: Option<DateTime<Utc>>,

    pub registrar: RegistrarInfo,

    /// Hosting/registration provider, defaulting to the registrar name
    pub provider: Option<String>,

    /// Nameserver hostnames in reply order
    pub name_servers: Option<Vec<String>>,
}

impl WhoisResponse {
    /// A response with every field unset.
    pub fn empty() -> Self {
        Self {
            origin: "whois".to_string(),
            domain_expiration_date: None,
            registrar: RegistrarInfo::default(),
            provider: None,
            name_servers: None,
        }
    }
}

impl Default for WhoisResponse {
    fn default() -> Self {
        Self::empty()
    }
}
