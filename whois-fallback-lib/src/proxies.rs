//! Free SOCKS5 proxy list.
//!
//! The list is a JSON array of `{"ip": .., "port": ..}` objects, the shape
//! Geonode's public proxy API returns under `data`. It is loaded once and
//! never mutated; `refresh` rewrites the file on disk for the next run.

use rand::seq::IndexedRandom;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::LookupError;
use crate::types::ProxyDescriptor;

/// Fast, mostly-up Brazilian SOCKS5 endpoints, newest first.
pub const DEFAULT_SOURCE_URL: &str = "https://proxylist.geonode.com/api/proxy-list?limit=500&page=1&sort_by=lastChecked&sort_type=desc&filterUpTime=90&country=BR&speed=fast&protocols=socks5";

/// File name used in the home directory when no path is configured.
pub const DEFAULT_FILE_NAME: &str = ".whois-fallback-proxies.json";

/// Read-only set of candidate proxies.
#[derive(Debug, Clone, Default)]
pub struct ProxyList {
    proxies: Vec<ProxyDescriptor>,
}

impl ProxyList {
    pub fn new(proxies: Vec<ProxyDescriptor>) -> Self {
        Self {
            proxies: proxies.into_iter().filter(|p| p.is_usable()).collect(),
        }
    }

    /// An empty list; every `random()` call returns `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON array of proxy entries.
    ///
    /// Ports may be numbers or numeric strings. Entries without a usable
    /// address and port are skipped.
    pub fn from_json(json: &str) -> Result<Self, LookupError> {
        let value: Value = serde_json::from_str(json)?;
        let entries = value
            .as_array()
            .ok_or_else(|| LookupError::internal("Proxy list must be a JSON array"))?;

        Ok(Self::new(entries.iter().filter_map(entry_to_proxy).collect()))
    }

    /// Load a proxy list file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LookupError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LookupError::file_error(path.display().to_string(), format!("Failed to read proxy list: {}", e))
        })?;

        let list = Self::from_json(&content)?;
        debug!(path = %path.display(), proxies = list.len(), "Loaded proxy list");
        Ok(list)
    }

    /// Load `path` if given, else the default file if it exists, else empty.
    pub fn discover(path: Option<&Path>) -> Result<Self, LookupError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match default_proxy_file() {
            Some(default) if default.exists() => Self::load(default),
            _ => Ok(Self::empty()),
        }
    }

    /// A uniformly random proxy, or `None` when the list is empty.
    pub fn random(&self) -> Option<ProxyDescriptor> {
        self.proxies.choose(&mut rand::rng()).cloned()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProxyDescriptor> {
        self.proxies.iter()
    }
}

fn entry_to_proxy(entry: &Value) -> Option<ProxyDescriptor> {
    let address = entry
        .get("ip")
        .or_else(|| entry.get("address"))
        .and_then(Value::as_str)?;

    let port = match entry.get("port")? {
        Value::Number(n) => u16::try_from(n.as_u64()?).ok()?,
        Value::String(s) => s.trim().parse::<u16>().ok()?,
        _ => return None,
    };

    Some(ProxyDescriptor::new(address.trim(), port))
}

/// `~/.whois-fallback-proxies.json`, when a home directory is known.
pub fn default_proxy_file() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| Path::new(&home).join(DEFAULT_FILE_NAME))
}

/// Extract the entries of a Geonode API reply (`{"data": [...]}`).
pub fn parse_source_reply(body: &Value) -> Result<Vec<Value>, LookupError> {
    body.get("data")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| LookupError::internal("Proxy source reply has no 'data' array"))
}

/// Download a fresh list from `url` and write it to `path`.
///
/// Returns the number of usable proxies written.
pub async fn refresh(url: &str, path: &Path) -> Result<usize, LookupError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| LookupError::internal(format!("Failed to create HTTP client: {}", e)))?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(LookupError::internal(format!(
            "Proxy source returned HTTP {}",
            response.status()
        )));
    }

    let body: Value = response.json().await?;
    let entries = parse_source_reply(&body)?;
    write_list(path, &entries)
}

/// Persist entries as a compact `[{"ip", "port"}]` array.
pub fn write_list(path: &Path, entries: &[Value]) -> Result<usize, LookupError> {
    let slim: Vec<Value> = entries
        .iter()
        .filter_map(|entry| {
            let proxy = entry_to_proxy(entry)?;
            Some(serde_json::json!({ "ip": proxy.address, "port": proxy.port.to_string() }))
        })
        .collect();

    let json = serde_json::to_string_pretty(&slim)?;
    fs::write(path, json).map_err(|e| {
        LookupError::file_error(path.display().to_string(), format!("Failed to write proxy list: {}", e))
    })?;

    info!(path = %path.display(), proxies = slim.len(), "Proxy list updated");
    Ok(slim.len())
}
