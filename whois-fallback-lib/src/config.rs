//! Configuration file parsing and management.
//!
//! Settings come from three layers: built-in defaults, TOML files discovered
//! in standard locations, and `WF_*` environment variables. Each layer only
//! overrides what it sets; the CLI applies its flags last.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::LookupError;
use crate::types::ServerDescriptor;

/// Which backend the `default` strategy delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupBackend {
    /// Built-in client that follows registrar referrals
    #[default]
    Referral,

    /// The operating system's `whois` command
    System,
}

impl fmt::Display for LookupBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupBackend::Referral => write!(f, "referral"),
            LookupBackend::System => write!(f, "system"),
        }
    }
}

impl FromStr for LookupBackend {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "referral" => Ok(LookupBackend::Referral),
            "system" => Ok(LookupBackend::System),
            other => Err(LookupError::config(format!(
                "Unknown lookup backend '{}', expected 'referral' or 'system'",
                other
            ))),
        }
    }
}

/// Effective settings for a [`crate::Resolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// How long a socket may stay silent before the reply is considered over
    pub idle_timeout: Duration,

    /// Limit for establishing a TCP or SOCKS5 session
    pub connect_timeout: Duration,

    /// Budget for the whole fallback sequence of one query
    pub deadline: Duration,

    /// Backend used by the `default` strategy
    pub lookup: LookupBackend,

    /// Proxy list file; `None` uses the default file if present
    pub proxy_file: Option<PathBuf>,

    /// Per-TLD server overrides
    pub servers: HashMap<String, ServerDescriptor>,

    /// Add the proxied strategy to every query
    pub free_proxy: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(30),
            lookup: LookupBackend::Referral,
            proxy_file: None,
            servers: HashMap::new(),
            free_proxy: false,
        }
    }
}

impl ResolverConfig {
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_lookup(mut self, lookup: LookupBackend) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_proxy_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.proxy_file = Some(path.into());
        self
    }

    pub fn with_server<T: Into<String>>(mut self, tld: T, server: ServerDescriptor) -> Self {
        self.servers.insert(tld.into(), server);
        self
    }

    /// Overlay values from a (validated) file config.
    pub fn apply_file(mut self, file: &FileConfig) -> Result<Self, LookupError> {
        if let Some(defaults) = &file.defaults {
            if let Some(value) = &defaults.timeout {
                self.idle_timeout = require_duration("timeout", value)?;
            }
            if let Some(value) = &defaults.connect_timeout {
                self.connect_timeout = require_duration("connect_timeout", value)?;
            }
            if let Some(value) = &defaults.deadline {
                self.deadline = require_duration("deadline", value)?;
            }
            if let Some(value) = &defaults.lookup {
                self.lookup = value.parse()?;
            }
            if let Some(value) = &defaults.proxy_file {
                self.proxy_file = Some(PathBuf::from(value));
            }
            if let Some(value) = defaults.free_proxy {
                self.free_proxy = value;
            }
        }

        if let Some(servers) = &file.servers {
            for (tld, entry) in servers {
                self.servers.insert(tld.clone(), entry.to_descriptor()?);
            }
        }

        Ok(self)
    }

    /// Overlay values from environment variables.
    pub fn apply_env(mut self, env_config: &EnvConfig) -> Self {
        if let Some(timeout) = env_config.timeout {
            self.idle_timeout = timeout;
        }
        if let Some(deadline) = env_config.deadline {
            self.deadline = deadline;
        }
        if let Some(lookup) = env_config.lookup {
            self.lookup = lookup;
        }
        if let Some(path) = &env_config.proxy_file {
            self.proxy_file = Some(path.clone());
        }
        self
    }
}

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Resolver defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// TLD to WHOIS server overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<HashMap<String, ServerEntry>>,
}

/// The `[defaults]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Idle-read timeout (as string, e.g., "5s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<String>,

    /// Whole-query budget (e.g., "30s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,

    /// "referral" or "system"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_file: Option<String>,

    /// Always add the proxied strategy using the free list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_proxy: Option<bool>,
}

/// A `[servers]` entry: either a bare host or a full descriptor.
///
/// ```toml
/// [servers]
/// io = "whois.nic.io"
/// de = { host = "whois.denic.de", query = "-T dn,ace $addr\r\n" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEntry {
    Host(String),
    Full(ServerDescriptor),
}

impl ServerEntry {
    pub fn to_descriptor(&self) -> Result<ServerDescriptor, LookupError> {
        match self {
            ServerEntry::Host(host) => host.parse(),
            ServerEntry::Full(server) => Ok(server.clone()),
        }
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were loaded
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, LookupError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LookupError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            LookupError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is the lowest layer, then the home directory file, then
    /// the file in the current directory.
    pub fn discover_and_load(&self) -> Result<FileConfig, LookupError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping config file"),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                debug!(path = %path.display(), "Loaded config file");
            }
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./whois-fallback.toml", "./.whois-fallback.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".whois-fallback.toml", "whois-fallback.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("whois-fallback").join("config.toml");
        path.exists().then_some(path)
    }

    /// Values from `higher` take precedence over values from `lower`.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.connect_timeout.is_some() {
                        lower_defaults.connect_timeout = higher_defaults.connect_timeout;
                    }
                    if higher_defaults.deadline.is_some() {
                        lower_defaults.deadline = higher_defaults.deadline;
                    }
                    if higher_defaults.lookup.is_some() {
                        lower_defaults.lookup = higher_defaults.lookup;
                    }
                    if higher_defaults.proxy_file.is_some() {
                        lower_defaults.proxy_file = higher_defaults.proxy_file;
                    }
                    if higher_defaults.free_proxy.is_some() {
                        lower_defaults.free_proxy = higher_defaults.free_proxy;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            servers: match (lower.servers, higher.servers) {
                (Some(mut lower_servers), Some(higher_servers)) => {
                    lower_servers.extend(higher_servers);
                    Some(lower_servers)
                }
                (lower_servers, higher_servers) => higher_servers.or(lower_servers),
            },
        }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), LookupError> {
        if let Some(defaults) = &config.defaults {
            for (name, value) in [
                ("timeout", &defaults.timeout),
                ("connect_timeout", &defaults.connect_timeout),
                ("deadline", &defaults.deadline),
            ] {
                if let Some(value) = value {
                    require_duration(name, value)?;
                }
            }

            if let Some(lookup) = &defaults.lookup {
                lookup.parse::<LookupBackend>()?;
            }
        }

        if let Some(servers) = &config.servers {
            for (tld, entry) in servers {
                if tld.is_empty() || tld.contains(' ') {
                    return Err(LookupError::config(format!("Invalid TLD '{}' in [servers]", tld)));
                }

                let server = entry.to_descriptor()?;
                if server.host.trim().is_empty() {
                    return Err(LookupError::config(format!(
                        "Server for '{}' has an empty host",
                        tld
                    )));
                }
                if !server.query.contains(crate::types::QUERY_PLACEHOLDER) {
                    return Err(LookupError::config(format!(
                        "Query template for '{}' must contain $addr",
                        tld
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration.
///
/// Values come from `WF_*` variables; invalid ones are ignored with a warning.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub timeout: Option<Duration>,
    pub deadline: Option<Duration>,
    pub lookup: Option<LookupBackend>,
    pub proxy_file: Option<PathBuf>,
}

/// Load configuration from `WF_TIMEOUT`, `WF_DEADLINE`, `WF_LOOKUP` and
/// `WF_PROXY_FILE`.
pub fn load_env_config() -> EnvConfig {
    let mut env_config = EnvConfig::default();

    if let Ok(value) = env::var("WF_TIMEOUT") {
        match parse_duration_string(&value) {
            Some(timeout) => {
                debug!(%value, "Using WF_TIMEOUT");
                env_config.timeout = Some(timeout);
            }
            None => warn!(%value, "Invalid WF_TIMEOUT, use a format like '5s' or '500ms'"),
        }
    }

    if let Ok(value) = env::var("WF_DEADLINE") {
        match parse_duration_string(&value) {
            Some(deadline) => {
                debug!(%value, "Using WF_DEADLINE");
                env_config.deadline = Some(deadline);
            }
            None => warn!(%value, "Invalid WF_DEADLINE, use a format like '30s' or '2m'"),
        }
    }

    if let Ok(value) = env::var("WF_LOOKUP") {
        match value.parse::<LookupBackend>() {
            Ok(lookup) => {
                debug!(%value, "Using WF_LOOKUP");
                env_config.lookup = Some(lookup);
            }
            Err(e) => warn!(%value, error = %e, "Invalid WF_LOOKUP"),
        }
    }

    if let Ok(value) = env::var("WF_PROXY_FILE") {
        if !value.trim().is_empty() {
            debug!(%value, "Using WF_PROXY_FILE");
            env_config.proxy_file = Some(PathBuf::from(value));
        }
    }

    env_config
}

/// Parse a duration like "500ms", "5s", "2m", or bare seconds.
pub fn parse_duration_string(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    if let Some(ms) = input.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = input.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = input.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        input.parse::<u64>().ok().map(Duration::from_secs)
    }
}

fn require_duration(name: &str, value: &str) -> Result<Duration, LookupError> {
    parse_duration_string(value).ok_or_else(|| {
        LookupError::config(format!(
            "Invalid {} format '{}'. Use format like '500ms', '5s', '2m'",
            name, value
        ))
    })
}
