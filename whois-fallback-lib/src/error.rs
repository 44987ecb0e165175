//! Error handling for WHOIS lookups.
//!
//! This module defines one error type covering every way a lookup can fail,
//! from blank input to exhausted transports. The user-facing messages of the
//! core variants are fixed strings so callers can match on them.

use std::fmt;
use std::time::Duration;

use crate::types::Strategy;

pub const NO_DOMAIN: &str = "You must enter a domain.";
pub const DOMAIN_PARSE: &str = "Error parsing the domain.";
pub const UNKNOWN_TLD: &str = "Unable to find the top level domain.";
pub const WHOIS_ERROR: &str = "Error making Whois request.";
pub const WHOIS_RESPONSE_EMPTY: &str = "Whois request returned no value.";

/// Main error type for WHOIS lookup operations.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupError {
    /// The input was blank
    NoDomain,

    /// The input is not a fully qualified domain name
    DomainParse { input: String },

    /// No server is known for the TLD and no fallback applies
    UnknownTld { tld: String },

    /// Any transport or protocol failure
    Whois {
        strategy: Option<Strategy>,
        message: String,
    },

    /// The reply parsed to nothing, or every strategy came back empty
    WhoisResponseEmpty,

    /// An operation ran past its time budget
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Invalid configuration values
    ConfigError { message: String },

    /// Failure reading or writing a config or proxy-list file
    FileError { path: String, message: String },

    /// Anything that doesn't fit the categories above
    Internal { message: String },
}

impl LookupError {
    /// Create a new domain parse error.
    pub fn domain_parse<I: Into<String>>(input: I) -> Self {
        Self::DomainParse {
            input: input.into(),
        }
    }

    /// Create a new transport error not yet attributed to a strategy.
    pub fn whois<M: Into<String>>(message: M) -> Self {
        Self::Whois {
            strategy: None,
            message: message.into(),
        }
    }

    /// Create a new transport error for a specific strategy.
    pub fn whois_via<M: Into<String>>(strategy: Strategy, message: M) -> Self {
        Self::Whois {
            strategy: Some(strategy),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attribute this error to the strategy that produced it.
    ///
    /// Timeouts and I/O style failures become `Whois` errors tagged with the
    /// strategy. Empty responses keep their generic message.
    pub fn attributed_to(self, strategy: Strategy) -> Self {
        match self {
            Self::Whois { message, .. } => Self::whois_via(strategy, message),
            Self::Timeout {
                operation,
                duration,
            } => Self::whois_via(
                strategy,
                format!("timed out after {:?} during {}", duration, operation),
            ),
            Self::FileError { path, message } => {
                Self::whois_via(strategy, format!("{}: {}", path, message))
            }
            Self::Internal { message } => Self::whois_via(strategy, message),
            other => other,
        }
    }

    /// Whether this error was raised before any network activity.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::NoDomain | Self::DomainParse { .. })
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDomain => write!(f, "{}", NO_DOMAIN),
            Self::DomainParse { .. } => write!(f, "{}", DOMAIN_PARSE),
            Self::UnknownTld { .. } => write!(f, "{}", UNKNOWN_TLD),
            Self::Whois { strategy, message } => match strategy {
                Some(strategy) => write!(
                    f,
                    "{}: {} {}",
                    strategy.as_str().to_uppercase(),
                    WHOIS_ERROR,
                    message
                ),
                None => write!(f, "{} {}", WHOIS_ERROR, message),
            },
            Self::WhoisResponseEmpty => write!(f, "{}", WHOIS_RESPONSE_EMPTY),
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for LookupError {}

impl From<std::io::Error> for LookupError {
    fn from(err: std::io::Error) -> Self {
        Self::whois(format!("I/O error: {}", err))
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(30))
        } else {
            Self::internal(format!("HTTP request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON parsing failed: {}", err))
    }
}

impl From<toml::de::Error> for LookupError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

impl From<regex::Error> for LookupError {
    fn from(err: regex::Error) -> Self {
        Self::internal(format!("Regex error: {}", err))
    }
}
