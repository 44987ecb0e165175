//! System `whois` command backend for the `default` strategy.
//!
//! Delegates the lookup to the operating system's whois client, which has
//! its own server table and referral logic. Useful where outbound port 43
//! is filtered for this process but the system client is configured to use
//! a relay.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{FetchRequest, Transport};
use crate::error::LookupError;
use crate::types::{RawHop, WHOIS_PORT};

/// Runs `whois -h <server> <domain>` and returns its stdout.
#[derive(Debug, Clone)]
pub struct SystemWhois {
    /// Timeout for one command invocation
    timeout: Duration,
}

impl SystemWhois {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(&self, host: &str, port: u16, domain: &str) -> Command {
        let mut command = Command::new("whois");
        command.arg("-h").arg(host);
        if port != WHOIS_PORT {
            command.arg("-p").arg(port.to_string());
        }
        command.arg(domain).kill_on_drop(true);
        command
    }
}

impl Default for SystemWhois {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SystemWhois {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<RawHop>, LookupError> {
        let server = request.server;
        let budget = request.budget(self.timeout);
        debug!(server = %server.host, "Running system whois");

        let output = tokio::time::timeout(
            budget,
            self.command(&server.host, server.port, request.domain).output(),
        )
        .await
        .map_err(|_| LookupError::timeout("system whois", budget))?
        .map_err(|e| {
            LookupError::whois(format!(
                "Failed to execute whois -h {} command: {}. Make sure 'whois' is installed.",
                server.host, e
            ))
        })?;

        let text = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() && text.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LookupError::whois(format!(
                "whois exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(vec![RawHop::new(server.host.clone(), text)])
    }
}

/// Check if the system has a working whois command.
pub async fn is_whois_available() -> bool {
    match Command::new("whois").arg("--version").output().await {
        Ok(output) => output.status.success(),
        // Some builds have no --version flag but still run
        Err(_) => Command::new("whois").arg("example.com").output().await.is_ok(),
    }
}
