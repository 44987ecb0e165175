//! Direct TCP transport (the `alternative` strategy).

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::{exchange, FetchRequest, Transport};
use crate::error::LookupError;
use crate::types::{RawHop, ServerDescriptor};

/// Opens a socket straight to the WHOIS server.
#[derive(Debug, Clone)]
pub struct DirectTransport {
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl DirectTransport {
    pub fn new(connect_timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            idle_timeout,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Query one server and return its decoded reply.
    pub async fn query(
        &self,
        server: &ServerDescriptor,
        domain: &str,
        connect_budget: Duration,
    ) -> Result<String, LookupError> {
        let addr = server.address();
        debug!(server = %addr, "Connecting to WHOIS server");

        let mut stream = timeout(connect_budget, TcpStream::connect(&addr))
            .await
            .map_err(|_| LookupError::timeout(format!("connect to {}", addr), connect_budget))?
            .map_err(|e| LookupError::whois(format!("Failed to connect to {}: {}", addr, e)))?;

        exchange(&mut stream, &server.render_query(domain), self.idle_timeout).await
    }
}

impl Default for DirectTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(5))
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<RawHop>, LookupError> {
        let text = self
            .query(
                request.server,
                request.domain,
                request.budget(self.connect_timeout),
            )
            .await?;

        Ok(vec![RawHop::new(request.server.host.clone(), text)])
    }
}
