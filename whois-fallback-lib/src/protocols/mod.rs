//! Transport implementations for WHOIS lookups.
//!
//! Every strategy produces raw reply text for a domain and a server
//! descriptor. The socket-based transports share the read loop defined here.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, Instant};

use crate::error::LookupError;
use crate::types::{ProxyDescriptor, RawHop, ServerDescriptor, Strategy};

/// Native RFC 3912 client that follows registrar referrals
pub mod referral;

/// WHOIS server directory
pub mod registry;

/// Direct TCP transport
pub mod socket;

/// SOCKS5-relayed TCP transport
pub mod socks;

/// System `whois` command backend
pub mod whois;

pub use referral::ReferralClient;
pub use registry::ServerDirectory;
pub use socket::DirectTransport;
pub use socks::SocksTransport;
pub use whois::{is_whois_available, SystemWhois};

/// Largest reply accepted from a server.
pub const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// One query handed to a transport.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    /// Sanitized domain
    pub domain: &'a str,

    /// Server to ask first
    pub server: &'a ServerDescriptor,

    /// Proxy chosen by the caller, if any
    pub proxy: Option<&'a ProxyDescriptor>,

    /// Point in time after which the attempt is abandoned
    pub deadline: Instant,
}

impl FetchRequest<'_> {
    /// Time left before the deadline, capped at `limit`.
    pub fn budget(&self, limit: Duration) -> Duration {
        self.deadline
            .saturating_duration_since(Instant::now())
            .min(limit)
    }
}

/// A way of getting raw WHOIS text for a domain.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the reply, one hop per authority consulted.
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<RawHop>, LookupError>;
}

/// Transports for each strategy, owned by the resolver.
pub struct Transports {
    pub default: Box<dyn Transport>,
    pub alternative: Box<dyn Transport>,
    pub proxy: Box<dyn Transport>,
}

impl Transports {
    pub fn for_strategy(&self, strategy: Strategy) -> &dyn Transport {
        match strategy {
            Strategy::Default => self.default.as_ref(),
            Strategy::Alternative => self.alternative.as_ref(),
            Strategy::Proxy => self.proxy.as_ref(),
        }
    }
}

/// Write the query and read until the peer closes or goes idle.
pub(crate) async fn exchange<S>(
    stream: &mut S,
    query: &str,
    idle: Duration,
) -> Result<String, LookupError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    timeout(idle, stream.write_all(query.as_bytes()))
        .await
        .map_err(|_| LookupError::timeout("write query", idle))?
        .map_err(|e| LookupError::whois(format!("Failed to send query: {}", e)))?;

    let bytes = read_reply(stream, idle).await?;
    Ok(decode(bytes))
}

/// Accumulate bytes until EOF or `idle` passes without new data.
///
/// Going idle after some data counts as the end of the reply; going idle
/// before any data is an error.
pub(crate) async fn read_reply<S>(stream: &mut S, idle: Duration) -> Result<Vec<u8>, LookupError>
where
    S: AsyncRead + Unpin,
{
    let mut response = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        match timeout(idle, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                response.extend_from_slice(&buf[..n]);
                if response.len() > MAX_RESPONSE_SIZE {
                    return Err(LookupError::whois("Response too large"));
                }
            }
            Ok(Err(e)) => return Err(LookupError::whois(format!("Read error: {}", e))),
            Err(_) => {
                if !response.is_empty() {
                    break;
                }
                return Err(LookupError::timeout("read reply", idle));
            }
        }
    }

    Ok(response)
}

/// UTF-8, falling back to Latin-1 for older registries.
pub(crate) fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().iter().map(|&b| b as char).collect(),
    }
}
