//! Referral-following WHOIS client (the native `default` backend).
//!
//! Thin registries such as Verisign only know which registrar holds a
//! domain. Their reply names the registrar's own WHOIS server, which has the
//! full record, so the client keeps asking until nobody refers further.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::socket::DirectTransport;
use super::{FetchRequest, Transport};
use crate::error::LookupError;
use crate::types::{RawHop, ServerDescriptor};

/// Most servers consulted for one query, registry included.
pub const MAX_REFERRAL_DEPTH: usize = 3;

lazy_static! {
    static ref REFERRAL_PATTERNS: Vec<Regex> = [
        r"(?im)^[ \t]*Registrar WHOIS Server:[ \t]*(\S+)",
        r"(?im)^[ \t]*Whois Server:[ \t]*(\S+)",
        r"(?im)^[ \t]*ReferralServer:[ \t]*r?whois://(\S+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect();
}

/// Native RFC 3912 client that follows registrar referrals.
#[derive(Debug, Clone, Default)]
pub struct ReferralClient {
    socket: DirectTransport,
}

impl ReferralClient {
    pub fn new(socket: DirectTransport) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for ReferralClient {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<RawHop>, LookupError> {
        let mut hops: Vec<RawHop> = Vec::new();
        let mut visited = HashSet::new();
        let mut current = request.server.clone();

        loop {
            visited.insert(current.address().to_lowercase());
            debug!(server = %current.address(), depth = hops.len(), "Querying WHOIS server");

            let budget = request.budget(self.socket.connect_timeout());
            let text = match self.socket.query(&current, request.domain, budget).await {
                Ok(text) => text,
                Err(err) if !hops.is_empty() => {
                    // The registry answer is still worth returning.
                    warn!(server = %current.address(), error = %err, "Referral server failed");
                    break;
                }
                Err(err) => return Err(err),
            };

            let referral = extract_referral(&text);
            hops.push(RawHop::new(current.host.clone(), text));

            let Some(next) = referral else {
                break;
            };

            if visited.contains(&next.address().to_lowercase()) {
                if next.address() != current.address() {
                    warn!(server = %next.address(), "Circular WHOIS referral detected");
                }
                break;
            }

            if hops.len() >= MAX_REFERRAL_DEPTH {
                warn!(server = %next.address(), "Max referral depth reached");
                break;
            }

            debug!(referral = %next.address(), "Following referral");
            current = next;
        }

        Ok(hops)
    }
}

/// Find the next WHOIS server named in a reply.
pub fn extract_referral(response: &str) -> Option<ServerDescriptor> {
    REFERRAL_PATTERNS.iter().find_map(|re| {
        let raw = re.captures(response)?.get(1)?.as_str();
        let host = raw
            .trim()
            .trim_start_matches("whois://")
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_lowercase();

        if host.is_empty() || !host.contains('.') {
            return None;
        }

        host.parse::<ServerDescriptor>().ok()
    })
}
