//! Connection orchestrator.
//!
//! A query walks an ordered list of strategies. Each attempt fetches raw
//! text and parses it; the first attempt that yields at least one non-empty
//! record wins and later strategies are never tried. Failed attempts are
//! logged and only remembered as the last error.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument};

use crate::config::{LookupBackend, ResolverConfig};
use crate::domain::sanitize;
use crate::error::LookupError;
use crate::extract::extract;
use crate::parser::{parse, ParsedRecord};
use crate::protocols::{
    DirectTransport, FetchRequest, ReferralClient, ServerDirectory, SocksTransport, SystemWhois,
    Transport, Transports,
};
use crate::proxies::ProxyList;
use crate::types::{AuthorityRecord, ConnectionOptions, Resolution, Strategy, WhoisResponse};

/// WHOIS resolver with fallback across transport strategies.
///
/// Holds only read-only state, so one instance can serve any number of
/// concurrent queries.
///
/// ```rust,no_run
/// use whois_fallback_lib::{ConnectionOptions, Resolver, ResolverConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let resolver = Resolver::new(ResolverConfig::default())?;
///     let summary = resolver.lookup("google.com", &ConnectionOptions::new()).await?;
///     println!("{:?}", summary.registrar.name);
///     Ok(())
/// }
/// ```
pub struct Resolver {
    config: ResolverConfig,
    directory: Arc<ServerDirectory>,
    transports: Transports,
}

impl Resolver {
    /// Build a resolver, loading the proxy list named in the config.
    pub fn new(config: ResolverConfig) -> Result<Self, LookupError> {
        let proxies = Arc::new(ProxyList::discover(config.proxy_file.as_deref())?);
        let directory = Arc::new(ServerDirectory::with_overrides(config.servers.clone()));
        Ok(Self::with_parts(config, directory, proxies))
    }

    /// Build a resolver from shared tables.
    pub fn with_parts(
        config: ResolverConfig,
        directory: Arc<ServerDirectory>,
        proxies: Arc<ProxyList>,
    ) -> Self {
        let direct = DirectTransport::new(config.connect_timeout, config.idle_timeout);

        let default: Box<dyn Transport> = match config.lookup {
            LookupBackend::Referral => Box::new(ReferralClient::new(direct.clone())),
            LookupBackend::System => Box::new(SystemWhois::with_timeout(config.deadline)),
        };

        let transports = Transports {
            default,
            alternative: Box::new(direct),
            proxy: Box::new(SocksTransport::new(
                proxies,
                config.connect_timeout,
                config.idle_timeout,
            )),
        };

        Self::with_transports(config, directory, transports)
    }

    /// Build a resolver around caller-supplied transports.
    pub fn with_transports(
        config: ResolverConfig,
        directory: Arc<ServerDirectory>,
        transports: Transports,
    ) -> Self {
        Self {
            config,
            directory,
            transports,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn directory(&self) -> &ServerDirectory {
        &self.directory
    }

    /// Run the fallback sequence and return every authority's record.
    ///
    /// # Errors
    ///
    /// Input errors (`NoDomain`, `DomainParse`) are returned before any
    /// network activity. Otherwise the error of the last strategy tried,
    /// tagged with that strategy; an empty reply stays `WhoisResponseEmpty`.
    #[instrument(skip(self, options), fields(domain = %domain))]
    pub async fn resolve(
        &self,
        domain: &str,
        options: &ConnectionOptions,
    ) -> Result<Resolution, LookupError> {
        let domain = sanitize(domain)?;

        let server = options
            .server
            .clone()
            .unwrap_or_else(|| self.directory.resolve(&domain));

        let budget = options.deadline.unwrap_or(self.config.deadline);
        let deadline = deadline_after(budget);

        let request = FetchRequest {
            domain: &domain,
            server: &server,
            proxy: options.proxy.as_ref(),
            deadline,
        };

        let mut last_error = LookupError::WhoisResponseEmpty;

        for strategy in self.strategy_order(options) {
            if Instant::now() >= deadline {
                last_error = LookupError::timeout("lookup deadline", budget).attributed_to(strategy);
                debug!(%strategy, "Deadline exhausted before attempt");
                continue;
            }

            debug!(%strategy, server = %server.address(), "Attempting strategy");

            let outcome = match timeout_at(deadline, self.attempt(strategy, &request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(LookupError::timeout("lookup deadline", budget)),
            };

            match outcome {
                Ok(authorities) => {
                    info!(%strategy, authorities = authorities.len(), "WHOIS lookup succeeded");
                    return Ok(Resolution {
                        domain,
                        strategy,
                        authorities,
                    });
                }
                Err(err) => {
                    debug!(%strategy, error = %err, "Strategy failed");
                    last_error = err.attributed_to(strategy);
                }
            }
        }

        Err(last_error)
    }

    /// Flat record of the most specific authority.
    pub async fn query(
        &self,
        domain: &str,
        options: &ConnectionOptions,
    ) -> Result<ParsedRecord, LookupError> {
        Ok(self.resolve(domain, options).await?.into_record())
    }

    /// Semantic summary across every authority consulted.
    pub async fn lookup(
        &self,
        domain: &str,
        options: &ConnectionOptions,
    ) -> Result<WhoisResponse, LookupError> {
        let resolution = self.resolve(domain, options).await?;
        Ok(extract(&resolution.authorities, Some(&resolution.domain)))
    }

    /// Resolve several domains, at most `concurrency` at a time.
    ///
    /// Each domain runs its own sequential fallback; results come back in
    /// input order.
    pub async fn resolve_many(
        &self,
        domains: &[String],
        options: &ConnectionOptions,
        concurrency: usize,
    ) -> Vec<(String, Result<Resolution, LookupError>)> {
        stream::iter(domains)
            .map(|domain| async move { (domain.clone(), self.resolve(domain, options).await) })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Strategies for one query; a config-wide `free_proxy` adds the
    /// proxied strategy unless the caller forced a single one.
    fn strategy_order(&self, options: &ConnectionOptions) -> Vec<Strategy> {
        let mut order = options.strategy_order();
        if self.config.free_proxy
            && options.strategy.is_none()
            && !order.contains(&Strategy::Proxy)
        {
            order.push(Strategy::Proxy);
        }
        order
    }

    async fn attempt(
        &self,
        strategy: Strategy,
        request: &FetchRequest<'_>,
    ) -> Result<Vec<AuthorityRecord>, LookupError> {
        let hops = self.transports.for_strategy(strategy).fetch(request).await?;

        let authorities: Vec<AuthorityRecord> = hops
            .into_iter()
            .filter_map(|hop| match parse(&hop.text) {
                Ok(record) => Some(AuthorityRecord::new(hop.authority, record)),
                Err(_) => {
                    debug!(authority = %hop.authority, "Authority returned nothing parseable");
                    None
                }
            })
            .collect();

        if authorities.is_empty() {
            return Err(LookupError::WhoisResponseEmpty);
        }

        Ok(authorities)
    }
}

/// Longest budget honoured; larger ones are clamped to it.
const MAX_DEADLINE: Duration = Duration::from_secs(30 * 365 * 86_400);

fn deadline_after(budget: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(budget).unwrap_or(now + MAX_DEADLINE)
}
