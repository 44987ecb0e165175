//! whois-fallback CLI Application
//!
//! Looks up WHOIS registration data with automatic fallback across the
//! delegated, direct and proxied transports. This binary is a thin layer
//! over whois-fallback-lib: it parses flags, layers configuration and
//! formats results.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use whois_fallback_lib::proxies::{self, default_proxy_file, DEFAULT_SOURCE_URL};
use whois_fallback_lib::{
    extract, load_env_config, parse_duration_string, ConfigManager, ConnectionOptions,
    LookupBackend, LookupError, ProxyDescriptor, Resolution, Resolver, ResolverConfig,
    ServerDescriptor, Strategy,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for whois-fallback
#[derive(Parser, Debug)]
#[command(name = "whois-fallback")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "WHOIS lookups that fall back across direct, delegated and SOCKS5 paths")]
#[command(
    long_about = "Query WHOIS registration data for one or more domains.\n\nEach lookup tries the delegated client first, then a direct socket, then (when a proxy is available) a SOCKS5-relayed socket. The first parseable reply wins."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain names to look up
    #[arg(value_name = "DOMAIN", help_heading = "Lookup")]
    pub domains: Vec<String>,

    /// Run only this strategy (default, alternative, proxy)
    #[arg(long = "use", value_name = "STRATEGY", help_heading = "Lookup")]
    pub strategy: Option<Strategy>,

    /// WHOIS server to query instead of the built-in directory
    #[arg(long = "server", value_name = "HOST[:PORT]", help_heading = "Lookup")]
    pub server: Option<ServerDescriptor>,

    /// Query template sent to --server ($addr is replaced by the domain)
    #[arg(
        long = "query",
        value_name = "TEMPLATE",
        requires = "server",
        allow_hyphen_values = true,
        help_heading = "Lookup"
    )]
    pub query: Option<String>,

    /// Delegated lookup backend (referral, system)
    #[arg(long = "lookup", value_name = "BACKEND", help_heading = "Lookup")]
    pub lookup: Option<LookupBackend>,

    /// Max concurrent lookups when several domains are given
    #[arg(
        short = 'c',
        long = "concurrency",
        default_value = "4",
        help_heading = "Lookup"
    )]
    pub concurrency: usize,

    /// SOCKS5 proxy for the proxied strategy
    #[arg(long = "proxy", value_name = "HOST:PORT", help_heading = "Proxy")]
    pub proxy: Option<ProxyDescriptor>,

    /// Add the proxied strategy using a random proxy from the saved list
    #[arg(long = "free-proxy", help_heading = "Proxy")]
    pub free_proxy: bool,

    /// Proxy list file (default: ~/.whois-fallback-proxies.json)
    #[arg(long = "proxy-file", value_name = "PATH", help_heading = "Proxy")]
    pub proxy_file: Option<PathBuf>,

    /// Download a fresh free proxy list and exit
    #[arg(long = "refresh-proxies", help_heading = "Proxy")]
    pub refresh_proxies: bool,

    /// URL of the proxy list to download with --refresh-proxies
    #[arg(
        long = "proxy-source",
        value_name = "URL",
        requires = "refresh_proxies",
        help_heading = "Proxy"
    )]
    pub proxy_source: Option<String>,

    /// Print the extracted summary instead of the raw record
    #[arg(short = 's', long = "summary", help_heading = "Output Format")]
    pub summary: bool,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Idle-read timeout per socket (e.g. "5s", "500ms")
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Configuration")]
    pub timeout: Option<String>,

    /// Budget for the whole fallback sequence (e.g. "30s", "2m")
    #[arg(long = "deadline", value_name = "DURATION", help_heading = "Configuration")]
    pub deadline: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging (debug level on stderr)
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let outcome = if args.refresh_proxies {
        run_refresh(&args).await.map(|_| true)
    } else {
        run_lookup(&args).await
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.refresh_proxies {
        if !args.domains.is_empty() {
            return Err("Cannot combine --refresh-proxies with domain lookups".to_string());
        }
        return Ok(());
    }

    if args.domains.is_empty() {
        return Err(LookupError::NoDomain.to_string());
    }

    if args.concurrency == 0 || args.concurrency > 32 {
        return Err("Concurrency must be between 1 and 32".to_string());
    }

    for (flag, value) in [("--timeout", &args.timeout), ("--deadline", &args.deadline)] {
        if let Some(value) = value {
            if parse_duration_string(value).is_none() {
                return Err(format!(
                    "Invalid {} value '{}'. Use format like '500ms', '5s', '2m'",
                    flag, value
                ));
            }
        }
    }

    if args.strategy == Some(Strategy::Alternative) && (args.proxy.is_some() || args.free_proxy) {
        return Err("--proxy and --free-proxy have no effect with --use alternative".to_string());
    }

    Ok(())
}

/// Layer defaults, config files, environment variables and CLI flags.
fn build_config(args: &Args) -> Result<ResolverConfig, LookupError> {
    let manager = ConfigManager::new(args.verbose);

    let file_config = match &args.config {
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load()?,
    };

    let mut config = ResolverConfig::default()
        .apply_file(&file_config)?
        .apply_env(&load_env_config());

    if let Some(timeout) = args.timeout.as_deref().and_then(parse_duration_string) {
        config = config.with_idle_timeout(timeout);
    }
    if let Some(deadline) = args.deadline.as_deref().and_then(parse_duration_string) {
        config = config.with_deadline(deadline);
    }
    if let Some(lookup) = args.lookup {
        config = config.with_lookup(lookup);
    }
    if let Some(path) = &args.proxy_file {
        config = config.with_proxy_file(path.clone());
    }

    Ok(config)
}

fn build_options(args: &Args, config: &ResolverConfig) -> ConnectionOptions {
    let mut options = ConnectionOptions::new().with_free_proxy(args.free_proxy || config.free_proxy);

    if let Some(server) = &args.server {
        let server = match &args.query {
            Some(query) => server.clone().with_query(query.as_str()),
            None => server.clone(),
        };
        options = options.with_server(server);
    }
    if let Some(proxy) = &args.proxy {
        options = options.with_proxy(proxy.clone());
    }
    if let Some(strategy) = args.strategy {
        options = options.with_strategy(strategy);
    }

    options
}

/// Resolve every domain and print the results.
///
/// Returns `Ok(false)` when at least one domain failed.
async fn run_lookup(args: &Args) -> Result<bool, LookupError> {
    let config = build_config(args)?;
    let options = build_options(args, &config);
    debug!(
        domains = args.domains.len(),
        lookup = %config.lookup,
        deadline = ?config.deadline,
        strategies = ?options.strategy_order(),
        "Starting lookups"
    );
    let resolver = Resolver::new(config)?;

    let results = resolver
        .resolve_many(&args.domains, &options, args.concurrency)
        .await;

    let all_ok = results.iter().all(|(_, result)| result.is_ok());
    let multiple = results.len() > 1;

    if args.json {
        if let [(_, Err(e))] = results.as_slice() {
            eprintln!("Error: {}", e);
            return Ok(false);
        }

        let values: Vec<Value> = results
            .iter()
            .map(|(domain, result)| json_entry(domain, result, args.summary, multiple))
            .collect();

        let output = if multiple {
            Value::Array(values)
        } else {
            values.into_iter().next().unwrap_or(Value::Null)
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (index, (domain, result)) in results.iter().enumerate() {
            if multiple && index > 0 {
                println!();
            }

            match result {
                Ok(resolution) => {
                    if multiple || args.verbose {
                        ui::print_domain_header(resolution);
                    }
                    if args.summary {
                        let summary = extract(&resolution.authorities, Some(&resolution.domain));
                        ui::print_summary(&summary);
                    } else if let Some(record) = resolution.record() {
                        ui::print_record(record);
                    }
                }
                Err(e) if multiple => eprintln!("Error: {}: {}", domain, e),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
    }

    Ok(all_ok)
}

/// JSON for one domain; the bare payload unless several domains were given.
fn json_entry(
    domain: &str,
    result: &Result<Resolution, LookupError>,
    summary: bool,
    multiple: bool,
) -> Value {
    match result {
        Ok(resolution) => {
            let data = if summary {
                serde_json::to_value(extract(&resolution.authorities, Some(&resolution.domain)))
            } else {
                serde_json::to_value(resolution.record())
            }
            .unwrap_or(Value::Null);

            if multiple {
                json!({
                    "domain": resolution.domain,
                    "strategy": resolution.strategy,
                    "result": data,
                })
            } else {
                data
            }
        }
        Err(e) => json!({ "domain": domain, "error": e.to_string() }),
    }
}

/// Download the free proxy list and save it.
async fn run_refresh(args: &Args) -> Result<(), LookupError> {
    let config = build_config(args)?;

    let path = config
        .proxy_file
        .clone()
        .or_else(default_proxy_file)
        .ok_or_else(|| {
            LookupError::config("Cannot determine a home directory; pass --proxy-file")
        })?;

    let url = args.proxy_source.as_deref().unwrap_or(DEFAULT_SOURCE_URL);

    let spinner = ui::Spinner::start("Fetching proxy list...".to_string());
    let result = proxies::refresh(url, &path).await;
    spinner.stop().await;

    let count = result?;
    ui::print_refresh_result(count, &path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("whois-fallback").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_validate_requires_domain() {
        let args = parse_args(&[]);
        assert_eq!(
            validate_args(&args),
            Err("You must enter a domain.".to_string())
        );

        let args = parse_args(&["--refresh-proxies"]);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(validate_args(&parse_args(&["a.com", "--timeout", "soon"])).is_err());
        assert!(validate_args(&parse_args(&["a.com", "-c", "0"])).is_err());
        assert!(validate_args(&parse_args(&["a.com", "--refresh-proxies"])).is_err());
        assert!(validate_args(&parse_args(&[
            "a.com",
            "--use",
            "alternative",
            "--free-proxy"
        ]))
        .is_err());
    }

    #[test]
    fn test_typed_flags_parse() {
        let args = parse_args(&[
            "google.com",
            "--use",
            "proxy",
            "--server",
            "whois.example.net:4343",
            "--query",
            "-T dn $addr\r\n",
            "--proxy",
            "10.0.0.1:1080",
            "--lookup",
            "system",
        ]);

        assert_eq!(args.strategy, Some(Strategy::Proxy));
        assert_eq!(args.lookup, Some(LookupBackend::System));

        let options = build_options(&args, &ResolverConfig::default());
        let server = options.server.unwrap();
        assert_eq!(server.host, "whois.example.net");
        assert_eq!(server.port, 4343);
        assert_eq!(server.query, "-T dn $addr\r\n");
        assert_eq!(options.proxy.unwrap().address(), "10.0.0.1:1080");
        assert_eq!(options.strategy, Some(Strategy::Proxy));
    }

    #[test]
    fn test_bad_typed_flags_rejected() {
        let argv = ["whois-fallback", "a.com", "--use", "carrier-pigeon"];
        assert!(Args::try_parse_from(argv).is_err());

        let argv = ["whois-fallback", "a.com", "--proxy", "10.0.0.1"];
        assert!(Args::try_parse_from(argv).is_err());

        let argv = ["whois-fallback", "a.com", "--query", "$addr\r\n"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_free_proxy_from_config() {
        let args = parse_args(&["a.com"]);
        let mut config = ResolverConfig::default();
        assert!(!build_options(&args, &config).wants_free_proxy);

        config.free_proxy = true;
        assert!(build_options(&args, &config).wants_free_proxy);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = parse_args(&[
            "a.com",
            "--config",
            "/nonexistent/whois-fallback.toml",
        ]);
        assert!(matches!(
            build_config(&args),
            Err(LookupError::FileError { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\ntimeout = \"9s\"\ndeadline = \"40s\"\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let args = parse_args(&["a.com", "--config", &path, "--deadline", "10s"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.deadline, Duration::from_secs(10));
    }
}
