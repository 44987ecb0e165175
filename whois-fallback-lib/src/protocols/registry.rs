//! WHOIS server directory.
//!
//! Maps a top-level label to the registry WHOIS server that answers for it.
//! The built-in table covers the common gTLDs and ccTLDs; entries from the
//! config file's `[servers]` table take precedence.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::domain::tld_of;
use crate::types::ServerDescriptor;

/// Built-in entry: host plus an optional registry-specific query template.
struct BuiltinServer {
    host: &'static str,
    query: Option<&'static str>,
}

const fn host(host: &'static str) -> BuiltinServer {
    BuiltinServer { host, query: None }
}

const fn host_with_query(host: &'static str, query: &'static str) -> BuiltinServer {
    BuiltinServer {
        host,
        query: Some(query),
    }
}

lazy_static! {
    static ref BUILTIN_SERVERS: HashMap<&'static str, BuiltinServer> = HashMap::from([
        // Generic TLDs
        ("com", host("whois.verisign-grs.com")),
        ("net", host("whois.verisign-grs.com")),
        ("org", host("whois.pir.org")),
        ("info", host("whois.afilias.net")),
        ("biz", host("whois.biz")),
        ("name", host("whois.nic.name")),
        ("mobi", host("whois.afilias.net")),
        ("pro", host("whois.registrypro.pro")),
        ("aero", host("whois.aero")),
        ("asia", host("whois.nic.asia")),
        ("coop", host("whois.nic.coop")),
        ("edu", host("whois.educause.edu")),
        ("gov", host("whois.dotgov.gov")),
        ("int", host("whois.iana.org")),
        ("museum", host("whois.museum")),
        ("tel", host("whois.nic.tel")),
        ("travel", host("whois.nic.travel")),
        // Google registry
        ("app", host("whois.nic.google")),
        ("dev", host("whois.nic.google")),
        ("page", host("whois.nic.google")),
        // Other new gTLDs
        ("blog", host("whois.nic.blog")),
        ("cloud", host("whois.nic.cloud")),
        ("xyz", host("whois.nic.xyz")),
        ("online", host("whois.nic.online")),
        ("site", host("whois.nic.site")),
        ("tech", host("whois.nic.tech")),
        ("store", host("whois.nic.store")),
        ("shop", host("whois.nic.shop")),
        ("website", host("whois.nic.website")),
        ("digital", host("whois.nic.digital")),
        ("agency", host("whois.nic.agency")),
        ("email", host("whois.nic.email")),
        ("live", host("whois.nic.live")),
        // Country codes
        ("br", host("whois.registro.br")),
        ("io", host("whois.nic.io")),
        ("co", host("whois.nic.co")),
        ("me", host("whois.nic.me")),
        ("tv", host("whois.nic.tv")),
        ("cc", host("ccwhois.verisign-grs.com")),
        ("ai", host("whois.nic.ai")),
        ("us", host("whois.nic.us")),
        ("uk", host("whois.nic.uk")),
        ("ca", host("whois.cira.ca")),
        ("au", host("whois.auda.org.au")),
        ("fr", host("whois.nic.fr")),
        ("nl", host("whois.domain-registry.nl")),
        ("be", host("whois.dns.be")),
        ("eu", host("whois.eu")),
        ("it", host("whois.nic.it")),
        ("es", host("whois.nic.es")),
        ("pt", host("whois.dns.pt")),
        ("ch", host("whois.nic.ch")),
        ("at", host("whois.nic.at")),
        ("se", host("whois.iis.se")),
        ("no", host("whois.norid.no")),
        ("fi", host("whois.fi")),
        ("pl", host("whois.dns.pl")),
        ("ru", host("whois.tcinet.ru")),
        ("in", host("whois.registry.in")),
        ("cn", host("whois.cnnic.cn")),
        ("kr", host("whois.kr")),
        ("mx", host("whois.mx")),
        ("ar", host("whois.nic.ar")),
        ("cl", host("whois.nic.cl")),
        ("de", host_with_query("whois.denic.de", "-T dn,ace $addr\r\n")),
        ("dk", host_with_query("whois.punktum.dk", "--show-handles $addr\r\n")),
        ("jp", host_with_query("whois.jprs.jp", "$addr/e\r\n")),
    ]);
}

/// Read-only TLD to server table.
#[derive(Debug, Clone, Default)]
pub struct ServerDirectory {
    overrides: HashMap<String, ServerDescriptor>,
}

impl ServerDirectory {
    /// Directory with the built-in table only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory where `overrides` shadow built-in entries.
    pub fn with_overrides(overrides: HashMap<String, ServerDescriptor>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(tld, server)| (tld.trim_start_matches('.').to_lowercase(), server))
            .collect();
        Self { overrides }
    }

    /// Server for a top-level label, if one is known.
    pub fn lookup(&self, tld: &str) -> Option<ServerDescriptor> {
        let tld = tld.trim_start_matches('.').to_lowercase();

        if let Some(server) = self.overrides.get(&tld) {
            return Some(server.clone());
        }

        BUILTIN_SERVERS.get(tld.as_str()).map(|entry| {
            let server = ServerDescriptor::new(entry.host);
            match entry.query {
                Some(query) => server.with_query(query),
                None => server,
            }
        })
    }

    /// Server for a sanitized domain, falling back to Verisign.
    pub fn resolve(&self, domain: &str) -> ServerDescriptor {
        self.lookup(tld_of(domain))
            .unwrap_or_else(ServerDescriptor::fallback)
    }

    /// Every TLD with an entry, sorted.
    pub fn known_tlds(&self) -> Vec<String> {
        let mut tlds: Vec<String> = BUILTIN_SERVERS
            .keys()
            .map(|tld| tld.to_string())
            .chain(self.overrides.keys().cloned())
            .collect();
        tlds.sort();
        tlds.dedup();
        tlds
    }
}
