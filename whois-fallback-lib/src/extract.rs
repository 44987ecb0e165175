//! Semantic field extraction from parsed WHOIS records.
//!
//! Registries name the same facts differently (`Registry Expiry Date`,
//! `Registrar Registration Expiration Date`, `expires`), so each summary
//! field is located with a small set of needles rather than a fixed key.

use tracing::debug;

use crate::dates::parse_date;
use crate::parser::ParsedRecord;
use crate::types::{AuthorityRecord, RegistrarInfo, WhoisResponse};

const BR_REGISTRAR_NAME: &str = "Registro BR";
const BR_REGISTRAR_URL: &str = "https://registro.br";

/// Build a summary from authority records in referral order.
///
/// `domain` is the sanitized domain when the caller knows it; it is only
/// used for the `.br` defaults. An empty slice yields [`WhoisResponse::empty`].
pub fn extract(authorities: &[AuthorityRecord], domain: Option<&str>) -> WhoisResponse {
    if authorities.is_empty() {
        return WhoisResponse::empty();
    }

    let fields = Fields { authorities };
    let is_br = fields.is_br(domain);

    let domain_expiration_date = fields.fetch(&["xpir"]).and_then(parse_date);

    let name_servers = fields.fetch(&["nserver", "nameServer"]).map(|value| {
        value
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>()
    });

    let name = fields
        .fetch(&["registrar"])
        .map(str::to_string)
        .or_else(|| is_br.then(|| BR_REGISTRAR_NAME.to_string()));

    let url = fields
        .fetch(&["registrarUrl"])
        .map(str::to_string)
        .or_else(|| is_br.then(|| BR_REGISTRAR_URL.to_string()));

    let owner = fields
        .fetch(&["ownerC"])
        .or_else(|| fields.br_contact(is_br, "ownerC"))
        .map(str::to_string);

    let tech = fields
        .fetch(&["techC"])
        .or_else(|| fields.br_contact(is_br, "techC"))
        .map(str::to_string);

    let provider = fields
        .fetch(&["provider"])
        .map(str::to_string)
        .or_else(|| name.clone());

    debug!(
        authorities = authorities.len(),
        is_br,
        has_expiration = domain_expiration_date.is_some(),
        "Extracted WHOIS summary"
    );

    WhoisResponse {
        origin: "whois".to_string(),
        domain_expiration_date,
        registrar: RegistrarInfo {
            name,
            url,
            owner,
            tech,
        },
        provider,
        name_servers,
    }
}

/// Build a summary from a single record.
pub fn extract_record(record: &ParsedRecord, domain: Option<&str>) -> WhoisResponse {
    extract(&[AuthorityRecord::new("", record.clone())], domain)
}

struct Fields<'a> {
    authorities: &'a [AuthorityRecord],
}

impl<'a> Fields<'a> {
    /// Exact key match across authorities in order, else the first key
    /// containing a needle in insertion order.
    fn fetch(&self, needles: &[&str]) -> Option<&'a str> {
        let exact = self.authorities.iter().find_map(|authority| {
            needles
                .iter()
                .find_map(|needle| authority.record.get(needle))
        });

        exact.or_else(|| {
            self.authorities.iter().find_map(|authority| {
                authority
                    .record
                    .iter()
                    .find(|(key, _)| needles.iter().any(|needle| key.contains(needle)))
                    .map(|(_, value)| value)
            })
        })
    }

    /// Literal contact handle from the last authority, for `.br` only.
    fn br_contact(&self, is_br: bool, key: &str) -> Option<&'a str> {
        if !is_br {
            return None;
        }
        self.authorities.last()?.record.get(key)
    }

    fn is_br(&self, domain: Option<&str>) -> bool {
        if domain.is_some_and(|d| d.to_lowercase().ends_with(".br")) {
            return true;
        }

        self.authorities.iter().any(|authority| {
            ["domain", "domainName"].iter().any(|key| {
                authority
                    .record
                    .get(key)
                    .is_some_and(|value| value.trim().to_lowercase().ends_with(".br"))
            })
        })
    }
}
