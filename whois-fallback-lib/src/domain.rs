//! Domain input sanitizing and validation.
//!
//! Users paste all sorts of things: bare names, URLs with schemes and paths,
//! mixed case. Everything goes through a URL parser first so the hostname is
//! extracted (and IDNs punycoded) the same way a browser would.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::error::LookupError;

/// Longest permitted DNS label.
const MAX_LABEL_LEN: usize = 63;

lazy_static! {
    /// Letter-led TLD, or a punycode `xn--` TLD.
    static ref TLD_RE: Regex = Regex::new(
        r"(?i)^([a-z\x{00A1}-\x{00A8}\x{00AA}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFEF}]{2,}|xn[a-z0-9-]{2,})$"
    )
    .expect("TLD pattern is valid");

    static ref LABEL_RE: Regex =
        Regex::new(r"(?i)^[a-z_\x{00A1}-\x{FFFF}0-9-]+$").expect("label pattern is valid");

    static ref FULLWIDTH_RE: Regex =
        Regex::new(r"[\x{FF01}-\x{FF5E}]").expect("fullwidth pattern is valid");
}

/// Normalize free-form input into a validated, lowercase hostname.
///
/// A scheme prefix and any path are discarded: `https://WWW.Example.com/`
/// becomes `www.example.com`.
///
/// # Errors
///
/// - `LookupError::NoDomain` for blank input
/// - `LookupError::DomainParse` when the hostname is not fully qualified
pub fn sanitize(input: &str) -> Result<String, LookupError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(LookupError::NoDomain);
    }

    if !is_fully_qualified_domain_name(trimmed) {
        return Err(LookupError::domain_parse(trimmed));
    }

    hostname(trimmed)
        .map(|host| host.to_lowercase())
        .ok_or_else(|| LookupError::domain_parse(trimmed))
}

/// Check that the hostname of `input` has at least two labels, a letter-led
/// TLD, and labels made of letters, digits and inner hyphens only.
pub fn is_fully_qualified_domain_name(input: &str) -> bool {
    let Some(host) = hostname(input) else {
        return false;
    };

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    let tld = parts[parts.len() - 1];
    if !TLD_RE.is_match(tld) {
        return false;
    }

    if tld.chars().any(char::is_whitespace) || tld.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    parts.iter().all(|part| is_valid_label(part))
}

fn is_valid_label(part: &str) -> bool {
    if part.len() > MAX_LABEL_LEN {
        return false;
    }

    if !LABEL_RE.is_match(part) {
        return false;
    }

    if FULLWIDTH_RE.is_match(part) {
        return false;
    }

    if part.starts_with('-') || part.ends_with('-') {
        return false;
    }

    !part.contains('_')
}

/// Extract the hostname, adding a scheme when the input has none.
fn hostname(input: &str) -> Option<String> {
    let parsed = if input.contains("//") {
        Url::parse(input)
    } else {
        Url::parse(&format!("https://{}", input))
    };

    parsed.ok()?.host_str().map(str::to_string)
}

/// The last label of a hostname.
pub fn tld_of(domain: &str) -> &str {
    domain.rsplit('.').next().unwrap_or(domain)
}
