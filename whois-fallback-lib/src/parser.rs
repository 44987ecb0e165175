//! Tolerant parser for free-text WHOIS replies.
//!
//! Registries disagree on almost everything: spacing after the delimiter,
//! comment markers, repeated fields, trailing `<<<` banners. The parser turns
//! whatever comes back into an ordered record of camelCase keys, keeping only
//! lines that look like `Label: value`.

use convert_case::{Case, Casing};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::LookupError;

/// Ordered key/value view of one WHOIS reply.
///
/// Keys are unique and keep the order in which they were first seen. A key
/// seen again gets the new value appended after a single space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecord {
    entries: Vec<(String, String)>,
}

impl ParsedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value stored under an exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Insert a value, merging into an existing key with one space.
    pub(crate) fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => {
                existing.push(' ');
                existing.push_str(&value);
            }
            None => self.entries.push((key, value)),
        }
    }

    /// Render as `key: value` lines. Parsing the output yields the same record.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for (key, value) in &self.entries {
            text.push_str(key);
            text.push_str(": ");
            text.push_str(value);
            text.push('\n');
        }
        text
    }
}

impl fmt::Display for ParsedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl<'a> IntoIterator for &'a ParsedRecord {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl FromIterator<(String, String)> for ParsedRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut record = ParsedRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for ParsedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParsedRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = ParsedRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of WHOIS field names to string values")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut record = ParsedRecord::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    record.insert(key, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Parse a raw WHOIS reply.
///
/// # Errors
///
/// Returns `LookupError::WhoisResponseEmpty` when no line yields a
/// non-empty value.
pub fn parse(raw: &str) -> Result<ParsedRecord, LookupError> {
    let decoded = html_escape::decode_html_entities(raw);

    let record: ParsedRecord = decoded.lines().filter_map(parse_line).collect();

    if record.is_empty() {
        return Err(LookupError::WhoisResponseEmpty);
    }

    Ok(record)
}

/// Split one line into a normalized key and a cleaned value.
fn parse_line(line: &str) -> Option<(String, String)> {
    if line.trim_start().starts_with('%') || !line.contains(':') {
        return None;
    }

    let line = strip_trailing_brackets(line);
    let delimiter = find_delimiter(line)?;

    let key = normalize_key(&line[..delimiter]);
    let value = clean_value(&line[delimiter + 1..]);

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value.to_string()))
}

/// First colon that does not start a `://` scheme separator.
fn find_delimiter(line: &str) -> Option<usize> {
    line.match_indices(':')
        .map(|(idx, _)| idx)
        .find(|&idx| !line[idx + 1..].starts_with("//"))
}

fn strip_trailing_brackets(s: &str) -> &str {
    s.trim().trim_end_matches('<').trim()
}

/// Drop trailing `<` banners and dangling delimiters (`... <<<:`).
fn clean_value(s: &str) -> &str {
    s.trim()
        .trim_end_matches(|c: char| c == '<' || c == ':' || c.is_whitespace())
        .trim()
}

/// Turn a free-form label into a camelCase key.
///
/// Any run of characters that is not a letter or digit separates words, so
/// `Registrant State/Province`, `>>> Last update of WHOIS database` and
/// `owner-c` become `registrantStateProvince`, `lastUpdateOfWhoisDatabase`
/// and `ownerC`.
pub fn normalize_key(label: &str) -> String {
    let spaced: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let words: Vec<&str> = spaced.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }

    words.join(" ").to_case(Case::Camel)
}
