//! Canonical-cased header multimap.
//!
//! The ABI exposes header names in canonical HTTP casing (`x-a` → `X-A`) and
//! enumerates them in lexicographic order, so the map is keyed by canonical
//! name over a `BTreeMap`. Values keep their insertion order per name.

use std::collections::BTreeMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::HostError;

/// Canonicalise a header name: the first letter and every letter following a
/// hyphen is uppercased, the rest lowercased.
pub fn canonical_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for ch in name.chars() {
        if upper {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        upper = ch == '-';
    }
    out
}

/// An ordered multimap of HTTP headers keyed by canonical name.
#[derive(Debug, Clone, Default)]
pub struct HeaderMultimap {
    entries: BTreeMap<String, Vec<String>>,
}

impl HeaderMultimap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values for `name` with `values`.
    pub fn set(&mut self, name: &str, values: Vec<String>) {
        self.entries.insert(canonical_key(name), values);
    }

    /// Replace all values for `name` with the single `value`.
    pub fn insert(&mut self, name: &str, value: String) {
        self.entries.insert(canonical_key(name), vec![value]);
    }

    /// Add `value` after any existing values for `name`.
    pub fn append(&mut self, name: &str, value: String) {
        self.entries
            .entry(canonical_key(name))
            .or_default()
            .push(value);
    }

    /// Remove every value for `name`. Removing an absent name is a no-op.
    pub fn remove(&mut self, name: &str) {
        self.entries.remove(&canonical_key(name));
    }

    /// The first value for `name`, in insertion order.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&canonical_key(name))
            .and_then(|vs| vs.first())
            .map(String::as_str)
    }

    /// All values for `name` in insertion order; empty if absent.
    pub fn values(&self, name: &str) -> &[String] {
        self.entries
            .get(&canonical_key(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Canonical names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Total number of name-value pairs.
    pub fn pair_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Build a `http::HeaderMap` for an outbound request or response.
    ///
    /// Fails when a name or value cannot be represented on the wire.
    pub fn to_header_map(&self) -> Result<HeaderMap, HostError> {
        let mut map = HeaderMap::new();
        for (name, values) in self.iter() {
            let header = name
                .parse::<HeaderName>()
                .map_err(|_| HostError::http_user_invalid())?;
            for value in values {
                let value = HeaderValue::from_str(value)
                    .map_err(|_| HostError::http_user_invalid())?;
                map.append(header.clone(), value);
            }
        }
        Ok(map)
    }
}

impl From<&HeaderMap> for HeaderMultimap {
    fn from(map: &HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map {
            headers.append(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        headers
    }
}
