//! Key/value pair (query string) handling.
//!
//! [`KvpQuery`] is the raw multimap as it arrives on the URL; keys keep their
//! original spelling and encounter order. [`parse_parameters`] reduces it to
//! a [`KvpRecord`] of single values for one operation's allowed keys.

use indexmap::IndexMap;
use tracing::trace;

use crate::exception::{Exception, Exceptions};

/// Query string parameters, in encounter order.
///
/// Lookups are case-insensitive on the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvpQuery {
    params: IndexMap<String, Vec<String>>,
}

impl KvpQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (with or without a leading `?`).
    ///
    /// `+` decodes to a space; invalid percent escapes are kept verbatim.
    pub fn parse(query: &str) -> Self {
        let mut kvp = Self::new();
        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            kvp.append(decode_component(key), decode_component(value));
        }
        kvp
    }

    /// Add a value, keeping values already present for the key.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Set the single value of a key, replacing what was there.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), vec![value.into()]);
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).into_iter().next()
    }

    /// All values for `key`, gathered across differently cased spellings.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .flat_map(|(_, values)| values.iter().map(String::as_str))
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.keys().any(|k| k.eq_ignore_ascii_case(key))
    }

    /// Keys as given, in encounter order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Percent-encoded query string, without a leading `?`.
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .flat_map(|(key, values)| {
                values.iter().map(move |value| {
                    format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
                })
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K, V> FromIterator<(K, V)> for KvpQuery
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut kvp = KvpQuery::new();
        for (key, value) in iter {
            kvp.append(key, value);
        }
        kvp
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Single-valued parameters of one operation, keyed by their canonical
/// (upper case) name, in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvpRecord {
    values: IndexMap<&'static str, String>,
}

impl KvpRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Value for `key`, treating an empty value as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Canonical keys in the order they appeared in the query.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Reduce `query` to the keys in `allowed`.
///
/// Keys match case-insensitively. A key carrying more than one value is
/// reported as `InvalidParameterValue` and left out of the record; parsing
/// carries on so all such problems are reported together. Keys outside
/// `allowed` are ignored.
pub fn parse_parameters(query: &KvpQuery, allowed: &[&'static str]) -> (KvpRecord, Exceptions) {
    let mut record = KvpRecord::default();
    let mut exceptions = Exceptions::new();
    let mut handled: Vec<&'static str> = Vec::new();

    for key in query.keys() {
        let Some(canonical) = allowed.iter().copied().find(|a| a.eq_ignore_ascii_case(key)) else {
            trace!(key, "ignoring unknown parameter");
            continue;
        };
        if handled.contains(&canonical) {
            continue;
        }
        handled.push(canonical);

        let values = query.get_all(canonical);
        match values.as_slice() {
            [value] => {
                record.values.insert(canonical, value.to_string());
            }
            _ => exceptions.push(Exception::invalid_parameter_value(&[
                canonical,
                values.join(",").as_str(),
            ])),
        }
    }

    (record, exceptions)
}

/// Split a comma separated list value, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
