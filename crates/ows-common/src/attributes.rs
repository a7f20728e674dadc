//! XML attribute pass-through.
//!
//! Request documents may carry attributes the request models do not
//! interpret (vendor namespaces, `xsi:schemaLocation`, ...). Those are kept
//! on the model and echoed back when the request is written again. The
//! functions here remove what the models consume themselves and collapse
//! repeated attributes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One XML attribute, split into its namespace prefix and local name.
///
/// Namespace declarations are attributes too: `xmlns:wfs="..."` has
/// namespace `xmlns` and local name `wfs`; a default `xmlns="..."` has no
/// namespace and local name `xmlns`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attr {
    pub namespace: Option<String>,
    pub local: String,
    pub value: String,
}

type AttrKey = (Option<String>, String);

impl Attr {
    /// Unqualified attribute.
    pub fn new(local: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
            value: value.into(),
        }
    }

    /// Attribute with a namespace prefix.
    pub fn qualified(
        namespace: impl Into<String>,
        local: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
            value: value.into(),
        }
    }

    /// Split a name as written in a document (`prefix:local` or `local`).
    pub fn from_qualified_name(name: &str, value: impl Into<String>) -> Self {
        match name.split_once(':') {
            Some((prefix, local)) => Self::qualified(prefix, local, value),
            None => Self::new(name, value),
        }
    }

    /// Namespace declaration `xmlns:prefix="uri"`, or the default namespace
    /// when `prefix` is `None`.
    pub fn namespace_declaration(prefix: Option<&str>, uri: impl Into<String>) -> Self {
        match prefix {
            Some(prefix) => Self::qualified("xmlns", prefix, uri),
            None => Self::new("xmlns", uri),
        }
    }

    /// Name as written in a document.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}:{}", namespace, self.local),
            None => self.local.clone(),
        }
    }

    pub fn is_namespace_declaration(&self) -> bool {
        match &self.namespace {
            Some(namespace) => namespace == "xmlns",
            None => self.local == "xmlns",
        }
    }

    /// Prefix bound by a namespace declaration; `None` for the default
    /// namespace and for ordinary attributes.
    pub fn declared_prefix(&self) -> Option<&str> {
        match &self.namespace {
            Some(namespace) if namespace == "xmlns" => Some(&self.local),
            _ => None,
        }
    }

    fn key(&self) -> AttrKey {
        (self.namespace.clone(), self.local.clone())
    }
}

/// Collapse attributes sharing namespace and local name.
///
/// The last value wins; each key keeps the position of its first occurrence.
pub fn dedupe<I>(attrs: I) -> Vec<Attr>
where
    I: IntoIterator<Item = Attr>,
{
    let mut seen: IndexMap<AttrKey, String> = IndexMap::new();
    for attr in attrs {
        seen.insert(attr.key(), attr.value);
    }
    seen.into_iter()
        .map(|((namespace, local), value)| Attr {
            namespace,
            local,
            value,
        })
        .collect()
}

/// Remove attributes whose local name matches one of `consumed`
/// (case-insensitive).
pub fn strip_consumed<I>(attrs: I, consumed: &[&str]) -> Vec<Attr>
where
    I: IntoIterator<Item = Attr>,
{
    attrs
        .into_iter()
        .filter(|attr| !consumed.iter().any(|c| c.eq_ignore_ascii_case(&attr.local)))
        .collect()
}

/// Remove namespace declarations binding one of the `managed` URIs either
/// as the default namespace or under the prefix paired with it.
pub fn strip_managed_namespaces<I>(attrs: I, managed: &[(&str, &str)]) -> Vec<Attr>
where
    I: IntoIterator<Item = Attr>,
{
    attrs
        .into_iter()
        .filter(|attr| !is_managed_declaration(attr, managed))
        .collect()
}

fn is_managed_declaration(attr: &Attr, managed: &[(&str, &str)]) -> bool {
    if !attr.is_namespace_declaration() {
        return false;
    }
    managed.iter().any(|(prefix, uri)| {
        attr.value == *uri && attr.declared_prefix().map_or(true, |declared| declared == *prefix)
    })
}

/// Combine attributes a model writes itself with its pass-through ones.
///
/// Managed attributes come first and win over pass-through attributes with
/// the same key.
pub fn merge_managed(managed: Vec<Attr>, passthrough: &[Attr]) -> Vec<Attr> {
    let mut merged: IndexMap<AttrKey, String> = IndexMap::new();
    for attr in dedupe(managed) {
        merged.insert(attr.key(), attr.value);
    }
    for attr in dedupe(passthrough.iter().cloned()) {
        merged.entry(attr.key()).or_insert(attr.value);
    }
    merged
        .into_iter()
        .map(|((namespace, local), value)| Attr {
            namespace,
            local,
            value,
        })
        .collect()
}
