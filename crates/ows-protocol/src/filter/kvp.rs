//! GetFeature KVP selection clauses: RESOURCEID, FILTER and BBOX.
//!
//! The three clauses are mutually exclusive; a request naming more than one
//! is rejected before any of them is parsed.

use ows_common::{BboxParseError, BoundingBox, Exception, KvpRecord};
use tracing::debug;

use super::{merge_resource_ids, Filter, ResourceId};

/// KVP shorthand that selects features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionClause {
    ResourceId,
    Filter,
    BBox,
}

impl SelectionClause {
    pub const ALL: [SelectionClause; 3] = [
        SelectionClause::ResourceId,
        SelectionClause::Filter,
        SelectionClause::BBox,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SelectionClause::ResourceId => "RESOURCEID",
            SelectionClause::Filter => "FILTER",
            SelectionClause::BBox => "BBOX",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|clause| clause.key().eq_ignore_ascii_case(key))
    }

    /// Parse the clause's value into a filter.
    pub fn parse(&self, value: &str) -> Result<Filter, Exception> {
        match self {
            SelectionClause::ResourceId => parse_resource_ids(value).map(Filter::from_resource_ids),
            SelectionClause::Filter => Filter::from_xml_fragment(strip_parentheses(value)),
            SelectionClause::BBox => parse_bbox(value).map(Filter::from_bbox),
        }
    }
}

/// Build the query filter from whichever selection clause the record holds.
pub fn selection_from_kvp(record: &KvpRecord) -> Result<Option<Filter>, Exception> {
    let clauses: Vec<SelectionClause> = record.keys().filter_map(SelectionClause::from_key).collect();

    match clauses.as_slice() {
        [] => Ok(None),
        [clause] => {
            let value = record.get(clause.key()).unwrap_or_default();
            clause.parse(value).map(Some)
        }
        _ => {
            let names: Vec<&str> = clauses.iter().map(SelectionClause::key).collect();
            debug!(clauses = %names.join(","), "conflicting selection clauses");
            let message = format!(
                "Only one of the following selection clauses can be used {}",
                names.join(",")
            );
            Err(Exception::no_applicable_code(&[message.as_str()]))
        }
    }
}

/// The KVP parameter a filter is written as, or `None` for an empty filter.
///
/// Filters holding only resource ids become RESOURCEID, a lone BBOX on the
/// default geometry becomes BBOX, anything else is written as FILTER.
pub fn selection_to_kvp(filter: &Filter) -> Option<(&'static str, String)> {
    if filter.is_empty() {
        return None;
    }
    // Shorthands cannot carry namespace declarations.
    if !filter.namespaces.is_empty() {
        return Some((SelectionClause::Filter.key(), filter.to_xml_fragment()));
    }
    if filter.is_resource_ids_only() {
        let ids: Vec<&str> = filter.resource_ids.iter().map(|r| r.rid.as_str()).collect();
        return Some((SelectionClause::ResourceId.key(), ids.join(",")));
    }
    if let Some(envelope) = filter.as_plain_bbox() {
        return Some((SelectionClause::BBox.key(), envelope.to_kvp()));
    }
    Some((SelectionClause::Filter.key(), filter.to_xml_fragment()))
}

/// `a,b` or parenthesised groups `(a,b)(c)`, concatenated in order.
fn parse_resource_ids(value: &str) -> Result<Vec<ResourceId>, Exception> {
    let groups: Vec<Vec<ResourceId>> = if value.contains('(') {
        value
            .split(')')
            .map(|group| group.trim_start_matches(|c: char| c == ',' || c == '(' || c.is_whitespace()))
            .map(resource_id_group)
            .collect()
    } else {
        vec![resource_id_group(value)]
    };

    let resource_ids = merge_resource_ids(groups);
    if resource_ids.is_empty() {
        return Err(Exception::missing_parameter_value(&["RESOURCEID"]));
    }
    Ok(resource_ids)
}

fn resource_id_group(group: &str) -> Vec<ResourceId> {
    ows_common::kvp::split_list(group)
        .into_iter()
        .map(ResourceId::new)
        .collect()
}

fn parse_bbox(value: &str) -> Result<BoundingBox, Exception> {
    BoundingBox::from_kvp(value).map_err(|err| match err {
        BboxParseError::InvalidFormat(_) => Exception::missing_parameter_value(&["BBOX", value]),
        BboxParseError::InvalidNumber(_) => Exception::invalid_value(&["BBOX", value]),
    })
}

fn strip_parentheses(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(trimmed)
}
