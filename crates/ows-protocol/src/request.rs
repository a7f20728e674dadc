//! Parts shared by every request model: the common base fields, the
//! [`OgcRequest`] trait and the helpers that read SERVICE/VERSION and
//! pass-through attributes from either encoding.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ows_common::attributes::{dedupe, merge_managed, strip_consumed, strip_managed_namespaces};
use ows_common::namespaces::MANAGED_NAMESPACES;
use ows_common::{parse_parameters, Attr, Exception, Exceptions, KvpQuery, KvpRecord, Service};

use crate::xml::Element;

/// Fields every request carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBase {
    pub service: Service,
    pub version: String,
    /// Root attributes not interpreted by the model, echoed back on output.
    pub attributes: Vec<Attr>,
    /// Root child elements not interpreted by the model, serialized with the
    /// namespace declarations they use. Only the XML encoding carries them.
    #[serde(default)]
    pub elements: Vec<String>,
}

impl RequestBase {
    pub fn new(service: Service) -> Self {
        Self {
            service,
            version: service.version().to_string(),
            attributes: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Namespace declarations among the pass-through attributes.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = &Attr> {
        self.attributes.iter().filter(|a| a.is_namespace_declaration())
    }

    /// Write REQUEST, SERVICE and VERSION, plus NAMESPACES for WFS requests
    /// carrying namespace declarations.
    pub(crate) fn write_kvp(&self, query: &mut KvpQuery, operation: &str) {
        query.insert("REQUEST", operation);
        query.insert("SERVICE", self.service.name());
        query.insert("VERSION", self.version.clone());
        if self.service == Service::Wfs {
            if let Some(namespaces) = namespaces_to_kvp(self.namespace_declarations()) {
                query.insert("NAMESPACES", namespaces);
            }
        }
    }

    /// Root element carrying `managed` attributes first, then SERVICE and
    /// VERSION, then the pass-through attributes.
    pub(crate) fn root_element(&self, name: &str, managed: Vec<Attr>) -> Element {
        let mut attributes = managed;
        attributes.push(Attr::new("service", self.service.name()));
        attributes.push(Attr::new("version", self.version.clone()));

        let mut root = Element::new(name);
        root.attributes = merge_managed(attributes, &self.attributes);
        root
    }

    /// Add namespace declarations found below the root; ones already
    /// present keep their binding.
    pub(crate) fn lift_declarations<I>(&mut self, declarations: I)
    where
        I: IntoIterator<Item = Attr>,
    {
        let lifted: Vec<Attr> = declarations
            .into_iter()
            .filter(|a| a.is_namespace_declaration())
            .collect();
        let lifted = strip_managed_namespaces(lifted, MANAGED_NAMESPACES);
        self.attributes = merge_managed(std::mem::take(&mut self.attributes), &lifted);
    }

    /// Append the pass-through elements to `root` and serialize it as a
    /// document.
    pub(crate) fn write_document(&self, mut root: Element) -> String {
        for element in &self.elements {
            root.push_raw(element.clone());
        }
        root.to_document()
    }
}

/// Common interface of the five request models.
pub trait OgcRequest: Sized {
    /// Operation name as used in REQUEST and as the XML root element.
    const OPERATION: &'static str;

    fn from_xml(document: &[u8]) -> Result<Self, Exceptions>;

    fn from_kvp(query: &KvpQuery) -> Result<Self, Exceptions>;

    /// XML request document, including the XML declaration.
    fn to_xml(&self) -> String;

    fn to_kvp(&self) -> KvpQuery;

    fn base(&self) -> &RequestBase;
}

/// How VERSION is treated while reading the base fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VersionRule {
    /// Must be present and equal to the service version.
    Required,
    /// Defaults to the service version; any given value is kept.
    Negotiable,
}

/// Parse a request document and check its root element.
pub(crate) fn parse_document(document: &[u8], operation: &str) -> Result<Element, Exceptions> {
    let root = Element::parse(document).map_err(|err| {
        debug!(operation, error = %err, "request body is not XML");
        Exceptions::from(Exception::no_applicable_code(&["Could not process XML, is it XML?"]))
    })?;
    if root.local_name() != operation {
        debug!(operation, root = %root.name, "unexpected root element");
        return Err(Exception::operation_not_supported(&[root.local_name()]).into());
    }
    Ok(root)
}

/// SERVICE for an operation bound to one service: optional, but must match
/// when given.
pub(crate) fn check_service(given: Option<&str>, expected: Service) -> Result<Service, Exception> {
    match given.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(expected),
        Some(value) if Service::from_name(value) == Some(expected) => Ok(expected),
        Some(value) => Err(Exception::invalid_parameter_value(&["SERVICE", value])),
    }
}

/// SERVICE for GetCapabilities: required and must name a known service.
pub(crate) fn require_service(given: Option<&str>) -> Result<Service, Exception> {
    match given.map(str::trim).filter(|v| !v.is_empty()) {
        None => Err(Exception::missing_parameter_value(&["SERVICE"])),
        Some(value) => Service::from_name(value)
            .ok_or_else(|| Exception::invalid_parameter_value(&["SERVICE", value])),
    }
}

pub(crate) fn check_version(
    given: Option<&str>,
    service: Service,
    rule: VersionRule,
) -> Result<String, Exception> {
    let given = given.map(str::trim).filter(|v| !v.is_empty());
    match (given, rule) {
        (None, VersionRule::Negotiable) => Ok(service.version().to_string()),
        (Some(version), VersionRule::Negotiable) => Ok(version.to_string()),
        (None, VersionRule::Required) => Err(Exception::missing_parameter_value(&["VERSION"])),
        (Some(version), VersionRule::Required) if version == service.version() => {
            Ok(version.to_string())
        }
        (Some(version), VersionRule::Required) => {
            Err(Exception::version_negotiation_failed(&[version]))
        }
    }
}

/// Base fields from the root element of a document for `service`.
///
/// `consumed` lists the root attributes the model reads itself and
/// `children` the local names of the child elements it reads.
pub(crate) fn base_from_element(
    root: &Element,
    service: Service,
    consumed: &[&str],
    children: &[&str],
) -> Result<RequestBase, Exceptions> {
    let service = check_service(root.attribute("service"), service)?;
    let version = check_version(root.attribute("version"), service, VersionRule::Required)?;
    Ok(RequestBase {
        service,
        version,
        attributes: passthrough_attributes(root, consumed),
        elements: passthrough_elements(root, &root.attributes, children),
    })
}

/// Child elements of `parent` other than the `consumed` local names,
/// serialized so they can be written back without `parent`.
///
/// `scope` holds the namespace declarations in force at `parent`,
/// outermost first.
pub(crate) fn passthrough_elements(
    parent: &Element,
    scope: &[Attr],
    consumed: &[&str],
) -> Vec<String> {
    parent
        .child_elements()
        .filter(|child| !consumed.contains(&child.local_name()))
        .map(|child| {
            debug!(element = %child.name, "keeping unrecognised element");
            child.detached(scope).to_xml_string()
        })
        .collect()
}

/// Root attributes left after removing SERVICE, VERSION, `consumed` and the
/// declarations of namespaces written by the models themselves.
pub(crate) fn passthrough_attributes(root: &Element, consumed: &[&str]) -> Vec<Attr> {
    let mut stripped: Vec<&str> = vec!["service", "version"];
    stripped.extend_from_slice(consumed);
    let attributes = strip_managed_namespaces(dedupe(root.attributes.clone()), MANAGED_NAMESPACES);
    strip_consumed(attributes, &stripped)
}

/// Allow-listed parameters and base fields of a KVP request bound to
/// `service`.
///
/// Problems with SERVICE, VERSION or NAMESPACES end parsing; the returned
/// exception list carries the non-fatal problems found so far.
pub(crate) fn kvp_preamble(
    query: &KvpQuery,
    allowed: &[&'static str],
    service: Service,
) -> Result<(RequestBase, KvpRecord, Exceptions), Exceptions> {
    let (record, mut exceptions) = parse_parameters(query, allowed);

    let base = check_service(record.get("SERVICE"), service)
        .and_then(|service| {
            let version = check_version(record.get("VERSION"), service, VersionRule::Required)?;
            let attributes = match record.get("NAMESPACES") {
                Some(namespaces) => namespaces_from_kvp(namespaces)?,
                None => Vec::new(),
            };
            Ok(RequestBase {
                service,
                version,
                attributes,
                elements: Vec::new(),
            })
        });

    match base {
        Ok(base) => Ok((base, record, exceptions)),
        Err(exception) => {
            exceptions.push(exception);
            Err(exceptions)
        }
    }
}

/// Parse NAMESPACES: `xmlns(prefix,uri)` items, comma separated.
///
/// `xmlns(uri)` declares the default namespace. Declarations of managed
/// namespaces are dropped.
pub fn namespaces_from_kvp(value: &str) -> Result<Vec<Attr>, Exception> {
    let invalid = || Exception::invalid_parameter_value(&["NAMESPACES", value]);
    let mut declarations = Vec::new();
    let mut rest = value.trim();

    while !rest.is_empty() {
        let body = rest.strip_prefix("xmlns(").ok_or_else(invalid)?;
        let (inner, remainder) = body.split_once(')').ok_or_else(invalid)?;
        let declaration = match inner.split_once(',') {
            Some((prefix, uri)) if !prefix.trim().is_empty() => {
                Attr::namespace_declaration(Some(prefix.trim()), uri.trim())
            }
            Some((_, uri)) => Attr::namespace_declaration(None, uri.trim()),
            None => Attr::namespace_declaration(None, inner.trim()),
        };
        if declaration.value.is_empty() {
            return Err(invalid());
        }
        declarations.push(declaration);
        rest = remainder.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }

    Ok(strip_managed_namespaces(dedupe(declarations), MANAGED_NAMESPACES))
}

/// NAMESPACES value for the given declarations, `None` when there are none.
pub fn namespaces_to_kvp<'a, I>(declarations: I) -> Option<String>
where
    I: IntoIterator<Item = &'a Attr>,
{
    let items: Vec<String> = declarations
        .into_iter()
        .filter(|attr| attr.is_namespace_declaration())
        .map(|attr| match attr.declared_prefix() {
            Some(prefix) => format!("xmlns({},{})", prefix, attr.value),
            None => format!("xmlns({})", attr.value),
        })
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items.join(","))
    }
}

// === KVP value helpers ===

/// Value of a required key; records `MissingParameterValue` when absent or
/// empty.
pub(crate) fn required<'a>(
    record: &'a KvpRecord,
    key: &str,
    exceptions: &mut Exceptions,
) -> Option<&'a str> {
    let value = record.get_non_empty(key);
    if value.is_none() {
        exceptions.push(Exception::missing_parameter_value(&[key]));
    }
    value
}

/// Parse `value`, recording `InvalidParameterValue` for `key` on failure.
pub(crate) fn parse_value<T: FromStr>(
    key: &str,
    value: &str,
    exceptions: &mut Exceptions,
) -> Option<T> {
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            exceptions.push(Exception::invalid_parameter_value(&[key, value]));
            None
        }
    }
}

/// Optional numeric or enumerated value: absent is `None`, invalid is
/// recorded and also `None`.
pub(crate) fn parse_optional<T: FromStr>(
    record: &KvpRecord,
    key: &str,
    exceptions: &mut Exceptions,
) -> Option<T> {
    record
        .get_non_empty(key)
        .and_then(|value| parse_value(key, value, exceptions))
}

pub(crate) fn parse_required<T: FromStr>(
    record: &KvpRecord,
    key: &str,
    exceptions: &mut Exceptions,
) -> Option<T> {
    required(record, key, exceptions).and_then(|value| parse_value(key, value, exceptions))
}

/// `TRUE`/`FALSE` in any case.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

// === XML value helpers ===

/// Text of a required child element; records `MissingParameterValue` named
/// after the element when absent or empty.
pub(crate) fn required_child_text(
    parent: &Element,
    local: &str,
    exceptions: &mut Exceptions,
) -> Option<String> {
    let text = parent
        .child_text(local)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if text.is_none() {
        exceptions.push(Exception::missing_parameter_value(&[local]));
    }
    text
}

pub(crate) fn optional_child_text(parent: &Element, local: &str) -> Option<String> {
    parent
        .child_text(local)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
