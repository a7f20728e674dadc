//! WFS 2.0 GetFeature with a single query.
//!
//! The query's selection comes either from an embedded `fes:Filter` (XML)
//! or from one of the RESOURCEID / FILTER / BBOX shorthands (KVP).

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use ows_common::attributes::{dedupe, merge_managed, strip_consumed};
use ows_common::kvp::split_list;
use ows_common::namespaces::{FES_NAMESPACE, GML_NAMESPACE, WFS_NAMESPACE};
use ows_common::{Attr, Exception, Exceptions, KvpQuery, KvpRecord, Service};

use crate::filter::{selection_from_kvp, selection_to_kvp, Filter, SortBy};
use crate::request::{
    base_from_element, kvp_preamble, parse_document, parse_optional, parse_value,
    passthrough_elements, OgcRequest, RequestBase,
};
use crate::xml::Element;

const PARAMETERS: &[&str] = &[
    "REQUEST",
    "SERVICE",
    "VERSION",
    "NAMESPACES",
    "STARTINDEX",
    "COUNT",
    "OUTPUTFORMAT",
    "RESULTTYPE",
    "TYPENAMES",
    "TYPENAME",
    "SRSNAME",
    "PROPERTYNAME",
    "SORTBY",
    "RESOURCEID",
    "FILTER",
    "BBOX",
];

const CONSUMED_ATTRIBUTES: &[&str] = &["count", "startIndex", "outputFormat", "resultType"];

const QUERY_ATTRIBUTES: &[&str] = &["typeNames", "srsName"];

const QUERY_ELEMENTS: &[&str] = &["Filter", "SortBy", "PropertyName"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultType {
    Results,
    Hits,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Results => "results",
            ResultType::Hits => "hits",
        }
    }
}

impl FromStr for ResultType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "results" => Ok(ResultType::Results),
            "hits" => Ok(ResultType::Hits),
            _ => Err(()),
        }
    }
}

/// The feature query: what to select and how to present it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// May only be empty when the filter selects by resource id.
    pub type_names: Vec<String>,
    pub srs_name: Option<String>,
    pub property_names: Option<Vec<String>>,
    pub filter: Option<Filter>,
    pub sort_by: Option<SortBy>,
    /// Other attributes of `wfs:Query`, such as `handle`. Namespace
    /// declarations move to the request root.
    #[serde(default)]
    pub attributes: Vec<Attr>,
    /// Unrecognised `wfs:Query` children, serialized.
    #[serde(default)]
    pub elements: Vec<String>,
}

impl Query {
    fn selects_by_resource_id(&self) -> bool {
        self.filter
            .as_ref()
            .is_some_and(|filter| !filter.resource_ids.is_empty())
    }

    /// Read a `wfs:Query`; `scope` holds the declarations of the root.
    fn from_element(element: &Element, scope: &[Attr]) -> Result<Query, Exceptions> {
        let mut exceptions = Exceptions::new();
        let scope: Vec<Attr> = scope.iter().chain(&element.attributes).cloned().collect();

        let filter = match element
            .child("Filter")
            .map(|filter| Filter::from_scoped_element(filter, &scope))
        {
            Some(Ok(filter)) if filter.is_empty() => None,
            Some(Ok(filter)) => Some(filter),
            Some(Err(exception)) => {
                exceptions.push(exception);
                None
            }
            None => None,
        };
        let sort_by = match element.child("SortBy").map(SortBy::from_element) {
            Some(Ok(sort_by)) => Some(sort_by),
            Some(Err(exception)) => {
                exceptions.push(exception);
                None
            }
            None => None,
        };
        let property_names: Vec<String> = element
            .children_named("PropertyName")
            .map(|e| e.text().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let attributes = element
            .attributes
            .iter()
            .filter(|a| !a.is_namespace_declaration())
            .cloned();

        let query = Query {
            type_names: element
                .attribute("typeNames")
                .map(|names| names.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            srs_name: element.attribute("srsName").map(str::to_string),
            property_names: if property_names.is_empty() {
                None
            } else {
                Some(property_names)
            },
            filter,
            sort_by,
            attributes: strip_consumed(dedupe(attributes), QUERY_ATTRIBUTES),
            elements: passthrough_elements(element, &scope, QUERY_ELEMENTS),
        };
        if query.type_names.is_empty() && !query.selects_by_resource_id() {
            exceptions.push(Exception::missing_parameter_value(&["typeNames"]));
        }

        exceptions.into_result().map(|()| query)
    }

    fn to_element(&self) -> Element {
        let mut managed = Vec::new();
        if !self.type_names.is_empty() {
            managed.push(Attr::new("typeNames", self.type_names.join(" ")));
        }
        if let Some(srs_name) = &self.srs_name {
            managed.push(Attr::new("srsName", srs_name.clone()));
        }
        let mut element = Element::new("wfs:Query");
        element.attributes = merge_managed(managed, &self.attributes);
        for property_name in self.property_names.iter().flatten() {
            element.push(Element::with_text("wfs:PropertyName", property_name.clone()));
        }
        if let Some(filter) = &self.filter {
            element.push(filter.to_element());
        }
        if let Some(sort_by) = &self.sort_by {
            element.push(sort_by.to_element());
        }
        for extra in &self.elements {
            element.push_raw(extra.clone());
        }
        element
    }

    fn from_kvp(record: &KvpRecord, exceptions: &mut Exceptions) -> Query {
        let filter = match selection_from_kvp(record) {
            Ok(filter) => filter.filter(|f| !f.is_empty()),
            Err(exception) => {
                exceptions.push(exception);
                None
            }
        };
        let sort_by = match record.get_non_empty("SORTBY").map(SortBy::from_kvp) {
            Some(Ok(sort_by)) => Some(sort_by),
            Some(Err(exception)) => {
                exceptions.push(exception);
                None
            }
            None => None,
        };

        let query = Query {
            type_names: record
                .get("TYPENAMES")
                .or_else(|| record.get("TYPENAME"))
                .map(split_list)
                .unwrap_or_default(),
            srs_name: record.get_non_empty("SRSNAME").map(str::to_string),
            property_names: record
                .get_non_empty("PROPERTYNAME")
                .map(split_list)
                .filter(|names| !names.is_empty()),
            filter,
            sort_by,
            ..Default::default()
        };

        // RESOURCEID stands in for TYPENAMES; checked on the parameter so a
        // broken RESOURCEID does not also report a missing TYPENAMES.
        if query.type_names.is_empty() && !record.contains("RESOURCEID") {
            exceptions.push(Exception::missing_parameter_value(&["TYPENAMES"]));
        }
        query
    }

    fn write_kvp(&self, query: &mut KvpQuery) {
        if !self.type_names.is_empty() {
            query.insert("TYPENAMES", self.type_names.join(","));
        }
        if let Some(srs_name) = &self.srs_name {
            query.insert("SRSNAME", srs_name.clone());
        }
        if let Some(property_names) = &self.property_names {
            query.insert("PROPERTYNAME", property_names.join(","));
        }
        if let Some(sort_by) = &self.sort_by {
            query.insert("SORTBY", sort_by.to_kvp());
        }
        if let Some((key, value)) = self.filter.as_ref().and_then(selection_to_kvp) {
            query.insert(key, value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetFeatureRequest {
    pub base: RequestBase,
    pub start_index: Option<u64>,
    pub count: Option<u64>,
    pub output_format: Option<String>,
    pub result_type: Option<ResultType>,
    pub query: Query,
}

impl GetFeatureRequest {
    pub fn new(query: Query) -> Self {
        Self {
            base: RequestBase::new(Service::Wfs),
            start_index: None,
            count: None,
            output_format: None,
            result_type: None,
            query,
        }
    }
}

fn optional_attribute<T: FromStr>(
    root: &Element,
    name: &str,
    exceptions: &mut Exceptions,
) -> Option<T> {
    root.attribute(name)
        .and_then(|value| parse_value(name, value, exceptions))
}

impl OgcRequest for GetFeatureRequest {
    const OPERATION: &'static str = "GetFeature";

    #[instrument(skip_all)]
    fn from_xml(document: &[u8]) -> Result<Self, Exceptions> {
        let root = parse_document(document, Self::OPERATION)?;
        let mut base = base_from_element(&root, Service::Wfs, CONSUMED_ATTRIBUTES, &["Query"])?;
        let mut exceptions = Exceptions::new();

        let start_index = optional_attribute(&root, "startIndex", &mut exceptions);
        let count = optional_attribute(&root, "count", &mut exceptions);
        let result_type = optional_attribute(&root, "resultType", &mut exceptions);

        let mut queries = root.children_named("Query");
        let query = match (queries.next(), queries.next()) {
            (Some(element), None) => match Query::from_element(element, &root.attributes) {
                Ok(query) => {
                    base.lift_declarations(element.declarations().cloned());
                    if let Some(filter) = &query.filter {
                        base.lift_declarations(filter.namespaces.iter().cloned());
                    }
                    Some(query)
                }
                Err(errors) => {
                    exceptions.extend(errors);
                    None
                }
            },
            (Some(_), Some(_)) => {
                exceptions.push(Exception::option_not_supported(&[
                    "Query",
                    "only one query per request is supported",
                ]));
                None
            }
            (None, _) => {
                exceptions.push(Exception::missing_parameter_value(&["Query"]));
                None
            }
        };

        match query {
            Some(query) if exceptions.is_empty() => Ok(Self {
                base,
                start_index,
                count,
                output_format: root.attribute("outputFormat").map(str::to_string),
                result_type,
                query,
            }),
            _ => Err(exceptions),
        }
    }

    #[instrument(skip_all)]
    fn from_kvp(query: &KvpQuery) -> Result<Self, Exceptions> {
        let (mut base, record, mut exceptions) = kvp_preamble(query, PARAMETERS, Service::Wfs)?;

        let start_index = parse_optional(&record, "STARTINDEX", &mut exceptions);
        let count = parse_optional(&record, "COUNT", &mut exceptions);
        let result_type = parse_optional(&record, "RESULTTYPE", &mut exceptions);
        let query = Query::from_kvp(&record, &mut exceptions);
        if let Some(filter) = &query.filter {
            base.lift_declarations(filter.namespaces.iter().cloned());
        }

        exceptions.into_result()?;
        Ok(Self {
            base,
            start_index,
            count,
            output_format: record.get_non_empty("OUTPUTFORMAT").map(str::to_string),
            result_type,
            query,
        })
    }

    fn to_xml(&self) -> String {
        let mut managed = vec![
            Attr::namespace_declaration(Some("wfs"), WFS_NAMESPACE),
            Attr::namespace_declaration(Some("fes"), FES_NAMESPACE),
            Attr::namespace_declaration(Some("gml"), GML_NAMESPACE),
        ];
        if let Some(count) = self.count {
            managed.push(Attr::new("count", count.to_string()));
        }
        if let Some(start_index) = self.start_index {
            managed.push(Attr::new("startIndex", start_index.to_string()));
        }
        if let Some(output_format) = &self.output_format {
            managed.push(Attr::new("outputFormat", output_format.clone()));
        }
        if let Some(result_type) = self.result_type {
            managed.push(Attr::new("resultType", result_type.as_str()));
        }

        let mut root = self.base.root_element("wfs:GetFeature", managed);
        root.push(self.query.to_element());
        self.base.write_document(root)
    }

    fn to_kvp(&self) -> KvpQuery {
        let mut query = KvpQuery::new();
        self.base.write_kvp(&mut query, Self::OPERATION);
        if let Some(start_index) = self.start_index {
            query.insert("STARTINDEX", start_index.to_string());
        }
        if let Some(count) = self.count {
            query.insert("COUNT", count.to_string());
        }
        if let Some(output_format) = &self.output_format {
            query.insert("OUTPUTFORMAT", output_format.clone());
        }
        if let Some(result_type) = self.result_type {
            query.insert("RESULTTYPE", result_type.as_str());
        }
        self.query.write_kvp(&mut query);
        query
    }

    fn base(&self) -> &RequestBase {
        &self.base
    }
}
