//! WFS 2.0 DescribeFeatureType.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use ows_common::kvp::split_list;
use ows_common::namespaces::{GML32_OUTPUT_FORMAT, WFS_NAMESPACE};
use ows_common::{Attr, Exceptions, KvpQuery, Service};

use crate::request::{base_from_element, kvp_preamble, parse_document, OgcRequest, RequestBase};
use crate::xml::Element;

const PARAMETERS: &[&str] = &[
    "REQUEST",
    "SERVICE",
    "VERSION",
    "NAMESPACES",
    "TYPENAMES",
    "TYPENAME",
    "OUTPUTFORMAT",
];

const CONSUMED_ATTRIBUTES: &[&str] = &["outputFormat"];

const CONSUMED_ELEMENTS: &[&str] = &["TypeName"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeFeatureTypeRequest {
    pub base: RequestBase,
    /// `None` describes every feature type.
    pub type_names: Option<Vec<String>>,
    pub output_format: String,
}

impl DescribeFeatureTypeRequest {
    pub fn new(type_names: Option<Vec<String>>) -> Self {
        Self {
            base: RequestBase::new(Service::Wfs),
            type_names,
            output_format: GML32_OUTPUT_FORMAT.to_string(),
        }
    }
}

fn non_empty(type_names: Vec<String>) -> Option<Vec<String>> {
    if type_names.is_empty() {
        None
    } else {
        Some(type_names)
    }
}

impl OgcRequest for DescribeFeatureTypeRequest {
    const OPERATION: &'static str = "DescribeFeatureType";

    #[instrument(skip_all)]
    fn from_xml(document: &[u8]) -> Result<Self, Exceptions> {
        let root = parse_document(document, Self::OPERATION)?;
        let base = base_from_element(&root, Service::Wfs, CONSUMED_ATTRIBUTES, CONSUMED_ELEMENTS)?;

        let type_names = root
            .children_named("TypeName")
            .map(|e| e.text().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        Ok(Self {
            base,
            type_names: non_empty(type_names),
            output_format: root
                .attribute("outputFormat")
                .filter(|format| !format.trim().is_empty())
                .unwrap_or(GML32_OUTPUT_FORMAT)
                .to_string(),
        })
    }

    #[instrument(skip_all)]
    fn from_kvp(query: &KvpQuery) -> Result<Self, Exceptions> {
        let (base, record, exceptions) = kvp_preamble(query, PARAMETERS, Service::Wfs)?;
        exceptions.into_result()?;

        let type_names = record
            .get("TYPENAMES")
            .or_else(|| record.get("TYPENAME"))
            .map(split_list)
            .and_then(non_empty);

        Ok(Self {
            base,
            type_names,
            output_format: record
                .get_non_empty("OUTPUTFORMAT")
                .unwrap_or(GML32_OUTPUT_FORMAT)
                .to_string(),
        })
    }

    fn to_xml(&self) -> String {
        let mut root = self.base.root_element(
            "wfs:DescribeFeatureType",
            vec![
                Attr::namespace_declaration(Some("wfs"), WFS_NAMESPACE),
                Attr::new("outputFormat", self.output_format.clone()),
            ],
        );
        for type_name in self.type_names.iter().flatten() {
            root.push(Element::with_text("wfs:TypeName", type_name.clone()));
        }
        self.base.write_document(root)
    }

    fn to_kvp(&self) -> KvpQuery {
        let mut query = KvpQuery::new();
        self.base.write_kvp(&mut query, Self::OPERATION);
        if let Some(type_names) = &self.type_names {
            query.insert("TYPENAMES", type_names.join(","));
        }
        query.insert("OUTPUTFORMAT", self.output_format.clone());
        query
    }

    fn base(&self) -> &RequestBase {
        &self.base
    }
}
