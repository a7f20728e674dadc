//! WMS GetFeatureInfo handling
//!
//! A GetFeatureInfo request repeats the map part of GetMap and adds the
//! layers to query and the pixel position (I, J) on that map.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use ows_common::kvp::split_list;
use ows_common::{BoundingBox, Exception, Exceptions, KvpQuery, Service};

use crate::getmap::{
    bbox_element, bbox_from_element, bbox_from_kvp, crs_from_kvp, size_element,
    size_from_element, size_from_kvp, sld_namespaces, styled_layers_element,
    styled_layers_from_element, styled_layers_from_kvp, validate_map, write_map_kvp, Size,
    StyledLayer,
};
use crate::request::{
    base_from_element, kvp_preamble, optional_child_text, parse_document, parse_optional,
    parse_value, required, required_child_text, OgcRequest, RequestBase,
};
use crate::xml::Element;

const PARAMETERS: &[&str] = &[
    "REQUEST",
    "SERVICE",
    "VERSION",
    "LAYERS",
    "STYLES",
    "CRS",
    "SRS",
    "BBOX",
    "WIDTH",
    "HEIGHT",
    "FORMAT",
    "QUERY_LAYERS",
    "INFO_FORMAT",
    "I",
    "J",
    "FEATURE_COUNT",
    "EXCEPTIONS",
];

const CONSUMED_ELEMENTS: &[&str] = &[
    "StyledLayerDescriptor",
    "CRS",
    "BoundingBox",
    "Output",
    "QueryLayer",
    "I",
    "J",
    "InfoFormat",
    "FeatureCount",
    "Exceptions",
];

/// Response formats known to this service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum InfoFormat {
    /// application/json
    #[serde(rename = "application/json")]
    Json,
    /// text/html
    #[serde(rename = "text/html")]
    Html,
    /// text/xml
    #[serde(rename = "text/xml")]
    Xml,
    /// text/plain
    #[serde(rename = "text/plain")]
    Text,
    /// application/vnd.ogc.gml
    #[serde(rename = "application/vnd.ogc.gml")]
    Gml,
}

impl InfoFormat {
    /// Parse from MIME type string
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "application/json" => Some(InfoFormat::Json),
            "text/html" => Some(InfoFormat::Html),
            "text/xml" => Some(InfoFormat::Xml),
            "text/plain" => Some(InfoFormat::Text),
            "application/vnd.ogc.gml" => Some(InfoFormat::Gml),
            _ => None,
        }
    }

    /// Get MIME type string
    pub fn to_mime(&self) -> &'static str {
        match self {
            InfoFormat::Json => "application/json",
            InfoFormat::Html => "text/html",
            InfoFormat::Xml => "text/xml",
            InfoFormat::Text => "text/plain",
            InfoFormat::Gml => "application/vnd.ogc.gml",
        }
    }
}

/// GetFeatureInfo request parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetFeatureInfoRequest {
    pub base: RequestBase,
    /// Layers of the map the point was picked on
    pub styled_layers: Vec<StyledLayer>,
    pub crs: String,
    pub bbox: BoundingBox,
    pub size: Size,
    /// Map format; optional since no map is rendered
    pub format: Option<String>,
    /// Layers to query for information
    pub query_layers: Vec<String>,
    /// Pixel column, 0 is the left edge
    pub i: u32,
    /// Pixel row, 0 is the top edge
    pub j: u32,
    /// Requested response MIME type, as given
    pub info_format: String,
    /// Maximum number of features to return
    pub feature_count: Option<u32>,
    pub exceptions: Option<String>,
}

impl GetFeatureInfoRequest {
    /// The response format, when it is one this service knows.
    pub fn known_info_format(&self) -> Option<InfoFormat> {
        InfoFormat::from_mime(&self.info_format)
    }

    /// GetMap checks plus: every query layer is one of the map layers, the
    /// point lies on the map and the info format is known.
    pub fn validate(&self) -> Result<(), Exceptions> {
        let mut exceptions = Exceptions::new();
        validate_map(&self.styled_layers, &self.bbox, self.size, &mut exceptions);

        for layer in &self.query_layers {
            if !self.styled_layers.iter().any(|l| &l.name == layer) {
                exceptions.push(Exception::layer_not_queryable(&[layer.as_str()]));
            }
        }
        if self.i >= self.size.width || self.j >= self.size.height {
            let (i, j) = (self.i.to_string(), self.j.to_string());
            exceptions.push(Exception::invalid_point(&[i.as_str(), j.as_str()]));
        }
        if self.known_info_format().is_none() {
            exceptions.push(Exception::invalid_format(&[self.info_format.as_str()]));
        }
        exceptions.into_result()
    }
}

/// I and J must both be non-negative integers.
fn parse_point(i: Option<&str>, j: Option<&str>, exceptions: &mut Exceptions) -> Option<(u32, u32)> {
    let (i, j) = match (i, j) {
        (Some(i), Some(j)) => (i, j),
        (i, j) => {
            if i.is_none() {
                exceptions.push(Exception::missing_parameter_value(&["I"]));
            }
            if j.is_none() {
                exceptions.push(Exception::missing_parameter_value(&["J"]));
            }
            return None;
        }
    };
    match (i.trim().parse::<u32>(), j.trim().parse::<u32>()) {
        (Ok(i), Ok(j)) => Some((i, j)),
        _ => {
            exceptions.push(Exception::invalid_point(&[i, j]));
            None
        }
    }
}

impl OgcRequest for GetFeatureInfoRequest {
    const OPERATION: &'static str = "GetFeatureInfo";

    #[instrument(skip_all)]
    fn from_xml(document: &[u8]) -> Result<Self, Exceptions> {
        let root = parse_document(document, Self::OPERATION)?;
        let base = base_from_element(&root, Service::Wms, &[], CONSUMED_ELEMENTS)?;
        let mut exceptions = Exceptions::new();

        let styled_layers = styled_layers_from_element(&root, &mut exceptions);
        let crs = required_child_text(&root, "CRS", &mut exceptions);
        let bbox = bbox_from_element(&root, &mut exceptions);
        let output = root.child("Output");
        let size = match output {
            Some(output) => size_from_element(output, &mut exceptions),
            None => {
                exceptions.push(Exception::missing_parameter_value(&["Output"]));
                None
            }
        };
        let format = output.and_then(|output| optional_child_text(output, "Format"));

        let query_layers: Vec<String> = root
            .children_named("QueryLayer")
            .map(|e| e.text().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        if query_layers.is_empty() {
            exceptions.push(Exception::missing_parameter_value(&["QueryLayer"]));
        }

        let i = optional_child_text(&root, "I");
        let j = optional_child_text(&root, "J");
        let point = parse_point(i.as_deref(), j.as_deref(), &mut exceptions);
        let info_format = required_child_text(&root, "InfoFormat", &mut exceptions);
        let feature_count = optional_child_text(&root, "FeatureCount")
            .and_then(|count| parse_value("FeatureCount", &count, &mut exceptions));

        match (crs, bbox, size, point, info_format) {
            (Some(crs), Some(bbox), Some(size), Some((i, j)), Some(info_format))
                if exceptions.is_empty() =>
            {
                Ok(Self {
                    base,
                    styled_layers,
                    crs,
                    bbox,
                    size,
                    format,
                    query_layers,
                    i,
                    j,
                    info_format,
                    feature_count,
                    exceptions: optional_child_text(&root, "Exceptions"),
                })
            }
            _ => Err(exceptions),
        }
    }

    #[instrument(skip_all)]
    fn from_kvp(query: &KvpQuery) -> Result<Self, Exceptions> {
        let (base, record, mut exceptions) = kvp_preamble(query, PARAMETERS, Service::Wms)?;

        let styled_layers = match styled_layers_from_kvp(&record) {
            Ok(styled_layers) => styled_layers,
            Err(exception) => {
                exceptions.push(exception);
                return Err(exceptions);
            }
        };
        let crs = crs_from_kvp(&record, &mut exceptions);
        let bbox = bbox_from_kvp(&record, &mut exceptions);
        let size = size_from_kvp(&record, &mut exceptions);
        let query_layers = required(&record, "QUERY_LAYERS", &mut exceptions)
            .map(split_list)
            .unwrap_or_default();
        let info_format = required(&record, "INFO_FORMAT", &mut exceptions).map(str::to_string);
        let point = parse_point(
            record.get_non_empty("I"),
            record.get_non_empty("J"),
            &mut exceptions,
        );
        let feature_count = parse_optional(&record, "FEATURE_COUNT", &mut exceptions);

        match (crs, bbox, size, point, info_format) {
            (Some(crs), Some(bbox), Some(size), Some((i, j)), Some(info_format))
                if exceptions.is_empty() =>
            {
                Ok(Self {
                    base,
                    styled_layers,
                    crs,
                    bbox,
                    size,
                    format: record.get_non_empty("FORMAT").map(str::to_string),
                    query_layers,
                    i,
                    j,
                    info_format,
                    feature_count,
                    exceptions: record.get_non_empty("EXCEPTIONS").map(str::to_string),
                })
            }
            _ => Err(exceptions),
        }
    }

    fn to_xml(&self) -> String {
        let mut root = self.base.root_element(Self::OPERATION, sld_namespaces());
        root.push(styled_layers_element(&self.styled_layers));
        root.push(Element::with_text("CRS", self.crs.clone()));
        root.push(bbox_element(&self.bbox));

        let mut output = Element::new("Output");
        output.push(size_element(self.size));
        if let Some(format) = &self.format {
            output.push(Element::with_text("wms:Format", format.clone()));
        }
        root.push(output);

        for layer in &self.query_layers {
            root.push(Element::with_text("QueryLayer", layer.clone()));
        }
        root.push(Element::with_text("I", self.i.to_string()));
        root.push(Element::with_text("J", self.j.to_string()));
        root.push(Element::with_text("InfoFormat", self.info_format.clone()));
        if let Some(feature_count) = self.feature_count {
            root.push(Element::with_text("FeatureCount", feature_count.to_string()));
        }
        if let Some(exceptions) = &self.exceptions {
            root.push(Element::with_text("Exceptions", exceptions.clone()));
        }
        self.base.write_document(root)
    }

    fn to_kvp(&self) -> KvpQuery {
        let mut query = KvpQuery::new();
        self.base.write_kvp(&mut query, Self::OPERATION);
        write_map_kvp(&mut query, &self.styled_layers, &self.crs, &self.bbox, self.size);
        if let Some(format) = &self.format {
            query.insert("FORMAT", format.clone());
        }
        query.insert("QUERY_LAYERS", self.query_layers.join(","));
        query.insert("INFO_FORMAT", self.info_format.clone());
        query.insert("I", self.i.to_string());
        query.insert("J", self.j.to_string());
        if let Some(feature_count) = self.feature_count {
            query.insert("FEATURE_COUNT", feature_count.to_string());
        }
        if let Some(exceptions) = &self.exceptions {
            query.insert("EXCEPTIONS", exceptions.clone());
        }
        query
    }

    fn base(&self) -> &RequestBase {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ows_common::ExceptionCode;

    fn query(pairs: &[(&str, &str)]) -> KvpQuery {
        pairs.iter().copied().collect()
    }

    fn with(pairs: &[(&str, &str)], key: &str, value: &str) -> KvpQuery {
        let mut query = query(pairs);
        query.insert(key, value);
        query
    }

    #[test]
    fn test_info_format_from_mime() {
        assert_eq!(InfoFormat::from_mime("Application/JSON"), Some(InfoFormat::Json));
        assert_eq!(InfoFormat::from_mime("image/png"), None);
        assert_eq!(InfoFormat::Gml.to_mime(), "application/vnd.ogc.gml");
    }

    #[test]
    fn test_from_kvp() {
        let request =
            GetFeatureInfoRequest::from_kvp(&query(test_utils::kvp::GET_FEATURE_INFO)).unwrap();
        assert_eq!(request.query_layers, vec!["Rivers"]);
        assert_eq!((request.i, request.j), (128, 64));
        assert_eq!(request.feature_count, Some(5));
        assert_eq!(request.known_info_format(), Some(InfoFormat::Json));
        assert_eq!(request.format, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_invalid_point() {
        let err = GetFeatureInfoRequest::from_kvp(&with(
            test_utils::kvp::GET_FEATURE_INFO,
            "I",
            "-3",
        ))
        .unwrap_err();
        assert_eq!(err.len(), 1);
        let exception = err.iter().next().unwrap();
        assert_eq!(exception.code, ExceptionCode::InvalidPoint);
        assert!(exception.text.contains("-3, 64"));
    }

    #[test]
    fn test_validate_reports_layer_not_queryable() {
        let request = GetFeatureInfoRequest::from_kvp(&with(
            test_utils::kvp::GET_FEATURE_INFO,
            "QUERY_LAYERS",
            "Rivers,Lakes",
        ))
        .unwrap();
        let err = request.validate().unwrap_err();
        assert_eq!(err.len(), 1);
        let exception = err.iter().next().unwrap();
        assert_eq!(exception.code, ExceptionCode::LayerNotQueryable);
        assert!(exception.text.contains("Lakes"));
    }

    #[test]
    fn test_validate_point_outside_map() {
        let request = GetFeatureInfoRequest::from_kvp(&with(
            test_utils::kvp::GET_FEATURE_INFO,
            "J",
            "256",
        ))
        .unwrap();
        let err = request.validate().unwrap_err();
        assert!(err.contains_code(ExceptionCode::InvalidPoint));
    }

    #[test]
    fn test_from_xml() {
        let request =
            GetFeatureInfoRequest::from_xml(test_utils::xml::GET_FEATURE_INFO.as_bytes()).unwrap();
        assert_eq!(request.styled_layers, vec![StyledLayer::new("Rivers", None)]);
        assert_eq!(request.crs, "EPSG:28992");
        assert_eq!(request.size, Size { width: 256, height: 256 });
        assert_eq!(request.query_layers, vec!["Rivers"]);
        assert_eq!(request.info_format, "application/json");
        assert_eq!(request.feature_count, Some(5));
        assert!(request.base.attributes.is_empty());
    }

    #[test]
    fn test_xml_missing_point() {
        let xml = test_utils::xml::GET_FEATURE_INFO.replace("<J>64</J>", "");
        let err = GetFeatureInfoRequest::from_xml(xml.as_bytes()).unwrap_err();
        let exception = err.iter().next().unwrap();
        assert_eq!(exception.code, ExceptionCode::MissingParameterValue);
        assert_eq!(exception.locator.as_deref(), Some("J"));
    }
}
