//! WMS 1.3.0 GetMap.
//!
//! The XML encoding follows the SLD 1.1 GetMap schema: named layers and
//! styles inside a `StyledLayerDescriptor`, an OWS bounding box and an
//! `Output` block. The map-part helpers here are shared with
//! GetFeatureInfo.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use ows_common::kvp::split_list;
use ows_common::namespaces::{OWS_NAMESPACE, SE_NAMESPACE, SLD_NAMESPACE, WMS_NAMESPACE};
use ows_common::{Attr, BoundingBox, Exception, Exceptions, KvpQuery, KvpRecord, Service};

use crate::request::{
    base_from_element, kvp_preamble, optional_child_text, parse_bool, parse_document,
    parse_required, parse_value, required, required_child_text, OgcRequest, RequestBase,
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
    "TRANSPARENT",
    "BGCOLOR",
    "EXCEPTIONS",
    "TIME",
    "ELEVATION",
];

/// Root children read by the model; others pass through.
const CONSUMED_ELEMENTS: &[&str] = &[
    "StyledLayerDescriptor",
    "CRS",
    "BoundingBox",
    "Output",
    "Exceptions",
    "Time",
    "Elevation",
];

/// Version of the StyledLayerDescriptor written inside request bodies.
const SLD_VERSION: &str = "1.1.0";

/// A layer and the style it is drawn with; `None` is the layer's default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledLayer {
    pub name: String,
    pub style: Option<String>,
}

impl StyledLayer {
    pub fn new(name: impl Into<String>, style: Option<&str>) -> Self {
        Self {
            name: name.into(),
            style: style.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub size: Size,
    pub format: String,
    pub transparent: Option<bool>,
    pub bgcolor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetMapRequest {
    pub base: RequestBase,
    pub styled_layers: Vec<StyledLayer>,
    pub crs: String,
    pub bbox: BoundingBox,
    pub output: Output,
    pub exceptions: Option<String>,
    pub time: Option<String>,
    pub elevation: Option<String>,
}

impl GetMapRequest {
    /// Semantic checks that do not need server metadata.
    pub fn validate(&self) -> Result<(), Exceptions> {
        let mut exceptions = Exceptions::new();
        validate_map(&self.styled_layers, &self.bbox, self.output.size, &mut exceptions);
        exceptions.into_result()
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.styled_layers.iter().map(|layer| layer.name.as_str())
    }
}

impl OgcRequest for GetMapRequest {
    const OPERATION: &'static str = "GetMap";

    #[instrument(skip_all)]
    fn from_xml(document: &[u8]) -> Result<Self, Exceptions> {
        let root = parse_document(document, Self::OPERATION)?;
        let base = base_from_element(&root, Service::Wms, &[], CONSUMED_ELEMENTS)?;
        let mut exceptions = Exceptions::new();

        let styled_layers = styled_layers_from_element(&root, &mut exceptions);
        let crs = required_child_text(&root, "CRS", &mut exceptions);
        let bbox = bbox_from_element(&root, &mut exceptions);
        let output = match root.child("Output") {
            Some(output) => {
                let size = size_from_element(output, &mut exceptions);
                let format = required_child_text(output, "Format", &mut exceptions);
                let transparent = optional_child_text(output, "Transparent").and_then(|value| {
                    let parsed = parse_bool(&value);
                    if parsed.is_none() {
                        exceptions.push(Exception::invalid_parameter_value(&["Transparent", value.as_str()]));
                    }
                    parsed
                });
                match (size, format) {
                    (Some(size), Some(format)) => Some(Output {
                        size,
                        format,
                        transparent,
                        bgcolor: optional_child_text(output, "BGcolor"),
                    }),
                    _ => None,
                }
            }
            None => {
                exceptions.push(Exception::missing_parameter_value(&["Output"]));
                None
            }
        };

        match (crs, bbox, output) {
            (Some(crs), Some(bbox), Some(output)) if exceptions.is_empty() => Ok(Self {
                base,
                styled_layers,
                crs,
                bbox,
                output,
                exceptions: optional_child_text(&root, "Exceptions"),
                time: optional_child_text(&root, "Time"),
                elevation: optional_child_text(&root, "Elevation"),
            }),
            _ => Err(exceptions),
        }
    }

    #[instrument(skip_all)]
    fn from_kvp(query: &KvpQuery) -> Result<Self, Exceptions> {
        let (base, record, mut exceptions) = kvp_preamble(query, PARAMETERS, Service::Wms)?;

        let styled_layers = match styled_layers_from_kvp(&record) {
            Ok(styled_layers) => styled_layers,
            // a LAYERS/STYLES mismatch leaves nothing to describe the map with
            Err(exception) => {
                exceptions.push(exception);
                return Err(exceptions);
            }
        };
        let crs = crs_from_kvp(&record, &mut exceptions);
        let bbox = bbox_from_kvp(&record, &mut exceptions);
        let size = size_from_kvp(&record, &mut exceptions);
        let format = required(&record, "FORMAT", &mut exceptions).map(str::to_string);
        let transparent = record.get_non_empty("TRANSPARENT").and_then(|value| {
            let parsed = parse_bool(value);
            if parsed.is_none() {
                exceptions.push(Exception::invalid_parameter_value(&["TRANSPARENT", value]));
            }
            parsed
        });

        match (crs, bbox, size, format) {
            (Some(crs), Some(bbox), Some(size), Some(format)) if exceptions.is_empty() => {
                Ok(Self {
                    base,
                    styled_layers,
                    crs,
                    bbox,
                    output: Output {
                        size,
                        format,
                        transparent,
                        bgcolor: record.get_non_empty("BGCOLOR").map(str::to_string),
                    },
                    exceptions: record.get_non_empty("EXCEPTIONS").map(str::to_string),
                    time: record.get_non_empty("TIME").map(str::to_string),
                    elevation: record.get_non_empty("ELEVATION").map(str::to_string),
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
        output.push(size_element(self.output.size));
        output.push(Element::with_text("wms:Format", self.output.format.clone()));
        if let Some(transparent) = self.output.transparent {
            output.push(Element::with_text("Transparent", transparent.to_string()));
        }
        if let Some(bgcolor) = &self.output.bgcolor {
            output.push(Element::with_text("BGcolor", bgcolor.clone()));
        }
        root.push(output);

        if let Some(exceptions) = &self.exceptions {
            root.push(Element::with_text("Exceptions", exceptions.clone()));
        }
        if let Some(time) = &self.time {
            root.push(Element::with_text("Time", time.clone()));
        }
        if let Some(elevation) = &self.elevation {
            root.push(Element::with_text("Elevation", elevation.clone()));
        }
        self.base.write_document(root)
    }

    fn to_kvp(&self) -> KvpQuery {
        let mut query = KvpQuery::new();
        self.base.write_kvp(&mut query, Self::OPERATION);
        write_map_kvp(&mut query, &self.styled_layers, &self.crs, &self.bbox, self.output.size);
        query.insert("FORMAT", self.output.format.clone());
        if let Some(transparent) = self.output.transparent {
            query.insert("TRANSPARENT", if transparent { "TRUE" } else { "FALSE" });
        }
        if let Some(bgcolor) = &self.output.bgcolor {
            query.insert("BGCOLOR", bgcolor.clone());
        }
        if let Some(exceptions) = &self.exceptions {
            query.insert("EXCEPTIONS", exceptions.clone());
        }
        if let Some(time) = &self.time {
            query.insert("TIME", time.clone());
        }
        if let Some(elevation) = &self.elevation {
            query.insert("ELEVATION", elevation.clone());
        }
        query
    }

    fn base(&self) -> &RequestBase {
        &self.base
    }
}

// === Map part shared with GetFeatureInfo ===

/// Pair LAYERS with STYLES.
///
/// Absent or empty STYLES leaves every layer on its default style, no
/// layers gives an empty list, equal counts pair up with empty entries
/// meaning the default style. Any other combination is `StyleNotDefined`.
pub(crate) fn styled_layers_from_kvp(record: &KvpRecord) -> Result<Vec<StyledLayer>, Exception> {
    let layers = record.get("LAYERS").map(split_list).unwrap_or_default();
    let styles: Vec<&str> = match record.get("STYLES").map(str::trim) {
        None | Some("") => Vec::new(),
        Some(styles) => styles.split(',').map(str::trim).collect(),
    };

    if styles.is_empty() {
        return Ok(layers.into_iter().map(|name| StyledLayer::new(name, None)).collect());
    }
    if layers.is_empty() {
        return Ok(Vec::new());
    }
    if layers.len() != styles.len() {
        return Err(Exception::style_not_defined(&[]));
    }
    Ok(layers
        .into_iter()
        .zip(styles)
        .map(|(name, style)| StyledLayer::new(name, Some(style).filter(|s| !s.is_empty())))
        .collect())
}

/// CRS, falling back to the WMS 1.1 SRS spelling.
pub(crate) fn crs_from_kvp(record: &KvpRecord, exceptions: &mut Exceptions) -> Option<String> {
    match record.get_non_empty("CRS").or_else(|| record.get_non_empty("SRS")) {
        Some(crs) => Some(crs.to_string()),
        None => {
            exceptions.push(Exception::missing_parameter_value(&["CRS"]));
            None
        }
    }
}

/// BBOX of exactly four numbers.
pub(crate) fn bbox_from_kvp(record: &KvpRecord, exceptions: &mut Exceptions) -> Option<BoundingBox> {
    let value = required(record, "BBOX", exceptions)?;
    match BoundingBox::from_kvp(value) {
        Ok(bbox) if bbox.srs_name.is_none() => Some(bbox),
        _ => {
            exceptions.push(Exception::invalid_parameter_value(&["BBOX", value]));
            None
        }
    }
}

pub(crate) fn size_from_kvp(record: &KvpRecord, exceptions: &mut Exceptions) -> Option<Size> {
    let width = parse_required(record, "WIDTH", exceptions);
    let height = parse_required(record, "HEIGHT", exceptions);
    Some(Size {
        width: width?,
        height: height?,
    })
}

/// LAYERS, STYLES, CRS, BBOX, WIDTH and HEIGHT.
///
/// STYLES is always written, empty when every layer uses its default.
pub(crate) fn write_map_kvp(
    query: &mut KvpQuery,
    styled_layers: &[StyledLayer],
    crs: &str,
    bbox: &BoundingBox,
    size: Size,
) {
    let layers: Vec<&str> = styled_layers.iter().map(|l| l.name.as_str()).collect();
    query.insert("LAYERS", layers.join(","));

    let styles = if styled_layers.iter().all(|l| l.style.is_none()) {
        String::new()
    } else {
        styled_layers
            .iter()
            .map(|l| l.style.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(",")
    };
    query.insert("STYLES", styles);
    query.insert("CRS", crs);
    query.insert("BBOX", bbox.coordinates_kvp());
    query.insert("WIDTH", size.width.to_string());
    query.insert("HEIGHT", size.height.to_string());
}

pub(crate) fn styled_layers_from_element(root: &Element, exceptions: &mut Exceptions) -> Vec<StyledLayer> {
    let Some(descriptor) = root.child("StyledLayerDescriptor") else {
        exceptions.push(Exception::missing_parameter_value(&["StyledLayerDescriptor"]));
        return Vec::new();
    };

    let mut styled_layers = Vec::new();
    for layer in descriptor.children_named("NamedLayer") {
        let Some(name) = required_child_text(layer, "Name", exceptions) else {
            continue;
        };
        let style = layer
            .child("NamedStyle")
            .and_then(|style| optional_child_text(style, "Name"));
        styled_layers.push(StyledLayer { name, style });
    }
    styled_layers
}

pub(crate) fn bbox_from_element(root: &Element, exceptions: &mut Exceptions) -> Option<BoundingBox> {
    let Some(element) = root.child("BoundingBox") else {
        exceptions.push(Exception::missing_parameter_value(&["BoundingBox"]));
        return None;
    };

    let mut corner = |local: &str| -> Option<(f64, f64)> {
        let text = required_child_text(element, local, exceptions)?;
        match BoundingBox::parse_corner(&text) {
            Ok(corner) => Some(corner),
            Err(_) => {
                exceptions.push(Exception::invalid_parameter_value(&[local, text.as_str()]));
                None
            }
        }
    };
    let lower_corner = corner("LowerCorner");
    let upper_corner = corner("UpperCorner");

    Some(BoundingBox {
        lower_corner: lower_corner?,
        upper_corner: upper_corner?,
        srs_name: element.attribute("crs").map(str::to_string),
    })
}

pub(crate) fn size_from_element(output: &Element, exceptions: &mut Exceptions) -> Option<Size> {
    let Some(size) = output.child("Size") else {
        exceptions.push(Exception::missing_parameter_value(&["Size"]));
        return None;
    };
    let mut dimension = |local: &str| -> Option<u32> {
        let text = required_child_text(size, local, exceptions)?;
        parse_value(local, &text, exceptions)
    };
    let width = dimension("Width");
    let height = dimension("Height");
    Some(Size {
        width: width?,
        height: height?,
    })
}

pub(crate) fn sld_namespaces() -> Vec<Attr> {
    vec![
        Attr::namespace_declaration(None, SLD_NAMESPACE),
        Attr::namespace_declaration(Some("se"), SE_NAMESPACE),
        Attr::namespace_declaration(Some("ows"), OWS_NAMESPACE),
        Attr::namespace_declaration(Some("wms"), WMS_NAMESPACE),
    ]
}

pub(crate) fn styled_layers_element(styled_layers: &[StyledLayer]) -> Element {
    let mut descriptor =
        Element::new("StyledLayerDescriptor").attr(Attr::new("version", SLD_VERSION));
    for styled_layer in styled_layers {
        let mut layer = Element::new("NamedLayer");
        layer.push(Element::with_text("se:Name", styled_layer.name.clone()));
        if let Some(style) = &styled_layer.style {
            let mut named_style = Element::new("NamedStyle");
            named_style.push(Element::with_text("se:Name", style.clone()));
            layer.push(named_style);
        }
        descriptor.push(layer);
    }
    descriptor
}

pub(crate) fn bbox_element(bbox: &BoundingBox) -> Element {
    let mut element = Element::new("BoundingBox");
    if let Some(crs) = &bbox.srs_name {
        element.attributes.push(Attr::new("crs", crs.clone()));
    }
    element.push(Element::with_text(
        "ows:LowerCorner",
        BoundingBox::format_corner(bbox.lower_corner),
    ));
    element.push(Element::with_text(
        "ows:UpperCorner",
        BoundingBox::format_corner(bbox.upper_corner),
    ));
    element
}

pub(crate) fn size_element(size: Size) -> Element {
    let mut element = Element::new("Size");
    element.push(Element::with_text("Width", size.width.to_string()));
    element.push(Element::with_text("Height", size.height.to_string()));
    element
}

/// Checks shared by GetMap and GetFeatureInfo.
pub(crate) fn validate_map(
    styled_layers: &[StyledLayer],
    bbox: &BoundingBox,
    size: Size,
    exceptions: &mut Exceptions,
) {
    if styled_layers.is_empty() {
        exceptions.push(Exception::missing_parameter_value(&["LAYERS"]));
    }
    if size.width == 0 {
        exceptions.push(Exception::invalid_parameter_value(&["WIDTH", "0"]));
    }
    if size.height == 0 {
        exceptions.push(Exception::invalid_parameter_value(&["HEIGHT", "0"]));
    }
    if bbox.is_inverted() {
        exceptions.push(Exception::invalid_parameter_value(&["BBOX", bbox.coordinates_kvp().as_str()]));
    }
}
