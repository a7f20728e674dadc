//! GetMap and GetFeatureInfo parameter handling.

use ows_common::{BoundingBox, ExceptionCode, KvpQuery};
use ows_protocol::{GetFeatureInfoRequest, GetMapRequest, InfoFormat, OgcRequest, StyledLayer};
use test_utils::{assert_coords_approx_eq, kvp, xml};

fn get_map(overrides: &[(&str, &str)]) -> KvpQuery {
    let mut query: KvpQuery = kvp::GET_MAP.iter().copied().collect();
    for (key, value) in overrides {
        query.insert(*key, *value);
    }
    query
}

// ============================================================================
// LAYERS / STYLES pairing
// ============================================================================

#[test]
fn test_styles_pair_with_layers() {
    let request = GetMapRequest::from_kvp(&get_map(&[])).unwrap();
    assert_eq!(
        request.styled_layers,
        vec![
            StyledLayer::new("Rivers", Some("CenterLine")),
            StyledLayer::new("Roads", None),
        ]
    );
    assert_eq!(request.to_kvp().get("STYLES"), Some("CenterLine,"));
}

#[test]
fn test_empty_styles_means_defaults() {
    let request = GetMapRequest::from_kvp(&get_map(&[("STYLES", "")])).unwrap();
    assert!(request.styled_layers.iter().all(|l| l.style.is_none()));
    assert_eq!(request.to_kvp().get("STYLES"), Some(""));
}

#[test]
fn test_style_count_must_match_layers() {
    let err = GetMapRequest::from_kvp(&get_map(&[("STYLES", "a,b,c")])).unwrap_err();
    assert_eq!(err.len(), 1);
    assert!(err.contains_code(ExceptionCode::StyleNotDefined));
}

#[test]
fn test_layer_names() {
    let request = GetMapRequest::from_kvp(&get_map(&[])).unwrap();
    assert_eq!(request.layer_names().collect::<Vec<_>>(), vec!["Rivers", "Roads"]);
}

// ============================================================================
// BBOX, CRS and size
// ============================================================================

#[test]
fn test_bbox_has_no_srs_name_in_kvp() {
    let request = GetMapRequest::from_kvp(&get_map(&[])).unwrap();
    assert_eq!(request.bbox, BoundingBox::new(-90.0, -180.0, 90.0, 180.0));
    assert_eq!(request.crs, "EPSG:4326");
}

#[test]
fn test_bbox_with_fifth_token_is_invalid() {
    let err = GetMapRequest::from_kvp(&get_map(&[("BBOX", "0,0,1,1,EPSG:4326")])).unwrap_err();
    let exception = err.iter().next().unwrap();
    assert_eq!(exception.code, ExceptionCode::InvalidParameterValue);
    assert_eq!(exception.locator.as_deref(), Some("BBOX"));
}

#[test]
fn test_xml_bounding_box_crs_becomes_srs_name() {
    let request = GetMapRequest::from_xml(xml::GET_MAP.as_bytes()).unwrap();
    assert_eq!(request.bbox.srs_name.as_deref(), Some("EPSG:4326"));
    assert_coords_approx_eq!(
        (request.bbox.lower_corner.0, request.bbox.lower_corner.1),
        (-180.0, -90.0),
        1e-9
    );
    assert_eq!(request.output.size.width, 1024);
    assert_eq!(request.output.transparent, Some(false));
}

#[test]
fn test_inverted_bbox_fails_validation() {
    let request = GetMapRequest::from_kvp(&get_map(&[("BBOX", "10,0,0,10")])).unwrap();
    let err = request.validate().unwrap_err();
    assert!(err.contains_code(ExceptionCode::InvalidParameterValue));
}

#[test]
fn test_missing_width_and_height_collected() {
    let mut query = get_map(&[]);
    query = query
        .iter()
        .filter(|(key, _)| !matches!(*key, "WIDTH" | "HEIGHT"))
        .map(|(key, values)| (key.to_string(), values.join(",")))
        .collect();
    let err = GetMapRequest::from_kvp(&query).unwrap_err();
    let locators: Vec<&str> = err.iter().filter_map(|e| e.locator.as_deref()).collect();
    assert_eq!(locators, vec!["WIDTH", "HEIGHT"]);
}

// ============================================================================
// Unrecognised elements
// ============================================================================

#[test]
fn test_get_map_keeps_unknown_elements() {
    let document = xml::GET_MAP.replace("</GetMap>", "  <wms:Dpi>96</wms:Dpi>\n</GetMap>");
    let request = GetMapRequest::from_xml(document.as_bytes()).unwrap();
    assert_eq!(
        request.base.elements,
        vec![r#"<wms:Dpi xmlns:wms="http://www.opengis.net/wms">96</wms:Dpi>"#.to_string()]
    );

    let written = request.to_xml();
    assert!(written.ends_with(r#"<wms:Dpi xmlns:wms="http://www.opengis.net/wms">96</wms:Dpi></GetMap>"#));
    assert_eq!(GetMapRequest::from_xml(written.as_bytes()).unwrap(), request);
    assert!(request.to_kvp().keys().all(|key| key != "DPI"));
}

#[test]
fn test_get_feature_info_keeps_unknown_elements() {
    let document = xml::GET_FEATURE_INFO.replace("</GetFeatureInfo>", "<Extra>x</Extra></GetFeatureInfo>");
    let request = GetFeatureInfoRequest::from_xml(document.as_bytes()).unwrap();
    assert_eq!(
        request.base.elements,
        vec![r#"<Extra xmlns="http://www.opengis.net/sld">x</Extra>"#.to_string()]
    );
    let written = request.to_xml();
    assert_eq!(GetFeatureInfoRequest::from_xml(written.as_bytes()).unwrap(), request);
}

// ============================================================================
// GetFeatureInfo
// ============================================================================

#[test]
fn test_get_feature_info_kvp() {
    let query: KvpQuery = kvp::GET_FEATURE_INFO.iter().copied().collect();
    let request = GetFeatureInfoRequest::from_kvp(&query).unwrap();
    assert_eq!((request.i, request.j), (128, 64));
    assert_eq!(request.query_layers, vec!["Rivers"]);
    assert_eq!(request.known_info_format(), Some(InfoFormat::Json));
    assert_eq!(request.feature_count, Some(5));
    assert!(request.validate().is_ok());
}

#[test]
fn test_get_feature_info_unknown_format_fails_validation() {
    let mut query: KvpQuery = kvp::GET_FEATURE_INFO.iter().copied().collect();
    query.insert("INFO_FORMAT", "image/png");
    let request = GetFeatureInfoRequest::from_kvp(&query).unwrap();
    assert_eq!(request.info_format, "image/png");
    let err = request.validate().unwrap_err();
    assert!(err.contains_code(ExceptionCode::InvalidFormat));
}

#[test]
fn test_get_feature_info_xml_matches_kvp() {
    let from_xml = GetFeatureInfoRequest::from_xml(xml::GET_FEATURE_INFO.as_bytes()).unwrap();
    let query: KvpQuery = kvp::GET_FEATURE_INFO.iter().copied().collect();
    let from_kvp = GetFeatureInfoRequest::from_kvp(&query).unwrap();
    assert_eq!(from_xml.styled_layers, from_kvp.styled_layers);
    assert_eq!(from_xml.bbox, from_kvp.bbox);
    assert_eq!((from_xml.i, from_xml.j), (from_kvp.i, from_kvp.j));
    assert_eq!(from_xml.info_format, from_kvp.info_format);
}
