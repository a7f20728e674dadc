//! GetFeature selection clauses, resource ids and base parameter handling.

use ows_common::{ExceptionCode, KvpQuery};
use ows_protocol::{Element, Filter, GetFeatureRequest, OgcRequest, ResourceId};
use proptest::prelude::*;
use test_utils::init_tracing;

const FILTER_VALUE: &str = r#"<Filter><ResourceId rid="perceel.1"/></Filter>"#;

fn query(pairs: &[(&str, &str)]) -> KvpQuery {
    let mut query: KvpQuery = [
        ("SERVICE", "WFS"),
        ("REQUEST", "GetFeature"),
        ("VERSION", "2.0.0"),
        ("TYPENAMES", "kad:Perceel"),
    ]
    .into_iter()
    .collect();
    for (key, value) in pairs {
        query.insert(*key, *value);
    }
    query
}

fn rids(request: &GetFeatureRequest) -> Vec<&str> {
    request
        .query
        .filter
        .iter()
        .flat_map(|filter| filter.resource_ids.iter())
        .map(|r| r.rid.as_str())
        .collect()
}

// ============================================================================
// Selection clause exclusion
// ============================================================================

fn assert_exclusive(pairs: &[(&str, &str)], expected: &str) {
    init_tracing();
    let err = GetFeatureRequest::from_kvp(&query(pairs)).unwrap_err();
    assert_eq!(err.len(), 1);
    let exception = err.iter().next().unwrap();
    assert_eq!(exception.code, ExceptionCode::NoApplicableCode);
    assert_eq!(
        exception.text,
        format!("Only one of the following selection clauses can be used {}", expected)
    );
}

#[test]
fn test_resource_id_and_filter_are_exclusive() {
    assert_exclusive(
        &[("RESOURCEID", "perceel.1"), ("FILTER", FILTER_VALUE)],
        "RESOURCEID,FILTER",
    );
}

#[test]
fn test_resource_id_and_bbox_are_exclusive() {
    assert_exclusive(
        &[("RESOURCEID", "perceel.1"), ("BBOX", "0,0,1,1")],
        "RESOURCEID,BBOX",
    );
}

#[test]
fn test_filter_and_bbox_are_exclusive() {
    assert_exclusive(
        &[("BBOX", "0,0,1,1"), ("FILTER", FILTER_VALUE)],
        "BBOX,FILTER",
    );
}

#[test]
fn test_all_three_clauses() {
    assert_exclusive(
        &[
            ("FILTER", FILTER_VALUE),
            ("RESOURCEID", "perceel.1"),
            ("BBOX", "0,0,1,1"),
        ],
        "FILTER,RESOURCEID,BBOX",
    );
}

#[test]
fn test_selection_keys_are_case_insensitive() {
    assert_exclusive(
        &[("resourceid", "perceel.1"), ("bbox", "0,0,1,1")],
        "RESOURCEID,BBOX",
    );
}

// ============================================================================
// Resource ids
// ============================================================================

#[test]
fn test_resource_id_groups_merge_in_order() {
    let request = GetFeatureRequest::from_kvp(&query(&[("RESOURCEID", "(A)(B,C)")])).unwrap();
    assert_eq!(rids(&request), vec!["A", "B", "C"]);
}

#[test]
fn test_resource_id_duplicates_survive_merge() {
    let request = GetFeatureRequest::from_kvp(&query(&[("RESOURCEID", "(A)(A)")])).unwrap();
    assert_eq!(rids(&request), vec!["A", "A"]);
}

#[test]
fn test_resource_ids_in_xml_filter_keep_order() {
    let document = format!(
        r#"<GetFeature service="WFS" version="2.0.0"><Query>{}</Query></GetFeature>"#,
        test_utils::xml::RESOURCE_ID_FILTER
    );
    let request = GetFeatureRequest::from_xml(document.as_bytes()).unwrap();
    assert_eq!(rids(&request), vec!["one", "two", "one"]);
    assert!(request.query.type_names.is_empty());
}

#[test]
fn test_resource_id_only_filter_written_as_resourceid() {
    let mut request = GetFeatureRequest::from_kvp(&query(&[])).unwrap();
    request.query.filter = Some(Filter::from_resource_ids(vec![
        ResourceId::new("b"),
        ResourceId::new("a"),
    ]));
    assert_eq!(request.to_kvp().get("RESOURCEID"), Some("b,a"));
}

// ============================================================================
// SERVICE and VERSION
// ============================================================================

#[test]
fn test_missing_version_is_fatal() {
    let pairs: KvpQuery = [
        ("SERVICE", "WFS"),
        ("REQUEST", "GetFeature"),
        ("TYPENAMES", "kad:Perceel"),
        ("COUNT", "nope"),
    ]
    .into_iter()
    .collect();

    let err = GetFeatureRequest::from_kvp(&pairs).unwrap_err();
    let exception = err.iter().last().unwrap();
    assert_eq!(exception.code, ExceptionCode::MissingParameterValue);
    assert_eq!(exception.locator.as_deref(), Some("VERSION"));
    assert!(!err.contains_code(ExceptionCode::InvalidParameterValue));
}

#[test]
fn test_wrong_version() {
    let err = GetFeatureRequest::from_kvp(&query(&[("VERSION", "1.1.0")])).unwrap_err();
    assert!(err.contains_code(ExceptionCode::VersionNegotiationFailed));
}

#[test]
fn test_wrong_service() {
    let err = GetFeatureRequest::from_kvp(&query(&[("SERVICE", "WMS")])).unwrap_err();
    let exception = err.iter().next().unwrap();
    assert_eq!(exception.code, ExceptionCode::InvalidParameterValue);
    assert_eq!(exception.locator.as_deref(), Some("SERVICE"));
}

#[test]
fn test_service_may_be_omitted() {
    let pairs: KvpQuery = [
        ("REQUEST", "GetFeature"),
        ("VERSION", "2.0.0"),
        ("TYPENAMES", "a"),
    ]
    .into_iter()
    .collect();
    let request = GetFeatureRequest::from_kvp(&pairs).unwrap();
    assert_eq!(request.to_kvp().get("SERVICE"), Some("WFS"));
}

#[test]
fn test_repeated_parameter_is_invalid() {
    let mut pairs = query(&[]);
    pairs.append("count", "5");
    pairs.append("COUNT", "6");
    let err = GetFeatureRequest::from_kvp(&pairs).unwrap_err();
    let exception = err.iter().next().unwrap();
    assert_eq!(exception.code, ExceptionCode::InvalidParameterValue);
    assert_eq!(exception.locator.as_deref(), Some("COUNT"));
}

#[test]
fn test_multiple_xml_queries_not_supported() {
    let err = GetFeatureRequest::from_xml(
        br#"<GetFeature service="WFS" version="2.0.0"><Query typeNames="a"/><Query typeNames="b"/></GetFeature>"#,
    )
    .unwrap_err();
    assert!(err.contains_code(ExceptionCode::OptionNotSupported));
}

// ============================================================================
// Namespace declarations
// ============================================================================

const FOREIGN_PREFIX_FILTER: &str = r#"<fes:Filter xmlns:fes="http://www.opengis.net/fes/2.0" xmlns:kad="http://kadaster.nl" xmlns:g="http://www.opengis.net/gml/3.2"><fes:And><fes:PropertyIsEqualTo><fes:ValueReference>kad:naam</fes:ValueReference><fes:Literal>x</fes:Literal></fes:PropertyIsEqualTo><fes:Intersects><fes:ValueReference>kad:geom</fes:ValueReference><g:Point><g:pos>1 2</g:pos></g:Point></fes:Intersects></fes:And></fes:Filter>"#;

/// Prefixes a GetFeature document uses in names, type names and value
/// references, each with whether it was bound where used.
fn check_prefixes(element: &Element, in_scope: &mut Vec<String>) {
    let outer = in_scope.len();
    in_scope.extend(
        element
            .declarations()
            .filter_map(|d| d.declared_prefix())
            .map(str::to_string),
    );

    let mut used: Vec<String> = Vec::new();
    used.extend(element.name.split_once(':').map(|(p, _)| p.to_string()));
    for attr in &element.attributes {
        match attr.namespace.as_deref() {
            Some("xmlns") | Some("xml") => {}
            Some(prefix) => used.push(prefix.to_string()),
            None if attr.local == "typeNames" => used.extend(
                attr.value
                    .split_whitespace()
                    .filter_map(|name| name.split_once(':'))
                    .map(|(p, _)| p.to_string()),
            ),
            None => {}
        }
    }
    if matches!(element.local_name(), "ValueReference" | "PropertyName") {
        used.extend(
            element
                .text()
                .split('/')
                .filter_map(|step| step.trim().split_once(':'))
                .map(|(p, _)| p.to_string()),
        );
    }
    for prefix in used {
        assert!(
            in_scope.contains(&prefix),
            "prefix {} used in {} is not declared",
            prefix,
            element.name
        );
    }

    for child in element.child_elements() {
        check_prefixes(child, in_scope);
    }
    in_scope.truncate(outer);
}

fn assert_prefixes_declared(xml: &str) {
    let root = Element::parse(xml.as_bytes()).unwrap();
    check_prefixes(&root, &mut Vec::new());
}

#[test]
fn test_kvp_filter_declarations_survive() {
    init_tracing();
    let request = GetFeatureRequest::from_kvp(&query(&[("FILTER", FOREIGN_PREFIX_FILTER)])).unwrap();

    let kvp = request.to_kvp();
    assert_eq!(
        kvp.get("NAMESPACES"),
        Some("xmlns(kad,http://kadaster.nl),xmlns(g,http://www.opengis.net/gml/3.2)")
    );
    let filter = kvp.get("FILTER").unwrap();
    assert_prefixes_declared(filter);
    assert!(filter.contains(r#"xmlns:kad="http://kadaster.nl""#));
    assert!(filter.contains(r#"xmlns:g="http://www.opengis.net/gml/3.2""#));

    let xml = request.to_xml();
    assert_prefixes_declared(&xml);

    assert_eq!(GetFeatureRequest::from_kvp(&kvp).unwrap(), request);
    assert_eq!(GetFeatureRequest::from_xml(xml.as_bytes()).unwrap(), request);
}

#[test]
fn test_xml_query_and_filter_declarations_survive() {
    let document = r#"<wfs:GetFeature service="WFS" version="2.0.0" xmlns:wfs="http://www.opengis.net/wfs/2.0">
  <wfs:Query typeNames="kad:Perceel" xmlns:kad="http://kadaster.nl">
    <fes:Filter xmlns:fes="http://www.opengis.net/fes/2.0" xmlns:g="http://www.opengis.net/gml/3.2">
      <fes:Intersects>
        <fes:ValueReference>kad:geom</fes:ValueReference>
        <g:Point><g:pos>1 2</g:pos></g:Point>
      </fes:Intersects>
    </fes:Filter>
  </wfs:Query>
</wfs:GetFeature>"#;
    assert_prefixes_declared(document);
    let request = GetFeatureRequest::from_xml(document.as_bytes()).unwrap();

    let xml = request.to_xml();
    assert_prefixes_declared(&xml);
    assert_eq!(GetFeatureRequest::from_xml(xml.as_bytes()).unwrap(), request);

    let kvp = request.to_kvp();
    assert_eq!(
        kvp.get("NAMESPACES"),
        Some("xmlns(kad,http://kadaster.nl),xmlns(g,http://www.opengis.net/gml/3.2)")
    );
    assert_prefixes_declared(kvp.get("FILTER").unwrap());
    assert_eq!(GetFeatureRequest::from_kvp(&kvp).unwrap(), request);
}

#[test]
fn test_deeply_nested_kvp_filter_is_rejected() {
    let depth = 5000;
    let filter = format!(
        "<Filter>{}<PropertyIsNull><ValueReference>a</ValueReference></PropertyIsNull>{}</Filter>",
        "<Not>".repeat(depth),
        "</Not>".repeat(depth)
    );
    let err = GetFeatureRequest::from_kvp(&query(&[("FILTER", filter.as_str())])).unwrap_err();
    let exception = err.iter().next().unwrap();
    assert_eq!(exception.code, ExceptionCode::OperationParsingFailed);
    assert_eq!(exception.locator.as_deref(), Some("Filter"));
}

#[test]
fn test_deeply_nested_xml_body_is_rejected() {
    let depth = 5000;
    let document = format!(
        r#"<GetFeature service="WFS" version="2.0.0"><Query typeNames="a"><Filter>{}<PropertyIsNull><ValueReference>a</ValueReference></PropertyIsNull>{}</Filter></Query></GetFeature>"#,
        "<Not>".repeat(depth),
        "</Not>".repeat(depth)
    );
    let err = GetFeatureRequest::from_xml(document.as_bytes()).unwrap_err();
    assert!(err.contains_code(ExceptionCode::NoApplicableCode));
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #[test]
    fn prop_resource_ids_survive_kvp(ids in prop::collection::vec("[a-z]{1,8}\\.[0-9]{1,4}", 1..8)) {
        let value = ids.join(",");
        let request = GetFeatureRequest::from_kvp(&query(&[("RESOURCEID", value.as_str())])).unwrap();
        prop_assert_eq!(rids(&request), ids.iter().map(String::as_str).collect::<Vec<_>>());

        let again = GetFeatureRequest::from_kvp(&request.to_kvp()).unwrap();
        prop_assert_eq!(again, request);
    }

    #[test]
    fn prop_paging_survives_kvp(count in 0u64..100_000, start in 0u64..100_000) {
        let (count, start) = (count.to_string(), start.to_string());
        let request = GetFeatureRequest::from_kvp(&query(&[
            ("COUNT", count.as_str()),
            ("STARTINDEX", start.as_str()),
        ]))
        .unwrap();
        let kvp = request.to_kvp();
        prop_assert_eq!(kvp.get("COUNT"), Some(count.as_str()));
        prop_assert_eq!(kvp.get("STARTINDEX"), Some(start.as_str()));
    }
}
