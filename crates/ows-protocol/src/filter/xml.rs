//! FES 2.0 XML encoding of filters.
//!
//! Predicates are matched on local name, so any prefix (or none) is accepted
//! on input. Output always uses the `fes` and `gml` prefixes; any other
//! declaration made inside the filter is written on the `fes:Filter`
//! element so prefixes in value references and geometries stay bound.

use std::collections::BTreeSet;

use ows_common::attributes::{dedupe, merge_managed, strip_managed_namespaces};
use ows_common::namespaces::{FES_NAMESPACE, GML_NAMESPACE, MANAGED_NAMESPACES};
use ows_common::{Attr, BoundingBox, Exception};
use tracing::debug;

use super::{
    BinaryComparisonKind, ComparisonOperator, Distance, DistanceKind, Expression, Filter,
    Geometry, LogicalOperator, MatchAction, ResourceId, SpatialKind, SpatialOperator,
};
use crate::xml::{Element, XmlError};

const LOCATOR: &str = "Filter";

impl Filter {
    /// Parse a standalone `<fes:Filter>` document, as sent in the KVP
    /// FILTER parameter.
    pub fn from_xml_fragment(fragment: &str) -> Result<Filter, Exception> {
        let root = Element::parse(fragment.trim().as_bytes()).map_err(|err| match err {
            XmlError::TooDeep(depth) => {
                debug!(depth, "filter nested too deeply");
                parsing_failed(format!("filter nesting exceeds {} levels", depth))
            }
            err => {
                debug!(error = %err, "filter is not well formed");
                Exception::no_applicable_code(&["Filter is not valid XML"])
            }
        })?;
        if root.local_name() != "Filter" {
            return Err(parsing_failed(format!(
                "expected a Filter element, found {}",
                root.name
            )));
        }
        Filter::from_element(&root)
    }

    /// Read the predicates of a `Filter` element.
    pub fn from_element(element: &Element) -> Result<Filter, Exception> {
        let mut filter = Filter::default();
        for child in element.child_elements() {
            apply_predicate(&mut filter, child)?;
        }
        filter.namespaces =
            strip_managed_namespaces(dedupe(element.all_declarations()), MANAGED_NAMESPACES);
        Ok(filter)
    }

    /// Read a `Filter` element nested in a request body.
    ///
    /// Prefixed declarations from `scope` (outermost first) that the filter
    /// uses in names or value references are kept with it, so the filter can
    /// be written on its own.
    pub fn from_scoped_element(element: &Element, scope: &[Attr]) -> Result<Filter, Exception> {
        let mut filter = Filter::from_element(element)?;

        let mut used = element.used_prefixes();
        collect_path_prefixes(element, &mut used);
        let declarations = scope
            .iter()
            .filter(|a| a.declared_prefix().is_some())
            .cloned();
        let inherited: Vec<Attr> = dedupe(declarations)
            .into_iter()
            .filter(|d| used.contains(&d.declared_prefix().map(str::to_string)))
            .collect();
        let inherited = strip_managed_namespaces(inherited, MANAGED_NAMESPACES);
        filter.namespaces = merge_managed(std::mem::take(&mut filter.namespaces), &inherited);
        Ok(filter)
    }

    /// `fes:Filter` element for embedding in a request body that declares
    /// the `fes` and `gml` prefixes itself.
    pub fn to_element(&self) -> Element {
        let mut root = Element::new("fes:Filter");
        root.attributes = self.namespaces.clone();
        write_predicates(self, &mut root);
        root
    }

    /// Standalone `fes:Filter` document declaring its own namespaces.
    pub fn to_xml_fragment(&self) -> String {
        let mut root = self.to_element();
        let managed = vec![
            Attr::namespace_declaration(Some("fes"), FES_NAMESPACE),
            Attr::namespace_declaration(Some("gml"), GML_NAMESPACE),
        ];
        root.attributes = merge_managed(managed, &self.namespaces);
        root.to_xml_string()
    }
}

/// Prefixes of the steps in every `ValueReference` below `element`.
fn collect_path_prefixes(element: &Element, used: &mut BTreeSet<Option<String>>) {
    if element.local_name() == "ValueReference" {
        for step in element.text().split('/') {
            let step = step.trim().trim_start_matches('@');
            if let Some((prefix, _)) = step.split_once(':') {
                used.insert(Some(prefix.to_string()));
            }
        }
    }
    for child in element.child_elements() {
        collect_path_prefixes(child, used);
    }
}

fn parsing_failed(detail: impl AsRef<str>) -> Exception {
    Exception::operation_parsing_failed(&[LOCATOR, detail.as_ref()])
}

fn apply_predicate(filter: &mut Filter, element: &Element) -> Result<(), Exception> {
    let name = element.local_name();
    match name {
        "And" | "Or" | "Not" => {
            if filter.logical.is_some() {
                return Err(parsing_failed(format!(
                    "{} cannot be combined with another logical operator",
                    name
                )));
            }
            filter.logical = Some(parse_logical(element)?);
        }
        "ResourceId" => {
            let rid = element
                .attribute("rid")
                .ok_or_else(|| parsing_failed("ResourceId without rid attribute"))?;
            filter.resource_ids.push(ResourceId::new(rid));
        }
        _ => {
            if let Some(comparison) = parse_comparison(element)? {
                filter.comparisons.push(comparison);
            } else if let Some(spatial) = parse_spatial(element)? {
                filter.spatials.push(spatial);
            } else {
                return Err(parsing_failed(format!("unknown predicate {}", element.name)));
            }
        }
    }
    Ok(())
}

fn parse_operand(element: &Element) -> Result<Filter, Exception> {
    let mut operand = Filter::default();
    apply_predicate(&mut operand, element)?;
    Ok(operand)
}

fn parse_logical(element: &Element) -> Result<LogicalOperator, Exception> {
    let mut operands = element
        .child_elements()
        .map(parse_operand)
        .collect::<Result<Vec<_>, _>>()?;

    match element.local_name() {
        "Not" => match (operands.pop(), operands.is_empty()) {
            (Some(operand), true) => Ok(LogicalOperator::Not(Box::new(operand))),
            _ => Err(parsing_failed("Not takes exactly one operand")),
        },
        name if operands.len() < 2 => Err(parsing_failed(format!(
            "{} takes at least two operands",
            name
        ))),
        "And" => Ok(LogicalOperator::And(operands)),
        _ => Ok(LogicalOperator::Or(operands)),
    }
}

fn parse_expression(element: &Element) -> Result<Expression, Exception> {
    match element.local_name() {
        "ValueReference" => Ok(Expression::ValueReference(element.text().trim().to_string())),
        "Literal" => {
            if element.child_elements().next().is_some() {
                return Err(parsing_failed("Literal values with nested elements are not supported"));
            }
            Ok(Expression::Literal(element.text()))
        }
        _ => Err(parsing_failed(format!("unsupported expression {}", element.name))),
    }
}

fn expressions<const N: usize>(element: &Element) -> Result<[Expression; N], Exception> {
    let parsed = element
        .child_elements()
        .map(parse_expression)
        .collect::<Result<Vec<_>, _>>()?;
    <[Expression; N]>::try_from(parsed).map_err(|found| {
        parsing_failed(format!(
            "{} takes {} expressions, found {}",
            element.local_name(),
            N,
            found.len()
        ))
    })
}

fn parse_match_case(element: &Element) -> Result<Option<bool>, Exception> {
    element
        .attribute("matchCase")
        .map(|value| match value.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(parsing_failed(format!("invalid matchCase {}", other))),
        })
        .transpose()
}

fn required_attribute<'a>(element: &'a Element, name: &str) -> Result<&'a str, Exception> {
    element.attribute(name).ok_or_else(|| {
        parsing_failed(format!("{} requires the {} attribute", element.local_name(), name))
    })
}

fn parse_comparison(element: &Element) -> Result<Option<ComparisonOperator>, Exception> {
    let name = element.local_name();
    if let Some(kind) = BinaryComparisonKind::from_element_name(name) {
        let [left, right] = expressions::<2>(element)?;
        let match_action = element
            .attribute("matchAction")
            .map(|value| {
                MatchAction::parse(value.trim())
                    .ok_or_else(|| parsing_failed(format!("invalid matchAction {}", value)))
            })
            .transpose()?;
        return Ok(Some(ComparisonOperator::Binary {
            kind,
            left,
            right,
            match_case: parse_match_case(element)?,
            match_action,
        }));
    }

    let comparison = match name {
        "PropertyIsLike" => {
            let [expression, pattern] = expressions::<2>(element)?;
            ComparisonOperator::Like {
                expression,
                pattern,
                wild_card: required_attribute(element, "wildCard")?.to_string(),
                single_char: required_attribute(element, "singleChar")?.to_string(),
                escape_char: required_attribute(element, "escapeChar")?.to_string(),
                match_case: parse_match_case(element)?,
            }
        }
        "PropertyIsNil" => {
            let [expression] = expressions::<1>(element)?;
            ComparisonOperator::Nil {
                expression,
                nil_reason: element.attribute("nilReason").map(str::to_string),
            }
        }
        "PropertyIsNull" => {
            let [expression] = expressions::<1>(element)?;
            ComparisonOperator::Null { expression }
        }
        "PropertyIsBetween" => {
            let expression = element
                .child_elements()
                .find(|e| !matches!(e.local_name(), "LowerBoundary" | "UpperBoundary"))
                .ok_or_else(|| parsing_failed("PropertyIsBetween without an expression"))
                .and_then(parse_expression)?;
            let boundary = |local: &str| -> Result<Expression, Exception> {
                let boundary = element.child(local).ok_or_else(|| {
                    parsing_failed(format!("PropertyIsBetween without {}", local))
                })?;
                let [value] = expressions::<1>(boundary)?;
                Ok(value)
            };
            ComparisonOperator::Between {
                expression,
                lower: boundary("LowerBoundary")?,
                upper: boundary("UpperBoundary")?,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(comparison))
}

fn parse_spatial(element: &Element) -> Result<Option<SpatialOperator>, Exception> {
    let name = element.local_name();
    let value_reference = element
        .child_text("ValueReference")
        .map(|path| path.trim().to_string());

    if name == "BBOX" {
        let envelope = element
            .child("Envelope")
            .ok_or_else(|| parsing_failed("BBOX requires a gml:Envelope"))?;
        return Ok(Some(SpatialOperator::BBox {
            value_reference,
            envelope: parse_envelope(envelope)?,
        }));
    }

    if let Some(kind) = SpatialKind::from_element_name(name) {
        return Ok(Some(SpatialOperator::Binary {
            kind,
            value_reference,
            geometry: parse_geometry(element)?,
        }));
    }

    if let Some(kind) = DistanceKind::from_element_name(name) {
        let distance = element
            .child("Distance")
            .ok_or_else(|| parsing_failed(format!("{} requires a Distance", name)))?;
        let value = distance
            .text()
            .trim()
            .parse::<f64>()
            .map_err(|_| parsing_failed(format!("invalid distance {}", distance.text())))?;
        return Ok(Some(SpatialOperator::Distance {
            kind,
            value_reference,
            geometry: parse_geometry(element)?,
            distance: Distance {
                value,
                uom: required_attribute(distance, "uom")?.to_string(),
            },
        }));
    }

    Ok(None)
}

fn parse_envelope(envelope: &Element) -> Result<BoundingBox, Exception> {
    let corner = |local: &str| -> Result<(f64, f64), Exception> {
        let text = envelope
            .child_text(local)
            .ok_or_else(|| parsing_failed(format!("Envelope without {}", local)))?;
        BoundingBox::parse_corner(&text).map_err(|err| parsing_failed(err.to_string()))
    };
    Ok(BoundingBox {
        lower_corner: corner("lowerCorner")?,
        upper_corner: corner("upperCorner")?,
        srs_name: envelope.attribute("srsName").map(str::to_string),
    })
}

fn parse_geometry(element: &Element) -> Result<Geometry, Exception> {
    element
        .child_elements()
        .find(|e| !matches!(e.local_name(), "ValueReference" | "Distance"))
        .map(|geometry| Geometry(geometry.to_xml_string()))
        .ok_or_else(|| parsing_failed(format!("{} requires a geometry", element.local_name())))
}

fn fes(local: &str) -> String {
    format!("fes:{}", local)
}

fn write_predicates(filter: &Filter, parent: &mut Element) {
    if let Some(logical) = &filter.logical {
        let mut element = Element::new(fes(logical.element_name()));
        match logical {
            LogicalOperator::And(operands) | LogicalOperator::Or(operands) => {
                for operand in operands {
                    write_predicates(operand, &mut element);
                }
            }
            LogicalOperator::Not(operand) => write_predicates(operand, &mut element),
        }
        parent.push(element);
    }
    for comparison in &filter.comparisons {
        parent.push(comparison_element(comparison));
    }
    for spatial in &filter.spatials {
        parent.push(spatial_element(spatial));
    }
    for resource_id in &filter.resource_ids {
        parent.push(Element::new("fes:ResourceId").attr(Attr::new("rid", resource_id.rid.clone())));
    }
}

fn expression_element(expression: &Expression) -> Element {
    match expression {
        Expression::ValueReference(path) => Element::with_text("fes:ValueReference", path.clone()),
        Expression::Literal(value) => Element::with_text("fes:Literal", value.clone()),
    }
}

fn bool_attribute(name: &str, value: bool) -> Attr {
    Attr::new(name, if value { "true" } else { "false" })
}

fn comparison_element(comparison: &ComparisonOperator) -> Element {
    let mut element = Element::new(fes(comparison.element_name()));
    match comparison {
        ComparisonOperator::Binary {
            left,
            right,
            match_case,
            match_action,
            ..
        } => {
            if let Some(match_case) = match_case {
                element.attributes.push(bool_attribute("matchCase", *match_case));
            }
            if let Some(match_action) = match_action {
                element.attributes.push(Attr::new("matchAction", match_action.as_str()));
            }
            element.push(expression_element(left));
            element.push(expression_element(right));
        }
        ComparisonOperator::Like {
            expression,
            pattern,
            wild_card,
            single_char,
            escape_char,
            match_case,
        } => {
            element.attributes.push(Attr::new("wildCard", wild_card.clone()));
            element.attributes.push(Attr::new("singleChar", single_char.clone()));
            element.attributes.push(Attr::new("escapeChar", escape_char.clone()));
            if let Some(match_case) = match_case {
                element.attributes.push(bool_attribute("matchCase", *match_case));
            }
            element.push(expression_element(expression));
            element.push(expression_element(pattern));
        }
        ComparisonOperator::Nil {
            expression,
            nil_reason,
        } => {
            if let Some(nil_reason) = nil_reason {
                element.attributes.push(Attr::new("nilReason", nil_reason.clone()));
            }
            element.push(expression_element(expression));
        }
        ComparisonOperator::Null { expression } => element.push(expression_element(expression)),
        ComparisonOperator::Between {
            expression,
            lower,
            upper,
        } => {
            element.push(expression_element(expression));
            let mut lower_boundary = Element::new("fes:LowerBoundary");
            lower_boundary.push(expression_element(lower));
            element.push(lower_boundary);
            let mut upper_boundary = Element::new("fes:UpperBoundary");
            upper_boundary.push(expression_element(upper));
            element.push(upper_boundary);
        }
    }
    element
}

fn envelope_element(envelope: &BoundingBox) -> Element {
    let mut element = Element::new("gml:Envelope");
    if let Some(srs_name) = &envelope.srs_name {
        element.attributes.push(Attr::new("srsName", srs_name.clone()));
    }
    element.push(Element::with_text(
        "gml:lowerCorner",
        BoundingBox::format_corner(envelope.lower_corner),
    ));
    element.push(Element::with_text(
        "gml:upperCorner",
        BoundingBox::format_corner(envelope.upper_corner),
    ));
    element
}

fn spatial_element(spatial: &SpatialOperator) -> Element {
    let mut element = Element::new(fes(spatial.element_name()));
    let value_reference = match spatial {
        SpatialOperator::BBox {
            value_reference, ..
        }
        | SpatialOperator::Binary {
            value_reference, ..
        }
        | SpatialOperator::Distance {
            value_reference, ..
        } => value_reference,
    };
    if let Some(path) = value_reference {
        element.push(Element::with_text("fes:ValueReference", path.clone()));
    }

    match spatial {
        SpatialOperator::BBox { envelope, .. } => element.push(envelope_element(envelope)),
        SpatialOperator::Binary { geometry, .. } => element.push_raw(geometry.0.clone()),
        SpatialOperator::Distance {
            geometry, distance, ..
        } => {
            element.push_raw(geometry.0.clone());
            element.push(
                Element::with_text("fes:Distance", distance.value.to_string())
                    .attr(Attr::new("uom", distance.uom.clone())),
            );
        }
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use ows_common::ExceptionCode;

    fn parse(fragment: &str) -> Filter {
        Filter::from_xml_fragment(fragment).unwrap()
    }

    #[test]
    fn test_parse_binary_comparison() {
        let filter = parse(
            r#"<Filter><PropertyIsLessThan matchAction="Any">
                 <ValueReference>area</ValueReference><Literal>10</Literal>
               </PropertyIsLessThan></Filter>"#,
        );
        assert_eq!(
            filter.comparisons,
            vec![ComparisonOperator::Binary {
                kind: BinaryComparisonKind::LessThan,
                left: Expression::ValueReference("area".to_string()),
                right: Expression::Literal("10".to_string()),
                match_case: None,
                match_action: Some(MatchAction::Any),
            }]
        );
    }

    #[test]
    fn test_parse_logical_nesting() {
        let filter = parse(test_utils::xml::FILTER);
        let Some(LogicalOperator::Or(operands)) = &filter.logical else {
            panic!("expected Or, got {:?}", filter.logical);
        };
        assert_eq!(operands.len(), 4);
        assert!(matches!(operands[1].logical, Some(LogicalOperator::Not(_))));
        assert!(matches!(
            operands[3].spatials[0],
            SpatialOperator::Distance {
                kind: DistanceKind::DWithin,
                ..
            }
        ));
    }

    #[test]
    fn test_resource_ids_keep_order_and_duplicates() {
        let filter = parse(test_utils::xml::RESOURCE_ID_FILTER);
        let rids: Vec<_> = filter.resource_ids.iter().map(|r| r.rid.as_str()).collect();
        assert_eq!(rids, vec!["one", "two", "one"]);
        assert_eq!(filter.comparisons.len(), 1);
    }

    #[test]
    fn test_bbox_envelope() {
        let filter = parse(
            r#"<fes:Filter xmlns:fes="http://www.opengis.net/fes/2.0" xmlns:gml="http://www.opengis.net/gml/3.2">
                 <fes:BBOX><gml:Envelope srsName="EPSG:4326">
                   <gml:lowerCorner>1 2</gml:lowerCorner><gml:upperCorner>3 4</gml:upperCorner>
                 </gml:Envelope></fes:BBOX></fes:Filter>"#,
        );
        let envelope = filter.as_plain_bbox().unwrap();
        assert_eq!(envelope.lower_corner, (1.0, 2.0));
        assert_eq!(envelope.upper_corner, (3.0, 4.0));
        assert_eq!(envelope.srs_name.as_deref(), Some("EPSG:4326"));
    }

    #[test]
    fn test_malformed_filter_is_no_applicable_code() {
        let err = Filter::from_xml_fragment("<Filter><And></Filter>").unwrap_err();
        assert_eq!(err.code, ExceptionCode::NoApplicableCode);
        assert_eq!(err.text, "Filter is not valid XML");
    }

    #[test]
    fn test_unknown_predicate_is_parsing_failure() {
        let err = Filter::from_xml_fragment("<Filter><PropertyIsSimilar/></Filter>").unwrap_err();
        assert_eq!(err.code, ExceptionCode::OperationParsingFailed);
        assert!(err.text.contains("PropertyIsSimilar"));
    }

    #[test]
    fn test_nested_literal_is_rejected() {
        let err = Filter::from_xml_fragment(
            "<Filter><PropertyIsEqualTo><ValueReference>a</ValueReference><Literal><b/></Literal></PropertyIsEqualTo></Filter>",
        )
        .unwrap_err();
        assert_eq!(err.code, ExceptionCode::OperationParsingFailed);
    }

    #[test]
    fn test_and_requires_two_operands() {
        let err = Filter::from_xml_fragment(
            "<Filter><And><PropertyIsNull><ValueReference>a</ValueReference></PropertyIsNull></And></Filter>",
        )
        .unwrap_err();
        assert_eq!(err.code, ExceptionCode::OperationParsingFailed);
    }

    #[test]
    fn test_wrong_root() {
        let err = Filter::from_xml_fragment("<Query/>").unwrap_err();
        assert_eq!(err.code, ExceptionCode::OperationParsingFailed);
    }

    #[test]
    fn test_fragment_declares_namespaces() {
        let filter = Filter::from_resource_ids(vec![ResourceId::new("a.1")]);
        assert_eq!(
            filter.to_xml_fragment(),
            r#"<fes:Filter xmlns:fes="http://www.opengis.net/fes/2.0" xmlns:gml="http://www.opengis.net/gml/3.2"><fes:ResourceId rid="a.1"/></fes:Filter>"#
        );
    }

    #[test]
    fn test_fragment_round_trip() {
        let filter = parse(test_utils::xml::FILTER);
        assert_eq!(parse(&filter.to_xml_fragment()), filter);
    }

    const FOREIGN_PREFIXES: &str = r#"<fes:Filter xmlns:fes="http://www.opengis.net/fes/2.0"
        xmlns:kad="http://kadaster.nl" xmlns:g="http://www.opengis.net/gml/3.2">
      <fes:Intersects>
        <fes:ValueReference>kad:geom</fes:ValueReference>
        <g:Point><g:pos>1 2</g:pos></g:Point>
      </fes:Intersects>
    </fes:Filter>"#;

    #[test]
    fn test_foreign_declarations_are_kept() {
        let filter = parse(FOREIGN_PREFIXES);
        assert_eq!(
            filter.namespaces,
            vec![
                Attr::qualified("xmlns", "kad", "http://kadaster.nl"),
                Attr::qualified("xmlns", "g", "http://www.opengis.net/gml/3.2"),
            ]
        );

        let fragment = filter.to_xml_fragment();
        assert!(fragment.starts_with(
            r#"<fes:Filter xmlns:fes="http://www.opengis.net/fes/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:kad="http://kadaster.nl" xmlns:g="http://www.opengis.net/gml/3.2">"#
        ));
        assert_eq!(parse(&fragment), filter);
    }

    #[test]
    fn test_nested_declarations_are_hoisted() {
        let filter = parse(
            r#"<Filter><PropertyIsNull xmlns:kad="http://kadaster.nl"><ValueReference>kad:eigenaar</ValueReference></PropertyIsNull></Filter>"#,
        );
        assert_eq!(
            filter.to_element().attributes,
            vec![Attr::qualified("xmlns", "kad", "http://kadaster.nl")]
        );
    }

    #[test]
    fn test_scoped_filter_keeps_used_outer_declarations() {
        let query = Element::parse(
            br#"<wfs:Query xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:kad="http://kadaster.nl" xmlns:bag="http://bag.nl" xmlns:g="http://www.opengis.net/gml/3.2">
              <Filter><Intersects><ValueReference>kad:perceel/@kad:geom</ValueReference><g:Point><g:pos>1 2</g:pos></g:Point></Intersects></Filter>
            </wfs:Query>"#,
        )
        .unwrap();
        let filter =
            Filter::from_scoped_element(query.child("Filter").unwrap(), &query.attributes).unwrap();
        assert_eq!(
            filter.namespaces,
            vec![
                Attr::qualified("xmlns", "kad", "http://kadaster.nl"),
                Attr::qualified("xmlns", "g", "http://www.opengis.net/gml/3.2"),
            ]
        );
        assert_eq!(parse(&filter.to_xml_fragment()), filter);
    }

    #[test]
    fn test_deep_nesting_is_parsing_failure() {
        let depth = 3000;
        let fragment = format!(
            "<Filter>{}<PropertyIsNull><ValueReference>a</ValueReference></PropertyIsNull>{}</Filter>",
            "<Not>".repeat(depth),
            "</Not>".repeat(depth)
        );
        let err = Filter::from_xml_fragment(&fragment).unwrap_err();
        assert_eq!(err.code, ExceptionCode::OperationParsingFailed);
        assert_eq!(err.locator.as_deref(), Some("Filter"));
    }

    #[test]
    fn test_literal_whitespace_is_kept() {
        let filter = parse(
            "<Filter><PropertyIsEqualTo><ValueReference> naam </ValueReference><Literal> a </Literal></PropertyIsEqualTo></Filter>",
        );
        let ComparisonOperator::Binary { left, right, .. } = &filter.comparisons[0] else {
            panic!("expected a binary comparison");
        };
        assert_eq!(left, &Expression::ValueReference("naam".to_string()));
        assert_eq!(right, &Expression::Literal(" a ".to_string()));
        assert!(filter.to_xml_fragment().contains("<fes:Literal> a </fes:Literal>"));
        assert_eq!(parse(&filter.to_xml_fragment()), filter);
    }

    #[test]
    fn test_geometry_is_carried_verbatim() {
        let filter = parse(test_utils::xml::FILTER);
        let Some(LogicalOperator::Or(operands)) = &filter.logical else {
            panic!("expected Or");
        };
        let SpatialOperator::Distance {
            geometry, distance, ..
        } = &operands[3].spatials[0]
        else {
            panic!("expected DWithin");
        };
        assert_eq!(
            geometry.0,
            r#"<gml:Point gml:id="p1" srsName="urn:ogc:def:crs:EPSG::4326"><gml:pos>52.1 5.3</gml:pos></gml:Point>"#
        );
        assert_eq!(distance.value, 250.0);
        assert_eq!(distance.uom, "m");
    }
}
