//! JSON shape of collected exceptions and exception reports.

use ows_common::{Exception, ExceptionCode, Exceptions, Service};
use serde_json::json;

fn collected() -> Exceptions {
    let mut exceptions = Exceptions::new();
    exceptions.push(Exception::missing_parameter_value(&["TYPENAMES"]));
    exceptions.push(Exception::new(
        ExceptionCode::InvalidParameterValue,
        "COUNT must be a non-negative integer",
        Some("COUNT"),
    ));
    exceptions.push(Exception::new(ExceptionCode::NoApplicableCode, "no locator", None));
    exceptions
}

// ============================================================================
// Exceptions
// ============================================================================

#[test]
fn test_exceptions_serialize_as_ordered_array() {
    let exceptions = collected();
    let value = serde_json::to_value(&exceptions).unwrap();

    let items = value.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["code"], "MissingParameterValue");
    assert_eq!(items[0]["locator"], "TYPENAMES");
    assert_eq!(
        items[0]["text"],
        exceptions.iter().next().unwrap().text.as_str()
    );
    assert_eq!(
        items[1],
        json!({
            "code": "InvalidParameterValue",
            "text": "COUNT must be a non-negative integer",
            "locator": "COUNT",
        })
    );
    assert!(items[2]["locator"].is_null());
}

#[test]
fn test_empty_exceptions_serialize_as_empty_array() {
    assert_eq!(serde_json::to_value(Exceptions::new()).unwrap(), json!([]));
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn test_report_json_shape() {
    let report = collected().to_report(Service::Wfs).unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["service"], "Wfs");
    assert_eq!(value["language"], "en");
    assert_eq!(value["exceptions"].as_array().unwrap().len(), 3);
    assert_eq!(value["exceptions"][1]["code"], "InvalidParameterValue");
    assert_eq!(value.as_object().unwrap().len(), 3);
}

#[test]
fn test_report_json_keeps_service() {
    let report = collected().to_report(Service::Wms).unwrap();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["service"], "Wms");
}
