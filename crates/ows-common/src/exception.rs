//! OGC exception taxonomy and exception report serialization.
//!
//! Every parsing step reports problems as [`Exception`] values collected into
//! [`Exceptions`]. A non-empty list is turned into an [`ExceptionReport`] at
//! the edge of the system; the report version is always the service's own
//! version constant, never the version found in the request.

use std::fmt;

use quick_xml::escape::escape;
use serde::Serialize;
use thiserror::Error;

use crate::namespaces::{
    Service, OGC_NAMESPACE, OWS_EXCEPTION_SCHEMA, OWS_NAMESPACE, WMS_EXCEPTION_SCHEMA,
    XSI_NAMESPACE,
};

/// Exception codes defined by OWS Common, WFS 2.0 and WMS 1.3.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExceptionCode {
    // === OWS Common ===
    MissingParameterValue,
    InvalidParameterValue,
    NoApplicableCode,
    OperationNotSupported,
    VersionNegotiationFailed,
    OptionNotSupported,
    InvalidUpdateSequence,

    // === WFS 2.0 ===
    InvalidValue,
    CannotLockAllFeatures,
    DuplicateStoredQueryIdValue,
    DuplicateStoredQueryParameterName,
    FeaturesNotLocked,
    InvalidLockId,
    LockHasExpired,
    OperationParsingFailed,
    OperationProcessingFailed,
    ResponseCacheExpired,

    // === WMS 1.3.0 ===
    InvalidFormat,
    InvalidCrs,
    LayerNotDefined,
    StyleNotDefined,
    LayerNotQueryable,
    InvalidPoint,
    CurrentUpdateSequence,
    MissingDimensionValue,
    InvalidDimensionValue,
}

impl ExceptionCode {
    /// The code string as the OGC exception schemas spell it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionCode::MissingParameterValue => "MissingParameterValue",
            ExceptionCode::InvalidParameterValue => "InvalidParameterValue",
            ExceptionCode::NoApplicableCode => "NoApplicableCode",
            ExceptionCode::OperationNotSupported => "OperationNotSupported",
            ExceptionCode::VersionNegotiationFailed => "VersionNegotiationFailed",
            ExceptionCode::OptionNotSupported => "OptionNotSupported",
            ExceptionCode::InvalidUpdateSequence => "InvalidUpdateSequence",
            ExceptionCode::InvalidValue => "InvalidValue",
            ExceptionCode::CannotLockAllFeatures => "CannotLockAllFeatures",
            ExceptionCode::DuplicateStoredQueryIdValue => "DuplicateStoredQueryIdValue",
            ExceptionCode::DuplicateStoredQueryParameterName => {
                "DuplicateStoredQueryParameterName"
            }
            ExceptionCode::FeaturesNotLocked => "FeaturesNotLocked",
            ExceptionCode::InvalidLockId => "InvalidLockId",
            ExceptionCode::LockHasExpired => "LockHasExpired",
            ExceptionCode::OperationParsingFailed => "OperationParsingFailed",
            ExceptionCode::OperationProcessingFailed => "OperationProcessingFailed",
            ExceptionCode::ResponseCacheExpired => "ResponseCacheExpired",
            ExceptionCode::InvalidFormat => "InvalidFormat",
            ExceptionCode::InvalidCrs => "InvalidCRS",
            ExceptionCode::LayerNotDefined => "LayerNotDefined",
            ExceptionCode::StyleNotDefined => "StyleNotDefined",
            ExceptionCode::LayerNotQueryable => "LayerNotQueryable",
            ExceptionCode::InvalidPoint => "InvalidPoint",
            ExceptionCode::CurrentUpdateSequence => "CurrentUpdateSequence",
            ExceptionCode::MissingDimensionValue => "MissingDimensionValue",
            ExceptionCode::InvalidDimensionValue => "InvalidDimensionValue",
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single OGC exception: code, human readable text and optional locator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{code}: {text}")]
pub struct Exception {
    pub code: ExceptionCode,
    pub text: String,
    pub locator: Option<String>,
}

impl Exception {
    pub fn new(code: ExceptionCode, text: impl Into<String>, locator: Option<&str>) -> Self {
        Self {
            code,
            text: text.into(),
            locator: locator.map(str::to_string),
        }
    }

    /// `[]` generic, `[key]` missing key, `[key, value]` key with unusable value.
    pub fn missing_parameter_value(args: &[&str]) -> Self {
        let code = ExceptionCode::MissingParameterValue;
        match args {
            [] => Self::new(code, "Missing parameter value", None),
            [key] => Self::new(code, format!("Missing key: {}", key), Some(*key)),
            [key, value, ..] => Self::new(
                code,
                format!("{} key got incorrect value: {}", key, value),
                Some(*key),
            ),
        }
    }

    /// `[key, value]`: the value given for `key` is not acceptable.
    pub fn invalid_parameter_value(args: &[&str]) -> Self {
        Self::invalid(ExceptionCode::InvalidParameterValue, args)
    }

    /// WFS flavour of [`Exception::invalid_parameter_value`].
    pub fn invalid_value(args: &[&str]) -> Self {
        Self::invalid(ExceptionCode::InvalidValue, args)
    }

    fn invalid(code: ExceptionCode, args: &[&str]) -> Self {
        match args {
            [] => Self::new(code, "Invalid parameter value", None),
            [key] => Self::new(code, format!("{} contains an invalid value", key), Some(*key)),
            [key, value, ..] => Self::new(
                code,
                format!("{} contains an invalid value: {}", key, value),
                Some(*key),
            ),
        }
    }

    pub fn no_applicable_code(args: &[&str]) -> Self {
        let code = ExceptionCode::NoApplicableCode;
        match args {
            [] => Self::new(code, "No applicable code", None),
            [message, ..] => Self::new(code, *message, None),
        }
    }

    pub fn operation_not_supported(args: &[&str]) -> Self {
        let code = ExceptionCode::OperationNotSupported;
        match args {
            [] => Self::new(code, "Operation not supported", None),
            [operation, ..] => Self::new(
                code,
                format!("This service does not know the operation: {}", operation),
                Some(*operation),
            ),
        }
    }

    pub fn version_negotiation_failed(args: &[&str]) -> Self {
        let code = ExceptionCode::VersionNegotiationFailed;
        match args {
            [] => Self::new(code, "Version negotiation failed", Some("VERSION")),
            [version, ..] => Self::new(
                code,
                format!("{} is an invalid version number", version),
                Some("VERSION"),
            ),
        }
    }

    pub fn option_not_supported(args: &[&str]) -> Self {
        let code = ExceptionCode::OptionNotSupported;
        match args {
            [] => Self::new(code, "Option not supported", None),
            [option] => Self::new(
                code,
                format!("The option {} is not supported by this service", option),
                Some(*option),
            ),
            [option, detail, ..] => Self::new(
                code,
                format!("The option {} is not supported: {}", option, detail),
                Some(*option),
            ),
        }
    }

    pub fn invalid_update_sequence(_args: &[&str]) -> Self {
        Self::new(
            ExceptionCode::InvalidUpdateSequence,
            "Value of (optional) updateSequence parameter is greater than the current value of the service metadata updateSequence number",
            Some("updateSequence"),
        )
    }

    // === WFS ===

    pub fn cannot_lock_all_features(_args: &[&str]) -> Self {
        Self::new(
            ExceptionCode::CannotLockAllFeatures,
            "A locking request with a lockAction of ALL failed to lock all the requested features",
            None,
        )
    }

    pub fn duplicate_stored_query_id_value(args: &[&str]) -> Self {
        let code = ExceptionCode::DuplicateStoredQueryIdValue;
        match args {
            [] => Self::new(code, "The identifier of the stored query is a duplicate", None),
            [id, ..] => Self::new(
                code,
                format!("The identifier {} of the stored query is a duplicate", id),
                Some(*id),
            ),
        }
    }

    pub fn duplicate_stored_query_parameter_name(args: &[&str]) -> Self {
        let code = ExceptionCode::DuplicateStoredQueryParameterName;
        match args {
            [] => Self::new(code, "The stored query parameter name is a duplicate", None),
            [name, ..] => Self::new(
                code,
                format!("The stored query parameter name {} is a duplicate", name),
                Some(*name),
            ),
        }
    }

    pub fn features_not_locked(_args: &[&str]) -> Self {
        Self::new(
            ExceptionCode::FeaturesNotLocked,
            "The features to be modified were not previously locked",
            None,
        )
    }

    pub fn invalid_lock_id(args: &[&str]) -> Self {
        let code = ExceptionCode::InvalidLockId;
        match args {
            [] => Self::new(code, "The lock identifier is not known", None),
            [id, ..] => Self::new(
                code,
                format!("The lock identifier {} is not known", id),
                Some(*id),
            ),
        }
    }

    pub fn lock_has_expired(_args: &[&str]) -> Self {
        Self::new(
            ExceptionCode::LockHasExpired,
            "The specified lock has expired",
            None,
        )
    }

    /// `[locator, detail]`: the request could not be parsed.
    pub fn operation_parsing_failed(args: &[&str]) -> Self {
        let code = ExceptionCode::OperationParsingFailed;
        match args {
            [] => Self::new(code, "The request is badly formed and failed to be parsed", None),
            [locator] => Self::new(
                code,
                format!("Failed to parse {}", locator),
                Some(*locator),
            ),
            [locator, detail, ..] => Self::new(
                code,
                format!("Failed to parse {}: {}", locator, detail),
                Some(*locator),
            ),
        }
    }

    pub fn operation_processing_failed(args: &[&str]) -> Self {
        let code = ExceptionCode::OperationProcessingFailed;
        match args {
            [] => Self::new(code, "Error encountered while processing the request", None),
            [detail, ..] => Self::new(code, *detail, None),
        }
    }

    pub fn response_cache_expired(_args: &[&str]) -> Self {
        Self::new(
            ExceptionCode::ResponseCacheExpired,
            "The response cache used to support paging has expired",
            None,
        )
    }

    // === WMS ===

    pub fn invalid_format(args: &[&str]) -> Self {
        let code = ExceptionCode::InvalidFormat;
        match args {
            [] => Self::new(code, "Request contains a Format not offered by the server", Some("FORMAT")),
            [format, ..] => Self::new(
                code,
                format!("Request contains a Format not offered by the server: {}", format),
                Some("FORMAT"),
            ),
        }
    }

    pub fn invalid_crs(args: &[&str]) -> Self {
        let code = ExceptionCode::InvalidCrs;
        match args {
            [] => Self::new(code, "Request contains a CRS not offered by the server", Some("CRS")),
            [crs] => Self::new(
                code,
                format!("CRS is not known by this service: {}", crs),
                Some("CRS"),
            ),
            [crs, layer, ..] => Self::new(
                code,
                format!("CRS {} is not known for the layer: {}", crs, layer),
                Some("CRS"),
            ),
        }
    }

    pub fn layer_not_defined(args: &[&str]) -> Self {
        let code = ExceptionCode::LayerNotDefined;
        match args {
            [] => Self::new(code, "The requested layer is not defined", Some("LAYERS")),
            [layer, ..] => Self::new(
                code,
                format!("The layer: {} is not known by the server", layer),
                Some("LAYERS"),
            ),
        }
    }

    /// `[]` layer/style count mismatch, `[style, layer]` unknown style.
    pub fn style_not_defined(args: &[&str]) -> Self {
        let code = ExceptionCode::StyleNotDefined;
        match args {
            [] => Self::new(
                code,
                "There is a one-to-one correspondence between the values in the LAYERS parameter and the values in the STYLES parameter. Expecting an empty string for the STYLES like STYLES= or comma-separated list STYLES=,,, or using keyword default STYLES=default,default,...",
                Some("STYLES"),
            ),
            [style] => Self::new(
                code,
                format!("The style: {} is not known by the server", style),
                Some("STYLES"),
            ),
            [style, layer, ..] => Self::new(
                code,
                format!("The style: {} is not known by the server for the layer: {}", style, layer),
                Some("STYLES"),
            ),
        }
    }

    pub fn layer_not_queryable(args: &[&str]) -> Self {
        let code = ExceptionCode::LayerNotQueryable;
        match args {
            [] => Self::new(code, "The layer is not queryable", Some("QUERY_LAYERS")),
            [layer, ..] => Self::new(
                code,
                format!("Layer: {} is not queryable", layer),
                Some("QUERY_LAYERS"),
            ),
        }
    }

    /// `[i, j]`: the pixel coordinates are not usable.
    pub fn invalid_point(args: &[&str]) -> Self {
        let code = ExceptionCode::InvalidPoint;
        match args {
            [] => Self::new(code, "The parameters I and J are invalid", Some("I")),
            [i] => Self::new(
                code,
                format!("The parameters I and J are invalid, given: {}", i),
                Some("I"),
            ),
            [i, j, ..] => Self::new(
                code,
                format!("The parameters I and J are invalid, given: {}, {}", i, j),
                Some("I"),
            ),
        }
    }

    pub fn current_update_sequence(_args: &[&str]) -> Self {
        Self::new(
            ExceptionCode::CurrentUpdateSequence,
            "Value of (optional) UpdateSequence parameter in GetCapabilities operation request is equal to current value of service metadata update sequence number",
            Some("UPDATESEQUENCE"),
        )
    }

    pub fn missing_dimension_value(args: &[&str]) -> Self {
        let code = ExceptionCode::MissingDimensionValue;
        match args {
            [] => Self::new(code, "Request does not include a sample dimension value", None),
            [dimension, ..] => Self::new(
                code,
                format!("Request does not include a sample dimension value for {}", dimension),
                Some(*dimension),
            ),
        }
    }

    pub fn invalid_dimension_value(args: &[&str]) -> Self {
        let code = ExceptionCode::InvalidDimensionValue;
        match args {
            [] => Self::new(code, "Request contains an invalid sample dimension value", None),
            [dimension] => Self::new(
                code,
                format!("Request contains an invalid sample dimension value for {}", dimension),
                Some(*dimension),
            ),
            [dimension, value, ..] => Self::new(
                code,
                format!("The value {} is not valid for the dimension {}", value, dimension),
                Some(*dimension),
            ),
        }
    }
}

/// Ordered collection of exceptions gathered while handling one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Exceptions(Vec<Exception>);

impl Exceptions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, exception: Exception) {
        self.0.push(exception);
    }

    pub fn extend(&mut self, other: Exceptions) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Exception> {
        self.0.iter()
    }

    /// Whether any collected exception carries `code`.
    pub fn contains_code(&self, code: ExceptionCode) -> bool {
        self.0.iter().any(|e| e.code == code)
    }

    /// `Ok(())` when nothing was collected, otherwise the list itself.
    pub fn into_result(self) -> Result<(), Exceptions> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Wrap the list in a report for `service`.
    ///
    /// Returns `None` for an empty list; an empty report is never produced.
    pub fn to_report(&self, service: Service) -> Option<ExceptionReport> {
        if self.is_empty() {
            return None;
        }
        Some(ExceptionReport {
            service,
            language: "en".to_string(),
            exceptions: self.clone(),
        })
    }
}

impl From<Exception> for Exceptions {
    fn from(exception: Exception) -> Self {
        Self(vec![exception])
    }
}

impl From<Vec<Exception>> for Exceptions {
    fn from(exceptions: Vec<Exception>) -> Self {
        Self(exceptions)
    }
}

impl IntoIterator for Exceptions {
    type Item = Exception;
    type IntoIter = std::vec::IntoIter<Exception>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Exceptions {
    type Item = &'a Exception;
    type IntoIter = std::slice::Iter<'a, Exception>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Exceptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, exception) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", exception)?;
        }
        Ok(())
    }
}

/// Exception report document for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionReport {
    pub service: Service,
    pub language: String,
    pub exceptions: Exceptions,
}

impl ExceptionReport {
    /// Report version: the service's fixed version.
    pub fn version(&self) -> &'static str {
        self.service.version()
    }

    /// Serialize the report.
    ///
    /// WFS uses the OWS 1.1 `ows:ExceptionReport`, WMS the
    /// `ServiceExceptionReport` from the WMS 1.3.0 exception schema.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        match self.service {
            Service::Wfs => {
                xml.push_str(&format!(
                    r#"<ows:ExceptionReport xmlns:ows="{}" xmlns:xsi="{}" xsi:schemaLocation="{}" version="{}" xml:lang="{}">"#,
                    OWS_NAMESPACE,
                    XSI_NAMESPACE,
                    OWS_EXCEPTION_SCHEMA,
                    self.version(),
                    escape(&self.language)
                ));
                xml.push('\n');
                for exception in &self.exceptions {
                    xml.push_str(&format!(
                        "  <ows:Exception exceptionCode=\"{}\"{}>\n",
                        exception.code,
                        locator_attribute(exception)
                    ));
                    xml.push_str(&format!(
                        "    <ows:ExceptionText>{}</ows:ExceptionText>\n",
                        escape(&exception.text)
                    ));
                    xml.push_str("  </ows:Exception>\n");
                }
                xml.push_str("</ows:ExceptionReport>");
            }
            Service::Wms => {
                xml.push_str(&format!(
                    r#"<ServiceExceptionReport xmlns="{}" xmlns:xsi="{}" xsi:schemaLocation="{}" version="{}" xml:lang="{}">"#,
                    OGC_NAMESPACE,
                    XSI_NAMESPACE,
                    WMS_EXCEPTION_SCHEMA,
                    self.version(),
                    escape(&self.language)
                ));
                xml.push('\n');
                for exception in &self.exceptions {
                    xml.push_str(&format!(
                        "  <ServiceException code=\"{}\"{}>{}</ServiceException>\n",
                        exception.code,
                        locator_attribute(exception),
                        escape(&exception.text)
                    ));
                }
                xml.push_str("</ServiceExceptionReport>");
            }
        }
        xml
    }
}

fn locator_attribute(exception: &Exception) -> String {
    match &exception.locator {
        Some(locator) => format!(" locator=\"{}\"", escape(locator)),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_value_templates() {
        let generic = Exception::missing_parameter_value(&[]);
        assert_eq!(generic.code, ExceptionCode::MissingParameterValue);
        assert_eq!(generic.locator, None);

        let key = Exception::missing_parameter_value(&["VERSION"]);
        assert_eq!(key.text, "Missing key: VERSION");
        assert_eq!(key.locator.as_deref(), Some("VERSION"));

        let value = Exception::missing_parameter_value(&["BBOX", "1,2,3"]);
        assert_eq!(value.text, "BBOX key got incorrect value: 1,2,3");
    }

    #[test]
    fn test_code_strings_match_ogc() {
        assert_eq!(ExceptionCode::InvalidCrs.as_str(), "InvalidCRS");
        assert_eq!(ExceptionCode::StyleNotDefined.as_str(), "StyleNotDefined");
        assert_eq!(
            ExceptionCode::OperationParsingFailed.to_string(),
            "OperationParsingFailed"
        );
    }

    #[test]
    fn test_exception_display() {
        let exception = Exception::operation_not_supported(&["GetTile"]);
        assert_eq!(
            exception.to_string(),
            "OperationNotSupported: This service does not know the operation: GetTile"
        );
    }

    #[test]
    fn test_empty_exceptions_never_become_a_report() {
        assert!(Exceptions::new().to_report(Service::Wfs).is_none());
    }

    #[test]
    fn test_wfs_report_xml() {
        let exceptions = Exceptions::from(Exception::missing_parameter_value(&["VERSION"]));
        let xml = exceptions.to_report(Service::Wfs).unwrap().to_xml();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<ows:ExceptionReport"));
        assert!(xml.contains(r#"version="2.0.0""#));
        assert!(xml.contains(r#"xml:lang="en""#));
        assert!(xml.contains(r#"exceptionCode="MissingParameterValue" locator="VERSION""#));
        assert!(xml.contains("<ows:ExceptionText>Missing key: VERSION</ows:ExceptionText>"));
    }

    #[test]
    fn test_wms_report_xml_escapes_text() {
        let exceptions = Exceptions::from(Exception::no_applicable_code(&["a < b & c"]));
        let xml = exceptions.to_report(Service::Wms).unwrap().to_xml();

        assert!(xml.contains("<ServiceExceptionReport"));
        assert!(xml.contains(r#"version="1.3.0""#));
        assert!(xml.contains(r#"<ServiceException code="NoApplicableCode">a &lt; b &amp; c</ServiceException>"#));
    }

    #[test]
    fn test_into_result() {
        assert!(Exceptions::new().into_result().is_ok());
        let err = Exceptions::from(Exception::invalid_point(&["-1", "2"]))
            .into_result()
            .unwrap_err();
        assert!(err.contains_code(ExceptionCode::InvalidPoint));
    }
}
