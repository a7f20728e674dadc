//! Service identifiers, versions and namespace URIs.
//!
//! Everything here is constant data; nothing is configured at runtime.

use serde::{Deserialize, Serialize};

/// WFS version handled by the request models.
pub const WFS_VERSION: &str = "2.0.0";

/// WMS version handled by the request models.
pub const WMS_VERSION: &str = "1.3.0";

pub const WFS_NAMESPACE: &str = "http://www.opengis.net/wfs/2.0";
pub const FES_NAMESPACE: &str = "http://www.opengis.net/fes/2.0";
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml/3.2";
pub const OWS_NAMESPACE: &str = "http://www.opengis.net/ows/1.1";
pub const OGC_NAMESPACE: &str = "http://www.opengis.net/ogc";
pub const WMS_NAMESPACE: &str = "http://www.opengis.net/wms";
pub const SLD_NAMESPACE: &str = "http://www.opengis.net/sld";
pub const SE_NAMESPACE: &str = "http://www.opengis.net/se";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Schema location of the OWS 1.1 exception report.
pub const OWS_EXCEPTION_SCHEMA: &str =
    "http://www.opengis.net/ows/1.1 http://schemas.opengis.net/ows/1.1.0/owsExceptionReport.xsd";

/// Schema location of the WMS 1.3.0 service exception report.
pub const WMS_EXCEPTION_SCHEMA: &str =
    "http://www.opengis.net/ogc http://schemas.opengis.net/wms/1.3.0/exceptions_1_3_0.xsd";

/// Default DescribeFeatureType output format (GML 3.2 media type).
pub const GML32_OUTPUT_FORMAT: &str = "application/gml+xml; version=3.2";

/// Namespaces the request models declare themselves when writing XML,
/// with the prefix each is written under.
///
/// Declarations binding one of these URIs to its usual prefix, or as the
/// default namespace, are dropped from pass-through attributes on input so
/// they are not echoed twice. Other prefixes for the same URI are kept since
/// carried content may still use them.
pub const MANAGED_NAMESPACES: &[(&str, &str)] = &[
    ("wfs", WFS_NAMESPACE),
    ("fes", FES_NAMESPACE),
    ("gml", GML_NAMESPACE),
    ("ows", OWS_NAMESPACE),
    ("ogc", OGC_NAMESPACE),
    ("wms", WMS_NAMESPACE),
    ("sld", SLD_NAMESPACE),
    ("se", SE_NAMESPACE),
];

/// OGC service family a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    Wfs,
    Wms,
}

impl Service {
    /// Parse a SERVICE value (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "WFS" => Some(Service::Wfs),
            "WMS" => Some(Service::Wms),
            _ => None,
        }
    }

    /// Canonical SERVICE value.
    pub fn name(&self) -> &'static str {
        match self {
            Service::Wfs => "WFS",
            Service::Wms => "WMS",
        }
    }

    /// The single protocol version supported for this service.
    pub fn version(&self) -> &'static str {
        match self {
            Service::Wfs => WFS_VERSION,
            Service::Wms => WMS_VERSION,
        }
    }

    /// Default namespace of request documents for this service.
    pub fn namespace(&self) -> &'static str {
        match self {
            Service::Wfs => WFS_NAMESPACE,
            Service::Wms => WMS_NAMESPACE,
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_from_name_is_case_insensitive() {
        assert_eq!(Service::from_name("wfs"), Some(Service::Wfs));
        assert_eq!(Service::from_name("Wms"), Some(Service::Wms));
        assert_eq!(Service::from_name("WCS"), None);
    }

    #[test]
    fn test_service_versions() {
        assert_eq!(Service::Wfs.version(), "2.0.0");
        assert_eq!(Service::Wms.version(), "1.3.0");
    }
}
