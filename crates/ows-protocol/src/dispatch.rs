//! Request identification and dispatch.
//!
//! The operation is taken from the KVP REQUEST parameter or from the local
//! name of the XML root element, then routed to its request model.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use ows_common::{Exception, Exceptions, KvpQuery, Service};

use crate::describefeaturetype::DescribeFeatureTypeRequest;
use crate::getcapabilities::GetCapabilitiesRequest;
use crate::getfeature::GetFeatureRequest;
use crate::getfeatureinfo::GetFeatureInfoRequest;
use crate::getmap::GetMapRequest;
use crate::request::{OgcRequest, RequestBase};
use crate::xml::Element;

/// Operations this crate models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    GetCapabilities,
    DescribeFeatureType,
    GetFeature,
    GetMap,
    GetFeatureInfo,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::GetCapabilities,
        Operation::DescribeFeatureType,
        Operation::GetFeature,
        Operation::GetMap,
        Operation::GetFeatureInfo,
    ];

    /// Resolve an operation name, ignoring case.
    pub fn dispatch(name: &str) -> Result<Operation, Exception> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|operation| operation.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Exception::operation_not_supported(&[name]))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::GetCapabilities => GetCapabilitiesRequest::OPERATION,
            Operation::DescribeFeatureType => DescribeFeatureTypeRequest::OPERATION,
            Operation::GetFeature => GetFeatureRequest::OPERATION,
            Operation::GetMap => GetMapRequest::OPERATION,
            Operation::GetFeatureInfo => GetFeatureInfoRequest::OPERATION,
        }
    }

    /// Service the operation belongs to; GetCapabilities belongs to both.
    pub fn service(&self) -> Option<Service> {
        match self {
            Operation::GetCapabilities => None,
            Operation::DescribeFeatureType | Operation::GetFeature => Some(Service::Wfs),
            Operation::GetMap | Operation::GetFeatureInfo => Some(Service::Wms),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Local name of the document's root element, empty when the bytes are not
/// XML.
pub fn identify_xml(document: &[u8]) -> String {
    match Element::root_name(document) {
        Ok(name) => name,
        Err(err) => {
            debug!(error = %err, "could not identify XML request");
            String::new()
        }
    }
}

/// The REQUEST parameter.
pub fn identify_kvp(query: &KvpQuery) -> Result<String, Exception> {
    query
        .get("REQUEST")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Exception::missing_parameter_value(&["REQUEST"]))
}

/// Flavour of exception report to answer a KVP request with.
///
/// SERVICE decides when it names a known service, then the operation's own
/// service; WFS otherwise.
pub fn report_service(query: &KvpQuery) -> Service {
    if let Some(service) = query.get("SERVICE").and_then(Service::from_name) {
        return service;
    }
    identify_kvp(query)
        .ok()
        .and_then(|name| Operation::dispatch(&name).ok())
        .and_then(|operation| operation.service())
        .unwrap_or(Service::Wfs)
}

/// Any modelled request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OgcRequestKind {
    GetCapabilities(GetCapabilitiesRequest),
    DescribeFeatureType(DescribeFeatureTypeRequest),
    GetFeature(GetFeatureRequest),
    GetMap(GetMapRequest),
    GetFeatureInfo(GetFeatureInfoRequest),
}

impl OgcRequestKind {
    #[instrument(skip_all)]
    pub fn from_kvp(query: &KvpQuery) -> Result<Self, Exceptions> {
        let name = identify_kvp(query)?;
        let operation = Operation::dispatch(&name)?;
        debug!(operation = %operation, "dispatching KVP request");

        Ok(match operation {
            Operation::GetCapabilities => {
                OgcRequestKind::GetCapabilities(GetCapabilitiesRequest::from_kvp(query)?)
            }
            Operation::DescribeFeatureType => {
                OgcRequestKind::DescribeFeatureType(DescribeFeatureTypeRequest::from_kvp(query)?)
            }
            Operation::GetFeature => OgcRequestKind::GetFeature(GetFeatureRequest::from_kvp(query)?),
            Operation::GetMap => OgcRequestKind::GetMap(GetMapRequest::from_kvp(query)?),
            Operation::GetFeatureInfo => {
                OgcRequestKind::GetFeatureInfo(GetFeatureInfoRequest::from_kvp(query)?)
            }
        })
    }

    #[instrument(skip_all)]
    pub fn from_xml(document: &[u8]) -> Result<Self, Exceptions> {
        let name = identify_xml(document);
        if name.is_empty() {
            return Err(Exception::no_applicable_code(&["Could not process XML, is it XML?"]).into());
        }
        let operation = Operation::dispatch(&name)?;
        debug!(operation = %operation, bytes = document.len(), "dispatching XML request");

        Ok(match operation {
            Operation::GetCapabilities => {
                OgcRequestKind::GetCapabilities(GetCapabilitiesRequest::from_xml(document)?)
            }
            Operation::DescribeFeatureType => {
                OgcRequestKind::DescribeFeatureType(DescribeFeatureTypeRequest::from_xml(document)?)
            }
            Operation::GetFeature => {
                OgcRequestKind::GetFeature(GetFeatureRequest::from_xml(document)?)
            }
            Operation::GetMap => OgcRequestKind::GetMap(GetMapRequest::from_xml(document)?),
            Operation::GetFeatureInfo => {
                OgcRequestKind::GetFeatureInfo(GetFeatureInfoRequest::from_xml(document)?)
            }
        })
    }

    pub fn operation(&self) -> Operation {
        match self {
            OgcRequestKind::GetCapabilities(_) => Operation::GetCapabilities,
            OgcRequestKind::DescribeFeatureType(_) => Operation::DescribeFeatureType,
            OgcRequestKind::GetFeature(_) => Operation::GetFeature,
            OgcRequestKind::GetMap(_) => Operation::GetMap,
            OgcRequestKind::GetFeatureInfo(_) => Operation::GetFeatureInfo,
        }
    }

    pub fn base(&self) -> &RequestBase {
        match self {
            OgcRequestKind::GetCapabilities(request) => request.base(),
            OgcRequestKind::DescribeFeatureType(request) => request.base(),
            OgcRequestKind::GetFeature(request) => request.base(),
            OgcRequestKind::GetMap(request) => request.base(),
            OgcRequestKind::GetFeatureInfo(request) => request.base(),
        }
    }

    pub fn to_kvp(&self) -> KvpQuery {
        match self {
            OgcRequestKind::GetCapabilities(request) => request.to_kvp(),
            OgcRequestKind::DescribeFeatureType(request) => request.to_kvp(),
            OgcRequestKind::GetFeature(request) => request.to_kvp(),
            OgcRequestKind::GetMap(request) => request.to_kvp(),
            OgcRequestKind::GetFeatureInfo(request) => request.to_kvp(),
        }
    }

    pub fn to_xml(&self) -> String {
        match self {
            OgcRequestKind::GetCapabilities(request) => request.to_xml(),
            OgcRequestKind::DescribeFeatureType(request) => request.to_xml(),
            OgcRequestKind::GetFeature(request) => request.to_xml(),
            OgcRequestKind::GetMap(request) => request.to_xml(),
            OgcRequestKind::GetFeatureInfo(request) => request.to_xml(),
        }
    }
}
