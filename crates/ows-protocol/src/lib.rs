//! OGC WFS 2.0 and WMS 1.3.0 request translation.
//!
//! Supports:
//! - WFS GetFeature and DescribeFeatureType
//! - WMS GetMap and GetFeatureInfo
//! - GetCapabilities for both services
//! - FES 2.0 filters and sorting
//!
//! Every request reads from and writes to both the KVP and the XML encoding.

pub mod describefeaturetype;
pub mod dispatch;
pub mod filter;
pub mod getcapabilities;
pub mod getfeature;
pub mod getfeatureinfo;
pub mod getmap;
pub mod request;
pub mod xml;

pub use describefeaturetype::DescribeFeatureTypeRequest;
pub use dispatch::{identify_kvp, identify_xml, report_service, OgcRequestKind, Operation};
pub use filter::{Filter, ResourceId, SortBy, SortOrder, SortProperty};
pub use getcapabilities::GetCapabilitiesRequest;
pub use getfeature::{GetFeatureRequest, Query, ResultType};
pub use getfeatureinfo::{GetFeatureInfoRequest, InfoFormat};
pub use getmap::{GetMapRequest, Output, Size, StyledLayer};
pub use request::{namespaces_from_kvp, namespaces_to_kvp, OgcRequest, RequestBase};
pub use xml::{Element, XmlError};
