//! Types shared by the OGC request models: the OWS exception taxonomy, the
//! KVP parameter parser, XML attribute pass-through and bounding boxes.

pub mod attributes;
pub mod bbox;
pub mod exception;
pub mod kvp;
pub mod namespaces;

pub use attributes::Attr;
pub use bbox::{BboxParseError, BoundingBox};
pub use exception::{Exception, ExceptionCode, ExceptionReport, Exceptions};
pub use kvp::{parse_parameters, KvpQuery, KvpRecord};
pub use namespaces::Service;
