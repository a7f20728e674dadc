//! GetCapabilities, shared by WFS and WMS.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use ows_common::{Attr, Exceptions, KvpQuery};

use crate::request::{
    check_version, parse_document, passthrough_attributes, passthrough_elements, require_service,
    OgcRequest, RequestBase, VersionRule,
};

const PARAMETERS: &[&str] = &["REQUEST", "SERVICE", "VERSION"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCapabilitiesRequest {
    pub base: RequestBase,
}

impl OgcRequest for GetCapabilitiesRequest {
    const OPERATION: &'static str = "GetCapabilities";

    #[instrument(skip_all)]
    fn from_xml(document: &[u8]) -> Result<Self, Exceptions> {
        let root = parse_document(document, Self::OPERATION)?;
        let service = require_service(root.attribute("service"))?;
        let version = check_version(root.attribute("version"), service, VersionRule::Negotiable)?;
        Ok(Self {
            base: RequestBase {
                service,
                version,
                attributes: passthrough_attributes(&root, &[]),
                elements: passthrough_elements(&root, &root.attributes, &[]),
            },
        })
    }

    #[instrument(skip_all)]
    fn from_kvp(query: &KvpQuery) -> Result<Self, Exceptions> {
        let (record, exceptions) = ows_common::parse_parameters(query, PARAMETERS);
        let base = require_service(record.get("SERVICE")).and_then(|service| {
            let version = check_version(record.get("VERSION"), service, VersionRule::Negotiable)?;
            Ok(RequestBase {
                service,
                version,
                attributes: Vec::new(),
                elements: Vec::new(),
            })
        });
        match base {
            Ok(base) => exceptions.into_result().map(|()| Self { base }),
            Err(exception) => {
                let mut exceptions = exceptions;
                exceptions.push(exception);
                Err(exceptions)
            }
        }
    }

    fn to_xml(&self) -> String {
        let root = self.base.root_element(
            Self::OPERATION,
            vec![Attr::namespace_declaration(None, self.base.service.namespace())],
        );
        self.base.write_document(root)
    }

    fn to_kvp(&self) -> KvpQuery {
        let mut query = KvpQuery::new();
        self.base.write_kvp(&mut query, Self::OPERATION);
        query
    }

    fn base(&self) -> &RequestBase {
        &self.base
    }
}
