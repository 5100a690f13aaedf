#![forbid(unsafe_code)]

//! The boundary with the XML signature subsystem.

use std::fmt::Debug;
use ulriksdal_core::{algorithm, QName, Result};
use ulriksdal_xml::{Document, NodeId};

/// What a signable object asks the signature hook to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningParameters {
    /// The attribute whose value anchors the signature reference. It must
    /// be present on the marshalled element.
    pub id_attribute: QName,
    pub canonicalization: String,
    pub digest: String,
    pub signature: String,
    pub key_name: Option<String>,
    /// InclusiveNamespaces PrefixList for exclusive canonicalization.
    pub inclusive_prefixes: Vec<String>,
}

impl SigningParameters {
    /// Exclusive C14N, SHA-256 and HMAC-SHA256.
    pub fn new(id_attribute: QName) -> Self {
        Self {
            id_attribute,
            canonicalization: algorithm::EXC_C14N.to_owned(),
            digest: algorithm::SHA256.to_owned(),
            signature: algorithm::HMAC_SHA256.to_owned(),
            key_name: None,
            inclusive_prefixes: Vec::new(),
        }
    }

    pub fn with_digest(mut self, uri: &str) -> Self {
        self.digest = uri.to_owned();
        self
    }

    pub fn with_signature(mut self, uri: &str) -> Self {
        self.signature = uri.to_owned();
        self
    }

    pub fn with_key_name(mut self, name: &str) -> Self {
        self.key_name = Some(name.to_owned());
        self
    }

    pub fn with_inclusive_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.inclusive_prefixes = prefixes;
        self
    }
}

/// Signs a freshly marshalled element.
///
/// Called as the last content step of marshalling, after the ID attribute
/// named by the parameters has been flagged ID-typed. Implementations
/// append the `Signature` element as the element's last child and return it.
pub trait SignatureHook: Debug + Send + Sync {
    fn sign(&self, doc: &mut Document, element: NodeId, params: &SigningParameters) -> Result<NodeId>;
}
