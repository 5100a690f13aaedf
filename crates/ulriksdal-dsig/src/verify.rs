#![forbid(unsafe_code)]

//! Enveloped signature verification.
//!
//! Processing order:
//! 1. Read `SignedInfo`: CanonicalizationMethod, SignatureMethod
//! 2. For each `Reference`: resolve the URI among ID-typed attributes, run
//!    the transforms, compare the digest
//! 3. Check `KeyName` against the context
//! 4. Canonicalize `SignedInfo` and check `SignatureValue`
//!
//! ID attributes are never guessed here: the document must already carry
//! the ID flags the unmarshaller sets from the ID-attribute registry.

use crate::context::DsigContext;
use crate::digest::DigestMethod;
use crate::mac::SignatureMethod;
use base64::Engine;
use ulriksdal_c14n::C14nMode;
use ulriksdal_core::{algorithm, ns, Error, Result};
use ulriksdal_xml::{Document, NodeId};

/// Result of signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid,
    Invalid { reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid)
    }
}

fn is_ds(doc: &Document, id: NodeId, local: &str) -> bool {
    doc.name(id)
        .is_some_and(|n| n.namespace_uri() == ns::DSIG && n.local_name() == local)
}

fn find_child(doc: &Document, parent: NodeId, local: &str) -> Option<NodeId> {
    doc.element_children(parent).find(|c| is_ds(doc, *c, local))
}

fn require_child(doc: &Document, parent: NodeId, local: &str) -> Result<NodeId> {
    find_child(doc, parent, local).ok_or_else(|| Error::MissingElement(local.into()))
}

fn algorithm_of(doc: &Document, element: NodeId, what: &str) -> Result<String> {
    doc.attribute(element, &ulriksdal_core::QName::local(ns::attr::ALGORITHM))
        .map(str::to_owned)
        .ok_or_else(|| Error::MissingAttribute(format!("Algorithm on {what}")))
}

fn read_inclusive_prefixes(doc: &Document, node: NodeId) -> Vec<String> {
    doc.element_children(node)
        .find(|c| {
            doc.name(*c).is_some_and(|n| {
                n.namespace_uri() == ns::EXC_C14N && n.local_name() == ns::node::INCLUSIVE_NAMESPACES
            })
        })
        .and_then(|c| doc.attribute(c, &ulriksdal_core::QName::local(ns::attr::PREFIX_LIST)))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

fn decode(doc: &Document, element: NodeId) -> Result<Vec<u8>> {
    let text: String = doc
        .text_content(element)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|e| Error::Base64(e.to_string()))
}

/// Every `ds:Signature` element in the document, in document order.
pub fn find_signatures(doc: &Document) -> Vec<NodeId> {
    match doc.root() {
        Some(root) => doc
            .descendants(root)
            .into_iter()
            .filter(|n| is_ds(doc, *n, ns::node::SIGNATURE))
            .collect(),
        None => Vec::new(),
    }
}

/// Verify every signature in the document. An empty result means the
/// document is unsigned.
pub fn verify_all(ctx: &DsigContext, doc: &Document) -> Result<Vec<(NodeId, VerifyResult)>> {
    find_signatures(doc)
        .into_iter()
        .map(|sig| verify(ctx, doc, sig).map(|r| (sig, r)))
        .collect()
}

/// Verify one `ds:Signature` element.
pub fn verify(ctx: &DsigContext, doc: &Document, signature: NodeId) -> Result<VerifyResult> {
    if !is_ds(doc, signature, ns::node::SIGNATURE) {
        return Err(Error::MissingElement("Signature".into()));
    }
    let signed_info = require_child(doc, signature, ns::node::SIGNED_INFO)?;

    let c14n_node = require_child(doc, signed_info, ns::node::CANONICALIZATION_METHOD)?;
    let c14n_uri = algorithm_of(doc, c14n_node, "CanonicalizationMethod")?;
    let c14n_mode = C14nMode::from_uri(&c14n_uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")))?;
    let inclusive_prefixes = read_inclusive_prefixes(doc, c14n_node);

    let method_node = require_child(doc, signed_info, ns::node::SIGNATURE_METHOD)?;
    let method = SignatureMethod::from_uri(&algorithm_of(doc, method_node, "SignatureMethod")?)?;

    let references: Vec<NodeId> = doc
        .element_children(signed_info)
        .filter(|c| is_ds(doc, *c, ns::node::REFERENCE))
        .collect();
    if references.is_empty() {
        return Err(Error::MissingElement("Reference".into()));
    }
    for reference in references {
        if let VerifyResult::Invalid { reason } = verify_reference(ctx, doc, signature, reference)? {
            return Ok(VerifyResult::Invalid {
                reason: format!("Reference digest failed: {reason}"),
            });
        }
    }

    if let Some(key_info) = find_child(doc, signature, ns::node::KEY_INFO) {
        if let (Some(name_el), Some(expected)) = (find_child(doc, key_info, ns::node::KEY_NAME), &ctx.key_name) {
            let named = doc.text_content(name_el);
            if named.trim() != expected {
                return Err(Error::Key(format!("no key named '{}'", named.trim())));
            }
        }
    }

    let canonical = ulriksdal_c14n::canonicalize(doc, signed_info, c14n_mode, None, &inclusive_prefixes)?;
    let value = decode(doc, require_child(doc, signature, ns::node::SIGNATURE_VALUE)?)?;
    if method.verify(ctx.key(), &canonical, &value)? {
        Ok(VerifyResult::Valid)
    } else {
        Ok(VerifyResult::Invalid {
            reason: "SignatureValue mismatch".into(),
        })
    }
}

fn resolve_reference(doc: &Document, signature: NodeId, uri: &str) -> Result<NodeId> {
    let scope = doc.top_ancestor(signature);
    if uri.is_empty() {
        return Ok(scope);
    }
    let id = uri
        .strip_prefix('#')
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::InvalidUri(format!("unsupported URI: {uri}")))?;
    match doc.elements_by_id(scope, id).as_slice() {
        [only] => Ok(*only),
        [] => Err(Error::InvalidUri(format!("no ID-typed attribute with value '{id}'"))),
        _ => Err(Error::InvalidUri(format!("ID '{id}' is not unique"))),
    }
}

fn verify_reference(
    ctx: &DsigContext,
    doc: &Document,
    signature: NodeId,
    reference: NodeId,
) -> Result<VerifyResult> {
    let uri = doc
        .attribute(reference, &ulriksdal_core::QName::local(ns::attr::URI))
        .unwrap_or("");
    let target = resolve_reference(doc, signature, uri)?;

    let mut exclude = None;
    let mut c14n: Option<(C14nMode, Vec<String>)> = None;
    if let Some(transforms) = find_child(doc, reference, ns::node::TRANSFORMS) {
        for transform in doc
            .element_children(transforms)
            .filter(|t| is_ds(doc, *t, ns::node::TRANSFORM))
        {
            let t_uri = algorithm_of(doc, transform, "Transform")?;
            if t_uri == algorithm::ENVELOPED_SIGNATURE {
                exclude = Some(signature);
            } else if let Some(mode) = C14nMode::from_uri(&t_uri) {
                c14n = Some((mode, read_inclusive_prefixes(doc, transform)));
            } else {
                return Err(Error::UnsupportedAlgorithm(format!("transform: {t_uri}")));
            }
        }
    }
    let (mode, prefixes) = c14n.ok_or_else(|| {
        Error::UnsupportedAlgorithm("Reference without an exclusive canonicalization transform".into())
    })?;

    let data = ulriksdal_c14n::canonicalize(doc, target, mode, exclude, &prefixes)?;
    if ctx.debug {
        tracing::debug!(data = %String::from_utf8_lossy(&data), "pre-digest");
    }
    let method_node = require_child(doc, reference, ns::node::DIGEST_METHOD)?;
    let digest_method = DigestMethod::from_uri(&algorithm_of(doc, method_node, "DigestMethod")?)?;
    let expected = decode(doc, require_child(doc, reference, ns::node::DIGEST_VALUE)?)?;

    if digest_method.digest(&data) == expected {
        Ok(VerifyResult::Valid)
    } else {
        Ok(VerifyResult::Invalid {
            reason: format!("digest mismatch for '{uri}'"),
        })
    }
}
