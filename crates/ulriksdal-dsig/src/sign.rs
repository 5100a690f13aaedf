#![forbid(unsafe_code)]

//! Enveloped signature creation.
//!
//! The signature is built directly in the marshalled tree: no template
//! text and no re-parse. The reference is `#<id>`, resolved against the
//! ID-typed attributes of the element's own tree, and carries the
//! enveloped-signature and exclusive canonicalization transforms.

use crate::context::DsigContext;
use crate::digest::DigestMethod;
use crate::mac::SignatureMethod;
use base64::Engine;
use ulriksdal_bind::{SignatureHook, SigningParameters};
use ulriksdal_c14n::C14nMode;
use ulriksdal_core::{algorithm, ns, Error, Namespace, QName, Result};
use ulriksdal_xml::{Document, NodeId};

/// A [`SignatureHook`] producing enveloped HMAC signatures.
#[derive(Debug, Clone)]
pub struct EnvelopedSigner {
    ctx: DsigContext,
}

impl EnvelopedSigner {
    pub fn new(ctx: DsigContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &DsigContext {
        &self.ctx
    }
}

impl SignatureHook for EnvelopedSigner {
    fn sign(&self, doc: &mut Document, element: NodeId, params: &SigningParameters) -> Result<NodeId> {
        let id_value = doc
            .attribute(element, &params.id_attribute)
            .ok_or_else(|| Error::MissingAttribute(params.id_attribute.to_string()))?
            .to_owned();
        resolve_anchor(doc, element, &id_value)?;

        let mode = C14nMode::from_uri(&params.canonicalization)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {}", params.canonicalization)))?;
        let digest_method = DigestMethod::from_uri(&params.digest)?;
        let signature_method = SignatureMethod::from_uri(&params.signature)?;

        let parts = build_signature(doc, element, params, &id_value, mode, digest_method, signature_method)?;
        let outcome = fill_values(&self.ctx, doc, element, &parts, params, mode, digest_method, signature_method);
        if let Err(err) = outcome {
            let _ = doc.detach(parts.signature);
            return Err(err);
        }
        tracing::debug!(reference = %id_value, algorithm = signature_method.uri(), "created enveloped signature");
        Ok(parts.signature)
    }
}

/// The anchor must name exactly one element of the tree, and that element
/// must be the one being signed.
fn resolve_anchor(doc: &Document, element: NodeId, id_value: &str) -> Result<()> {
    let scope = doc.top_ancestor(element);
    match doc.elements_by_id(scope, id_value).as_slice() {
        [only] if *only == element => Ok(()),
        [] => Err(Error::InvalidUri(format!(
            "#{id_value} does not resolve to an ID-typed attribute"
        ))),
        _ => Err(Error::InvalidUri(format!(
            "#{id_value} does not resolve uniquely to the signed element"
        ))),
    }
}

struct SignatureParts {
    prefix: String,
    signature: NodeId,
    signed_info: NodeId,
    digest_value: NodeId,
    signature_value: NodeId,
}

fn ds(prefix: &str, local: &str) -> QName {
    QName::with_prefix(ns::DSIG, local, prefix)
}

fn child(doc: &mut Document, parent: NodeId, name: QName) -> Result<NodeId> {
    let id = doc.create_element(name);
    doc.append_child(parent, id)?;
    Ok(id)
}

fn algorithm_child(doc: &mut Document, parent: NodeId, name: QName, uri: &str) -> Result<NodeId> {
    let id = child(doc, parent, name)?;
    doc.set_attribute(id, QName::local(ns::attr::ALGORITHM), uri)?;
    Ok(id)
}

fn inclusive_namespaces(doc: &mut Document, parent: NodeId, prefixes: &[String]) -> Result<()> {
    if prefixes.is_empty() {
        return Ok(());
    }
    let name = QName::with_prefix(ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES, ns::prefix::EXC_C14N);
    let id = child(doc, parent, name)?;
    doc.ensure_namespace(id, &Namespace::prefixed(ns::EXC_C14N, ns::prefix::EXC_C14N))?;
    doc.set_attribute(id, QName::local(ns::attr::PREFIX_LIST), prefixes.join(" "))?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_signature(
    doc: &mut Document,
    element: NodeId,
    params: &SigningParameters,
    id_value: &str,
    mode: C14nMode,
    digest_method: DigestMethod,
    signature_method: SignatureMethod,
) -> Result<SignatureParts> {
    let prefix = doc
        .lookup_prefix(element, ns::DSIG)
        .unwrap_or_else(|| ns::prefix::DSIG.to_owned());
    let signature = child(doc, element, ds(&prefix, ns::node::SIGNATURE))?;
    if let Err(err) = doc.ensure_namespace(signature, &Namespace::prefixed(ns::DSIG, prefix.as_str())) {
        let _ = doc.detach(signature);
        return Err(err);
    }

    let build = |doc: &mut Document| -> Result<SignatureParts> {
        let signed_info = child(doc, signature, ds(&prefix, ns::node::SIGNED_INFO))?;
        let c14n = algorithm_child(doc, signed_info, ds(&prefix, ns::node::CANONICALIZATION_METHOD), mode.uri())?;
        inclusive_namespaces(doc, c14n, &params.inclusive_prefixes)?;
        algorithm_child(doc, signed_info, ds(&prefix, ns::node::SIGNATURE_METHOD), signature_method.uri())?;

        let reference = child(doc, signed_info, ds(&prefix, ns::node::REFERENCE))?;
        doc.set_attribute(reference, QName::local(ns::attr::URI), format!("#{id_value}"))?;
        let transforms = child(doc, reference, ds(&prefix, ns::node::TRANSFORMS))?;
        algorithm_child(doc, transforms, ds(&prefix, ns::node::TRANSFORM), algorithm::ENVELOPED_SIGNATURE)?;
        let exc = algorithm_child(doc, transforms, ds(&prefix, ns::node::TRANSFORM), mode.uri())?;
        inclusive_namespaces(doc, exc, &params.inclusive_prefixes)?;
        algorithm_child(doc, reference, ds(&prefix, ns::node::DIGEST_METHOD), digest_method.uri())?;
        let digest_value = child(doc, reference, ds(&prefix, ns::node::DIGEST_VALUE))?;

        let signature_value = child(doc, signature, ds(&prefix, ns::node::SIGNATURE_VALUE))?;
        Ok(SignatureParts {
            prefix: prefix.clone(),
            signature,
            signed_info,
            digest_value,
            signature_value,
        })
    };
    match build(doc) {
        Ok(parts) => Ok(parts),
        Err(err) => {
            let _ = doc.detach(signature);
            Err(err)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_values(
    ctx: &DsigContext,
    doc: &mut Document,
    element: NodeId,
    parts: &SignatureParts,
    params: &SigningParameters,
    mode: C14nMode,
    digest_method: DigestMethod,
    signature_method: SignatureMethod,
) -> Result<()> {
    let engine = base64::engine::general_purpose::STANDARD;

    let key_name = params.key_name.as_ref().or(ctx.key_name.as_ref());
    if let Some(name) = key_name {
        let key_info = child(doc, parts.signature, ds(&parts.prefix, ns::node::KEY_INFO))?;
        let key_name_el = child(doc, key_info, ds(&parts.prefix, ns::node::KEY_NAME))?;
        doc.set_text_content(key_name_el, name)?;
    }

    let referenced = ulriksdal_c14n::canonicalize(
        doc,
        element,
        mode,
        Some(parts.signature),
        &params.inclusive_prefixes,
    )?;
    if ctx.debug {
        tracing::debug!(data = %String::from_utf8_lossy(&referenced), "pre-digest");
    }
    let digest = digest_method.digest(&referenced);
    doc.set_text_content(parts.digest_value, &engine.encode(digest))?;

    let signed_info = ulriksdal_c14n::canonicalize(doc, parts.signed_info, mode, None, &params.inclusive_prefixes)?;
    if ctx.debug {
        tracing::debug!(data = %String::from_utf8_lossy(&signed_info), "pre-signature");
    }
    let mac = signature_method.sign(ctx.key(), &signed_info)?;
    doc.set_text_content(parts.signature_value, &engine.encode(mac))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{find_signatures, verify, VerifyResult};
    use std::sync::Arc;
    use ulriksdal_bind::{AnyElement, BindingContext, ObjectId, XmlObjectGraph};

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn signing_ctx(dsig: DsigContext) -> BindingContext {
        BindingContext::new()
            .with_defaults()
            .with_signature_hook(Arc::new(EnvelopedSigner::new(dsig)))
    }

    fn signed_graph(ctx: &BindingContext, params: SigningParameters) -> (XmlObjectGraph, ObjectId, NodeId) {
        let mut graph = XmlObjectGraph::new();
        let root = ctx
            .build(&mut graph, QName::with_prefix("urn:t", "Assertion", "t"), None)
            .unwrap();
        let child = ctx
            .build(&mut graph, QName::with_prefix("urn:t", "Subject", "t"), None)
            .unwrap();
        graph
            .object_mut::<AnyElement>(child)
            .unwrap()
            .set_text(Some("alice".into()));
        graph
            .with_object_mut::<AnyElement, _>(root, |g, any| {
                any.set_attribute(QName::local("ID"), "_a1");
                any.set_signing_parameters(Some(params));
                any.children_mut().push(g, child)
            })
            .unwrap();
        let element = ctx.marshall(&mut graph, root).unwrap();
        (graph, root, element)
    }

    #[test]
    fn test_sign_then_verify() {
        let dsig = DsigContext::new(KEY).with_key_name("shared");
        let ctx = signing_ctx(dsig.clone());
        let (graph, _, element) = signed_graph(&ctx, SigningParameters::new(QName::local("ID")));
        let doc = graph.document();

        let sigs = find_signatures(doc);
        assert_eq!(sigs.len(), 1);
        assert_eq!(doc.element_children(element).last(), Some(sigs[0]));
        assert_eq!(doc.name(sigs[0]).unwrap().prefix(), Some("ds"));
        assert_eq!(verify(&dsig, doc, sigs[0]).unwrap(), VerifyResult::Valid);

        let xml = doc.to_xml_string(element).unwrap();
        assert!(xml.contains(r##"URI="#_a1""##));
        assert!(xml.contains("<ds:KeyName>shared</ds:KeyName>"));
        assert!(xml.contains(algorithm::ENVELOPED_SIGNATURE));
    }

    #[test]
    fn test_tampering_detected() {
        let dsig = DsigContext::new(KEY);
        let ctx = signing_ctx(dsig.clone());
        let (mut graph, _, element) = signed_graph(&ctx, SigningParameters::new(QName::local("ID")));
        let subject = graph.document().element_children(element).next().unwrap();
        graph.document_mut().set_text_content(subject, "mallory").unwrap();

        let sig = find_signatures(graph.document())[0];
        let result = verify(&dsig, graph.document(), sig).unwrap();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_wrong_key_detected() {
        let ctx = signing_ctx(DsigContext::new(KEY));
        let (graph, _, _) = signed_graph(&ctx, SigningParameters::new(QName::local("ID")));
        let sig = find_signatures(graph.document())[0];
        let other = DsigContext::new(b"another key entirely".to_vec());
        assert_eq!(
            verify(&other, graph.document(), sig).unwrap(),
            VerifyResult::Invalid {
                reason: "SignatureValue mismatch".into()
            }
        );
    }

    #[test]
    fn test_other_algorithms_and_prefixes() {
        let dsig = DsigContext::new(KEY);
        let ctx = signing_ctx(dsig.clone());
        let params = SigningParameters::new(QName::local("ID"))
            .with_digest(algorithm::SHA512)
            .with_signature(algorithm::HMAC_SHA1)
            .with_inclusive_prefixes(vec!["t".into()]);
        let (graph, _, element) = signed_graph(&ctx, params);
        let sig = find_signatures(graph.document())[0];
        assert!(verify(&dsig, graph.document(), sig).unwrap().is_valid());
        let xml = graph.document().to_xml_string(element).unwrap();
        assert!(xml.contains(r#"PrefixList="t""#));
    }

    #[test]
    fn test_unflagged_anchor_rejected() {
        let mut doc = Document::parse(r#"<Root ID="r1"/>"#).unwrap();
        let root = doc.root().unwrap();
        let signer = EnvelopedSigner::new(DsigContext::new(KEY));
        let params = SigningParameters::new(QName::local("ID"));
        assert!(matches!(
            signer.sign(&mut doc, root, &params),
            Err(Error::InvalidUri(_))
        ));
        assert!(doc.element_children(root).next().is_none());
    }

    #[test]
    fn test_duplicate_anchor_rejected() {
        let mut doc = Document::parse(r#"<Root ID="r1"><Decoy ID="r1"/></Root>"#).unwrap();
        let root = doc.root().unwrap();
        let decoy = doc.element_children(root).next().unwrap();
        doc.set_id_attribute(root, &QName::local("ID"), true).unwrap();
        doc.set_id_attribute(decoy, &QName::local("ID"), true).unwrap();
        let signer = EnvelopedSigner::new(DsigContext::new(KEY));
        assert!(matches!(
            signer.sign(&mut doc, root, &SigningParameters::new(QName::local("ID"))),
            Err(Error::InvalidUri(_))
        ));
    }

    #[test]
    fn test_unsupported_algorithm_leaves_tree_untouched() {
        let mut doc = Document::parse(r#"<Root ID="r1"/>"#).unwrap();
        let root = doc.root().unwrap();
        doc.set_id_attribute(root, &QName::local("ID"), true).unwrap();
        let signer = EnvelopedSigner::new(DsigContext::new(KEY));
        let params = SigningParameters::new(QName::local("ID")).with_digest("urn:md5");
        assert!(matches!(
            signer.sign(&mut doc, root, &params),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        assert!(doc.element_children(root).next().is_none());
    }

    #[test]
    fn test_verify_after_reparse() {
        let dsig = DsigContext::new(KEY);
        let ctx = signing_ctx(dsig.clone());
        let (graph, _, element) = signed_graph(&ctx, SigningParameters::new(QName::local("ID")));
        let text = graph.document().to_xml_string(element).unwrap();

        let mut doc = Document::parse(&text).unwrap();
        let sig = find_signatures(&doc)[0];
        assert!(matches!(verify(&dsig, &doc, sig), Err(Error::InvalidUri(_))));

        let root = doc.root().unwrap();
        doc.set_id_attribute(root, &QName::local("ID"), true).unwrap();
        assert!(verify(&dsig, &doc, sig).unwrap().is_valid());
    }

    #[test]
    fn test_multiline_attribute_verifies_after_reparse() {
        let dsig = DsigContext::new(KEY);
        let ctx = signing_ctx(dsig.clone());
        let mut graph = XmlObjectGraph::new();
        let root = ctx
            .build(&mut graph, QName::with_prefix("urn:t", "Assertion", "t"), None)
            .unwrap();
        let any = graph.object_mut::<AnyElement>(root).unwrap();
        any.set_attribute(QName::local("ID"), "_a1");
        any.set_attribute(QName::local("Note"), "line one\n\tline two\r");
        any.set_signing_parameters(Some(SigningParameters::new(QName::local("ID"))));
        let element = ctx.marshall(&mut graph, root).unwrap();
        let text = graph.document().to_xml_string(element).unwrap();

        let mut doc = Document::parse(&text).unwrap();
        let copy = doc.root().unwrap();
        assert_eq!(
            doc.attribute(copy, &QName::local("Note")),
            Some("line one\n\tline two\r")
        );
        doc.set_id_attribute(copy, &QName::local("ID"), true).unwrap();
        let sig = find_signatures(&doc)[0];
        assert!(verify(&dsig, &doc, sig).unwrap().is_valid());
    }

    #[test]
    fn test_unbound_inclusive_prefix_still_signs() {
        let dsig = DsigContext::new(KEY);
        let ctx = signing_ctx(dsig.clone());
        let params = SigningParameters::new(QName::local("ID")).with_inclusive_prefixes(vec!["xs".into()]);
        let (graph, _, element) = signed_graph(&ctx, params);
        let doc = graph.document();
        let sig = find_signatures(doc)[0];
        assert!(verify(&dsig, doc, sig).unwrap().is_valid());
        assert!(doc.to_xml_string(element).unwrap().contains(r#"PrefixList="xs""#));
    }
}
