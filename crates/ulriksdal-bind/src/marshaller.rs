#![forbid(unsafe_code)]

//! Object graph to XML.
//!
//! The steps run in a fixed order: element, namespaces, attributes,
//! children, content, schema-instance attributes, signature. Signing must
//! come last because canonicalization is sensitive to everything before it.

use crate::context::BindingContext;
use crate::graph::XmlObjectGraph;
use crate::object::{ObjectCore, ObjectId, XmlObject};
use crate::signature::SigningParameters;
use std::fmt::Debug;
use ulriksdal_core::{ns, Error, Namespace, QName, Result};
use ulriksdal_xml::{Document, NodeId};

/// Writes one kind of object to XML.
///
/// Implementors provide the type-specific hooks; the traversal, namespace
/// handling, ID flagging and signing are shared.
pub trait Marshaller: Debug + Send + Sync {
    /// When set, only objects whose schema type or element name equals this
    /// name are accepted.
    fn target(&self) -> Option<&QName> {
        None
    }

    /// Write the object's own attributes onto `element`.
    fn marshall_attributes(&self, _obj: &dyn XmlObject, _doc: &mut Document, _element: NodeId) -> Result<()> {
        Ok(())
    }

    /// Write the object's text content. Runs after the children.
    fn marshall_element_content(
        &self,
        _obj: &dyn XmlObject,
        _doc: &mut Document,
        _element: NodeId,
    ) -> Result<()> {
        Ok(())
    }

    /// Marshall `id` into the graph's document. A parentless object becomes
    /// the document element.
    fn marshall(&self, ctx: &BindingContext, graph: &mut XmlObjectGraph, id: ObjectId) -> Result<NodeId> {
        marshall_object(self, ctx, graph, id, None)
    }

    /// Marshall `id` as the last child of `parent`.
    fn marshall_into(
        &self,
        ctx: &BindingContext,
        graph: &mut XmlObjectGraph,
        id: ObjectId,
        parent: NodeId,
    ) -> Result<NodeId> {
        marshall_object(self, ctx, graph, id, Some(parent))
    }
}

pub(crate) fn marshall_object<M: Marshaller + ?Sized>(
    marshaller: &M,
    ctx: &BindingContext,
    graph: &mut XmlObjectGraph,
    id: ObjectId,
    parent: Option<NodeId>,
) -> Result<NodeId> {
    check_target(marshaller.target(), graph.core(id)?)?;

    let core = graph.core(id)?;
    let name = core.element_name().clone();
    let is_root = core.parent().is_none();

    if let Some(dom) = core.dom() {
        let doc = graph.document_mut();
        match parent {
            Some(p) => doc.adopt_child(p, dom)?,
            None if is_root => doc.set_root(dom)?,
            None => {}
        }
        tracing::debug!(element = %name, "reusing cached DOM");
        return Ok(dom);
    }

    tracing::trace!(element = %name, "marshalling");
    let doc = graph.document_mut();
    let element = doc.create_element(name);
    match parent {
        Some(p) => doc.append_child(p, element)?,
        None if is_root => doc.set_root(element)?,
        None => {}
    }

    if let Err(err) = fill_element(marshaller, ctx, graph, id, element) {
        // Leave the caller's tree as it was.
        let _ = graph.document_mut().detach(element);
        return Err(err);
    }
    graph.core_mut(id)?.dom = Some(element);
    Ok(element)
}

fn check_target(target: Option<&QName>, core: &ObjectCore) -> Result<()> {
    match target {
        Some(t) if core.schema_type() != Some(t) && core.element_name() != t => {
            Err(Error::TargetMismatch {
                expected: t.clone(),
                actual: core.type_name().clone(),
            })
        }
        _ => Ok(()),
    }
}

fn fill_element<M: Marshaller + ?Sized>(
    marshaller: &M,
    ctx: &BindingContext,
    graph: &mut XmlObjectGraph,
    id: ObjectId,
    element: NodeId,
) -> Result<()> {
    let name_binding = graph.core(id)?.element_name().namespace();
    let namespaces: Vec<Namespace> = graph.core(id)?.namespaces().iter().cloned().collect();
    for binding in &namespaces {
        if binding.prefix() == name_binding.prefix() && binding.uri() != name_binding.uri() {
            tracing::warn!(prefix = ?binding.prefix(), uri = binding.uri(), "declaration conflicts with the element name, skipping");
            continue;
        }
        graph.document_mut().declare_namespace(element, binding)?;
    }
    declare_if_needed(graph, id, element, &name_binding)?;

    {
        let (obj, doc) = graph.body_and_document_mut(id)?;
        marshaller.marshall_attributes(obj, doc, element)?;
    }
    marshall_attribute_names(ctx, graph, id, element)?;

    marshall_children(ctx, graph, id, element)?;

    {
        let (obj, doc) = graph.body_and_document_mut(id)?;
        marshaller.marshall_element_content(obj, doc, element)?;
    }

    marshall_schema_instance(graph, id, element)?;

    let params = graph.body(id)?.signing_parameters().cloned();
    if let Some(params) = params {
        sign_element(ctx, graph.document_mut(), element, &params)?;
    }
    Ok(())
}

/// Declare `binding` on the element unless it is already in scope, and
/// remember it on the object so an unmarshalled copy compares equal.
fn declare_if_needed(
    graph: &mut XmlObjectGraph,
    id: ObjectId,
    element: NodeId,
    binding: &Namespace,
) -> Result<()> {
    if graph.document_mut().ensure_namespace(element, binding)? {
        graph.core_mut(id)?.namespaces.insert(binding.clone());
    }
    Ok(())
}

/// Flag registered ID attributes and make every attribute namespace
/// resolvable.
fn marshall_attribute_names(
    ctx: &BindingContext,
    graph: &mut XmlObjectGraph,
    id: ObjectId,
    element: NodeId,
) -> Result<()> {
    let attributes = graph.document().attributes(element).to_vec();
    for attr in attributes {
        if attr.is_namespace_declaration() {
            continue;
        }
        let mut name = attr.name.clone();
        if name.has_namespace() && name.namespace_uri() != ns::XML {
            let prefix = bind_prefix(graph, id, element, name.namespace_uri(), name.prefix())?;
            if name.prefix() != Some(prefix.as_str()) {
                name = name.reprefixed(Some(prefix.as_str()));
                let doc = graph.document_mut();
                doc.remove_attribute(element, &attr.name)?;
                doc.set_attribute(element, name.clone(), attr.value.clone())?;
            }
        }
        if ctx.id_attributes().is_id_attribute(&name) {
            graph.document_mut().set_id_attribute(element, &name, true)?;
        }
    }
    Ok(())
}

/// A prefix bound to `uri` at `element`, declaring one when needed.
/// `preferred` is kept if it is unbound or already bound to `uri`. A prefix
/// in scope for another URI is never redeclared, since names already
/// serialized under it would change namespace.
fn bind_prefix(
    graph: &mut XmlObjectGraph,
    id: ObjectId,
    element: NodeId,
    uri: &str,
    preferred: Option<&str>,
) -> Result<String> {
    let doc = graph.document();
    let prefix = match preferred.map(|p| (p, doc.lookup_namespace_uri(element, Some(p)))) {
        Some((p, Some(bound))) if bound == uri => return Ok(p.to_owned()),
        Some((p, None)) => p.to_owned(),
        _ => match doc.lookup_prefix(element, uri) {
            Some(p) => return Ok(p),
            None => unused_prefix(doc, element),
        },
    };
    declare_if_needed(graph, id, element, &Namespace::prefixed(uri, prefix.as_str()))?;
    Ok(prefix)
}

fn unused_prefix(doc: &Document, element: NodeId) -> String {
    let mut n = 1;
    loop {
        let candidate = format!("ns{n}");
        if doc.lookup_namespace_uri(element, Some(&candidate)).is_none() {
            return candidate;
        }
        n += 1;
    }
}

fn marshall_children(
    ctx: &BindingContext,
    graph: &mut XmlObjectGraph,
    id: ObjectId,
    element: NodeId,
) -> Result<()> {
    for child in graph.ordered_children(id)? {
        let core = graph.core(child)?;
        let child_name = core.type_name().clone();
        if let Some(dom) = core.dom() {
            graph.document_mut().adopt_child(element, dom)?;
            tracing::debug!(element = %child_name, "reusing cached DOM");
            continue;
        }
        let provider = ctx.registry().resolve(core.schema_type(), core.element_name());
        match provider {
            Some(provider) => {
                marshall_object(provider.marshaller.as_ref(), ctx, graph, child, Some(element))?;
            }
            None if ctx.ignore_unknown_elements() => {
                tracing::warn!(element = %child_name, "no marshaller registered, skipping child");
            }
            None => {
                return Err(Error::NoMarshallerForChild {
                    parent: graph.core(id)?.type_name().clone(),
                    child: child_name,
                })
            }
        }
    }
    Ok(())
}

fn xsi_name(local: &str, prefix: &str) -> QName {
    QName::with_prefix(ns::XSI, local, prefix)
}

fn marshall_schema_instance(graph: &mut XmlObjectGraph, id: ObjectId, element: NodeId) -> Result<()> {
    let core = graph.core(id)?.clone();
    if core.schema_type().is_none()
        && core.schema_location().is_none()
        && core.no_namespace_schema_location().is_none()
        && core.nil().is_none()
    {
        return Ok(());
    }

    let xsi_prefix = match graph.document().lookup_prefix(element, ns::XSI) {
        Some(p) => p,
        None => bind_prefix(graph, id, element, ns::XSI, Some(ns::prefix::XSI))?,
    };

    if let Some(schema_type) = core.schema_type() {
        if schema_type.local_name().is_empty() || !schema_type.has_namespace() {
            return Err(Error::MalformedTypeAnnotation(schema_type.to_string()));
        }
        if schema_type.prefix().is_none()
            && graph.document().lookup_prefix(element, schema_type.namespace_uri()).is_none()
        {
            return Err(Error::MalformedTypeAnnotation(format!("{schema_type} has no prefix")));
        }
        let prefix = bind_prefix(graph, id, element, schema_type.namespace_uri(), schema_type.prefix())?;
        graph.document_mut().set_attribute(
            element,
            xsi_name(ns::attr::XSI_TYPE, &xsi_prefix),
            format!("{prefix}:{}", schema_type.local_name()),
        )?;
    }

    let doc = graph.document_mut();
    if let Some(location) = core.schema_location() {
        doc.set_attribute(element, xsi_name(ns::attr::XSI_SCHEMA_LOCATION, &xsi_prefix), location)?;
    }
    if let Some(location) = core.no_namespace_schema_location() {
        doc.set_attribute(
            element,
            xsi_name(ns::attr::XSI_NO_NAMESPACE_SCHEMA_LOCATION, &xsi_prefix),
            location,
        )?;
    }
    if let Some(nil) = core.nil() {
        doc.set_attribute(
            element,
            xsi_name(ns::attr::XSI_NIL, &xsi_prefix),
            if nil { "true" } else { "false" },
        )?;
    }
    Ok(())
}

/// Flag the reference anchor, then hand the element to the signature hook.
fn sign_element(
    ctx: &BindingContext,
    doc: &mut Document,
    element: NodeId,
    params: &SigningParameters,
) -> Result<()> {
    if doc.attribute(element, &params.id_attribute).is_none() {
        return Err(Error::MissingAttribute(params.id_attribute.to_string()));
    }
    doc.set_id_attribute(element, &params.id_attribute, true)?;
    let hook = ctx
        .signature_hook()
        .ok_or_else(|| Error::SignatureCreation("no signature hook configured".into()))?;
    hook.sign(doc, element, params)?;
    tracing::debug!(attribute = %params.id_attribute, "signed element");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::any::AnyElement;
    use crate::registry::Provider;
    use crate::signature::SignatureHook;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn ctx() -> BindingContext {
        BindingContext::new().with_defaults()
    }

    fn element(ctx: &BindingContext, graph: &mut XmlObjectGraph, local: &str) -> ObjectId {
        ctx.build(graph, QName::with_prefix("urn:t", local, "t"), None).unwrap()
    }

    fn add_child(graph: &mut XmlObjectGraph, parent: ObjectId, child: ObjectId) {
        graph
            .with_object_mut::<AnyElement, _>(parent, |g, any| any.children_mut().push(g, child))
            .unwrap();
    }

    fn set_text(graph: &mut XmlObjectGraph, id: ObjectId, text: &str) {
        graph.object_mut::<AnyElement>(id).unwrap().set_text(Some(text.to_owned()));
    }

    #[derive(Debug)]
    struct Fixed(QName);

    impl Marshaller for Fixed {
        fn target(&self) -> Option<&QName> {
            Some(&self.0)
        }
    }

    #[derive(Debug, Default)]
    struct RecordingHook {
        id_flagged_at_call: Mutex<Vec<bool>>,
    }

    impl SignatureHook for RecordingHook {
        fn sign(&self, doc: &mut Document, element: NodeId, params: &SigningParameters) -> Result<NodeId> {
            self.id_flagged_at_call
                .lock()
                .push(doc.is_id_attribute(element, &params.id_attribute));
            let sig = doc.create_element(QName::with_prefix(ns::DSIG, "Signature", "ds"));
            doc.append_child(element, sig)?;
            Ok(sig)
        }
    }

    #[test]
    fn test_marshall_builds_tree() {
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let root = element(&ctx, &mut graph, "Root");
        let child = element(&ctx, &mut graph, "A");
        graph
            .object_mut::<AnyElement>(root)
            .unwrap()
            .set_attribute(QName::local("ID"), "r1");
        set_text(&mut graph, child, "hello");
        add_child(&mut graph, root, child);

        let node = ctx.marshall(&mut graph, root).unwrap();
        assert_eq!(graph.document().root(), Some(node));
        assert_eq!(
            graph.document().to_xml_string(node).unwrap(),
            r#"<t:Root xmlns:t="urn:t" ID="r1"><t:A>hello</t:A></t:Root>"#
        );
        assert!(graph
            .core(root)
            .unwrap()
            .namespaces()
            .contains(&Namespace::prefixed("urn:t", "t")));
        assert!(graph.core(child).unwrap().namespaces().is_empty());
    }

    #[test]
    fn test_marshall_twice_returns_cached_element() {
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let root = element(&ctx, &mut graph, "Root");
        let first = ctx.marshall(&mut graph, root).unwrap();
        let nodes = graph.document().len();
        let second = ctx.marshall(&mut graph, root).unwrap();
        assert_eq!(first, second);
        assert_eq!(graph.document().len(), nodes);
    }

    #[test]
    fn test_mutation_rewalks_only_mutated_path() {
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let root = element(&ctx, &mut graph, "Root");
        let a = element(&ctx, &mut graph, "A");
        let b = element(&ctx, &mut graph, "B");
        add_child(&mut graph, root, a);
        add_child(&mut graph, root, b);
        let old_root = ctx.marshall(&mut graph, root).unwrap();
        let a_dom = graph.dom(a).unwrap().unwrap();

        set_text(&mut graph, b, "changed");
        assert_eq!(graph.dom(root).unwrap(), None);
        assert_eq!(graph.dom(b).unwrap(), None);
        assert_eq!(graph.dom(a).unwrap(), Some(a_dom));

        let new_root = ctx.marshall(&mut graph, root).unwrap();
        assert_ne!(new_root, old_root);
        assert_eq!(graph.dom(a).unwrap(), Some(a_dom));
        assert_eq!(graph.document().parent(a_dom), Some(new_root));
        assert_eq!(
            graph.document().to_xml_string(new_root).unwrap(),
            r#"<t:Root xmlns:t="urn:t"><t:A/><t:B>changed</t:B></t:Root>"#
        );
    }

    #[test]
    fn test_reclaim_keeps_repeated_marshals_bounded() {
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let root = element(&ctx, &mut graph, "Root");
        let a = element(&ctx, &mut graph, "A");
        let b = element(&ctx, &mut graph, "B");
        add_child(&mut graph, root, a);
        add_child(&mut graph, root, b);
        ctx.marshall(&mut graph, root).unwrap();
        let a_dom = graph.dom(a).unwrap().unwrap();

        let mut sizes = Vec::new();
        for i in 0..5 {
            set_text(&mut graph, b, &format!("v{i}"));
            ctx.marshall(&mut graph, root).unwrap();
            graph.reclaim_unreachable();
            sizes.push(graph.document().len());
        }
        assert!(sizes[1..].iter().all(|s| *s == sizes[1]));

        let node = graph.dom(root).unwrap().unwrap();
        assert_eq!(graph.dom(a).unwrap(), Some(a_dom));
        assert_eq!(
            graph.document().to_xml_string(node).unwrap(),
            r#"<t:Root xmlns:t="urn:t"><t:A/><t:B>v4</t:B></t:Root>"#
        );
    }

    #[test]
    fn test_removing_child_invalidates_ancestors() {
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let root = element(&ctx, &mut graph, "Root");
        let mid = element(&ctx, &mut graph, "Mid");
        let leaf = element(&ctx, &mut graph, "Leaf");
        add_child(&mut graph, root, mid);
        add_child(&mut graph, mid, leaf);
        ctx.marshall(&mut graph, root).unwrap();

        let removed = graph
            .with_object_mut::<AnyElement, _>(mid, |g, any| any.children_mut().remove_object(g, leaf))
            .unwrap();
        assert!(removed);
        assert_eq!(graph.dom(root).unwrap(), None);
        assert_eq!(graph.dom(mid).unwrap(), None);
        assert_eq!(graph.dom(leaf).unwrap(), None);
        assert_eq!(graph.parent(leaf).unwrap(), None);
    }

    #[test]
    fn test_fixed_target_checked() {
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let root = element(&ctx, &mut graph, "Root");
        let err = Fixed(QName::new("urn:t", "Other"))
            .marshall(&ctx, &mut graph, root)
            .unwrap_err();
        assert!(matches!(err, Error::TargetMismatch { .. }));
        assert!(Fixed(QName::new("urn:t", "Root")).marshall(&ctx, &mut graph, root).is_ok());
    }

    #[test]
    fn test_unknown_child_policy() {
        let strict = BindingContext::new();
        let root_name = QName::with_prefix("urn:t", "Root", "t");
        strict.registry().register(
            root_name.clone(),
            Provider::new(
                crate::any::AnyElementBuilder,
                crate::any::AnyElementMarshaller,
                crate::any::AnyElementUnmarshaller,
            ),
        );
        let mut graph = XmlObjectGraph::new();
        let root = strict.build(&mut graph, root_name, None).unwrap();
        let stray = graph.build_object(
            &crate::any::AnyElementBuilder,
            QName::with_prefix("urn:t", "Stray", "t"),
            None,
        );
        add_child(&mut graph, root, stray);

        let err = strict.marshall(&mut graph, root).unwrap_err();
        assert!(matches!(err, Error::NoMarshallerForChild { .. }));
        assert!(err.is_no_provider());
        assert_eq!(graph.document().root(), None);
        assert_eq!(graph.dom(root).unwrap(), None);

        let tolerant = strict.clone().with_ignore_unknown_elements(true);
        let node = tolerant.marshall(&mut graph, root).unwrap();
        assert_eq!(graph.document().element_children(node).count(), 0);
    }

    #[test]
    fn test_schema_type_written() {
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let id = ctx
            .build(
                &mut graph,
                QName::local("Name"),
                Some(QName::with_prefix(ns::XSD, "string", "xs")),
            )
            .unwrap();
        graph
            .object_mut::<crate::any::XsString>(id)
            .unwrap()
            .set_value(Some("Alice".into()));
        let node = ctx.marshall(&mut graph, id).unwrap();
        let doc = graph.document();
        assert_eq!(
            doc.attribute(node, &QName::new(ns::XSI, "type")),
            Some("xs:string")
        );
        assert_eq!(doc.lookup_namespace_uri(node, Some("xs")).as_deref(), Some(ns::XSD));
        assert_eq!(doc.lookup_namespace_uri(node, Some("xsi")).as_deref(), Some(ns::XSI));
        assert!(graph
            .core(id)
            .unwrap()
            .namespaces()
            .contains(&Namespace::prefixed(ns::XSI, "xsi")));
    }

    #[test]
    fn test_malformed_schema_type() {
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let id = element(&ctx, &mut graph, "Root");
        graph
            .set_schema_type(id, Some(QName::with_prefix("", "T", "p")))
            .unwrap();
        assert!(matches!(
            ctx.marshall(&mut graph, id),
            Err(Error::MalformedTypeAnnotation(_))
        ));
        graph
            .set_schema_type(id, Some(QName::new("urn:types", "T")))
            .unwrap();
        assert!(matches!(
            ctx.marshall(&mut graph, id),
            Err(Error::MalformedTypeAnnotation(_))
        ));
    }

    #[test]
    fn test_attribute_namespace_declared_and_id_flagged() {
        let ctx = ctx();
        ctx.id_attributes().register(QName::new("urn:a", "Id"));
        let mut graph = XmlObjectGraph::new();
        let id = element(&ctx, &mut graph, "Root");
        graph
            .object_mut::<AnyElement>(id)
            .unwrap()
            .set_attribute(QName::new("urn:a", "Id"), "x1");
        let node = ctx.marshall(&mut graph, id).unwrap();
        let doc = graph.document();
        let attr = doc.attribute_node(node, &QName::new("urn:a", "Id")).unwrap();
        assert_eq!(attr.name.prefix(), Some("ns1"));
        assert!(attr.is_id);
        assert_eq!(doc.lookup_namespace_uri(node, Some("ns1")).as_deref(), Some("urn:a"));
        assert_eq!(doc.element_by_id("x1"), Some(node));
    }

    #[test]
    fn test_prefix_bound_elsewhere_is_never_redeclared() {
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let id = element(&ctx, &mut graph, "Root");
        graph
            .set_schema_type(id, Some(QName::with_prefix("urn:types", "T", "t")))
            .unwrap();
        graph
            .object_mut::<AnyElement>(id)
            .unwrap()
            .set_attribute(QName::with_prefix("urn:other", "a", "t"), "v");
        let node = ctx.marshall(&mut graph, id).unwrap();
        let xml = graph.document().to_xml_string(node).unwrap();

        let reparsed = Document::parse(&xml).unwrap();
        let root = reparsed.root().unwrap();
        assert_eq!(reparsed.name(root), Some(&QName::new("urn:t", "Root")));
        assert_eq!(reparsed.lookup_namespace_uri(root, Some("t")).as_deref(), Some("urn:t"));
        assert_eq!(reparsed.attribute(root, &QName::new("urn:other", "a")), Some("v"));
        let xsi_type = reparsed.attribute(root, &QName::new(ns::XSI, "type")).unwrap();
        assert_eq!(
            reparsed.resolve_qualified_value(root, xsi_type).unwrap(),
            QName::new("urn:types", "T")
        );

        let (copy, copy_root) = ctx.parse_and_unmarshall(&xml).unwrap();
        assert_eq!(copy.element_name(copy_root).unwrap(), &QName::new("urn:t", "Root"));
        assert_eq!(copy.schema_type(copy_root).unwrap(), Some(&QName::new("urn:types", "T")));
    }

    #[test]
    fn test_signing_requires_hook_and_anchor() {
        let params = SigningParameters::new(QName::local("ID"));
        let ctx = ctx();
        let mut graph = XmlObjectGraph::new();
        let id = element(&ctx, &mut graph, "Root");
        graph
            .object_mut::<AnyElement>(id)
            .unwrap()
            .set_signing_parameters(Some(params.clone()));
        assert!(matches!(
            ctx.marshall(&mut graph, id),
            Err(Error::MissingAttribute(_))
        ));

        graph
            .object_mut::<AnyElement>(id)
            .unwrap()
            .set_attribute(QName::local("ID"), "r1");
        assert!(matches!(
            ctx.marshall(&mut graph, id),
            Err(Error::SignatureCreation(_))
        ));

        let hook = Arc::new(RecordingHook::default());
        let signing = ctx.clone().with_signature_hook(hook.clone());
        let child = element(&signing, &mut graph, "Child");
        add_child(&mut graph, id, child);
        let node = signing.marshall(&mut graph, id).unwrap();
        assert_eq!(*hook.id_flagged_at_call.lock(), vec![true]);
        let last = graph.document().element_children(node).last().unwrap();
        assert_eq!(graph.document().name(last).unwrap().local_name(), "Signature");
    }
}
