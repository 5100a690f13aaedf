#![forbid(unsafe_code)]

//! XML to object graph.

use crate::context::BindingContext;
use crate::graph::XmlObjectGraph;
use crate::object::{ObjectId, XmlObject};
use std::fmt::Debug;
use ulriksdal_core::{ns, Error, QName, Result};
use ulriksdal_xml::{Attribute, Document, NodeId, NodeKind};

/// Reads one kind of object from XML.
///
/// Implementors provide the type-specific hooks; provider dispatch,
/// namespace capture, schema-instance attributes and ID flagging are
/// shared.
pub trait Unmarshaller: Debug + Send + Sync {
    /// When set, only elements whose name or `xsi:type` equals this name
    /// are accepted.
    fn target(&self) -> Option<&QName> {
        None
    }

    /// Called for every attribute that is not a namespace declaration or a
    /// built-in `xsi` attribute.
    fn process_attribute(&self, _obj: &mut dyn XmlObject, _attribute: &Attribute) -> Result<()> {
        Ok(())
    }

    /// Called for each non-blank text node, untrimmed.
    fn process_element_content(&self, _obj: &mut dyn XmlObject, _text: &str) -> Result<()> {
        Ok(())
    }

    /// Called with each unmarshalled child, in document order.
    fn process_child_element(
        &self,
        _graph: &mut XmlObjectGraph,
        _parent: ObjectId,
        _child: ObjectId,
    ) -> Result<()> {
        Ok(())
    }

    /// Build an object from `element`, which must belong to the graph's
    /// document. The element becomes the object's cached DOM.
    fn unmarshall(&self, ctx: &BindingContext, graph: &mut XmlObjectGraph, element: NodeId) -> Result<ObjectId> {
        unmarshall_element(self, ctx, graph, element)
    }
}

/// The element's `xsi:type`, resolved against the bindings in scope.
pub fn schema_type_of(doc: &Document, element: NodeId) -> Result<Option<QName>> {
    let Some(value) = doc.attribute(element, &QName::new(ns::XSI, ns::attr::XSI_TYPE)) else {
        return Ok(None);
    };
    let resolved = doc
        .resolve_qualified_value(element, value)
        .map_err(|_| Error::MalformedTypeAnnotation(value.to_owned()))?;
    if resolved.local_name().is_empty() {
        return Err(Error::MalformedTypeAnnotation(value.to_owned()));
    }
    Ok(Some(resolved))
}

fn element_name(doc: &Document, element: NodeId) -> Result<QName> {
    doc.name(element)
        .cloned()
        .ok_or_else(|| Error::XmlStructure(format!("node {} is not an element", element.index())))
}

fn parse_nil(value: &str) -> Result<bool> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::XmlStructure(format!("invalid xsi:nil value '{other}'"))),
    }
}

pub(crate) fn unmarshall_element<U: Unmarshaller + ?Sized>(
    unmarshaller: &U,
    ctx: &BindingContext,
    graph: &mut XmlObjectGraph,
    element: NodeId,
) -> Result<ObjectId> {
    let name = element_name(graph.document(), element)?;
    let schema_type = schema_type_of(graph.document(), element)?;

    if let Some(target) = unmarshaller.target() {
        if name != *target && schema_type.as_ref() != Some(target) {
            return Err(Error::TargetMismatch {
                expected: target.clone(),
                actual: schema_type.unwrap_or(name),
            });
        }
    }

    let provider = ctx
        .registry()
        .resolve(schema_type.as_ref(), &name)
        .ok_or_else(|| Error::NoProviderRegistered(schema_type.clone().unwrap_or_else(|| name.clone())))?;
    tracing::trace!(element = %name, "unmarshalling");
    let id = graph.build_object(provider.builder.as_ref(), name, schema_type);

    unmarshall_attributes(unmarshaller, ctx, graph, id, element)?;

    for child in graph.document().children(element).to_vec() {
        let text = match graph.document().node_kind(child) {
            Some(NodeKind::Element(_)) => None,
            Some(NodeKind::Text(t)) if !t.trim().is_empty() => Some(t.clone()),
            _ => continue,
        };
        match text {
            Some(text) => {
                graph.with_body(id, |_, obj| unmarshaller.process_element_content(obj, &text))?;
            }
            None => {
                if let Some(child_id) = unmarshall_child(ctx, graph, child)? {
                    unmarshaller.process_child_element(graph, id, child_id)?;
                }
            }
        }
    }

    graph.core_mut(id)?.dom = Some(element);
    Ok(id)
}

fn unmarshall_attributes<U: Unmarshaller + ?Sized>(
    unmarshaller: &U,
    ctx: &BindingContext,
    graph: &mut XmlObjectGraph,
    id: ObjectId,
    element: NodeId,
) -> Result<()> {
    for mut attr in graph.document().attributes(element).to_vec() {
        if let Some(binding) = attr.declared_namespace() {
            graph.core_mut(id)?.namespaces.insert(binding);
            continue;
        }
        if attr.name.namespace_uri() == ns::XSI {
            let core = graph.core_mut(id)?;
            match attr.name.local_name() {
                ns::attr::XSI_TYPE => continue,
                ns::attr::XSI_SCHEMA_LOCATION => {
                    core.schema_location = Some(attr.value);
                    continue;
                }
                ns::attr::XSI_NO_NAMESPACE_SCHEMA_LOCATION => {
                    core.no_namespace_schema_location = Some(attr.value);
                    continue;
                }
                ns::attr::XSI_NIL => {
                    core.nil = Some(parse_nil(&attr.value)?);
                    continue;
                }
                _ => {}
            }
        }
        // Without a schema the tree cannot know which attributes are IDs;
        // flag them before anything canonicalizes this element.
        if !attr.is_id && ctx.id_attributes().is_id_attribute(&attr.name) {
            graph.document_mut().set_id_attribute(element, &attr.name, true)?;
            attr.is_id = true;
        }
        graph.with_body(id, |_, obj| unmarshaller.process_attribute(obj, &attr))?;
    }
    Ok(())
}

/// Unmarshall a child element with the provider its name resolves to.
/// Returns `None` when the child is skipped as unknown.
fn unmarshall_child(
    ctx: &BindingContext,
    graph: &mut XmlObjectGraph,
    child: NodeId,
) -> Result<Option<ObjectId>> {
    let name = element_name(graph.document(), child)?;
    let schema_type = schema_type_of(graph.document(), child)?;
    match ctx.registry().resolve(schema_type.as_ref(), &name) {
        Some(provider) => provider.unmarshaller.unmarshall(ctx, graph, child).map(Some),
        None if ctx.ignore_unknown_elements() => {
            tracing::warn!(element = %name, "no unmarshaller registered, skipping element");
            Ok(None)
        }
        None => Err(Error::NoProviderRegistered(schema_type.unwrap_or(name))),
    }
}
