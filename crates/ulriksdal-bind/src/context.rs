#![forbid(unsafe_code)]

//! Binding context: the registries and policies every marshal and
//! unmarshal call runs against.

use crate::any;
use crate::graph::XmlObjectGraph;
use crate::marshaller::marshall_object;
use crate::object::ObjectId;
use crate::registry::{IdAttributeRegistry, Provider, ProviderRegistry};
use crate::signature::SignatureHook;
use crate::unmarshaller::schema_type_of;
use std::sync::Arc;
use ulriksdal_core::{ns, Error, QName, Result};
use ulriksdal_xml::{Document, NodeId};

/// Registries, signature hook and unknown-element policy for binding.
///
/// Built once and shared: cloning is cheap and clones see the same
/// registries.
#[derive(Debug, Clone)]
pub struct BindingContext {
    registry: Arc<ProviderRegistry>,
    id_attributes: Arc<IdAttributeRegistry>,
    signature_hook: Option<Arc<dyn SignatureHook>>,
    /// Skip elements with no provider instead of failing.
    ignore_unknown_elements: bool,
}

impl Default for BindingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingContext {
    /// A context with empty registries (apart from `xml:id`), no signature
    /// hook, and unknown elements rejected.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ProviderRegistry::new()),
            id_attributes: Arc::new(IdAttributeRegistry::new()),
            signature_hook: None,
            ignore_unknown_elements: false,
        }
    }

    pub fn with_registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_id_attributes(mut self, id_attributes: Arc<IdAttributeRegistry>) -> Self {
        self.id_attributes = id_attributes;
        self
    }

    pub fn with_signature_hook(mut self, hook: Arc<dyn SignatureHook>) -> Self {
        self.signature_hook = Some(hook);
        self
    }

    pub fn with_ignore_unknown_elements(mut self, ignore: bool) -> Self {
        self.ignore_unknown_elements = ignore;
        self
    }

    /// Register the built-in providers: [`any::AnyElement`] as the default
    /// provider and [`any::XsString`] for `xs:string`.
    pub fn with_defaults(self) -> Self {
        self.registry.register(
            self.registry.default_provider(),
            Provider::new(
                any::AnyElementBuilder,
                any::AnyElementMarshaller,
                any::AnyElementUnmarshaller,
            ),
        );
        self.registry.register(
            QName::new(ns::XSD, "string"),
            Provider::new(
                any::XsStringBuilder,
                any::XsStringMarshaller,
                any::XsStringUnmarshaller,
            ),
        );
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn id_attributes(&self) -> &Arc<IdAttributeRegistry> {
        &self.id_attributes
    }

    pub fn signature_hook(&self) -> Option<&Arc<dyn SignatureHook>> {
        self.signature_hook.as_ref()
    }

    pub fn ignore_unknown_elements(&self) -> bool {
        self.ignore_unknown_elements
    }

    /// Create an object with the builder registered for its schema type or
    /// element name.
    pub fn build(
        &self,
        graph: &mut XmlObjectGraph,
        element_name: QName,
        schema_type: Option<QName>,
    ) -> Result<ObjectId> {
        let provider = self.provider_for(schema_type.as_ref(), &element_name)?;
        Ok(graph.build_object(provider.builder.as_ref(), element_name, schema_type))
    }

    fn provider_for(&self, schema_type: Option<&QName>, element_name: &QName) -> Result<Provider> {
        self.registry
            .resolve(schema_type, element_name)
            .ok_or_else(|| Error::NoProviderRegistered(schema_type.unwrap_or(element_name).clone()))
    }

    /// Marshall an object into the graph's document, dispatching on its
    /// schema type or element name. A parentless object becomes the
    /// document element.
    pub fn marshall(&self, graph: &mut XmlObjectGraph, id: ObjectId) -> Result<NodeId> {
        let core = graph.core(id)?;
        let provider = self.provider_for(core.schema_type(), core.element_name())?;
        marshall_object(provider.marshaller.as_ref(), self, graph, id, None)
    }

    /// Marshall an object as the last child of `parent`.
    pub fn marshall_into(&self, graph: &mut XmlObjectGraph, id: ObjectId, parent: NodeId) -> Result<NodeId> {
        let core = graph.core(id)?;
        let provider = self.provider_for(core.schema_type(), core.element_name())?;
        marshall_object(provider.marshaller.as_ref(), self, graph, id, Some(parent))
    }

    /// Unmarshall an element of the graph's document, dispatching on its
    /// `xsi:type` or name.
    pub fn unmarshall(&self, graph: &mut XmlObjectGraph, element: NodeId) -> Result<ObjectId> {
        let doc = graph.document();
        let name = doc
            .name(element)
            .cloned()
            .ok_or_else(|| Error::XmlStructure(format!("node {} is not an element", element.index())))?;
        let schema_type = schema_type_of(doc, element)?;
        let provider = self.provider_for(schema_type.as_ref(), &name)?;
        provider.unmarshaller.unmarshall(self, graph, element)
    }

    /// Take ownership of a parsed document and unmarshall its root.
    pub fn unmarshall_document(&self, document: Document) -> Result<(XmlObjectGraph, ObjectId)> {
        let root = document
            .root()
            .ok_or_else(|| Error::MissingElement("document element".into()))?;
        let mut graph = XmlObjectGraph::with_document(document);
        let id = self.unmarshall(&mut graph, root)?;
        Ok((graph, id))
    }

    pub fn parse_and_unmarshall(&self, xml: &str) -> Result<(XmlObjectGraph, ObjectId)> {
        self.unmarshall_document(Document::parse(xml)?)
    }
}
