#![forbid(unsafe_code)]

//! Built-in element types.
//!
//! [`AnyElement`] binds any element at all and is the natural default
//! provider. [`XsString`] binds simple string content and is registered
//! under the `xs:string` schema type.

use crate::children::IndexedChildrenList;
use crate::graph::XmlObjectGraph;
use crate::marshaller::Marshaller;
use crate::object::{downcast_mut, downcast_ref, ObjectId, XmlObject, XmlObjectBuilder};
use crate::signature::SigningParameters;
use crate::unmarshaller::Unmarshaller;
use std::any::Any;
use ulriksdal_core::{QName, Result};
use ulriksdal_xml::{Attribute, Document, NodeId};

/// An element of any type: attributes, text and children kept as found.
#[derive(Debug)]
pub struct AnyElement {
    attributes: Vec<(QName, String)>,
    text: Option<String>,
    children: IndexedChildrenList,
    signing: Option<SigningParameters>,
}

impl AnyElement {
    pub fn new(owner: ObjectId) -> Self {
        Self {
            attributes: Vec::new(),
            text: None,
            children: IndexedChildrenList::new(owner),
            signing: None,
        }
    }

    /// Attributes in document order, prefixes included.
    pub fn attributes(&self) -> &[(QName, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => *slot = (name, value),
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &QName) -> Option<String> {
        let pos = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }

    pub fn children(&self) -> &IndexedChildrenList {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut IndexedChildrenList {
        &mut self.children
    }

    pub fn set_signing_parameters(&mut self, params: Option<SigningParameters>) {
        self.signing = params;
    }
}

impl XmlObject for AnyElement {
    fn ordered_children(&self) -> Vec<ObjectId> {
        self.children.as_slice().to_vec()
    }

    fn signing_parameters(&self) -> Option<&SigningParameters> {
        self.signing.as_ref()
    }

    fn child_renamed(&mut self, graph: &XmlObjectGraph, child: ObjectId, previous: &[QName]) -> Result<()> {
        self.children.refresh(graph, child, previous)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnyElementBuilder;

impl XmlObjectBuilder for AnyElementBuilder {
    fn build_object(&self, owner: ObjectId, _: &QName, _: Option<&QName>) -> Box<dyn XmlObject> {
        Box::new(AnyElement::new(owner))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnyElementMarshaller;

impl Marshaller for AnyElementMarshaller {
    fn marshall_attributes(&self, obj: &dyn XmlObject, doc: &mut Document, element: NodeId) -> Result<()> {
        let any = downcast_ref::<AnyElement>(obj)?;
        for (name, value) in &any.attributes {
            doc.set_attribute(element, name.clone(), value.as_str())?;
        }
        Ok(())
    }

    fn marshall_element_content(&self, obj: &dyn XmlObject, doc: &mut Document, element: NodeId) -> Result<()> {
        let any = downcast_ref::<AnyElement>(obj)?;
        if let Some(text) = &any.text {
            let node = doc.create_text(text.as_str());
            doc.append_child(element, node)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnyElementUnmarshaller;

impl Unmarshaller for AnyElementUnmarshaller {
    fn process_attribute(&self, obj: &mut dyn XmlObject, attribute: &Attribute) -> Result<()> {
        downcast_mut::<AnyElement>(obj)?.set_attribute(attribute.name.clone(), attribute.value.as_str());
        Ok(())
    }

    fn process_element_content(&self, obj: &mut dyn XmlObject, text: &str) -> Result<()> {
        let any = downcast_mut::<AnyElement>(obj)?;
        any.text.get_or_insert_with(String::new).push_str(text);
        Ok(())
    }

    fn process_child_element(&self, graph: &mut XmlObjectGraph, parent: ObjectId, child: ObjectId) -> Result<()> {
        graph.with_object_mut::<AnyElement, _>(parent, |graph, any| any.children.push(graph, child))
    }
}

/// Simple string content, typically annotated `xsi:type="xs:string"`.
#[derive(Debug, Default)]
pub struct XsString {
    value: Option<String>,
}

impl XsString {
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }
}

impl XmlObject for XsString {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XsStringBuilder;

impl XmlObjectBuilder for XsStringBuilder {
    fn build_object(&self, _: ObjectId, _: &QName, _: Option<&QName>) -> Box<dyn XmlObject> {
        Box::new(XsString::default())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XsStringMarshaller;

impl Marshaller for XsStringMarshaller {
    fn marshall_element_content(&self, obj: &dyn XmlObject, doc: &mut Document, element: NodeId) -> Result<()> {
        if let Some(value) = &downcast_ref::<XsString>(obj)?.value {
            let node = doc.create_text(value.as_str());
            doc.append_child(element, node)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XsStringUnmarshaller;

impl Unmarshaller for XsStringUnmarshaller {
    fn process_element_content(&self, obj: &mut dyn XmlObject, text: &str) -> Result<()> {
        let s = downcast_mut::<XsString>(obj)?;
        s.value.get_or_insert_with(String::new).push_str(text);
        Ok(())
    }
}
