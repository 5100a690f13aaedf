#![forbid(unsafe_code)]

//! The bound object capability and the per-object state the engine keeps.

use crate::graph::XmlObjectGraph;
use crate::signature::SigningParameters;
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt::Debug;
use ulriksdal_core::{Error, Namespace, QName, Result};
use ulriksdal_xml::NodeId;

/// Handle of an object inside an [`XmlObjectGraph`](crate::XmlObjectGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The type-specific part of a bound object.
///
/// Everything the engine itself needs (names, namespaces, parent, cached
/// DOM) lives in [`ObjectCore`] and is managed by the graph. Implementors
/// only describe their children and, when signable, how to sign them.
pub trait XmlObject: Any + Debug + Send + Sync {
    /// Children in the order they must be serialized.
    fn ordered_children(&self) -> Vec<ObjectId> {
        Vec::new()
    }

    /// Present when the object should be signed as the last step of
    /// marshalling.
    fn signing_parameters(&self) -> Option<&SigningParameters> {
        None
    }

    /// The element name or schema type of `child`, one of this object's
    /// children, changed. `previous` holds the names it carried before.
    /// Collections indexed by name refresh their entries here.
    fn child_renamed(&mut self, _graph: &XmlObjectGraph, _child: ObjectId, _previous: &[QName]) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Creates the type-specific part of an object. `owner` is the id the new
/// object will have, for children collections that must know their owner.
pub trait XmlObjectBuilder: Debug + Send + Sync {
    fn build_object(
        &self,
        owner: ObjectId,
        element_name: &QName,
        schema_type: Option<&QName>,
    ) -> Box<dyn XmlObject>;
}

/// Downcast a type-erased object body, for use inside marshaller and
/// unmarshaller hooks.
pub fn downcast_ref<T: XmlObject>(obj: &dyn XmlObject) -> Result<&T> {
    obj.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Other(format!("expected {}", std::any::type_name::<T>())))
}

pub fn downcast_mut<T: XmlObject>(obj: &mut dyn XmlObject) -> Result<&mut T> {
    obj.as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| Error::Other(format!("expected {}", std::any::type_name::<T>())))
}

/// State common to every bound object.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    pub(crate) element_name: QName,
    pub(crate) schema_type: Option<QName>,
    pub(crate) namespaces: BTreeSet<Namespace>,
    pub(crate) dom: Option<NodeId>,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) schema_location: Option<String>,
    pub(crate) no_namespace_schema_location: Option<String>,
    pub(crate) nil: Option<bool>,
}

impl ObjectCore {
    pub(crate) fn new(element_name: QName, schema_type: Option<QName>) -> Self {
        Self {
            element_name,
            schema_type,
            namespaces: BTreeSet::new(),
            dom: None,
            parent: None,
            schema_location: None,
            no_namespace_schema_location: None,
            nil: None,
        }
    }

    pub fn element_name(&self) -> &QName {
        &self.element_name
    }

    pub fn schema_type(&self) -> Option<&QName> {
        self.schema_type.as_ref()
    }

    /// Explicit namespace declarations serialized on this element.
    pub fn namespaces(&self) -> &BTreeSet<Namespace> {
        &self.namespaces
    }

    pub fn dom(&self) -> Option<NodeId> {
        self.dom
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn schema_location(&self) -> Option<&str> {
        self.schema_location.as_deref()
    }

    pub fn no_namespace_schema_location(&self) -> Option<&str> {
        self.no_namespace_schema_location.as_deref()
    }

    pub fn nil(&self) -> Option<bool> {
        self.nil
    }

    /// The name providers are looked up by first: the schema type when
    /// present, the element name otherwise.
    pub fn type_name(&self) -> &QName {
        self.schema_type.as_ref().unwrap_or(&self.element_name)
    }
}
