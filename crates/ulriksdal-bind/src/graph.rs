#![forbid(unsafe_code)]

//! Arena of bound objects sharing one XML document.
//!
//! Parent links are handles maintained by the graph on behalf of the
//! children collections, never fields an object sets on itself. Every
//! mutation entry point releases the cached DOM of the object and of all
//! its ancestors, so a later marshal of the root re-walks exactly the
//! mutated path and reuses the cached subtrees of untouched siblings.

use crate::children::index_keys;
use crate::object::{ObjectCore, ObjectId, XmlObject, XmlObjectBuilder};
use ulriksdal_core::{Error, Namespace, QName, Result};
use ulriksdal_xml::{Document, NodeId};

#[derive(Debug)]
struct ObjectSlot {
    core: ObjectCore,
    // Taken out while the object is handed to a closure that also needs
    // the graph.
    body: Option<Box<dyn XmlObject>>,
}

/// An object graph and the document its cached DOM handles point into.
#[derive(Debug, Default)]
pub struct XmlObjectGraph {
    slots: Vec<ObjectSlot>,
    document: Document,
    // (parent, child, previous names) for renames made while the parent's
    // body was checked out.
    deferred_renames: Vec<(ObjectId, ObjectId, Vec<QName>)>,
}

impl XmlObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph whose objects will be unmarshalled from, or marshalled
    /// into, `document`.
    pub fn with_document(document: Document) -> Self {
        Self {
            slots: Vec::new(),
            document,
            deferred_renames: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access to the document. Editing an element that is some
    /// object's cached DOM bypasses invalidation; release it with
    /// [`release_dom`](Self::release_dom) afterwards.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Move another document's nodes into this graph's document.
    pub fn import_document(&mut self, other: Document) -> Option<NodeId> {
        self.document.import_document(other)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Create an object with `builder`.
    pub fn build_object(
        &mut self,
        builder: &dyn XmlObjectBuilder,
        element_name: QName,
        schema_type: Option<QName>,
    ) -> ObjectId {
        let id = ObjectId(self.slots.len());
        let body = builder.build_object(id, &element_name, schema_type.as_ref());
        self.slots.push(ObjectSlot {
            core: ObjectCore::new(element_name, schema_type),
            body: Some(body),
        });
        id
    }

    fn slot(&self, id: ObjectId) -> Result<&ObjectSlot> {
        self.slots.get(id.0).ok_or(Error::UnknownObject(id.0))
    }

    fn slot_mut(&mut self, id: ObjectId) -> Result<&mut ObjectSlot> {
        self.slots.get_mut(id.0).ok_or(Error::UnknownObject(id.0))
    }

    pub fn core(&self, id: ObjectId) -> Result<&ObjectCore> {
        Ok(&self.slot(id)?.core)
    }

    /// Mutable core access for the engine itself; does not release DOM.
    pub(crate) fn core_mut(&mut self, id: ObjectId) -> Result<&mut ObjectCore> {
        Ok(&mut self.slot_mut(id)?.core)
    }

    pub fn body(&self, id: ObjectId) -> Result<&dyn XmlObject> {
        self.slot(id)?
            .body
            .as_deref()
            .ok_or_else(|| Error::Other(format!("object {} is checked out", id.0)))
    }

    /// The object's type-specific part, downcast to `T`.
    pub fn object<T: XmlObject>(&self, id: ObjectId) -> Result<&T> {
        self.body(id)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| Error::WrongObjectType(self.slots[id.0].core.element_name.clone()))
    }

    /// Mutable access to the type-specific part. Releases the cached DOM of
    /// the object and its ancestors.
    pub fn object_mut<T: XmlObject>(&mut self, id: ObjectId) -> Result<&mut T> {
        self.release_dom(id)?;
        let slot = self.slot_mut(id)?;
        let name = slot.core.element_name.clone();
        slot.body
            .as_deref_mut()
            .ok_or_else(|| Error::Other(format!("object {} is checked out", id.0)))?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(Error::WrongObjectType(name))
    }

    /// Run `f` with the object downcast to `T` and the graph, so the
    /// object's children collections can be edited. Releases the cached
    /// DOM of the object and its ancestors.
    pub fn with_object_mut<T, R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut Self, &mut T) -> Result<R>,
    ) -> Result<R>
    where
        T: XmlObject,
    {
        self.release_dom(id)?;
        self.with_body(id, |graph, body| {
            let name = graph.slots[id.0].core.element_name.clone();
            let typed = body
                .as_any_mut()
                .downcast_mut::<T>()
                .ok_or(Error::WrongObjectType(name))?;
            f(graph, typed)
        })
    }

    /// Check the body out, run `f`, and put it back, whatever `f` returns.
    pub(crate) fn with_body<R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut Self, &mut dyn XmlObject) -> Result<R>,
    ) -> Result<R> {
        let mut body = self
            .slot_mut(id)?
            .body
            .take()
            .ok_or_else(|| Error::Other(format!("object {} is checked out", id.0)))?;
        let result = f(self, body.as_mut());
        self.slots[id.0].body = Some(body);
        let deferred = self.apply_deferred_renames(id);
        result.and_then(|r| deferred.map(|()| r))
    }

    /// Tell the parent of `child` that it now carries other names.
    fn notify_renamed(&mut self, child: ObjectId, previous: Vec<QName>) -> Result<()> {
        let Some(parent) = self.core(child)?.parent() else {
            return Ok(());
        };
        if self.slot(parent)?.body.is_none() {
            self.deferred_renames.push((parent, child, previous));
            return Ok(());
        }
        self.with_body(parent, |graph, body| body.child_renamed(graph, child, &previous))
    }

    fn apply_deferred_renames(&mut self, parent: ObjectId) -> Result<()> {
        if self.deferred_renames.is_empty() {
            return Ok(());
        }
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred_renames)
            .into_iter()
            .partition(|(p, _, _)| *p == parent);
        self.deferred_renames = waiting;
        for (_, child, previous) in ready {
            self.with_body(parent, |graph, body| body.child_renamed(graph, child, &previous))?;
        }
        Ok(())
    }

    /// Split borrow used by the marshaller hooks.
    pub(crate) fn body_and_document_mut(
        &mut self,
        id: ObjectId,
    ) -> Result<(&dyn XmlObject, &mut Document)> {
        let slot = self.slots.get(id.0).ok_or(Error::UnknownObject(id.0))?;
        let body = slot
            .body
            .as_deref()
            .ok_or_else(|| Error::Other(format!("object {} is checked out", id.0)))?;
        Ok((body, &mut self.document))
    }

    // ── Core accessors and mutators ──────────────────────────────────

    pub fn element_name(&self, id: ObjectId) -> Result<&QName> {
        Ok(self.core(id)?.element_name())
    }

    pub fn schema_type(&self, id: ObjectId) -> Result<Option<&QName>> {
        Ok(self.core(id)?.schema_type())
    }

    pub fn parent(&self, id: ObjectId) -> Result<Option<ObjectId>> {
        Ok(self.core(id)?.parent())
    }

    pub fn dom(&self, id: ObjectId) -> Result<Option<NodeId>> {
        Ok(self.core(id)?.dom())
    }

    pub fn ordered_children(&self, id: ObjectId) -> Result<Vec<ObjectId>> {
        Ok(self.body(id)?.ordered_children())
    }

    /// Rename the element. The prefix travels with the name.
    pub fn set_element_name(&mut self, id: ObjectId, name: QName) -> Result<()> {
        let previous = index_keys(self, id)?;
        self.release_dom(id)?;
        self.core_mut(id)?.element_name = name;
        self.notify_renamed(id, previous)
    }

    pub fn set_schema_type(&mut self, id: ObjectId, schema_type: Option<QName>) -> Result<()> {
        let previous = index_keys(self, id)?;
        self.release_dom(id)?;
        self.core_mut(id)?.schema_type = schema_type;
        self.notify_renamed(id, previous)
    }

    pub fn add_namespace(&mut self, id: ObjectId, namespace: Namespace) -> Result<()> {
        self.release_dom(id)?;
        self.core_mut(id)?.namespaces.insert(namespace);
        Ok(())
    }

    pub fn remove_namespace(&mut self, id: ObjectId, namespace: &Namespace) -> Result<bool> {
        self.release_dom(id)?;
        Ok(self.core_mut(id)?.namespaces.remove(namespace))
    }

    pub fn set_schema_location(&mut self, id: ObjectId, location: Option<String>) -> Result<()> {
        self.release_dom(id)?;
        self.core_mut(id)?.schema_location = location;
        Ok(())
    }

    pub fn set_no_namespace_schema_location(
        &mut self,
        id: ObjectId,
        location: Option<String>,
    ) -> Result<()> {
        self.release_dom(id)?;
        self.core_mut(id)?.no_namespace_schema_location = location;
        Ok(())
    }

    pub fn set_nil(&mut self, id: ObjectId, nil: Option<bool>) -> Result<()> {
        self.release_dom(id)?;
        self.core_mut(id)?.nil = nil;
        Ok(())
    }

    /// Drop the cached DOM of `id` and of every ancestor.
    pub fn release_dom(&mut self, id: ObjectId) -> Result<()> {
        let mut current = Some(id);
        while let Some(n) = current {
            let core = self.core_mut(n)?;
            if core.dom.take().is_some() {
                tracing::trace!(element = %core.element_name, "released cached DOM");
            }
            current = core.parent;
        }
        Ok(())
    }

    /// Drop every cached DOM handle so the next marshal rebuilds the whole
    /// tree.
    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            slot.core.dom = None;
        }
    }

    /// Free the document nodes that neither the document element's tree
    /// nor any object's cached DOM reaches, such as the elements a
    /// re-marshal replaced. Later marshals reuse the freed slots. Returns
    /// the number of nodes freed.
    pub fn reclaim_unreachable(&mut self) -> usize {
        let keep: Vec<NodeId> = self.slots.iter().filter_map(|s| s.core.dom).collect();
        self.document.reclaim_unreachable(&keep)
    }

    /// True if `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: ObjectId, id: ObjectId) -> Result<bool> {
        let mut current = Some(id);
        while let Some(n) = current {
            if n == ancestor {
                return Ok(true);
            }
            current = self.core(n)?.parent;
        }
        Ok(false)
    }

    // ── Ownership, driven by children collections ────────────────────

    /// Make `owner` the parent of `child`. Returns `false` when it already
    /// was.
    pub(crate) fn attach_child(&mut self, owner: ObjectId, child: ObjectId) -> Result<bool> {
        let conflict = || -> Result<Error> {
            Ok(Error::OwnershipConflict {
                child: self.core(child)?.element_name.clone(),
                owner: self.core(owner)?.element_name.clone(),
            })
        };
        match self.core(child)?.parent {
            Some(p) if p == owner => return Ok(false),
            Some(_) => return Err(conflict()?),
            None => {}
        }
        if self.is_ancestor_or_self(child, owner)? {
            return Err(conflict()?);
        }
        self.core_mut(child)?.parent = Some(owner);
        self.release_dom(owner)?;
        Ok(true)
    }

    /// Undo [`attach_child`](Self::attach_child): clears the child's parent
    /// and cached DOM and releases the owner's.
    pub(crate) fn detach_child(&mut self, owner: ObjectId, child: ObjectId) -> Result<()> {
        let core = self.core_mut(child)?;
        if core.parent == Some(owner) {
            core.parent = None;
            core.dom = None;
        }
        self.release_dom(owner)
    }
}
