#![forbid(unsafe_code)]

//! Children collections with ownership transfer.
//!
//! A collection records which object owns it. Every insert and remove goes
//! through the graph, which sets or clears the child's parent link and
//! releases the cached DOM of the owner and its ancestors.

use crate::graph::XmlObjectGraph;
use crate::object::ObjectId;
use std::collections::HashMap;
use ulriksdal_core::{Error, QName, Result};

/// An ordered list of child objects.
#[derive(Debug, Clone)]
pub struct ChildrenList {
    owner: ObjectId,
    items: Vec<ObjectId>,
}

impl ChildrenList {
    pub fn new(owner: ObjectId) -> Self {
        Self {
            owner,
            items: Vec::new(),
        }
    }

    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ObjectId> {
        self.items.get(index).copied()
    }

    pub fn as_slice(&self) -> &[ObjectId] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.items.iter().copied()
    }

    pub fn contains(&self, child: ObjectId) -> bool {
        self.items.contains(&child)
    }

    pub fn position(&self, child: ObjectId) -> Option<usize> {
        self.items.iter().position(|c| *c == child)
    }

    /// Append `child`. Inserting an object already in the list is a no-op.
    pub fn push(&mut self, graph: &mut XmlObjectGraph, child: ObjectId) -> Result<()> {
        self.insert(graph, self.items.len(), child)
    }

    /// Insert `child` at `index`.
    ///
    /// Fails with [`Error::OwnershipConflict`] when the child belongs to
    /// another object, or when it is the owner or one of its ancestors.
    pub fn insert(&mut self, graph: &mut XmlObjectGraph, index: usize, child: ObjectId) -> Result<()> {
        if self.contains(child) {
            return Ok(());
        }
        check_index(index, self.items.len() + 1)?;
        graph.attach_child(self.owner, child)?;
        self.items.insert(index, child);
        Ok(())
    }

    /// Replace the child at `index`, returning the one it displaced.
    pub fn set(&mut self, graph: &mut XmlObjectGraph, index: usize, child: ObjectId) -> Result<ObjectId> {
        check_index(index, self.items.len())?;
        let old = self.items[index];
        if old == child {
            return Ok(old);
        }
        if self.contains(child) {
            return Err(Error::Other(format!(
                "object {} is already in this collection",
                child.index()
            )));
        }
        graph.attach_child(self.owner, child)?;
        graph.detach_child(self.owner, old)?;
        self.items[index] = child;
        Ok(old)
    }

    pub fn remove(&mut self, graph: &mut XmlObjectGraph, index: usize) -> Result<ObjectId> {
        check_index(index, self.items.len())?;
        let child = self.items[index];
        graph.detach_child(self.owner, child)?;
        self.items.remove(index);
        Ok(child)
    }

    /// Remove `child` if present. Returns whether it was.
    pub fn remove_object(&mut self, graph: &mut XmlObjectGraph, child: ObjectId) -> Result<bool> {
        match self.position(child) {
            Some(index) => self.remove(graph, index).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn clear(&mut self, graph: &mut XmlObjectGraph) -> Result<()> {
        while !self.items.is_empty() {
            self.remove(graph, self.items.len() - 1)?;
        }
        Ok(())
    }
}

fn check_index(index: usize, bound: usize) -> Result<()> {
    if index < bound {
        Ok(())
    } else {
        Err(Error::Other(format!("index {index} out of bounds")))
    }
}

/// A [`ChildrenList`] that also indexes its children by element name and
/// by schema type.
///
/// The index holds, for every name, the children carrying it in list
/// order. The graph reports renames and retypes of a child to its parent
/// (see [`XmlObject::child_renamed`](crate::XmlObject::child_renamed)),
/// which calls [`refresh`](Self::refresh).
#[derive(Debug, Clone)]
pub struct IndexedChildrenList {
    list: ChildrenList,
    index: HashMap<QName, Vec<ObjectId>>,
}

impl IndexedChildrenList {
    pub fn new(owner: ObjectId) -> Self {
        Self {
            list: ChildrenList::new(owner),
            index: HashMap::new(),
        }
    }

    pub fn owner(&self) -> ObjectId {
        self.list.owner()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ObjectId> {
        self.list.get(index)
    }

    pub fn as_slice(&self) -> &[ObjectId] {
        self.list.as_slice()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.list.iter()
    }

    pub fn contains(&self, child: ObjectId) -> bool {
        self.list.contains(child)
    }

    /// Children whose element name or schema type is `name`, in list order.
    pub fn lookup(&self, name: &QName) -> &[ObjectId] {
        self.index.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn push(&mut self, graph: &mut XmlObjectGraph, child: ObjectId) -> Result<()> {
        self.insert(graph, self.list.len(), child)
    }

    pub fn insert(&mut self, graph: &mut XmlObjectGraph, index: usize, child: ObjectId) -> Result<()> {
        self.list.insert(graph, index, child)?;
        self.reindex(graph, child)
    }

    pub fn set(&mut self, graph: &mut XmlObjectGraph, index: usize, child: ObjectId) -> Result<ObjectId> {
        let old = self.list.set(graph, index, child)?;
        self.reindex(graph, old)?;
        self.reindex(graph, child)?;
        Ok(old)
    }

    pub fn remove(&mut self, graph: &mut XmlObjectGraph, index: usize) -> Result<ObjectId> {
        let child = self.list.remove(graph, index)?;
        self.reindex(graph, child)?;
        Ok(child)
    }

    pub fn remove_object(&mut self, graph: &mut XmlObjectGraph, child: ObjectId) -> Result<bool> {
        let removed = self.list.remove_object(graph, child)?;
        if removed {
            self.reindex(graph, child)?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self, graph: &mut XmlObjectGraph) -> Result<()> {
        self.list.clear(graph)?;
        self.index.clear();
        Ok(())
    }

    /// Recompute the whole index from the children's current names.
    pub fn rebuild_index(&mut self, graph: &XmlObjectGraph) -> Result<()> {
        self.index.clear();
        for child in self.list.iter() {
            for key in index_keys(graph, child)? {
                self.index.entry(key).or_default().push(child);
            }
        }
        Ok(())
    }

    /// Move `child` from the entries of the names in `previous` to those of
    /// its current names.
    pub fn refresh(&mut self, graph: &XmlObjectGraph, child: ObjectId, previous: &[QName]) -> Result<()> {
        let mut keys = previous.to_vec();
        keys.extend(index_keys(graph, child)?);
        self.reindex_keys(graph, keys)
    }

    fn reindex(&mut self, graph: &XmlObjectGraph, changed: ObjectId) -> Result<()> {
        let keys = index_keys(graph, changed)?;
        self.reindex_keys(graph, keys)
    }

    /// Recompute the entries for `keys` from the list, so each stays in
    /// list order.
    fn reindex_keys(&mut self, graph: &XmlObjectGraph, keys: Vec<QName>) -> Result<()> {
        for key in keys {
            let mut members = Vec::new();
            for child in self.list.iter() {
                if index_keys(graph, child)?.contains(&key) {
                    members.push(child);
                }
            }
            if members.is_empty() {
                self.index.remove(&key);
            } else {
                self.index.insert(key, members);
            }
        }
        Ok(())
    }
}

/// The names a child is indexed under: element name, then schema type.
pub(crate) fn index_keys(graph: &XmlObjectGraph, child: ObjectId) -> Result<Vec<QName>> {
    let core = graph.core(child)?;
    let mut keys = vec![core.element_name().clone()];
    if let Some(t) = core.schema_type() {
        if t != core.element_name() {
            keys.push(t.clone());
        }
    }
    Ok(keys)
}
