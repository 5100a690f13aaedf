#![forbid(unsafe_code)]

//! Mutable XML element tree stored in an arena, with ID attribute flags.
//!
//! Nodes are addressed by [`NodeId`] and never freed: detaching a node only
//! unlinks it, which keeps every handle held elsewhere valid for the
//! lifetime of the document.
//!
//! Namespace declarations are ordinary attributes in the
//! `http://www.w3.org/2000/xmlns/` namespace, as in DOM level 2: `xmlns:p`
//! has prefix `xmlns` and local name `p`, and the default declaration has
//! no prefix and local name `xmlns`.

use crate::writer::XmlWriter;
use std::collections::{BTreeMap, HashSet};
use ulriksdal_core::qname::split_qualified;
use ulriksdal_core::{ns, Error, Namespace, QName};

/// Handle of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
    /// Whether the attribute is of type `ID`, i.e. a valid target for
    /// [`Document::element_by_id`].
    pub is_id: bool,
}

impl Attribute {
    /// True for `xmlns` and `xmlns:*` attributes.
    pub fn is_namespace_declaration(&self) -> bool {
        self.name.namespace_uri() == ns::XMLNS
    }

    /// The binding this attribute declares, if it is a namespace declaration.
    pub fn declared_namespace(&self) -> Option<Namespace> {
        if !self.is_namespace_declaration() {
            return None;
        }
        let prefix = match self.name.prefix() {
            Some(_) => Some(self.name.local_name().to_owned()),
            None => None,
        };
        Some(Namespace::new(self.value.clone(), prefix))
    }
}

/// Element payload: its prefixed name and attributes in document order.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
}

/// The kind of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An XML document: an arena of nodes plus the document element.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    // Slots freed by `reclaim_unreachable`, reused by the next allocations.
    free: Vec<NodeId>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse XML text into a new document.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let src = roxmltree::Document::parse_with_options(text, crate::parsing_options())
            .map_err(|e| Error::XmlParse(e.to_string()))?;
        let mut doc = Self::new();
        let root = doc.copy_roxml_element(text, src.root_element(), None);
        doc.root = Some(root);
        tracing::trace!(nodes = doc.nodes.len(), "parsed document");
        Ok(doc)
    }

    /// Parse XML from bytes.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?;
        Self::parse(text)
    }

    fn copy_roxml_element(
        &mut self,
        text: &str,
        src: roxmltree::Node<'_, '_>,
        parent: Option<NodeId>,
    ) -> NodeId {
        let src_parent = src.parent().filter(|p| p.is_element());

        let mut attributes = Vec::new();
        for decl in src.namespaces() {
            if decl.name() == Some(ns::prefix::XML) {
                continue;
            }
            let inherited = src_parent
                .and_then(|p| p.lookup_namespace_uri(decl.name()))
                .is_some_and(|uri| uri == decl.uri());
            if !inherited {
                attributes.push(declaration_attribute(decl.name(), decl.uri()));
            }
        }
        // An `xmlns=""` undeclaration leaves no trace in the in-scope list.
        let parent_default = src_parent.and_then(|p| p.lookup_namespace_uri(None));
        if parent_default.is_some_and(|uri| !uri.is_empty())
            && src.lookup_namespace_uri(None).is_none()
        {
            attributes.push(declaration_attribute(None, ""));
        }

        for attr in src.attributes() {
            let name = match attr.namespace() {
                Some(uri) => {
                    let prefix = attribute_prefix(src, uri);
                    QName::with_prefix(uri, attr.name(), prefix.unwrap_or_default())
                }
                None => QName::local(attr.name()),
            };
            attributes.push(Attribute {
                name,
                value: attr.value().to_owned(),
                is_id: false,
            });
        }

        let tag = src.tag_name();
        let name = match tag.namespace() {
            Some(uri) => {
                let prefix = element_prefix(text, src, uri);
                QName::with_prefix(uri, tag.name(), prefix.unwrap_or_default())
            }
            None => QName::local(tag.name()),
        };

        let id = self.push_node(NodeKind::Element(Element { name, attributes }), parent);
        for child in src.children() {
            if child.is_element() {
                let child_id = self.copy_roxml_element(text, child, Some(id));
                self.nodes[id.0].children.push(child_id);
            } else if child.is_text() || child.is_comment() {
                let value = child.text().unwrap_or_default().to_owned();
                let kind = if child.is_text() {
                    NodeKind::Text(value)
                } else {
                    NodeKind::Comment(value)
                };
                let child_id = self.push_node(kind, Some(id));
                self.nodes[id.0].children.push(child_id);
            }
        }
        id
    }

    fn push_node(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let node = Node {
            kind,
            parent,
            children: Vec::new(),
        };
        if let Some(id) = self.free.pop() {
            self.nodes[id.0] = node;
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node, Error> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id.0))
    }

    fn element_data_mut(&mut self, id: NodeId) -> Result<&mut Element, Error> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(e)) => Ok(e),
            Some(_) => Err(Error::XmlStructure(format!("node {} is not an element", id.0))),
            None => Err(Error::UnknownNode(id.0)),
        }
    }

    /// Number of node slots in the arena, free ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Free every node that is neither in the document element's tree nor
    /// in a subtree rooted at one of `keep`. Freed slots are handed out
    /// again by later allocations, so handles to them must not be used
    /// afterwards. Returns the number of nodes freed.
    pub fn reclaim_unreachable(&mut self, keep: &[NodeId]) -> usize {
        let mut live = vec![false; self.nodes.len()];
        for id in &self.free {
            live[id.0] = true;
        }
        let mut stack: Vec<NodeId> = self.root.into_iter().chain(keep.iter().copied()).collect();
        while let Some(n) = stack.pop() {
            match live.get_mut(n.0) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            stack.extend(self.nodes[n.0].children.iter().copied());
        }

        let mut freed = 0;
        for (i, is_live) in live.iter().enumerate() {
            if *is_live {
                // A kept subtree whose old parent is about to be freed.
                if self.nodes[i].parent.is_some_and(|p| !live[p.0]) {
                    self.nodes[i].parent = None;
                }
                continue;
            }
            self.nodes[i] = Node {
                kind: NodeKind::Text(String::new()),
                parent: None,
                children: Vec::new(),
            };
            self.free.push(NodeId(i));
            freed += 1;
        }
        if freed > 0 {
            tracing::trace!(freed, free = self.free.len(), "reclaimed document nodes");
        }
        freed
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The document element, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make `id` the document element, replacing any existing one. The
    /// element is first detached from its current parent.
    pub fn set_root(&mut self, id: NodeId) -> Result<(), Error> {
        self.element(id)
            .ok_or_else(|| Error::XmlStructure(format!("node {} is not an element", id.0)))?;
        self.detach(id)?;
        self.root = Some(id);
        Ok(())
    }

    pub fn node_kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node_kind(id) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// The element's name, prefix included.
    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.element(id).map(|e| &e.name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map_or(&[], |n| n.children.as_slice())
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    /// The node and all its descendants, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if n.0 >= self.nodes.len() {
                continue;
            }
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// True if `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// The outermost ancestor of `id` (itself when detached).
    pub fn top_ancestor(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(p) = self.parent(current) {
            current = p;
        }
        current
    }

    /// True if the node is reachable from the document element.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.root == Some(self.top_ancestor(id))
    }

    // ── Construction and structure ───────────────────────────────────

    /// Create a detached element.
    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.push_node(
            NodeKind::Element(Element {
                name,
                attributes: Vec::new(),
            }),
            None,
        )
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(text.into()), None)
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Comment(text.into()), None)
    }

    /// Unlink a node from its parent, or from the document element slot.
    pub fn detach(&mut self, id: NodeId) -> Result<(), Error> {
        let parent = self.node(id)?.parent;
        if let Some(p) = parent {
            self.nodes[p.0].children.retain(|c| *c != id);
            self.nodes[id.0].parent = None;
        }
        if self.root == Some(id) {
            self.root = None;
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, moving it out of its
    /// previous position.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.node(child)?;
        if !self.is_element(parent) {
            return Err(Error::XmlStructure(format!(
                "cannot append to non-element node {}",
                parent.0
            )));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::XmlStructure(format!(
                "node {} cannot be appended to its own descendant",
                child.0
            )));
        }
        self.detach(child)?;
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// Append `child` under `parent`, re-declaring on `child` every
    /// namespace binding its subtree inherited from its old ancestors that
    /// is not in scope at the new location.
    pub fn adopt_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        let mut inherited: Vec<Namespace> = Vec::new();
        for e in self.descendants(child) {
            for used in self.used_namespaces(e) {
                let declared_inside = self
                    .declaring_element(e, used.prefix())
                    .is_some_and(|d| self.is_ancestor_or_self(child, d));
                if !declared_inside && !inherited.contains(&used) {
                    inherited.push(used);
                }
            }
        }

        self.append_child(parent, child)?;

        for binding in inherited {
            self.ensure_namespace(child, &binding)?;
        }
        Ok(())
    }

    /// Move every node of `other` into this arena. Returns the handle of
    /// `other`'s document element, now a detached element of `self`.
    pub fn import_document(&mut self, other: Document) -> Option<NodeId> {
        let offset = self.nodes.len();
        let shift = |id: NodeId| NodeId(id.0 + offset);
        for mut node in other.nodes {
            node.parent = node.parent.map(shift);
            node.children = node.children.into_iter().map(shift).collect();
            self.nodes.push(node);
        }
        self.free.extend(other.free.into_iter().map(shift));
        other.root.map(shift)
    }

    // ── Attributes ───────────────────────────────────────────────────

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map_or(&[], |e| e.attributes.as_slice())
    }

    pub fn attribute(&self, id: NodeId, name: &QName) -> Option<&str> {
        self.attribute_node(id, name).map(|a| a.value.as_str())
    }

    pub fn attribute_node(&self, id: NodeId, name: &QName) -> Option<&Attribute> {
        self.attributes(id).iter().find(|a| a.name == *name)
    }

    /// Set an attribute, replacing the value of an existing attribute with
    /// the same name. Replacing keeps the attribute's ID flag.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: QName,
        value: impl Into<String>,
    ) -> Result<(), Error> {
        let value = value.into();
        let element = self.element_data_mut(id)?;
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => {
                existing.value = value;
                existing.name = name;
            }
            None => element.attributes.push(Attribute {
                name,
                value,
                is_id: false,
            }),
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &QName) -> Result<Option<Attribute>, Error> {
        let element = self.element_data_mut(id)?;
        let pos = element.attributes.iter().position(|a| a.name == *name);
        Ok(pos.map(|p| element.attributes.remove(p)))
    }

    /// Flag or unflag an existing attribute as ID-typed.
    pub fn set_id_attribute(&mut self, id: NodeId, name: &QName, is_id: bool) -> Result<(), Error> {
        let element = self.element_data_mut(id)?;
        let attr = element
            .attributes
            .iter_mut()
            .find(|a| a.name == *name)
            .ok_or_else(|| Error::MissingAttribute(name.to_string()))?;
        attr.is_id = is_id;
        Ok(())
    }

    pub fn is_id_attribute(&self, id: NodeId, name: &QName) -> bool {
        self.attribute_node(id, name).is_some_and(|a| a.is_id)
    }

    /// Every element under `scope` (inclusive) carrying an ID-typed
    /// attribute with the given value.
    pub fn elements_by_id(&self, scope: NodeId, value: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| {
                self.attributes(*n)
                    .iter()
                    .any(|a| a.is_id && a.value == value)
            })
            .collect()
    }

    /// Resolve an ID value within the tree reachable from the document
    /// element. Only attributes flagged ID-typed are considered.
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        let root = self.root?;
        self.elements_by_id(root, value).into_iter().next()
    }

    // ── Namespaces ───────────────────────────────────────────────────

    /// Declare a namespace binding on an element, replacing any existing
    /// declaration of the same prefix.
    pub fn declare_namespace(&mut self, id: NodeId, binding: &Namespace) -> Result<(), Error> {
        let attr = declaration_attribute(binding.prefix(), binding.uri());
        self.set_attribute(id, attr.name, attr.value)
    }

    /// Bindings declared directly on an element.
    pub fn namespace_declarations(&self, id: NodeId) -> Vec<Namespace> {
        self.attributes(id)
            .iter()
            .filter_map(Attribute::declared_namespace)
            .collect()
    }

    /// Resolve a prefix (`None` for the default namespace) in the scope of
    /// `id`. An undeclared default namespace resolves to `None`.
    pub fn lookup_namespace_uri(&self, id: NodeId, prefix: Option<&str>) -> Option<String> {
        match prefix {
            Some(ns::prefix::XML) => return Some(ns::XML.to_owned()),
            Some(ns::prefix::XMLNS) => return Some(ns::XMLNS.to_owned()),
            _ => {}
        }
        let declaring = self.declaring_element(id, prefix)?;
        self.namespace_declarations(declaring)
            .into_iter()
            .find(|b| b.prefix() == prefix)
            .map(|b| b.uri().to_owned())
            .filter(|uri| !uri.is_empty())
    }

    /// Find a non-default prefix bound to `uri` in the scope of `id`.
    pub fn lookup_prefix(&self, id: NodeId, uri: &str) -> Option<String> {
        if uri == ns::XML {
            return Some(ns::prefix::XML.to_owned());
        }
        let mut current = Some(id);
        while let Some(n) = current {
            for binding in self.namespace_declarations(n) {
                if let Some(prefix) = binding.prefix() {
                    if binding.uri() == uri
                        && self.lookup_namespace_uri(id, Some(prefix)).as_deref() == Some(uri)
                    {
                        return Some(prefix.to_owned());
                    }
                }
            }
            current = self.parent(n);
        }
        None
    }

    /// All bindings in scope at `id`, keyed by prefix (`""` for default).
    pub fn in_scope_namespaces(&self, id: NodeId) -> BTreeMap<String, String> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            chain.push(n);
            current = self.parent(n);
        }
        let mut result = BTreeMap::new();
        for n in chain.into_iter().rev() {
            for binding in self.namespace_declarations(n) {
                let prefix = binding.prefix().unwrap_or("").to_owned();
                if binding.uri().is_empty() {
                    result.remove(&prefix);
                } else {
                    result.insert(prefix, binding.uri().to_owned());
                }
            }
        }
        result
    }

    /// Declare `binding` on `id` unless it is already in scope there.
    /// Returns whether a declaration was added.
    pub fn ensure_namespace(&mut self, id: NodeId, binding: &Namespace) -> Result<bool, Error> {
        if binding.prefix() == Some(ns::prefix::XML) {
            return Ok(false);
        }
        let current = self.lookup_namespace_uri(id, binding.prefix()).unwrap_or_default();
        if current == binding.uri() {
            return Ok(false);
        }
        self.declare_namespace(id, binding)?;
        Ok(true)
    }

    /// Nearest ancestor-or-self declaring `prefix`.
    fn declaring_element(&self, id: NodeId, prefix: Option<&str>) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(n) = current {
            if self
                .namespace_declarations(n)
                .iter()
                .any(|b| b.prefix() == prefix)
            {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// Bindings an element's own name and attribute names depend on.
    fn used_namespaces(&self, id: NodeId) -> Vec<Namespace> {
        let Some(element) = self.element(id) else {
            return Vec::new();
        };
        let mut used = vec![element.name.namespace()];
        for attr in &element.attributes {
            if attr.name.has_namespace()
                && !attr.is_namespace_declaration()
                && attr.name.namespace_uri() != ns::XML
            {
                used.push(attr.name.namespace());
            }
        }
        used
    }

    // ── Text ─────────────────────────────────────────────────────────

    /// Concatenated text of the node's direct text children.
    pub fn text_content(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|c| match self.node_kind(*c) {
                Some(NodeKind::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace every child of an element with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), Error> {
        self.element_data_mut(id)?;
        for child in self.children(id).to_vec() {
            self.detach(child)?;
        }
        let text_id = self.create_text(text);
        self.append_child(id, text_id)
    }

    /// Resolve a `prefix:local` attribute or content value to a name, using
    /// the bindings in scope at `id`.
    pub fn resolve_qualified_value(&self, id: NodeId, value: &str) -> Result<QName, Error> {
        let (prefix, local) = split_qualified(value.trim());
        let uri = self.lookup_namespace_uri(id, prefix).unwrap_or_default();
        if prefix.is_some() && uri.is_empty() {
            return Err(Error::XmlStructure(format!("unbound prefix in '{value}'")));
        }
        Ok(QName::with_prefix(uri, local, prefix.unwrap_or_default()))
    }

    // ── Serialization ────────────────────────────────────────────────

    /// Serialize a subtree exactly as stored.
    pub fn to_xml_string(&self, id: NodeId) -> Result<String, Error> {
        let mut writer = XmlWriter::new();
        self.write_node(&mut writer, id)?;
        writer.into_string()
    }

    /// Serialize the whole document with an XML declaration.
    pub fn to_document_string(&self) -> Result<String, Error> {
        let root = self
            .root
            .ok_or_else(|| Error::XmlStructure("document has no root element".into()))?;
        let mut writer = XmlWriter::new();
        writer.write_declaration()?;
        self.write_node(&mut writer, root)?;
        writer.into_string()
    }

    fn write_node(&self, writer: &mut XmlWriter, id: NodeId) -> Result<(), Error> {
        match &self.node(id)?.kind {
            NodeKind::Text(t) => writer.write_text(t),
            NodeKind::Comment(c) => writer.write_comment(c),
            NodeKind::Element(e) => {
                let tag = e.name.qualified_name();
                let names: Vec<String> = e.attributes.iter().map(|a| a.name.qualified_name()).collect();
                let attrs: Vec<(&str, &str)> = names
                    .iter()
                    .zip(&e.attributes)
                    .map(|(n, a)| (n.as_str(), a.value.as_str()))
                    .collect();
                let children = self.children(id);
                if children.is_empty() {
                    writer.empty_element(&tag, &attrs)
                } else {
                    writer.start_element(&tag, &attrs)?;
                    for child in children {
                        self.write_node(writer, *child)?;
                    }
                    writer.end_element(&tag)
                }
            }
        }
    }
}

/// Build the attribute that declares `uri` for `prefix`.
fn declaration_attribute(prefix: Option<&str>, uri: &str) -> Attribute {
    let name = match prefix {
        Some(p) => QName::with_prefix(ns::XMLNS, p, ns::prefix::XMLNS),
        None => QName::new(ns::XMLNS, ns::prefix::XMLNS),
    };
    Attribute {
        name,
        value: uri.to_owned(),
        is_id: false,
    }
}

/// Recover the prefix an element was written with from the source text,
/// falling back to any in-scope binding of its namespace.
fn element_prefix(text: &str, node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    let raw = text
        .get(node.range().start + 1..)
        .and_then(|tag| {
            tag.find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .map(|end| &tag[..end])
        })
        .map(split_qualified);
    if let Some((prefix, _)) = raw {
        if node.lookup_namespace_uri(prefix) == Some(uri) {
            return prefix.map(str::to_owned);
        }
    }
    if node.lookup_namespace_uri(None) == Some(uri) {
        return None;
    }
    attribute_prefix(node, uri)
}

/// Attributes never use the default namespace, so pick a named binding.
fn attribute_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == ns::XML {
        return Some(ns::prefix::XML.to_owned());
    }
    let mut seen = HashSet::new();
    node.namespaces()
        .filter_map(|b| b.name().map(|p| (p, b.uri())))
        .filter(|(p, _)| seen.insert(*p))
        .find(|(_, u)| *u == uri)
        .map(|(p, _)| p.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<r:Root xmlns:r="urn:r" xmlns="urn:d" xmlns:x="urn:x" Id="a1" x:flag="on"><Child>text</Child><x:Other xmlns="">plain</x:Other><!--note--></r:Root>"#;

    #[test]
    fn test_parse_names_and_prefixes() {
        let doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root().unwrap();
        let name = doc.name(root).unwrap();
        assert_eq!(name, &QName::new("urn:r", "Root"));
        assert_eq!(name.prefix(), Some("r"));

        let children: Vec<NodeId> = doc.element_children(root).collect();
        assert_eq!(children.len(), 2);
        let child = doc.name(children[0]).unwrap();
        assert_eq!(child, &QName::new("urn:d", "Child"));
        assert_eq!(child.prefix(), None);
        assert_eq!(doc.text_content(children[0]), "text");

        let flag = QName::new("urn:x", "flag");
        assert_eq!(doc.attribute(root, &flag), Some("on"));
        assert_eq!(doc.attribute_node(root, &flag).unwrap().name.prefix(), Some("x"));
    }

    #[test]
    fn test_parse_records_declarations_per_element() {
        let doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root().unwrap();
        let decls = doc.namespace_declarations(root);
        assert_eq!(decls.len(), 3);
        assert!(decls.contains(&Namespace::prefixed("urn:r", "r")));
        assert!(decls.contains(&Namespace::default_namespace("urn:d")));

        let children: Vec<NodeId> = doc.element_children(root).collect();
        assert!(doc.namespace_declarations(children[0]).is_empty());
        assert_eq!(
            doc.namespace_declarations(children[1]),
            vec![Namespace::default_namespace("")]
        );
        assert_eq!(doc.lookup_namespace_uri(children[1], None), None);
        assert_eq!(doc.lookup_namespace_uri(children[0], None).as_deref(), Some("urn:d"));
    }

    #[test]
    fn test_serialize_verbatim() {
        let doc = Document::parse(SAMPLE).unwrap();
        let out = doc.to_xml_string(doc.root().unwrap()).unwrap();
        assert!(out.contains(r#"Id="a1" x:flag="on">"#));
        assert!(out.contains("<Child>text</Child>"));
        assert!(out.contains(r#"<x:Other xmlns="">plain</x:Other>"#));
        assert!(out.contains("<!--note-->"));
        assert!(out.starts_with("<r:Root"));
    }

    #[test]
    fn test_serialized_whitespace_survives_reparse() {
        let doc = Document::parse("<R a=\"x&#10;y&#9;z&#13;\">1&#13;\n2</R>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.attribute(root, &QName::local("a")), Some("x\ny\tz\r"));

        let reparsed = Document::parse(&doc.to_xml_string(root).unwrap()).unwrap();
        let copy = reparsed.root().unwrap();
        assert_eq!(reparsed.attribute(copy, &QName::local("a")), Some("x\ny\tz\r"));
        assert_eq!(reparsed.text_content(copy), "1\r\n2");
    }

    #[test]
    fn test_reclaim_frees_unreachable_and_reuses_slots() {
        let mut doc = Document::parse("<r><a><b/></a><c/></r>").unwrap();
        let root = doc.root().unwrap();
        let a = doc.element_children(root).next().unwrap();
        let b = doc.element_children(a).next().unwrap();
        let c = doc.element_children(root).nth(1).unwrap();
        doc.detach(a).unwrap();
        doc.detach(c).unwrap();
        let size = doc.len();

        assert_eq!(doc.reclaim_unreachable(&[b]), 2);
        assert_eq!(doc.parent(b), None);
        assert_eq!(doc.to_xml_string(root).unwrap(), "<r/>");
        assert_eq!(doc.to_xml_string(b).unwrap(), "<b/>");

        let x = doc.create_element(QName::local("x"));
        let y = doc.create_element(QName::local("y"));
        assert_eq!(doc.len(), size);
        assert!([a, c].contains(&x) && [a, c].contains(&y));
        doc.append_child(root, x).unwrap();
        assert_eq!(doc.to_xml_string(root).unwrap(), "<r><x/></r>");
        assert_eq!(doc.reclaim_unreachable(&[]), 2);
    }

    #[test]
    fn test_id_flag_controls_lookup() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root().unwrap();
        let id_name = QName::local("Id");
        assert_eq!(doc.element_by_id("a1"), None);
        doc.set_id_attribute(root, &id_name, true).unwrap();
        assert!(doc.is_id_attribute(root, &id_name));
        assert_eq!(doc.element_by_id("a1"), Some(root));

        // Replacing the value keeps the flag.
        doc.set_attribute(root, id_name.clone(), "a2").unwrap();
        assert_eq!(doc.element_by_id("a2"), Some(root));

        assert!(matches!(
            doc.set_id_attribute(root, &QName::local("Missing"), true),
            Err(Error::MissingAttribute(_))
        ));
    }

    #[test]
    fn test_detached_elements_not_found_by_id() {
        let mut doc = Document::new();
        let e = doc.create_element(QName::local("E"));
        doc.set_attribute(e, QName::local("ID"), "x").unwrap();
        doc.set_id_attribute(e, &QName::local("ID"), true).unwrap();
        assert_eq!(doc.element_by_id("x"), None);
        assert_eq!(doc.elements_by_id(e, "x"), vec![e]);
        doc.set_root(e).unwrap();
        assert_eq!(doc.element_by_id("x"), Some(e));
    }

    #[test]
    fn test_append_moves_and_rejects_cycles() {
        let mut doc = Document::new();
        let a = doc.create_element(QName::local("a"));
        let b = doc.create_element(QName::local("b"));
        let c = doc.create_element(QName::local("c"));
        doc.set_root(a).unwrap();
        doc.append_child(a, c).unwrap();
        doc.append_child(b, c).unwrap();
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.parent(c), Some(b));
        assert!(doc.append_child(c, b).is_err());
        assert!(doc.append_child(c, c).is_err());

        // Appending the document element elsewhere vacates the root slot.
        let d = doc.create_element(QName::local("d"));
        doc.append_child(d, a).unwrap();
        assert_eq!(doc.root(), None);
    }

    #[test]
    fn test_adopt_redeclares_inherited_bindings() {
        let mut doc = Document::parse(
            r#"<p:Outer xmlns:p="urn:p" xmlns:q="urn:q"><p:Inner q:attr="1"><p:Leaf/></p:Inner></p:Outer>"#,
        )
        .unwrap();
        let outer = doc.root().unwrap();
        let inner = doc.element_children(outer).next().unwrap();

        let target = doc.create_element(QName::local("Target"));
        doc.set_root(target).unwrap();
        doc.adopt_child(target, inner).unwrap();

        assert_eq!(doc.lookup_namespace_uri(inner, Some("p")).as_deref(), Some("urn:p"));
        assert_eq!(doc.lookup_namespace_uri(inner, Some("q")).as_deref(), Some("urn:q"));
        let out = doc.to_xml_string(target).unwrap();
        assert!(Document::parse(&out).is_ok());
    }

    #[test]
    fn test_adopt_undeclares_default_namespace() {
        let mut doc = Document::new();
        let plain = doc.create_element(QName::local("Plain"));
        let parent = doc.create_element(QName::new("urn:d", "Parent"));
        doc.declare_namespace(parent, &Namespace::default_namespace("urn:d")).unwrap();
        doc.adopt_child(parent, plain).unwrap();
        assert_eq!(doc.lookup_namespace_uri(plain, None), None);
        assert_eq!(doc.namespace_declarations(plain), vec![Namespace::default_namespace("")]);
    }

    #[test]
    fn test_lookup_prefix_respects_shadowing() {
        let doc = Document::parse(
            r#"<a xmlns:p="urn:one"><b xmlns:p="urn:two"><c/></b></a>"#,
        )
        .unwrap();
        let a = doc.root().unwrap();
        let b = doc.element_children(a).next().unwrap();
        let c = doc.element_children(b).next().unwrap();
        assert_eq!(doc.lookup_prefix(c, "urn:two").as_deref(), Some("p"));
        assert_eq!(doc.lookup_prefix(c, "urn:one"), None);
        assert_eq!(doc.lookup_prefix(a, "urn:one").as_deref(), Some("p"));
    }

    #[test]
    fn test_resolve_qualified_value() {
        let doc = Document::parse(r#"<a xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#).unwrap();
        let a = doc.root().unwrap();
        let name = doc.resolve_qualified_value(a, "xs:string").unwrap();
        assert_eq!(name, QName::new(ns::XSD, "string"));
        assert_eq!(name.prefix(), Some("xs"));
        assert!(doc.resolve_qualified_value(a, "zz:string").is_err());
    }

    #[test]
    fn test_import_document() {
        let mut doc = Document::parse("<a><b/></a>").unwrap();
        let other = Document::parse("<c><d/></c>").unwrap();
        let imported = doc.import_document(other).unwrap();
        assert_eq!(doc.name(imported).unwrap(), &QName::local("c"));
        assert_eq!(doc.parent(imported), None);
        let d = doc.element_children(imported).next().unwrap();
        assert_eq!(doc.parent(d), Some(imported));
        assert_eq!(doc.name(doc.root().unwrap()).unwrap(), &QName::local("a"));
    }

    #[test]
    fn test_set_text_content() {
        let mut doc = Document::parse("<a>x<b/>y</a>").unwrap();
        let a = doc.root().unwrap();
        doc.set_text_content(a, "z").unwrap();
        assert_eq!(doc.to_xml_string(a).unwrap(), "<a>z</a>");
    }
}
