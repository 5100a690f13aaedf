#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only "visibly utilized" namespace declarations are output. A prefix is
//! visibly utilized by an element when its tag name or one of its
//! attributes uses it, or when it is in the InclusiveNamespaces PrefixList.

use crate::escape;
use crate::render::{Attr, NsDecl};
use std::collections::{BTreeMap, BTreeSet};
use ulriksdal_core::{ns, Error};
use ulriksdal_xml::{Document, NodeId, NodeKind};

/// Canonicalize the subtree rooted at `apex`, omitting `exclude`.
pub fn canonicalize(
    doc: &Document,
    apex: NodeId,
    with_comments: bool,
    exclude: Option<NodeId>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    if !doc.is_element(apex) {
        return Err(Error::Canonicalization(format!(
            "node {} is not an element",
            apex.index()
        )));
    }
    let inclusive = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();
    let ctx = ExcC14nContext {
        doc,
        with_comments,
        exclude,
        inclusive_prefixes: inclusive,
    };
    let mut output = Vec::new();
    ctx.process_node(apex, &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct ExcC14nContext<'a> {
    doc: &'a Document,
    with_comments: bool,
    exclude: Option<NodeId>,
    inclusive_prefixes: BTreeSet<String>,
}

impl ExcC14nContext<'_> {
    fn process_node(
        &self,
        id: NodeId,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if self.exclude == Some(id) {
            return Ok(());
        }
        match self.doc.node_kind(id) {
            Some(NodeKind::Element(_)) => self.process_element(id, output, rendered_ns)?,
            Some(NodeKind::Text(text)) => {
                output.extend_from_slice(escape::escape_text(text).as_bytes());
            }
            Some(NodeKind::Comment(text)) => {
                if self.with_comments {
                    output.extend_from_slice(b"<!--");
                    output.extend_from_slice(text.as_bytes());
                    output.extend_from_slice(b"-->");
                }
            }
            None => return Err(Error::UnknownNode(id.index())),
        }
        Ok(())
    }

    fn process_element(
        &self,
        id: NodeId,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let element = self
            .doc
            .element(id)
            .ok_or_else(|| Error::Canonicalization(format!("node {} is not an element", id.index())))?;

        // Prefixes the names use must be bound. PrefixList entries that are
        // not in scope are ignored.
        let mut utilized: BTreeSet<String> = BTreeSet::new();
        utilized.insert(element.name.prefix().unwrap_or("").to_owned());

        let mut attrs = Vec::new();
        for attr in &element.attributes {
            if attr.is_namespace_declaration() {
                continue;
            }
            if attr.name.has_namespace() {
                let prefix = if attr.name.namespace_uri() == ns::XML {
                    ns::prefix::XML
                } else {
                    attr.name.prefix().ok_or_else(|| {
                        Error::Canonicalization(format!(
                            "namespaced attribute {} has no prefix",
                            attr.name
                        ))
                    })?
                };
                utilized.insert(prefix.to_owned());
                attrs.push(Attr {
                    name: attr.name.reprefixed(Some(prefix)),
                    value: attr.value.clone(),
                });
            } else {
                attrs.push(Attr {
                    name: attr.name.clone(),
                    value: attr.value.clone(),
                });
            }
        }
        attrs.sort();

        let in_scope = self.doc.in_scope_namespaces(id);
        let mut ns_decls = Vec::new();
        for prefix in utilized.union(&self.inclusive_prefixes) {
            if prefix == ns::prefix::XML {
                continue;
            }
            match in_scope.get(prefix) {
                Some(uri) => {
                    if rendered_ns.get(prefix) != Some(uri) {
                        ns_decls.push(NsDecl {
                            prefix: prefix.clone(),
                            uri: uri.clone(),
                        });
                    }
                }
                None if prefix.is_empty() => {
                    // The default namespace was rendered non-empty above
                    // but this element is in no namespace.
                    if rendered_ns.get("").is_some_and(|uri| !uri.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None if !utilized.contains(prefix) => {}
                None => {
                    return Err(Error::Canonicalization(format!(
                        "prefix '{prefix}' is not bound on {}",
                        element.name
                    )))
                }
            }
        }
        ns_decls.sort();

        let name = element.name.qualified_name();
        output.push(b'<');
        output.extend_from_slice(name.as_bytes());
        for decl in &ns_decls {
            decl.write_to(output);
        }
        for attr in &attrs {
            attr.write_to(output);
        }
        output.push(b'>');

        let mut child_rendered = rendered_ns.clone();
        for decl in ns_decls {
            child_rendered.insert(decl.prefix, decl.uri);
        }
        for child in self.doc.children(id) {
            self.process_node(*child, output, &child_rendered)?;
        }

        output.extend_from_slice(b"</");
        output.extend_from_slice(name.as_bytes());
        output.push(b'>');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{canonicalize_str, C14nMode};

    fn c14n(xml: &str) -> String {
        String::from_utf8(canonicalize_str(xml, C14nMode::Exclusive, &[]).unwrap()).unwrap()
    }

    #[test]
    fn test_unused_namespaces_dropped() {
        let out = c14n(r#"<a:Root xmlns:a="urn:a" xmlns:b="urn:b"><a:Child/></a:Root>"#);
        assert_eq!(out, r#"<a:Root xmlns:a="urn:a"><a:Child></a:Child></a:Root>"#);
    }

    #[test]
    fn test_namespace_pushed_down_to_user() {
        let out = c14n(r#"<Root xmlns:b="urn:b"><b:Child b:x="1"/></Root>"#);
        assert_eq!(out, r#"<Root><b:Child xmlns:b="urn:b" b:x="1"></b:Child></Root>"#);
    }

    #[test]
    fn test_attribute_ordering() {
        let out = c14n(r#"<e xmlns:z="urn:a" xmlns:y="urn:b" z:k="3" b="2" a="1" y:k="4"/>"#);
        assert_eq!(
            out,
            r#"<e xmlns:y="urn:b" xmlns:z="urn:a" a="1" b="2" z:k="3" y:k="4"></e>"#
        );
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let out = c14n(r#"<Root xmlns="urn:d"><Plain xmlns=""/></Root>"#);
        assert_eq!(out, r#"<Root xmlns="urn:d"><Plain xmlns=""></Plain></Root>"#);
    }

    #[test]
    fn test_comments() {
        let xml = "<r><!--c-->t</r>";
        assert_eq!(c14n(xml), "<r>t</r>");
        let with = canonicalize_str(xml, C14nMode::ExclusiveWithComments, &[]).unwrap();
        assert_eq!(String::from_utf8(with).unwrap(), "<r><!--c-->t</r>");
    }

    #[test]
    fn test_inclusive_prefix_list() {
        let xml = r#"<Root xmlns:q="urn:q"><Child/></Root>"#;
        let out = canonicalize_str(xml, C14nMode::Exclusive, &["q".to_owned()]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<Root xmlns:q="urn:q"><Child></Child></Root>"#
        );
    }

    #[test]
    fn test_unbound_inclusive_prefix_ignored() {
        let out = canonicalize_str("<a/>", C14nMode::Exclusive, &["xs".to_owned()]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<a></a>");

        let out = canonicalize_str(
            r#"<Root xmlns:q="urn:q"><Child/></Root>"#,
            C14nMode::Exclusive,
            &["xs".to_owned(), "q".to_owned()],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<Root xmlns:q="urn:q"><Child></Child></Root>"#
        );
    }

    #[test]
    fn test_subtree_and_exclusion() {
        let doc = Document::parse(
            r#"<p:Outer xmlns:p="urn:p"><p:Inner ID="x"><p:Drop/><p:Keep/></p:Inner></p:Outer>"#,
        )
        .unwrap();
        let outer = doc.root().unwrap();
        let inner = doc.element_children(outer).next().unwrap();
        let drop = doc.element_children(inner).next().unwrap();
        let out = canonicalize(&doc, inner, false, Some(drop), &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<p:Inner xmlns:p="urn:p" ID="x"><p:Keep></p:Keep></p:Inner>"#
        );
    }

    #[test]
    fn test_same_output_regardless_of_context() {
        let standalone = c14n(r#"<p:Inner xmlns:p="urn:p"><p:Leaf>v</p:Leaf></p:Inner>"#);
        let doc = Document::parse(
            r#"<o:Wrap xmlns:o="urn:o" xmlns:p="urn:p"><p:Inner><p:Leaf>v</p:Leaf></p:Inner></o:Wrap>"#,
        )
        .unwrap();
        let inner = doc.element_children(doc.root().unwrap()).next().unwrap();
        let embedded = canonicalize(&doc, inner, false, None, &[]).unwrap();
        assert_eq!(String::from_utf8(embedded).unwrap(), standalone);
    }
}
