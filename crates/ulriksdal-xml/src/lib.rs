#![forbid(unsafe_code)]

//! XML tree layer for the Ulriksdal binding engine.
//!
//! [`Document`] is a mutable element tree parsed with `roxmltree` and
//! serialized with `quick-xml`. Unlike a read-only parse tree it lets the
//! binding layer build elements, move subtrees between parents, and flag
//! attributes as ID-typed.

pub mod document;
pub mod writer;

pub use document::{Attribute, Document, Element, NodeId, NodeKind};
pub use writer::XmlWriter;

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree does not expand external entities, and SAML metadata in the
/// wild sometimes carries an internal subset.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}
