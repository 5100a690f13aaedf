#![forbid(unsafe_code)]

//! Exclusive XML Canonicalization 1.0 for the Ulriksdal XML binding
//! library, with and without comments.
//!
//! Canonicalization works on a subtree of a [`Document`] and can leave out
//! one descendant subtree, which is how the enveloped-signature transform
//! removes the `Signature` element from its own digest.

pub mod escape;
pub mod exclusive;
pub mod render;

use ulriksdal_core::{algorithm, Error};
use ulriksdal_xml::{Document, NodeId};

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(self, Self::ExclusiveWithComments)
    }
}

/// Canonicalize the subtree rooted at `apex`.
///
/// - `exclude`: a descendant whose subtree is omitted from the output
/// - `inclusive_prefixes`: the InclusiveNamespaces PrefixList (`#default`
///   names the default namespace)
pub fn canonicalize(
    doc: &Document,
    apex: NodeId,
    mode: C14nMode,
    exclude: Option<NodeId>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    exclusive::canonicalize(doc, apex, mode.with_comments(), exclude, inclusive_prefixes)
}

/// Parse the text and canonicalize its document element.
pub fn canonicalize_str(
    xml: &str,
    mode: C14nMode,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let doc = Document::parse(xml)?;
    let root = doc
        .root()
        .ok_or_else(|| Error::Canonicalization("document has no root element".into()))?;
    canonicalize(&doc, root, mode, None, inclusive_prefixes)
}
