#![forbid(unsafe_code)]

use crate::QName;

/// Errors produced by the Ulriksdal XML binding library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("{actual} does not match target {expected}")]
    TargetMismatch { expected: QName, actual: QName },

    #[error("no object provider registered for {0}")]
    NoProviderRegistered(QName),

    #[error("no marshaller registered for child {child} of {parent}")]
    NoMarshallerForChild { parent: QName, child: QName },

    #[error("{child} is already the child of another object than {owner}")]
    OwnershipConflict { child: QName, owner: QName },

    #[error("malformed type annotation: {0}")]
    MalformedTypeAnnotation(String),

    #[error("unknown DOM node: {0}")]
    UnknownNode(usize),

    #[error("unknown object: {0}")]
    UnknownObject(usize),

    #[error("object {0} is not of the requested type")]
    WrongObjectType(QName),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for both flavours of the "no provider" failure, the only kind
    /// callers may choose to tolerate.
    pub fn is_no_provider(&self) -> bool {
        matches!(
            self,
            Error::NoProviderRegistered(_) | Error::NoMarshallerForChild { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_provider_family() {
        let name = QName::new("urn:x", "Foo");
        assert!(Error::NoProviderRegistered(name.clone()).is_no_provider());
        assert!(Error::NoMarshallerForChild {
            parent: name.clone(),
            child: QName::new("urn:x", "Bar"),
        }
        .is_no_provider());
        assert!(!Error::MalformedTypeAnnotation("x".into()).is_no_provider());
    }

    #[test]
    fn test_messages_carry_names() {
        let err = Error::TargetMismatch {
            expected: QName::new("urn:x", "Foo"),
            actual: QName::new("urn:x", "Bar"),
        };
        assert_eq!(err.to_string(), "{urn:x}Bar does not match target {urn:x}Foo");
    }
}
