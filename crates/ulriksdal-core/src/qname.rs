#![forbid(unsafe_code)]

//! Qualified names and namespace bindings.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A qualified name: namespace URI plus local name, with an optional
/// serialization prefix.
///
/// Equality, ordering and hashing use the namespace URI and local name only.
/// The prefix is carried along so that marshalling can reproduce it, but two
/// names that differ only by prefix are the same name.
#[derive(Debug, Clone)]
pub struct QName {
    namespace_uri: String,
    local_name: String,
    prefix: Option<String>,
}

impl QName {
    /// Create an unprefixed name. An empty `namespace_uri` means "no namespace".
    pub fn new(namespace_uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
            prefix: None,
        }
    }

    /// Create a name with a serialization prefix.
    pub fn with_prefix(
        namespace_uri: impl Into<String>,
        local_name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        let prefix = prefix.into();
        Self {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
            prefix: (!prefix.is_empty()).then_some(prefix),
        }
    }

    /// A name in no namespace.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", local_name)
    }

    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn has_namespace(&self) -> bool {
        !self.namespace_uri.is_empty()
    }

    /// Same name, different prefix.
    pub fn reprefixed(&self, prefix: Option<&str>) -> Self {
        Self {
            namespace_uri: self.namespace_uri.clone(),
            local_name: self.local_name.clone(),
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_owned),
        }
    }

    /// `prefix:local`, or just `local` when unprefixed.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// The namespace binding this name needs in scope to be serialized.
    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.namespace_uri.clone(), self.prefix.clone())
    }

    /// True when the prefix is also significant, i.e. both names would
    /// serialize identically.
    pub fn same_serialization(&self, other: &QName) -> bool {
        self == other && self.prefix == other.prefix
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace_uri == other.namespace_uri && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace_uri.hash(state);
        self.local_name.hash(state);
    }
}

impl Ord for QName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.namespace_uri
            .cmp(&other.namespace_uri)
            .then_with(|| self.local_name.cmp(&other.local_name))
    }
}

impl PartialOrd for QName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_uri.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace_uri, self.local_name)
        }
    }
}

/// A namespace binding: URI plus prefix (`None` for the default namespace).
///
/// Unlike [`QName`], the prefix is part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    uri: String,
    prefix: Option<String>,
}

impl Namespace {
    pub fn new(uri: impl Into<String>, prefix: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            prefix: prefix.filter(|p| !p.is_empty()),
        }
    }

    pub fn prefixed(uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(uri, Some(prefix.into()))
    }

    pub fn default_namespace(uri: impl Into<String>) -> Self {
        Self::new(uri, None)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "xmlns:{p}=\"{}\"", self.uri),
            None => write!(f, "xmlns=\"{}\"", self.uri),
        }
    }
}

/// Split `prefix:local` into its parts. A value without a colon has no prefix.
pub fn split_qualified(value: &str) -> (Option<&str>, &str) {
    match value.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, value),
    }
}
