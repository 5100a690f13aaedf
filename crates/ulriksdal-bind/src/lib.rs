#![forbid(unsafe_code)]

//! Typed object/XML binding for the Ulriksdal library.
//!
//! An [`XmlObjectGraph`] holds bound objects and the XML document their
//! cached DOM points into. Objects are created and dispatched through a
//! [`ProviderRegistry`] keyed by element name or schema type, converted to
//! XML by a [`Marshaller`] and back by an [`Unmarshaller`]. A
//! [`BindingContext`] bundles the registries, the signature hook and the
//! unknown-element policy for both directions.

pub mod any;
pub mod children;
pub mod config;
pub mod context;
pub mod graph;
pub mod marshaller;
pub mod object;
pub mod registry;
pub mod signature;
pub mod unmarshaller;

pub use any::{AnyElement, XsString};
pub use children::{ChildrenList, IndexedChildrenList};
pub use config::{ConfigurationLoader, LoadSummary, ProviderCatalog};
pub use context::BindingContext;
pub use graph::XmlObjectGraph;
pub use marshaller::Marshaller;
pub use object::{ObjectCore, ObjectId, XmlObject, XmlObjectBuilder};
pub use registry::{IdAttributeRegistry, Provider, ProviderRegistry};
pub use signature::{SignatureHook, SigningParameters};
pub use unmarshaller::Unmarshaller;
