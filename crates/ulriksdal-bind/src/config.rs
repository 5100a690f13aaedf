#![forbid(unsafe_code)]

//! Loader for the registry bootstrap document.
//!
//! The document has an `<XMLTooling>` root in the
//! `http://www.opensaml.org/xmltooling-config` namespace with two optional
//! sections:
//!
//! - `<ObjectProviders>`: one `<ObjectProvider qualifiedName="p:Local">`
//!   per name, with `<BuilderClass>`, `<MarshallingClass>` and
//!   `<UnmarshallingClass>` children whose `className` names an entry of the
//!   [`ProviderCatalog`]
//! - `<IDAttributes>`: `<IDAttribute>p:local</IDAttribute>` entries added to
//!   the ID-attribute registry
//!
//! An unprefixed `qualifiedName` resolves against the default namespace in
//! scope, so `qualifiedName="DEFAULT"` names the default provider.

use crate::any::{
    AnyElementBuilder, AnyElementMarshaller, AnyElementUnmarshaller, XsStringBuilder,
    XsStringMarshaller, XsStringUnmarshaller,
};
use crate::context::BindingContext;
use crate::marshaller::Marshaller;
use crate::object::XmlObjectBuilder;
use crate::registry::Provider;
use crate::unmarshaller::Unmarshaller;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use ulriksdal_core::qname::split_qualified;
use ulriksdal_core::{ns, Error, QName, Result};

pub type BuilderFactory = fn() -> Arc<dyn XmlObjectBuilder>;
pub type MarshallerFactory = fn() -> Arc<dyn Marshaller>;
pub type UnmarshallerFactory = fn() -> Arc<dyn Unmarshaller>;

/// Implementation names a bootstrap document may refer to, each mapped to
/// a typed constructor.
#[derive(Debug, Clone, Default)]
pub struct ProviderCatalog {
    builders: HashMap<String, BuilderFactory>,
    marshallers: HashMap<String, MarshallerFactory>,
    unmarshallers: HashMap<String, UnmarshallerFactory>,
}

impl ProviderCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the built-in element types.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.add_builder("ulriksdal_bind::any::AnyElementBuilder", || Arc::new(AnyElementBuilder));
        catalog.add_marshaller("ulriksdal_bind::any::AnyElementMarshaller", || {
            Arc::new(AnyElementMarshaller)
        });
        catalog.add_unmarshaller("ulriksdal_bind::any::AnyElementUnmarshaller", || {
            Arc::new(AnyElementUnmarshaller)
        });
        catalog.add_builder("ulriksdal_bind::any::XsStringBuilder", || Arc::new(XsStringBuilder));
        catalog.add_marshaller("ulriksdal_bind::any::XsStringMarshaller", || Arc::new(XsStringMarshaller));
        catalog.add_unmarshaller("ulriksdal_bind::any::XsStringUnmarshaller", || {
            Arc::new(XsStringUnmarshaller)
        });
        catalog
    }

    pub fn add_builder(&mut self, name: &str, factory: BuilderFactory) {
        self.builders.insert(name.to_owned(), factory);
    }

    pub fn add_marshaller(&mut self, name: &str, factory: MarshallerFactory) {
        self.marshallers.insert(name.to_owned(), factory);
    }

    pub fn add_unmarshaller(&mut self, name: &str, factory: UnmarshallerFactory) {
        self.unmarshallers.insert(name.to_owned(), factory);
    }

    fn builder(&self, name: &str) -> Result<Arc<dyn XmlObjectBuilder>> {
        self.builders
            .get(name)
            .map(|f| f())
            .ok_or_else(|| Error::Config(format!("unknown builder '{name}'")))
    }

    fn marshaller(&self, name: &str) -> Result<Arc<dyn Marshaller>> {
        self.marshallers
            .get(name)
            .map(|f| f())
            .ok_or_else(|| Error::Config(format!("unknown marshaller '{name}'")))
    }

    fn unmarshaller(&self, name: &str) -> Result<Arc<dyn Unmarshaller>> {
        self.unmarshallers
            .get(name)
            .map(|f| f())
            .ok_or_else(|| Error::Config(format!("unknown unmarshaller '{name}'")))
    }
}

/// What a bootstrap document registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub providers: Vec<QName>,
    pub id_attributes: Vec<QName>,
}

/// Applies bootstrap documents to a [`BindingContext`]'s registries.
#[derive(Debug, Clone)]
pub struct ConfigurationLoader {
    catalog: ProviderCatalog,
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self::new(ProviderCatalog::with_builtins())
    }
}

impl ConfigurationLoader {
    pub fn new(catalog: ProviderCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog_mut(&mut self) -> &mut ProviderCatalog {
        &mut self.catalog
    }

    pub fn load_file(&self, ctx: &BindingContext, path: &Path) -> Result<LoadSummary> {
        let xml = std::fs::read_to_string(path)?;
        let summary = self.load_str(ctx, &xml)?;
        tracing::info!(
            path = %path.display(),
            providers = summary.providers.len(),
            id_attributes = summary.id_attributes.len(),
            "loaded bootstrap configuration"
        );
        Ok(summary)
    }

    /// Apply a bootstrap document. Stops at the first bad entry; entries
    /// before it stay registered.
    pub fn load_str(&self, ctx: &BindingContext, xml: &str) -> Result<LoadSummary> {
        let doc = roxmltree::Document::parse_with_options(xml, ulriksdal_xml::parsing_options())
            .map_err(|e| Error::XmlParse(format!("bootstrap configuration: {e}")))?;
        let root = doc.root_element();
        if !is_config_element(root, ns::node::XMLTOOLING) {
            return Err(Error::Config(format!(
                "expected {{{}}}{} as document element",
                ns::XMLTOOLING_CONFIG,
                ns::node::XMLTOOLING
            )));
        }

        let mut summary = LoadSummary::default();
        for section in root.children().filter(|n| n.is_element()) {
            if is_config_element(section, ns::node::OBJECT_PROVIDERS) {
                for entry in section
                    .children()
                    .filter(|n| is_config_element(*n, ns::node::OBJECT_PROVIDER))
                {
                    summary.providers.push(self.load_provider(ctx, entry)?);
                }
            } else if is_config_element(section, ns::node::ID_ATTRIBUTES) {
                for entry in section
                    .children()
                    .filter(|n| is_config_element(*n, ns::node::ID_ATTRIBUTE))
                {
                    let name = resolve_qname(entry, entry.text().unwrap_or(""))?;
                    ctx.id_attributes().register(name.clone());
                    summary.id_attributes.push(name);
                }
            }
        }
        Ok(summary)
    }

    fn load_provider(&self, ctx: &BindingContext, entry: roxmltree::Node<'_, '_>) -> Result<QName> {
        let qualified = entry.attribute(ns::attr::QUALIFIED_NAME).ok_or_else(|| {
            Error::Config(format!("{} without {}", ns::node::OBJECT_PROVIDER, ns::attr::QUALIFIED_NAME))
        })?;
        let name = resolve_qname(entry, qualified)?;

        match self.resolve_provider(entry) {
            Ok(provider) => {
                ctx.registry().register(name.clone(), provider);
                Ok(name)
            }
            Err(err) => {
                ctx.registry().deregister(&name);
                Err(Error::Config(format!("object provider {name}: {err}")))
            }
        }
    }

    fn resolve_provider(&self, entry: roxmltree::Node<'_, '_>) -> Result<Provider> {
        Ok(Provider {
            builder: self.catalog.builder(class_name(entry, ns::node::BUILDER_CLASS)?)?,
            marshaller: self
                .catalog
                .marshaller(class_name(entry, ns::node::MARSHALLING_CLASS)?)?,
            unmarshaller: self
                .catalog
                .unmarshaller(class_name(entry, ns::node::UNMARSHALLING_CLASS)?)?,
        })
    }
}

fn is_config_element(node: roxmltree::Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(ns::XMLTOOLING_CONFIG)
}

fn class_name<'a>(entry: roxmltree::Node<'a, '_>, element: &str) -> Result<&'a str> {
    entry
        .children()
        .find(|n| is_config_element(*n, element))
        .ok_or_else(|| Error::Config(format!("missing {element}")))?
        .attribute(ns::attr::CLASS_NAME)
        .ok_or_else(|| Error::Config(format!("{element} without {}", ns::attr::CLASS_NAME)))
}

fn resolve_qname(node: roxmltree::Node<'_, '_>, value: &str) -> Result<QName> {
    let (prefix, local) = split_qualified(value.trim());
    if local.is_empty() {
        return Err(Error::Config(format!("empty qualified name '{value}'")));
    }
    let uri = match node.lookup_namespace_uri(prefix) {
        Some(uri) => uri,
        None if prefix.is_none() => "",
        None => return Err(Error::Config(format!("unbound prefix in '{value}'"))),
    };
    Ok(QName::with_prefix(uri, local, prefix.unwrap_or_default()))
}
