#![forbid(unsafe_code)]

//! Provider and ID-attribute registries.
//!
//! Both are read on every element and written rarely, so readers load an
//! immutable snapshot through `ArcSwap` and writers build a new snapshot
//! under a mutex and swap it in.

use crate::marshaller::Marshaller;
use crate::object::XmlObjectBuilder;
use crate::unmarshaller::Unmarshaller;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use ulriksdal_core::{ns, QName};

/// The capability bundle registered for one QName.
#[derive(Debug, Clone)]
pub struct Provider {
    pub builder: Arc<dyn XmlObjectBuilder>,
    pub marshaller: Arc<dyn Marshaller>,
    pub unmarshaller: Arc<dyn Unmarshaller>,
}

impl Provider {
    pub fn new(
        builder: impl XmlObjectBuilder + 'static,
        marshaller: impl Marshaller + 'static,
        unmarshaller: impl Unmarshaller + 'static,
    ) -> Self {
        Self {
            builder: Arc::new(builder),
            marshaller: Arc::new(marshaller),
            unmarshaller: Arc::new(unmarshaller),
        }
    }
}

/// Maps element names and schema types to providers.
///
/// The three capabilities are stored as one bundle per name, so a lookup
/// never observes a builder without its marshaller and unmarshaller.
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: ArcSwap<HashMap<QName, Provider>>,
    write_lock: Mutex<()>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: ArcSwap::from_pointee(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// The name the fallback provider is registered under.
    pub fn default_provider(&self) -> QName {
        default_provider_name()
    }

    /// Register `provider` for `name`, replacing any existing registration.
    pub fn register(&self, name: QName, provider: Provider) {
        let _guard = self.write_lock.lock();
        let mut next = HashMap::clone(&self.providers.load());
        tracing::debug!(element = %name, "registering object provider");
        next.insert(name, provider);
        self.providers.store(Arc::new(next));
    }

    /// Remove the registration for `name`. Returns whether there was one.
    pub fn deregister(&self, name: &QName) -> bool {
        let _guard = self.write_lock.lock();
        let mut next = HashMap::clone(&self.providers.load());
        let removed = next.remove(name).is_some();
        if removed {
            tracing::debug!(element = %name, "deregistered object provider");
            self.providers.store(Arc::new(next));
        }
        removed
    }

    /// The provider registered for exactly `name`.
    pub fn lookup_exact(&self, name: &QName) -> Option<Provider> {
        self.providers.load().get(name).cloned()
    }

    /// The provider for `name`, or the default provider if `name` has none.
    pub fn lookup(&self, name: &QName) -> Option<Provider> {
        let snapshot = self.providers.load();
        snapshot
            .get(name)
            .or_else(|| snapshot.get(&default_provider_name()))
            .cloned()
    }

    /// Resolve the provider for an object or element: by schema type, then
    /// element name, then the default provider, all from one snapshot.
    pub fn resolve(&self, schema_type: Option<&QName>, element_name: &QName) -> Option<Provider> {
        let snapshot = self.providers.load();
        schema_type
            .and_then(|t| snapshot.get(t))
            .or_else(|| snapshot.get(element_name))
            .or_else(|| snapshot.get(&default_provider_name()))
            .cloned()
    }

    /// Every registered name, sorted.
    pub fn names(&self) -> Vec<QName> {
        let mut names: Vec<QName> = self.providers.load().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.load().is_empty()
    }
}

fn default_provider_name() -> QName {
    QName::new(ns::XMLTOOLING_CONFIG, ns::node::DEFAULT_PROVIDER)
}

/// Attribute names that are of type `ID` wherever they appear.
///
/// Seeded with `xml:id`.
#[derive(Debug)]
pub struct IdAttributeRegistry {
    names: ArcSwap<HashSet<QName>>,
    write_lock: Mutex<()>,
}

impl Default for IdAttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAttributeRegistry {
    pub fn new() -> Self {
        let mut names = HashSet::new();
        names.insert(QName::new(ns::XML, ns::attr::XML_ID));
        Self {
            names: ArcSwap::from_pointee(names),
            write_lock: Mutex::new(()),
        }
    }

    pub fn register(&self, name: QName) {
        let _guard = self.write_lock.lock();
        let mut next = HashSet::clone(&self.names.load());
        tracing::debug!(attribute = %name, "registering ID attribute");
        next.insert(name);
        self.names.store(Arc::new(next));
    }

    pub fn deregister(&self, name: &QName) -> bool {
        let _guard = self.write_lock.lock();
        let mut next = HashSet::clone(&self.names.load());
        let removed = next.remove(name);
        if removed {
            self.names.store(Arc::new(next));
        }
        removed
    }

    pub fn is_id_attribute(&self, name: &QName) -> bool {
        self.names.load().contains(name)
    }

    pub fn names(&self) -> Vec<QName> {
        let mut names: Vec<QName> = self.names.load().iter().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::any::{AnyElementBuilder, AnyElementMarshaller, AnyElementUnmarshaller};
    use crate::any::{XsStringBuilder, XsStringMarshaller, XsStringUnmarshaller};

    fn any_provider() -> Provider {
        Provider::new(AnyElementBuilder, AnyElementMarshaller, AnyElementUnmarshaller)
    }

    fn string_provider() -> Provider {
        Provider::new(XsStringBuilder, XsStringMarshaller, XsStringUnmarshaller)
    }

    fn is_string_provider(p: &Provider) -> bool {
        format!("{:?}", p.builder).contains("XsString")
    }

    #[test]
    fn test_lookup_falls_back_to_default() {
        let registry = ProviderRegistry::new();
        let foo = QName::new("urn:ns", "Foo");
        let bar = QName::new("urn:ns", "Bar");

        registry.register(foo.clone(), string_provider());
        assert!(registry.lookup(&bar).is_none());

        registry.register(registry.default_provider(), any_provider());
        let found = registry.lookup(&bar).unwrap();
        assert!(!is_string_provider(&found));
        assert!(is_string_provider(&registry.lookup(&foo).unwrap()));
        assert!(registry.lookup_exact(&bar).is_none());
    }

    #[test]
    fn test_default_provider_name() {
        let registry = ProviderRegistry::new();
        assert_eq!(
            registry.default_provider(),
            QName::new("http://www.opensaml.org/xmltooling-config", "DEFAULT")
        );
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = ProviderRegistry::new();
        let foo = QName::new("urn:ns", "Foo");
        registry.register(foo.clone(), any_provider());
        registry.register(foo.clone(), string_provider());
        assert_eq!(registry.len(), 1);
        assert!(is_string_provider(&registry.lookup(&foo).unwrap()));
        assert!(registry.deregister(&foo));
        assert!(!registry.deregister(&foo));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_prefers_schema_type() {
        let registry = ProviderRegistry::new();
        let element = QName::new("urn:ns", "Name");
        let xs_string = QName::new(ns::XSD, "string");
        registry.register(element.clone(), any_provider());
        registry.register(xs_string.clone(), string_provider());
        assert!(is_string_provider(&registry.resolve(Some(&xs_string), &element).unwrap()));
        assert!(!is_string_provider(&registry.resolve(None, &element).unwrap()));
        assert!(registry
            .resolve(Some(&QName::new("urn:ns", "Unknown")), &QName::new("urn:ns", "Other"))
            .is_none());
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let registry = Arc::new(ProviderRegistry::new());
        let names: Vec<QName> = (0..50).map(|i| QName::new("urn:ns", format!("E{i}"))).collect();
        let writer = {
            let registry = Arc::clone(&registry);
            let names = names.clone();
            std::thread::spawn(move || {
                for name in names {
                    registry.register(name, any_provider());
                }
            })
        };
        let reader = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let mut seen = 0;
                for _ in 0..200 {
                    seen = seen.max(registry.len());
                }
                seen
            })
        };
        writer.join().unwrap();
        assert!(reader.join().unwrap() <= 50);
        assert_eq!(registry.names().len(), 50);
    }

    #[test]
    fn test_id_registry_seeded_with_xml_id() {
        let registry = IdAttributeRegistry::new();
        assert!(registry.is_id_attribute(&QName::new(ns::XML, "id")));
        let saml_id = QName::local("ID");
        assert!(!registry.is_id_attribute(&saml_id));
        registry.register(saml_id.clone());
        assert!(registry.is_id_attribute(&saml_id));
        assert!(registry.deregister(&saml_id));
        assert!(!registry.is_id_attribute(&saml_id));
    }
}
