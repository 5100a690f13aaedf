#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

/// XML Schema namespace
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Exclusive C14N namespace
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// Namespace of the object provider bootstrap documents
pub const XMLTOOLING_CONFIG: &str = "http://www.opensaml.org/xmltooling-config";

/// SAML 2.0 assertion namespace
pub const SAML2: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SAML 2.0 protocol namespace
pub const SAML2P: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// WS-Security utility namespace
pub const WSU: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";

// ── Conventional prefixes ────────────────────────────────────────────

pub mod prefix {
    pub const XML: &str = "xml";
    pub const XMLNS: &str = "xmlns";
    pub const XSD: &str = "xs";
    pub const XSI: &str = "xsi";
    pub const DSIG: &str = "ds";
    pub const EXC_C14N: &str = "ec";
    pub const XMLTOOLING_CONFIG: &str = "xt";
}

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    // DSig elements
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_NAME: &str = "KeyName";
    pub const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";

    // Bootstrap configuration elements
    pub const XMLTOOLING: &str = "XMLTooling";
    pub const OBJECT_PROVIDERS: &str = "ObjectProviders";
    pub const OBJECT_PROVIDER: &str = "ObjectProvider";
    pub const BUILDER_CLASS: &str = "BuilderClass";
    pub const MARSHALLING_CLASS: &str = "MarshallingClass";
    pub const UNMARSHALLING_CLASS: &str = "UnmarshallingClass";
    pub const ID_ATTRIBUTES: &str = "IDAttributes";
    pub const ID_ATTRIBUTE: &str = "IDAttribute";

    /// Local name of the default object provider.
    pub const DEFAULT_PROVIDER: &str = "DEFAULT";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "ID";
    pub const XML_ID: &str = "id";
    pub const WSU_ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const ALGORITHM: &str = "Algorithm";
    pub const PREFIX_LIST: &str = "PrefixList";

    // Schema instance attributes
    pub const XSI_TYPE: &str = "type";
    pub const XSI_SCHEMA_LOCATION: &str = "schemaLocation";
    pub const XSI_NO_NAMESPACE_SCHEMA_LOCATION: &str = "noNamespaceSchemaLocation";
    pub const XSI_NIL: &str = "nil";

    // Bootstrap configuration attributes
    pub const QUALIFIED_NAME: &str = "qualifiedName";
    pub const CLASS_NAME: &str = "className";
}
