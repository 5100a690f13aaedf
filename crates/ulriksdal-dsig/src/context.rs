#![forbid(unsafe_code)]

//! DSig context: the shared HMAC key used to sign and verify.

use std::fmt;

/// Key material and settings for signature operations.
#[derive(Clone)]
pub struct DsigContext {
    key: Vec<u8>,
    /// Written as `ds:KeyName` when signing. When set, verification rejects
    /// signatures that name a different key.
    pub key_name: Option<String>,
    /// Log the canonical bytes fed to the digest and the MAC.
    pub debug: bool,
}

impl DsigContext {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            key_name: None,
            debug: false,
        }
    }

    pub fn with_key_name(mut self, name: &str) -> Self {
        self.key_name = Some(name.to_owned());
        self
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for DsigContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DsigContext")
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .field("key_name", &self.key_name)
            .field("debug", &self.debug)
            .finish()
    }
}
