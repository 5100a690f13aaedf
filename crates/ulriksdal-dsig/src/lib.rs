#![forbid(unsafe_code)]

//! Enveloped XML-DSig signatures for the Ulriksdal binding engine.
//!
//! [`EnvelopedSigner`] plugs into a `BindingContext` as its signature hook
//! and signs elements as they are marshalled. [`verify`] checks a signature
//! already present in a document.

pub mod context;
pub mod digest;
pub mod mac;
pub mod sign;
pub mod verify;

pub use context::DsigContext;
pub use sign::EnvelopedSigner;
pub use verify::{find_signatures, verify, verify_all, VerifyResult};
