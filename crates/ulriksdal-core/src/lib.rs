#![forbid(unsafe_code)]

//! Shared vocabulary for the Ulriksdal XML binding library: qualified names,
//! namespace and algorithm constants, and the common error type.

pub mod algorithm;
pub mod error;
pub mod ns;
pub mod qname;

pub use error::{Error, Result};
pub use qname::{Namespace, QName};
