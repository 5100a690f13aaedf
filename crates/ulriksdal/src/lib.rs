#![forbid(unsafe_code)]

pub use ulriksdal_bind as bind;
pub use ulriksdal_c14n as c14n;
pub use ulriksdal_core as core;
pub use ulriksdal_dsig as dsig;
pub use ulriksdal_xml as xml;
