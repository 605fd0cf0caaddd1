pub mod http;
pub mod metrics_defs;

#[cfg(feature = "testutils")]
pub mod testutils;
