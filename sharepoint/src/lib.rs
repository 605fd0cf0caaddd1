//! Permission lookups for documents stored in SharePoint Online.
//!
//! Authentication uses the client credentials grant against Entra ID; the
//! document is then located through Microsoft Graph by site name and etag.

pub mod auth;
pub mod config;
pub mod errors;
pub mod graph;
pub mod metrics_defs;
pub mod permission;
pub mod resolver;

pub use errors::PermissionError;
pub use permission::PermissionEntry;
pub use resolver::PermissionResolver;
