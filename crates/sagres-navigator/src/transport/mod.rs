//! HTTP transport: client, fetched pages and the tagged request registry.

pub mod http_client;
pub mod page;
pub mod registry;

pub use http_client::{Credential, HttpClient, PendingDownload, RequestOptions};
pub use page::Page;
pub use registry::{RequestGuard, RequestRegistry};
