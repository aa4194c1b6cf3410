//! skylift-proxy — the request-time edge of the platform.
//!
//! Every inbound request carries a hostname of the form
//! `{project-id}.{domain}`. The proxy takes the first DNS label as the
//! project id, computes the storage prefix that project was published
//! under, and forwards the request there — rewriting bare `/` to
//! `/index.html` on the way. Resolution is a pure function of the Host
//! header: no shared mutable state, no locks, no caching.
//!
//! # Components
//!
//! - **`resolve`** — hostname → project id, path rewrite, target URL
//! - **`server`** — hyper HTTP/1.1 server and upstream forwarding

pub mod error;
pub mod resolve;
pub mod server;

pub use error::ProxyError;
pub use resolve::{project_from_host, rewrite_path, target_url, upstream_url};
pub use server::EdgeProxy;
