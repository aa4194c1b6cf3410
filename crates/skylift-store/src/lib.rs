//! skylift-store — durable artifact storage for published sites.
//!
//! A deploy's build output is pushed file-by-file to object storage
//! under the key prefix `__outputs/{project_id}/`, content-typed from
//! the file extension. The edge proxy later serves straight from that
//! prefix, so re-deploying a project overwrites the same keys
//! (last-write-wins, no versioning).
//!
//! # Components
//!
//! - **`store`** — the `ObjectStore` port plus HTTP and in-memory impls
//! - **`mime`** — extension → content-type resolution
//! - **`uploader`** — recursive walk + bounded-concurrency upload

pub mod error;
pub mod mime;
pub mod store;
pub mod uploader;

pub use error::{StoreError, StoreResult};
pub use mime::content_type_for;
pub use store::{HttpObjectStore, MemoryObjectStore, ObjectStore};
pub use uploader::Uploader;
