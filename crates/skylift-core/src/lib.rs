//! skylift-core — shared types for the Skylift deploy platform.
//!
//! A project id is the single identifier threaded through the whole
//! system: it names the log channel (`logs:{id}`), the storage key
//! prefix (`__outputs/{id}/...`), and the routing subdomain
//! (`{id}.example.com`). This crate owns that type, the build job
//! descriptor, and the `skylift.toml` configuration surface.

pub mod config;
pub mod types;

pub use config::SkyliftConfig;
pub use types::{BuildJob, ProjectId, ProjectIdError};
