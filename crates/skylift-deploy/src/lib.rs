//! skylift-deploy — the deploy state machine.
//!
//! Composes the build runner and the artifact uploader: a project id
//! goes in, a fully published artifact set (or a terminal failure)
//! comes out, with one log event announcing each phase transition.
//!
//! ```text
//! Pending → Building → Uploading → Succeeded
//!               └──────────┴─────→ Failed
//! ```
//!
//! # Components
//!
//! - **`orchestrator`** — runs one job to a terminal phase
//! - **`registry`** — current phase per project, for status queries

pub mod orchestrator;
pub mod registry;

pub use orchestrator::{DeployPhase, Orchestrator, orchestrator_with};
pub use registry::DeployRegistry;
