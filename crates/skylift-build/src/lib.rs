//! skylift-build — executes a project's build command and streams its
//! output to log subscribers line by line.
//!
//! The runner owns exactly one concern: turn a [`BuildJob`] into a
//! terminal [`BuildStatus`] while every stdout/stderr line the child
//! writes is forwarded to the project's log channel as it appears.
//! Retry policy belongs to the caller; the runner never retries.

pub mod runner;

pub use runner::{BuildError, BuildRunner, BuildStatus};

// Re-exported so callers constructing jobs do not need skylift-core.
pub use skylift_core::BuildJob;
