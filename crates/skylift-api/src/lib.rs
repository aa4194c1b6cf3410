//! skylift-api — REST + SSE control surface for Skylift.
//!
//! Provides axum route handlers for triggering deploys, querying their
//! phase, and tailing build logs.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/deploys` | Trigger a deploy (202, runs in background) |
//! | GET | `/api/v1/deploys/{id}` | Current phase of a project's deploy |
//! | GET | `/api/v1/logs/{id}/events` | SSE tail of the project's build logs |

pub mod handlers;
pub mod sse;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use skylift_deploy::{DeployRegistry, Orchestrator};
use skylift_logs::LogBroker;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: DeployRegistry,
    pub broker: LogBroker,
    /// Build command used when a deploy request carries none.
    pub default_command: String,
    /// Directory under the source tree where build output lands.
    pub output_dir: String,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/deploys", post(handlers::create_deploy))
        .route("/api/v1/deploys/{id}", get(handlers::get_deploy))
        .route("/api/v1/logs/{id}/events", get(sse::log_events))
        .with_state(state)
}
