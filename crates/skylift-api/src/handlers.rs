//! REST API handlers.
//!
//! Each handler reads/writes via the deploy registry and returns JSON
//! responses in a `{ success, data?, error? }` envelope.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::info;

use skylift_core::{BuildJob, ProjectId};
use skylift_deploy::DeployPhase;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
pub(crate) struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub(crate) fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

pub(crate) fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// Deploy trigger body.
#[derive(serde::Deserialize)]
pub struct DeployRequest {
    pub project_id: String,
    pub source_dir: PathBuf,
    /// Falls back to the configured default build command.
    pub build_command: Option<String>,
}

/// Deploy trigger acknowledgement.
#[derive(serde::Serialize)]
pub struct DeployAccepted {
    pub project_id: String,
}

/// POST /api/v1/deploys
///
/// Validates the project id, records the deploy as Pending, and runs
/// the orchestrator in a background task. Responds 202 immediately;
/// progress is observable via the status and log routes.
pub async fn create_deploy(
    State(state): State<ApiState>,
    Json(req): Json<DeployRequest>,
) -> impl IntoResponse {
    let project_id = match ProjectId::parse(&req.project_id) {
        Ok(project_id) => project_id,
        Err(e) => return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    };

    let command = req
        .build_command
        .unwrap_or_else(|| state.default_command.clone());
    let output_root = req.source_dir.join(&state.output_dir);
    let job = BuildJob::new(project_id.clone(), req.source_dir, command);

    state.registry.set(&project_id, DeployPhase::Pending);
    info!(project = %project_id, "deploy accepted");

    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        orchestrator.deploy(job, &output_root).await;
    });

    (
        StatusCode::ACCEPTED,
        ApiResponse::ok(DeployAccepted {
            project_id: project_id.to_string(),
        }),
    )
        .into_response()
}

/// GET /api/v1/deploys/:id
pub async fn get_deploy(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let project_id = match ProjectId::parse(&id) {
        Ok(project_id) => project_id,
        Err(e) => return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    };

    match state.registry.get(&project_id) {
        Some(phase) => ApiResponse::ok(phase).into_response(),
        None => error_response("no deploy recorded for project", StatusCode::NOT_FOUND).into_response(),
    }
}
