//! SSE log tailing.
//!
//! GET /api/v1/logs/{id}/events
//!
//! Subscribes to the project's log channel and forwards each payload
//! as a Server-Sent Event. No replay: a client that connects mid-build
//! sees only what follows, and a client that lags loses the oldest
//! events rather than stalling the publisher.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures_util::stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use skylift_core::ProjectId;

use crate::ApiState;
use crate::handlers::error_response;

pub async fn log_events(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let project_id = match ProjectId::parse(&id) {
        Ok(project_id) => project_id,
        Err(e) => return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    };

    let rx = state.broker.subscribe(&project_id);

    let s = stream::unfold((rx, project_id), move |(mut rx, project)| async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    let event = Event::default().event("log").data(payload);
                    return Some((Ok::<Event, Infallible>(event), (rx, project)));
                }
                Err(RecvError::Lagged(missed)) => {
                    // Keep tailing; the skipped events are gone by design.
                    debug!(project = %project, missed, "log subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(s)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("ping"),
        )
        .into_response()
}
