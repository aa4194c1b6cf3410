//! Deploy orchestrator — build, then upload, then done.

use std::sync::Arc;

use tracing::{info, warn};

use skylift_build::{BuildRunner, BuildStatus};
use skylift_core::BuildJob;
use skylift_logs::LogBroker;
use skylift_store::Uploader;

use crate::registry::DeployRegistry;

/// Phase of a deploy, as observed through the registry and the API.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DeployPhase {
    /// Accepted, build not yet started.
    Pending,
    /// Build command running.
    Building,
    /// Build succeeded, artifacts going to storage.
    Uploading,
    /// Terminal: all artifacts published.
    Succeeded,
    /// Terminal: build or upload failed. Requires a fresh deploy.
    Failed { reason: String },
}

impl DeployPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployPhase::Succeeded | DeployPhase::Failed { .. })
    }
}

/// Drives one build job from Pending to a terminal phase.
///
/// Dependencies are injected at construction so tests can substitute
/// an in-memory store behind the uploader. The orchestrator owns the
/// job for its lifetime and performs no retries.
pub struct Orchestrator {
    runner: BuildRunner,
    uploader: Uploader,
    broker: LogBroker,
    registry: DeployRegistry,
}

impl Orchestrator {
    pub fn new(
        runner: BuildRunner,
        uploader: Uploader,
        broker: LogBroker,
        registry: DeployRegistry,
    ) -> Self {
        Self {
            runner,
            uploader,
            broker,
            registry,
        }
    }

    pub fn registry(&self) -> &DeployRegistry {
        &self.registry
    }

    /// Run `job` to completion: build in `source_dir`, then publish
    /// everything under `output_root` to storage.
    ///
    /// Returns the terminal phase; the same value is left in the
    /// registry and mirrored to log subscribers as phase events.
    pub async fn deploy(&self, job: BuildJob, output_root: &std::path::Path) -> DeployPhase {
        let project = job.project_id.clone();
        self.registry.set(&project, DeployPhase::Pending);

        // Pending → Building
        self.registry.set(&project, DeployPhase::Building);
        self.broker.publish(&project, "Build Started...");

        let status = match self.runner.run(&job).await {
            Ok(status) => status,
            Err(e) => {
                return self.fail(&project, format!("build error: {e}"));
            }
        };
        if let BuildStatus::Failed { code } = status {
            let reason = match code {
                Some(code) => format!("build failed with exit code {code}"),
                None => "build terminated by signal".to_string(),
            };
            return self.fail(&project, reason);
        }

        // Building → Uploading ("Build Complete" was already published
        // by the runner at process exit.)
        self.registry.set(&project, DeployPhase::Uploading);
        self.broker.publish(&project, "Starting to upload");

        let uploaded = match self.uploader.publish_artifacts(&project, output_root).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                return self.fail(&project, format!("upload error: {e}"));
            }
        };

        // Uploading → Succeeded
        self.registry.set(&project, DeployPhase::Succeeded);
        self.broker.publish(&project, "Done");
        info!(project = %project, files = uploaded, "deploy succeeded");
        DeployPhase::Succeeded
    }

    fn fail(&self, project: &skylift_core::ProjectId, reason: String) -> DeployPhase {
        let phase = DeployPhase::Failed {
            reason: reason.clone(),
        };
        self.registry.set(project, phase.clone());
        self.broker.publish(project, &format!("error: {reason}"));
        warn!(project = %project, reason = %reason, "deploy failed");
        phase
    }
}

/// Convenience constructor wiring an orchestrator from its parts.
pub fn orchestrator_with(
    store: Arc<dyn skylift_store::ObjectStore>,
    broker: LogBroker,
    registry: DeployRegistry,
    upload_concurrency: usize,
) -> Orchestrator {
    let runner = BuildRunner::new(broker.clone());
    let uploader = Uploader::new(store, broker.clone()).with_concurrency(upload_concurrency);
    Orchestrator::new(runner, uploader, broker, registry)
}
