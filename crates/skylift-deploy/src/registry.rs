//! Current deploy phase per project.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use skylift_core::ProjectId;

use crate::orchestrator::DeployPhase;

/// Shared map of project id → latest deploy phase.
///
/// `Clone` + `Send` + `Sync`; the orchestrator writes transitions, the
/// API reads them. Only the most recent deploy per project is tracked —
/// re-deploys overwrite, matching last-write-wins storage semantics.
#[derive(Clone, Default)]
pub struct DeployRegistry {
    phases: Arc<RwLock<HashMap<ProjectId, DeployPhase>>>,
}

impl DeployRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, project_id: &ProjectId, phase: DeployPhase) {
        self.phases
            .write()
            .expect("phases lock")
            .insert(project_id.clone(), phase);
    }

    pub fn get(&self, project_id: &ProjectId) -> Option<DeployPhase> {
        self.phases
            .read()
            .expect("phases lock")
            .get(project_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_latest_phase_per_project() {
        let registry = DeployRegistry::new();
        let p1 = ProjectId::parse("p1").unwrap();

        assert!(registry.get(&p1).is_none());

        registry.set(&p1, DeployPhase::Pending);
        registry.set(&p1, DeployPhase::Building);
        assert_eq!(registry.get(&p1), Some(DeployPhase::Building));

        // Other projects are unaffected.
        let p2 = ProjectId::parse("p2").unwrap();
        assert!(registry.get(&p2).is_none());
    }
}
