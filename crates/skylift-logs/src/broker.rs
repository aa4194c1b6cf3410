//! In-process log broker backed by tokio broadcast channels.
//!
//! One broadcast channel per project, created lazily on first publish
//! or subscribe. `publish` is fire-and-forget: it never blocks and
//! never surfaces an error to the build path — a publish with zero
//! subscribers simply drops the message.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use skylift_core::ProjectId;

use crate::event::LogEvent;

/// Buffered messages per channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Routes build log events to per-project subscribers.
///
/// `Clone` + `Send` + `Sync`; hand one copy to every component that
/// publishes or tails logs.
#[derive(Clone)]
pub struct LogBroker {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<String>>>>,
}

impl LogBroker {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish a build-progress message for a project.
    ///
    /// Fire-and-forget: a failure here must never fail the build, so
    /// the only side channel is an operator-facing trace event.
    pub fn publish(&self, project_id: &ProjectId, message: &str) {
        let payload = LogEvent::new(message).to_payload();
        let channel = project_id.log_channel();

        let sender = {
            let channels = self.channels.read().expect("channels lock");
            channels.get(&channel).cloned()
        };

        match sender {
            Some(tx) => {
                // Err means no active receivers; the event is simply dropped.
                if tx.send(payload).is_err() {
                    debug!(project = %project_id, "log event dropped, no subscribers");
                }
            }
            None => {
                debug!(project = %project_id, "log event dropped, channel not open");
            }
        }
    }

    /// Subscribe to a project's log channel.
    ///
    /// A receiver that falls more than the channel capacity behind
    /// observes `RecvError::Lagged` and loses the oldest messages —
    /// slow subscribers never stall the publisher.
    pub fn subscribe(&self, project_id: &ProjectId) -> broadcast::Receiver<String> {
        let channel = project_id.log_channel();
        let mut channels = self.channels.write().expect("channels lock");
        channels
            .entry(channel)
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
                tx
            })
            .subscribe()
    }

    /// Drop channels whose last subscriber disconnected.
    ///
    /// Long-lived daemons call this periodically so finished deploys do
    /// not leak a sender per project.
    pub fn prune(&self) {
        let mut channels = self.channels.write().expect("channels lock");
        let before = channels.len();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        let pruned = before - channels.len();
        if pruned > 0 {
            warn!(pruned, "pruned idle log channels");
        }
    }

    /// Number of open channels (for tests and diagnostics).
    pub fn channel_count(&self) -> usize {
        self.channels.read().expect("channels lock").len()
    }
}

impl Default for LogBroker {
    fn default() -> Self {
        Self::new()
    }
}
