//! skylift-logs — per-project build log pub/sub.
//!
//! Build progress events are published to a channel named
//! `logs:{project_id}` so concurrent builds never cross-talk. Delivery
//! is at-most-once per connected subscriber with no replay buffer:
//! a subscriber that connects mid-build sees only what follows, and a
//! subscriber that falls behind loses the oldest messages rather than
//! stalling the publisher.

pub mod broker;
pub mod event;

pub use broker::LogBroker;
pub use event::LogEvent;
