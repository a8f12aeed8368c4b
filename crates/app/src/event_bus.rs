//! In-process event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use autorun_domain::event::EngineEvent;

use crate::ports::EventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped). Slow subscribers lag rather than
/// blocking the runner.
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events published *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: EngineEvent) {
        // Only fails without receivers.
        let _ = self.sender.send(event);
    }
}

/// Publisher that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: EngineEvent) {}
}
