//! Event bus port — publish engine events to interested subscribers.

use autorun_domain::event::EngineEvent;

/// Publishes engine events.
///
/// Publishing is fire-and-forget and must not block: the runner calls it
/// from inside its single-writer loop.
pub trait EventPublisher {
    fn publish(&self, event: EngineEvent);
}

impl<T: EventPublisher + ?Sized> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: EngineEvent) {
        (**self).publish(event);
    }
}
