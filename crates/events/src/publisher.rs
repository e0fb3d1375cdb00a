//! Object-safe sink the store emits into.

use crate::bus::EventBus;
use crate::ledger_event::LedgerEvent;

/// Fire-and-forget emission of committed ledger events.
///
/// Any [`EventBus`] carrying [`LedgerEvent`] is a publisher. A failed publish is
/// logged, never propagated: the change it describes is already durable.
pub trait EventPublisher: Send + Sync {
    fn emit(&self, event: LedgerEvent);
}

impl<B> EventPublisher for B
where
    B: EventBus<LedgerEvent>,
{
    fn emit(&self, event: LedgerEvent) {
        if let Err(err) = self.publish(event) {
            tracing::warn!(error = ?err, "failed to publish ledger event");
        }
    }
}

/// Publisher that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn emit(&self, _event: LedgerEvent) {}
}
