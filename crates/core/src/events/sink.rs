//! Domain event sink trait and implementations.

use std::sync::{Arc, Mutex, MutexGuard};

use super::DomainEvent;

/// Trait for receiving domain events.
///
/// `emit()` must be fast and must not fail the operation that produced the
/// event; sinks queue or drop, they never block on I/O.
pub trait DomainEventSink: Send + Sync {
    /// Emit a single domain event.
    fn emit(&self, event: DomainEvent);

    /// Emit multiple domain events, in order.
    fn emit_batch(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Discards every event.
#[derive(Clone, Default)]
pub struct NoOpDomainEventSink;

impl DomainEventSink for NoOpDomainEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// Collects emitted events in memory. Used by tests and by hosts that drain
/// events on their own schedule.
#[derive(Clone, Default)]
pub struct MockDomainEventSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl MockDomainEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DomainEvent>> {
        // a panic while holding the lock cannot leave the Vec half-written
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.lock().clone()
    }

    /// Clears collected events.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl DomainEventSink for MockDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        self.lock().push(event);
    }
}
