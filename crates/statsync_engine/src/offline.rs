//! Durable offline event log abstraction.

use crate::error::StatsResult;
use parking_lot::Mutex;
use std::sync::Arc;

/// The durable offline event log collaborator.
///
/// When a push fails for a connectivity reason the engine hands the
/// serialized document to this writer, which is responsible for eventual
/// delivery. The engine does not retry that delivery itself.
///
/// The destination is chosen at construction time: a platform event log
/// in production, [`NoopOfflineWriter`] where no durable log exists, or
/// [`MemoryOfflineWriter`] in tests.
pub trait OfflineWriter: Send + Sync + 'static {
    /// Records an event with the given type and JSON payload.
    fn write_event(&self, event_type: &str, payload: serde_json::Value) -> StatsResult<()>;
}

/// An offline writer that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOfflineWriter;

impl OfflineWriter for NoopOfflineWriter {
    fn write_event(&self, _event_type: &str, _payload: serde_json::Value) -> StatsResult<()> {
        Ok(())
    }
}

/// An offline writer that records events in memory, for testing.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryOfflineWriter {
    events: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl MemoryOfflineWriter {
    /// Creates a new memory offline writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in write order.
    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events.lock().clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if no event has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl OfflineWriter for MemoryOfflineWriter {
    fn write_event(&self, event_type: &str, payload: serde_json::Value) -> StatsResult<()> {
        self.events.lock().push((event_type.to_string(), payload));
        Ok(())
    }
}
