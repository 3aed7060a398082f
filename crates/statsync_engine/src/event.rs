//! Events queued for delivery to the host.

use crate::error::StatsError;

/// The kind of asynchronous outcome an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatEventKind {
    /// A local user's initial document fetch completed.
    UserAdded,
    /// A local user's removal (including any final best-effort sync)
    /// completed.
    UserRemoved,
    /// A document push to the service completed.
    UpdateCompleted,
}

/// An immutable record of an asynchronous outcome, consumed exactly once
/// by the host via [`StatsManager::do_work`](crate::StatsManager::do_work).
#[derive(Debug, Clone)]
pub struct StatEvent {
    kind: StatEventKind,
    user_id: String,
    result: Result<(), StatsError>,
}

impl StatEvent {
    pub(crate) fn new(
        kind: StatEventKind,
        user_id: impl Into<String>,
        result: Result<(), StatsError>,
    ) -> Self {
        Self {
            kind,
            user_id: user_id.into(),
            result,
        }
    }

    /// The kind of outcome this event reports.
    pub fn kind(&self) -> StatEventKind {
        self.kind
    }

    /// The user the outcome applies to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The outcome. Service failures are only ever reported here; they
    /// are never surfaced synchronously.
    pub fn result(&self) -> &Result<(), StatsError> {
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_accessors() {
        let event = StatEvent::new(StatEventKind::UserAdded, "user-1", Ok(()));
        assert_eq!(event.kind(), StatEventKind::UserAdded);
        assert_eq!(event.user_id(), "user-1");
        assert!(event.result().is_ok());

        let event = StatEvent::new(
            StatEventKind::UpdateCompleted,
            "user-1",
            Err(StatsError::service_connectivity("offline")),
        );
        assert!(event.result().as_ref().unwrap_err().is_connectivity());
    }
}
