//! # Domain Events
//!
//! Events emitted after each accepted transition, consumed fire-and-forget
//! by the notification layer. The engine never awaits delivery and never
//! fails a command because a notifier did.

use crate::status::{GroupStatus, ThesisStatus};
use crate::types::{GroupId, ThesisId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A fact about a completed state change.
///
/// Externally tagged (serde's default) so the same derive serves both the
/// JSON notification layer and the postcard snapshot path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEvent {
    /// A group moved between approval states.
    GroupStatusChanged {
        /// Who drove the change.
        actor: UserId,
        /// The group.
        group: GroupId,
        /// Status before.
        old: GroupStatus,
        /// Status after.
        new: GroupStatus,
    },
    /// A thesis moved along the lifecycle.
    ThesisStatusChanged {
        /// Who drove the change.
        actor: UserId,
        /// The thesis.
        thesis: ThesisId,
        /// Status before.
        old: ThesisStatus,
        /// Status after.
        new: ThesisStatus,
    },
    /// An adviser was assigned to a group.
    AdviserAssigned {
        /// Who assigned.
        actor: UserId,
        /// The group.
        group: GroupId,
        /// The assigned adviser.
        adviser: UserId,
    },
    /// A panel set was assigned to a group.
    PanelAssigned {
        /// Who assigned.
        actor: UserId,
        /// The group.
        group: GroupId,
        /// The assigned panel members.
        panels: Vec<UserId>,
    },
}

// =============================================================================
// NOTIFIER TRAIT
// =============================================================================

/// The notification collaborator's interface.
///
/// # Extension Point
///
/// Like storage, delivery lives outside the core: the app layer plugs in
/// whatever transport it has (log lines, mail, webhooks). Implementations
/// must be infallible from the engine's point of view — swallow your own
/// errors.
pub trait Notifier: Send + Sync {
    /// Observe one completed state change.
    fn notify(&self, event: &DomainEvent);
}

/// Discards every event. The default when no notification layer is wired.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &DomainEvent) {}
}

/// Buffers events in memory, in emission order.
///
/// Used by tests to assert on the event stream; a poisoned lock degrades
/// to dropping the event rather than panicking inside the engine.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<DomainEvent>>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the events emitted so far.
    #[must_use]
    pub fn drain(&self) -> Vec<DomainEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => Vec::new(),
        }
    }
}

impl Notifier for EventLog {
    fn notify(&self, event: &DomainEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_log_preserves_order() {
        let log = EventLog::new();
        log.notify(&DomainEvent::AdviserAssigned {
            actor: UserId(1),
            group: GroupId(2),
            adviser: UserId(9),
        });
        log.notify(&DomainEvent::GroupStatusChanged {
            actor: UserId(1),
            group: GroupId(2),
            old: GroupStatus::Pending,
            new: GroupStatus::Approved,
        });

        let events = log.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DomainEvent::AdviserAssigned { .. }));
        assert!(log.drain().is_empty());
    }

    #[test]
    fn events_round_trip_through_postcard() {
        let event = DomainEvent::ThesisStatusChanged {
            actor: UserId(1),
            thesis: ThesisId(3),
            old: ThesisStatus::Draft,
            new: ThesisStatus::TopicSubmitted,
        };
        let bytes = postcard::to_stdvec(&event).expect("serialize");
        let restored: DomainEvent = postcard::from_bytes(&bytes).expect("deserialize");
        assert_eq!(event, restored);
    }
}
