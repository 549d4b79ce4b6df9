//! # Defense Schedules
//!
//! Schedule records associate a thesis defense stage with a slot, a
//! location, and the panel members expected to sit. The engine does not
//! compute schedules — no availability search, no conflict scoring; the
//! calendar layer creates records and the engine only checks them as
//! preconditions for panel actions.

use crate::status::{DefenseStage, ScheduleStatus};
use crate::types::{GradusError, ScheduleId, Subject, ThesisId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A defense slot for one thesis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Schedule identifier.
    pub id: ScheduleId,
    /// The thesis being defended.
    pub thesis: ThesisId,
    /// Which staged defense this slot is for.
    pub stage: DefenseStage,
    /// Opaque date/time string; the calendar layer owns its format.
    pub slot: String,
    /// Room or venue.
    pub location: String,
    /// Panel members expected to sit this defense.
    pub panels: BTreeSet<UserId>,
    /// Calendar status. Only `Scheduled` enables panel actions.
    pub status: ScheduleStatus,
}

impl Schedule {
    /// Create a new schedule record, already confirmed on the calendar.
    #[must_use]
    pub fn create(
        id: ScheduleId,
        thesis: ThesisId,
        stage: DefenseStage,
        slot: impl Into<String>,
        location: impl Into<String>,
        panels: BTreeSet<UserId>,
    ) -> Self {
        Self {
            id,
            thesis,
            stage,
            slot: slot.into(),
            location: location.into(),
            panels,
            status: ScheduleStatus::Scheduled,
        }
    }

    /// Move the record to a new calendar status.
    ///
    /// `Completed` and `Cancelled` are terminal for the record; the
    /// calendar layer creates a fresh record when a defense is rebooked.
    pub fn set_status(&mut self, status: ScheduleStatus) -> Result<(), GradusError> {
        if matches!(
            self.status,
            ScheduleStatus::Completed | ScheduleStatus::Cancelled
        ) {
            return Err(GradusError::InvalidTransition {
                action: "set_schedule_status",
                subject: Subject::Schedule(self.id),
                status: self.status.to_string(),
            });
        }
        self.status = status;
        Ok(())
    }

    /// Check whether this record authorizes the user for panel actions:
    /// confirmed on the calendar and naming the user.
    #[must_use]
    pub fn authorizes_panel(&self, user: UserId) -> bool {
        self.status == ScheduleStatus::Scheduled && self.panels.contains(&user)
    }
}

// =============================================================================
// TESTS
// =============================================================================
