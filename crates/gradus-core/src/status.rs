//! # Status Vocabulary
//!
//! The status enums for both aggregates plus the defense-stage ladder.
//!
//! ## Thesis progression
//!
//! | Stage | Entry | Defense outcome |
//! |-------|-------|-----------------|
//! | Topic | `TopicSubmitted` | adviser approves or rejects, no defense |
//! | Concept | `ConceptSubmitted` | panel approves, requires revisions, or rejects |
//! | Proposal | `ProposalSubmitted` | panel approves, requires revisions, or rejects |
//! | Final | `FinalSubmitted` | panel approves, requires revisions, or rejects |
//!
//! Which transitions connect these states, and who may drive them, is
//! declared in [`crate::transitions`]; this module only defines the
//! vocabulary and its structural helpers (terminality, stage mapping,
//! display names).

use serde::{Deserialize, Serialize};

// =============================================================================
// DEFENSE STAGE
// =============================================================================

/// One of the three staged defenses a thesis advances through.
///
/// The topic review is adviser-only and has no defense, so it is not a
/// `DefenseStage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DefenseStage {
    /// Concept defense: the earliest staged defense.
    Concept,
    /// Proposal defense.
    Proposal,
    /// Final defense.
    Final,
}

impl DefenseStage {
    /// Get the stage name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DefenseStage::Concept => "concept",
            DefenseStage::Proposal => "proposal",
            DefenseStage::Final => "final",
        }
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(&self) -> Option<DefenseStage> {
        match self {
            DefenseStage::Concept => Some(DefenseStage::Proposal),
            DefenseStage::Proposal => Some(DefenseStage::Final),
            DefenseStage::Final => None,
        }
    }
}

impl std::fmt::Display for DefenseStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// THESIS STATUS
// =============================================================================

/// The full thesis lifecycle state machine.
///
/// Ordered progression with revision loops; `TopicRejected`, `Rejected`
/// and `Archived` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThesisStatus {
    /// Created but nothing submitted yet.
    Draft,
    /// Topic submitted, awaiting adviser review.
    TopicSubmitted,
    /// Topic approved by the adviser.
    TopicApproved,
    /// Topic rejected by the adviser. Terminal: re-proposal needs a new thesis.
    TopicRejected,
    /// Concept document submitted, awaiting adviser clearance.
    ConceptSubmitted,
    /// Cleared for concept defense, awaiting scheduling.
    ReadyForConceptDefense,
    /// A concept defense is on the calendar.
    ConceptScheduled,
    /// The concept defense was held, awaiting panel disposition.
    ConceptDefended,
    /// Concept approved by the panel.
    ConceptApproved,
    /// Panel (or adviser, pre-defense) requires concept revisions.
    ConceptRevisionsRequired,
    /// Proposal document submitted.
    ProposalSubmitted,
    /// Cleared for proposal defense.
    ReadyForProposalDefense,
    /// A proposal defense is on the calendar.
    ProposalScheduled,
    /// The proposal defense was held.
    ProposalDefended,
    /// Proposal approved by the panel.
    ProposalApproved,
    /// Proposal revisions required.
    ProposalRevisionsRequired,
    /// The student declared research underway.
    ResearchInProgress,
    /// Final manuscript submitted.
    FinalSubmitted,
    /// Cleared for final defense.
    ReadyForFinalDefense,
    /// A final defense is on the calendar.
    FinalScheduled,
    /// The final defense was held.
    FinalDefended,
    /// Final manuscript approved. Eligible for archival.
    FinalApproved,
    /// Final revisions required.
    FinalRevisionsRequired,
    /// Rejected at a defense. Terminal.
    Rejected,
    /// Archived by an administrator. Terminal.
    Archived,
}

impl ThesisStatus {
    /// Get the status name as shown to callers (snake_case, matches serde).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ThesisStatus::Draft => "draft",
            ThesisStatus::TopicSubmitted => "topic_submitted",
            ThesisStatus::TopicApproved => "topic_approved",
            ThesisStatus::TopicRejected => "topic_rejected",
            ThesisStatus::ConceptSubmitted => "concept_submitted",
            ThesisStatus::ReadyForConceptDefense => "ready_for_concept_defense",
            ThesisStatus::ConceptScheduled => "concept_scheduled",
            ThesisStatus::ConceptDefended => "concept_defended",
            ThesisStatus::ConceptApproved => "concept_approved",
            ThesisStatus::ConceptRevisionsRequired => "concept_revisions_required",
            ThesisStatus::ProposalSubmitted => "proposal_submitted",
            ThesisStatus::ReadyForProposalDefense => "ready_for_proposal_defense",
            ThesisStatus::ProposalScheduled => "proposal_scheduled",
            ThesisStatus::ProposalDefended => "proposal_defended",
            ThesisStatus::ProposalApproved => "proposal_approved",
            ThesisStatus::ProposalRevisionsRequired => "proposal_revisions_required",
            ThesisStatus::ResearchInProgress => "research_in_progress",
            ThesisStatus::FinalSubmitted => "final_submitted",
            ThesisStatus::ReadyForFinalDefense => "ready_for_final_defense",
            ThesisStatus::FinalScheduled => "final_scheduled",
            ThesisStatus::FinalDefended => "final_defended",
            ThesisStatus::FinalApproved => "final_approved",
            ThesisStatus::FinalRevisionsRequired => "final_revisions_required",
            ThesisStatus::Rejected => "rejected",
            ThesisStatus::Archived => "archived",
        }
    }

    /// Check if this status is terminal (no outgoing transitions).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ThesisStatus::TopicRejected | ThesisStatus::Rejected | ThesisStatus::Archived
        )
    }

    /// Check if a thesis in this status still occupies its group's slot.
    ///
    /// A group holds at most one active thesis; terminal theses free the
    /// slot so the group can propose again.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// The defense stage this status belongs to, if it is between clearance
    /// and disposition for one.
    ///
    /// Used to look up the schedule record guarding panel actions.
    #[must_use]
    pub fn defense_stage(&self) -> Option<DefenseStage> {
        match self {
            ThesisStatus::ConceptSubmitted
            | ThesisStatus::ReadyForConceptDefense
            | ThesisStatus::ConceptScheduled
            | ThesisStatus::ConceptDefended
            | ThesisStatus::ConceptRevisionsRequired => Some(DefenseStage::Concept),
            ThesisStatus::ProposalSubmitted
            | ThesisStatus::ReadyForProposalDefense
            | ThesisStatus::ProposalScheduled
            | ThesisStatus::ProposalDefended
            | ThesisStatus::ProposalRevisionsRequired => Some(DefenseStage::Proposal),
            ThesisStatus::FinalSubmitted
            | ThesisStatus::ReadyForFinalDefense
            | ThesisStatus::FinalScheduled
            | ThesisStatus::FinalDefended
            | ThesisStatus::FinalRevisionsRequired => Some(DefenseStage::Final),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThesisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// GROUP STATUS
// =============================================================================

/// The group approval state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// Present in the vocabulary but unused in the current flow; groups are
    /// created directly in `Pending`.
    Draft,
    /// Awaiting administrator approval.
    Pending,
    /// Approved; thesis work may begin.
    Approved,
    /// Rejected; the leader may resubmit.
    Rejected,
}

impl GroupStatus {
    /// Get the status name (snake_case, matches serde).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            GroupStatus::Draft => "draft",
            GroupStatus::Pending => "pending",
            GroupStatus::Approved => "approved",
            GroupStatus::Rejected => "rejected",
        }
    }

    /// Check whether a membership in this status blocks joining another group.
    ///
    /// A student may belong to at most one group with status Pending or
    /// Approved at a time.
    #[must_use]
    pub fn occupies_member(&self) -> bool {
        matches!(self, GroupStatus::Pending | GroupStatus::Approved)
    }
}

impl std::fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// SCHEDULE STATUS
// =============================================================================

/// Lifecycle of a defense schedule record.
///
/// Only `Scheduled` satisfies the precondition for panel-initiated thesis
/// actions; the rest exist so the calendar layer can round-trip its states
/// through the engine without loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Requested but not yet confirmed.
    Pending,
    /// Confirmed on the calendar. Enables panel actions.
    Scheduled,
    /// The defense is currently underway.
    InProgress,
    /// The defense concluded.
    Completed,
    /// Cancelled without being held.
    Cancelled,
    /// Superseded by a new slot.
    Rescheduled,
}

impl ScheduleStatus {
    /// Get the status name (snake_case, matches serde).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::InProgress => "in_progress",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
            ScheduleStatus::Rescheduled => "rescheduled",
        }
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// TESTS
// =============================================================================
