//! # Thesis Transition Table
//!
//! The thesis state machine as one declared table instead of status checks
//! scattered through handlers. Each row is `(from, action) → (to, required
//! authority)`; lookup is the single source of truth for both the engine
//! and the validation pass.
//!
//! The table is validated when an engine is constructed: every status must
//! either be terminal or have at least one outgoing row, no row may leave a
//! terminal status, and `(from, action)` pairs must be unique.

use crate::status::ThesisStatus;
use crate::types::GradusError;

// =============================================================================
// ACTIONS
// =============================================================================

/// The verbs that drive thesis transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThesisAction {
    /// Proposer submits the current stage's work.
    Submit,
    /// Proposer resubmits after revisions were required.
    Resubmit,
    /// Adviser approves a submission (topic, or clearance for defense).
    AdviserApprove,
    /// Adviser rejects the topic.
    AdviserReject,
    /// Adviser bounces a stage submission back for revisions.
    AdviserRequestRevision,
    /// Adviser or admin records that a defense slot is on the calendar.
    ScheduleDefense,
    /// A named panel member records the defense as held.
    ConcludeDefense,
    /// Panel approves the defended stage.
    PanelApprove,
    /// Panel rejects the thesis outright.
    PanelReject,
    /// Panel requires revisions to the defended stage.
    PanelRequestRevision,
    /// Proposer declares research underway.
    BeginResearch,
    /// Admin archives a fully approved thesis.
    Archive,
}

impl ThesisAction {
    /// Get the action verb as carried in errors and logs.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            ThesisAction::Submit => "submit",
            ThesisAction::Resubmit => "resubmit",
            ThesisAction::AdviserApprove => "adviser_approve",
            ThesisAction::AdviserReject => "adviser_reject",
            ThesisAction::AdviserRequestRevision => "adviser_request_revision",
            ThesisAction::ScheduleDefense => "schedule_defense",
            ThesisAction::ConcludeDefense => "conclude_defense",
            ThesisAction::PanelApprove => "panel_approve",
            ThesisAction::PanelReject => "panel_reject",
            ThesisAction::PanelRequestRevision => "panel_request_revision",
            ThesisAction::BeginResearch => "begin_research",
            ThesisAction::Archive => "archive",
        }
    }
}

impl std::fmt::Display for ThesisAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

// =============================================================================
// AUTHORITY
// =============================================================================

/// Who may drive a given transition.
///
/// Authority is a relationship to the aggregate, not a bare role: an
/// adviser may act only on their own group's thesis, a panel member only
/// when named on a `Scheduled` schedule for the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// The submitting student, who must still be a member of the group.
    Proposer,
    /// The group's assigned adviser.
    GroupAdviser,
    /// The group's adviser or any administrator (scheduling is shared).
    GroupAdviserOrAdmin,
    /// A group panel member named on a `Scheduled` schedule for this stage.
    ScheduledPanel,
    /// Any administrator.
    Admin,
}

// =============================================================================
// TRANSITION TABLE
// =============================================================================

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    /// Status the aggregate must currently hold.
    pub from: ThesisStatus,
    /// The action verb driving the transition.
    pub action: ThesisAction,
    /// Status the aggregate moves to.
    pub to: ThesisStatus,
    /// Who may drive it.
    pub authority: Authority,
}

const fn rule(
    from: ThesisStatus,
    action: ThesisAction,
    to: ThesisStatus,
    authority: Authority,
) -> TransitionRule {
    TransitionRule {
        from,
        action,
        to,
        authority,
    }
}

/// The complete thesis transition table.
///
/// Revision loops close back to the corresponding submitted status; the
/// topic stage has no defense, so adviser rejection there is terminal.
pub const TRANSITIONS: &[TransitionRule] = &[
    // Topic stage
    rule(
        ThesisStatus::Draft,
        ThesisAction::Submit,
        ThesisStatus::TopicSubmitted,
        Authority::Proposer,
    ),
    rule(
        ThesisStatus::TopicSubmitted,
        ThesisAction::AdviserApprove,
        ThesisStatus::TopicApproved,
        Authority::GroupAdviser,
    ),
    rule(
        ThesisStatus::TopicSubmitted,
        ThesisAction::AdviserReject,
        ThesisStatus::TopicRejected,
        Authority::GroupAdviser,
    ),
    // Concept stage
    rule(
        ThesisStatus::TopicApproved,
        ThesisAction::Submit,
        ThesisStatus::ConceptSubmitted,
        Authority::Proposer,
    ),
    rule(
        ThesisStatus::ConceptSubmitted,
        ThesisAction::AdviserApprove,
        ThesisStatus::ReadyForConceptDefense,
        Authority::GroupAdviser,
    ),
    rule(
        ThesisStatus::ConceptSubmitted,
        ThesisAction::AdviserRequestRevision,
        ThesisStatus::ConceptRevisionsRequired,
        Authority::GroupAdviser,
    ),
    rule(
        ThesisStatus::ReadyForConceptDefense,
        ThesisAction::ScheduleDefense,
        ThesisStatus::ConceptScheduled,
        Authority::GroupAdviserOrAdmin,
    ),
    rule(
        ThesisStatus::ConceptScheduled,
        ThesisAction::ConcludeDefense,
        ThesisStatus::ConceptDefended,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::ConceptDefended,
        ThesisAction::PanelApprove,
        ThesisStatus::ConceptApproved,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::ConceptDefended,
        ThesisAction::PanelRequestRevision,
        ThesisStatus::ConceptRevisionsRequired,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::ConceptDefended,
        ThesisAction::PanelReject,
        ThesisStatus::Rejected,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::ConceptRevisionsRequired,
        ThesisAction::Resubmit,
        ThesisStatus::ConceptSubmitted,
        Authority::Proposer,
    ),
    // Proposal stage
    rule(
        ThesisStatus::ConceptApproved,
        ThesisAction::Submit,
        ThesisStatus::ProposalSubmitted,
        Authority::Proposer,
    ),
    rule(
        ThesisStatus::ProposalSubmitted,
        ThesisAction::AdviserApprove,
        ThesisStatus::ReadyForProposalDefense,
        Authority::GroupAdviser,
    ),
    rule(
        ThesisStatus::ProposalSubmitted,
        ThesisAction::AdviserRequestRevision,
        ThesisStatus::ProposalRevisionsRequired,
        Authority::GroupAdviser,
    ),
    rule(
        ThesisStatus::ReadyForProposalDefense,
        ThesisAction::ScheduleDefense,
        ThesisStatus::ProposalScheduled,
        Authority::GroupAdviserOrAdmin,
    ),
    rule(
        ThesisStatus::ProposalScheduled,
        ThesisAction::ConcludeDefense,
        ThesisStatus::ProposalDefended,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::ProposalDefended,
        ThesisAction::PanelApprove,
        ThesisStatus::ProposalApproved,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::ProposalDefended,
        ThesisAction::PanelRequestRevision,
        ThesisStatus::ProposalRevisionsRequired,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::ProposalDefended,
        ThesisAction::PanelReject,
        ThesisStatus::Rejected,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::ProposalRevisionsRequired,
        ThesisAction::Resubmit,
        ThesisStatus::ProposalSubmitted,
        Authority::Proposer,
    ),
    // Research & final stage
    rule(
        ThesisStatus::ProposalApproved,
        ThesisAction::BeginResearch,
        ThesisStatus::ResearchInProgress,
        Authority::Proposer,
    ),
    rule(
        ThesisStatus::ResearchInProgress,
        ThesisAction::Submit,
        ThesisStatus::FinalSubmitted,
        Authority::Proposer,
    ),
    rule(
        ThesisStatus::FinalSubmitted,
        ThesisAction::AdviserApprove,
        ThesisStatus::ReadyForFinalDefense,
        Authority::GroupAdviser,
    ),
    rule(
        ThesisStatus::FinalSubmitted,
        ThesisAction::AdviserRequestRevision,
        ThesisStatus::FinalRevisionsRequired,
        Authority::GroupAdviser,
    ),
    rule(
        ThesisStatus::ReadyForFinalDefense,
        ThesisAction::ScheduleDefense,
        ThesisStatus::FinalScheduled,
        Authority::GroupAdviserOrAdmin,
    ),
    rule(
        ThesisStatus::FinalScheduled,
        ThesisAction::ConcludeDefense,
        ThesisStatus::FinalDefended,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::FinalDefended,
        ThesisAction::PanelApprove,
        ThesisStatus::FinalApproved,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::FinalDefended,
        ThesisAction::PanelRequestRevision,
        ThesisStatus::FinalRevisionsRequired,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::FinalDefended,
        ThesisAction::PanelReject,
        ThesisStatus::Rejected,
        Authority::ScheduledPanel,
    ),
    rule(
        ThesisStatus::FinalRevisionsRequired,
        ThesisAction::Resubmit,
        ThesisStatus::FinalSubmitted,
        Authority::Proposer,
    ),
    rule(
        ThesisStatus::FinalApproved,
        ThesisAction::Archive,
        ThesisStatus::Archived,
        Authority::Admin,
    ),
];

/// Every thesis status, used by the validation pass and by property tests.
pub const ALL_STATUSES: &[ThesisStatus] = &[
    ThesisStatus::Draft,
    ThesisStatus::TopicSubmitted,
    ThesisStatus::TopicApproved,
    ThesisStatus::TopicRejected,
    ThesisStatus::ConceptSubmitted,
    ThesisStatus::ReadyForConceptDefense,
    ThesisStatus::ConceptScheduled,
    ThesisStatus::ConceptDefended,
    ThesisStatus::ConceptApproved,
    ThesisStatus::ConceptRevisionsRequired,
    ThesisStatus::ProposalSubmitted,
    ThesisStatus::ReadyForProposalDefense,
    ThesisStatus::ProposalScheduled,
    ThesisStatus::ProposalDefended,
    ThesisStatus::ProposalApproved,
    ThesisStatus::ProposalRevisionsRequired,
    ThesisStatus::ResearchInProgress,
    ThesisStatus::FinalSubmitted,
    ThesisStatus::ReadyForFinalDefense,
    ThesisStatus::FinalScheduled,
    ThesisStatus::FinalDefended,
    ThesisStatus::FinalApproved,
    ThesisStatus::FinalRevisionsRequired,
    ThesisStatus::Rejected,
    ThesisStatus::Archived,
];

/// Every thesis action, used by property tests to enumerate the space.
pub const ALL_ACTIONS: &[ThesisAction] = &[
    ThesisAction::Submit,
    ThesisAction::Resubmit,
    ThesisAction::AdviserApprove,
    ThesisAction::AdviserReject,
    ThesisAction::AdviserRequestRevision,
    ThesisAction::ScheduleDefense,
    ThesisAction::ConcludeDefense,
    ThesisAction::PanelApprove,
    ThesisAction::PanelReject,
    ThesisAction::PanelRequestRevision,
    ThesisAction::BeginResearch,
    ThesisAction::Archive,
];

// =============================================================================
// LOOKUP & VALIDATION
// =============================================================================

/// Find the rule for `(from, action)`, if one is declared.
#[must_use]
pub fn find_transition(from: ThesisStatus, action: ThesisAction) -> Option<&'static TransitionRule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.action == action)
}

/// Validate the table's shape.
///
/// Checks, in order:
/// 1. No duplicate `(from, action)` pairs.
/// 2. No rule leaves a terminal status.
/// 3. Every non-terminal status has at least one outgoing rule.
///
/// The engine runs this once at construction; a failure means the compiled
/// table is inconsistent with the status vocabulary.
pub fn validate_table() -> Result<(), GradusError> {
    for (i, a) in TRANSITIONS.iter().enumerate() {
        for b in &TRANSITIONS[i + 1..] {
            if a.from == b.from && a.action == b.action {
                return Err(GradusError::SerializationError(format!(
                    "duplicate transition ({}, {})",
                    a.from, a.action
                )));
            }
        }
        if a.from.is_terminal() {
            return Err(GradusError::SerializationError(format!(
                "transition declared out of terminal status {}",
                a.from
            )));
        }
    }

    for status in ALL_STATUSES {
        if status.is_terminal() {
            continue;
        }
        if !TRANSITIONS.iter().any(|rule| rule.from == *status) {
            return Err(GradusError::SerializationError(format!(
                "non-terminal status {} has no outgoing transition",
                status
            )));
        }
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
