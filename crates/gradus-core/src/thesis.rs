//! # Thesis Aggregate
//!
//! The research artifact tracked through the staged defense lifecycle,
//! owned by exactly one approved group. All status movement goes through
//! [`Thesis::apply`], which consults the declared transition table; there
//! is no other way to change a thesis status.
//!
//! Revised content (documents, manuscripts) is edited out-of-band; the
//! aggregate records only status, feedback, and the rejection reason.

use crate::status::ThesisStatus;
use crate::transitions::{self, ThesisAction, TransitionRule};
use crate::types::{GradusError, GroupId, Subject, ThesisId, UserId};
use serde::{Deserialize, Serialize};

/// A thesis and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thesis {
    /// Thesis identifier.
    pub id: ThesisId,
    /// Working title.
    pub title: String,
    /// Abstract text.
    pub abstract_text: String,
    /// Keywords for catalogue search.
    pub keywords: Vec<String>,
    /// The owning group. Must be approved at creation time.
    pub group: GroupId,
    /// The submitting student.
    pub proposer: UserId,
    /// Current lifecycle status.
    pub status: ThesisStatus,
    /// Most recent adviser feedback, if any.
    pub adviser_feedback: Option<String>,
    /// Most recent panel feedback, if any.
    pub panel_feedback: Option<String>,
    /// Reason recorded when the thesis was rejected.
    pub rejection_reason: Option<String>,
}

impl Thesis {
    /// Create a new thesis in `Draft`.
    ///
    /// The group-approved and single-active-thesis preconditions need
    /// roster knowledge and are enforced by the engine before this runs.
    #[must_use]
    pub fn create(
        id: ThesisId,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        keywords: Vec<String>,
        group: GroupId,
        proposer: UserId,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            abstract_text: abstract_text.into(),
            keywords,
            group,
            proposer,
            status: ThesisStatus::Draft,
            adviser_feedback: None,
            panel_feedback: None,
            rejection_reason: None,
        }
    }

    /// Apply an action through the transition table.
    ///
    /// Returns the matched rule so the caller can authorize against it and
    /// report the old/new pair. Fails `InvalidTransition` when no rule
    /// connects the current status with `action` — including replays of an
    /// already-completed transition.
    pub fn apply(&mut self, action: ThesisAction) -> Result<&'static TransitionRule, GradusError> {
        let rule = transitions::find_transition(self.status, action).ok_or_else(|| {
            GradusError::InvalidTransition {
                action: action.verb(),
                subject: Subject::Thesis(self.id),
                status: self.status.to_string(),
            }
        })?;
        self.status = rule.to;
        Ok(rule)
    }

    /// Record adviser feedback alongside a review action.
    pub fn record_adviser_feedback(&mut self, feedback: Option<String>) {
        if feedback.is_some() {
            self.adviser_feedback = feedback;
        }
    }

    /// Record panel feedback alongside a defense disposition.
    pub fn record_panel_feedback(&mut self, feedback: Option<String>) {
        if feedback.is_some() {
            self.panel_feedback = feedback;
        }
    }

    /// Record why the thesis was rejected.
    pub fn record_rejection(&mut self, reason: Option<String>) {
        self.rejection_reason = reason;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn thesis() -> Thesis {
        Thesis::create(
            ThesisId(1),
            "Adaptive Beamforming",
            "We study adaptive arrays.",
            vec!["dsp".to_string()],
            GroupId(1),
            UserId(10),
        )
    }

    #[test]
    fn created_in_draft() {
        let t = thesis();
        assert_eq!(t.status, ThesisStatus::Draft);
        assert!(t.adviser_feedback.is_none());
    }

    #[test]
    fn apply_moves_along_table() {
        let mut t = thesis();
        let rule = t.apply(ThesisAction::Submit).expect("submit");
        assert_eq!(rule.to, ThesisStatus::TopicSubmitted);
        assert_eq!(t.status, ThesisStatus::TopicSubmitted);
    }

    #[test]
    fn undefined_action_is_invalid_transition() {
        let mut t = thesis();
        let err = t.apply(ThesisAction::Archive).expect_err("not archivable");
        assert!(matches!(err, GradusError::InvalidTransition { .. }));
        // Status unchanged on failure.
        assert_eq!(t.status, ThesisStatus::Draft);
    }

    #[test]
    fn replay_after_success_is_invalid_transition() {
        let mut t = thesis();
        t.apply(ThesisAction::Submit).expect("first");
        let err = t.apply(ThesisAction::Submit).expect_err("replay");
        assert!(matches!(err, GradusError::InvalidTransition { .. }));
    }

    #[test]
    fn feedback_is_kept_when_absent() {
        let mut t = thesis();
        t.record_adviser_feedback(Some("tighten scope".to_string()));
        t.record_adviser_feedback(None);
        assert_eq!(t.adviser_feedback.as_deref(), Some("tighten scope"));
    }
}
