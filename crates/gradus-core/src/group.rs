//! # Group Aggregate
//!
//! A bounded team of students collaborating on one thesis, with a leader,
//! an adviser, and a panel. The aggregate owns its own state guards:
//! methods check the status machine and intra-group invariants and return
//! the appropriate error without touching storage. Who may call each
//! method is the engine's concern (see [`crate::engine`]), not the
//! aggregate's.
//!
//! ## Invariants
//!
//! - `leader ∈ members` always.
//! - Member count stays within 1..=4 inclusive of the leader.
//! - `panels` may be non-empty only while `Approved`.
//! - Approval requires an assigned adviser.

use crate::limits::{MAX_GROUP_MEMBERS, MAX_PANEL_SIZE, MIN_GROUP_MEMBERS};
use crate::status::GroupStatus;
use crate::types::{GradusError, GroupId, Precondition, Subject, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A student group and its approval state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Approval status.
    pub status: GroupStatus,
    /// All members, leader included. Deterministic iteration order.
    pub members: BTreeSet<UserId>,
    /// The distinguished member who created and administers the group.
    pub leader: UserId,
    /// Assigned adviser, if any. May be set while Pending (pre-assignment).
    pub adviser: Option<UserId>,
    /// The adviser the group asked for at creation. Informational.
    pub preferred_adviser: Option<UserId>,
    /// Assigned panel members. Non-empty only while Approved.
    pub panels: BTreeSet<UserId>,
    /// Topics the group is considering.
    pub possible_topics: Vec<String>,
    /// Reason recorded on rejection, cleared on resubmit.
    pub rejection_reason: Option<String>,
}

impl Group {
    /// Create a new group in `Pending` with the leader among the members.
    ///
    /// Enforces the member-count bound and the `leader ∈ members`
    /// invariant. The cross-group "already in a group" rule needs roster
    /// knowledge and is enforced by the engine before this runs.
    pub fn create(
        id: GroupId,
        name: impl Into<String>,
        leader: UserId,
        members: BTreeSet<UserId>,
        possible_topics: Vec<String>,
        preferred_adviser: Option<UserId>,
    ) -> Result<Self, GradusError> {
        let mut members = members;
        members.insert(leader);

        if members.len() < MIN_GROUP_MEMBERS || members.len() > MAX_GROUP_MEMBERS {
            return Err(GradusError::PreconditionFailed {
                action: "create",
                subject: Subject::Group(id),
                status: GroupStatus::Pending.to_string(),
                reason: Precondition::MemberCount(members.len()),
            });
        }

        Ok(Self {
            id,
            name: name.into(),
            status: GroupStatus::Pending,
            members,
            leader,
            adviser: None,
            preferred_adviser,
            panels: BTreeSet::new(),
            possible_topics,
            rejection_reason: None,
        })
    }

    fn invalid(&self, action: &'static str) -> GradusError {
        GradusError::InvalidTransition {
            action,
            subject: Subject::Group(self.id),
            status: self.status.to_string(),
        }
    }

    fn precondition(&self, action: &'static str, reason: Precondition) -> GradusError {
        GradusError::PreconditionFailed {
            action,
            subject: Subject::Group(self.id),
            status: self.status.to_string(),
            reason,
        }
    }

    // =========================================================================
    // STATE TRANSITIONS
    // =========================================================================

    /// Approve a pending group. Fails `AdviserRequired` without an adviser.
    pub fn approve(&mut self) -> Result<(), GradusError> {
        if self.status != GroupStatus::Pending {
            return Err(self.invalid("approve"));
        }
        if self.adviser.is_none() {
            return Err(self.precondition("approve", Precondition::AdviserRequired));
        }
        self.status = GroupStatus::Approved;
        Ok(())
    }

    /// Reject a pending group, recording the reason if given.
    pub fn reject(&mut self, reason: Option<String>) -> Result<(), GradusError> {
        if self.status != GroupStatus::Pending {
            return Err(self.invalid("reject"));
        }
        self.status = GroupStatus::Rejected;
        self.rejection_reason = reason;
        Ok(())
    }

    /// Resubmit a rejected group. No cool-down; clears the rejection reason.
    pub fn resubmit(&mut self) -> Result<(), GradusError> {
        if self.status != GroupStatus::Rejected {
            return Err(self.invalid("resubmit"));
        }
        self.status = GroupStatus::Pending;
        self.rejection_reason = None;
        Ok(())
    }

    // =========================================================================
    // ASSIGNMENT & MEMBERSHIP
    // =========================================================================

    /// Assign or replace the adviser. Permitted while Pending or Approved.
    pub fn set_adviser(&mut self, adviser: UserId) -> Result<(), GradusError> {
        if !matches!(self.status, GroupStatus::Pending | GroupStatus::Approved) {
            return Err(self.invalid("assign_adviser"));
        }
        self.adviser = Some(adviser);
        Ok(())
    }

    /// Replace the panel set. Only approved groups carry panels.
    pub fn set_panels(&mut self, panels: BTreeSet<UserId>) -> Result<(), GradusError> {
        if self.status != GroupStatus::Approved {
            return Err(self.invalid("assign_panel"));
        }
        if panels.len() > MAX_PANEL_SIZE {
            return Err(self.precondition("assign_panel", Precondition::PanelSize(panels.len())));
        }
        self.panels = panels;
        Ok(())
    }

    /// Remove a non-leader member.
    ///
    /// The leader path is group deletion, not member removal; the minimum
    /// member count holds because the leader always remains.
    pub fn remove_member(&mut self, member: UserId) -> Result<(), GradusError> {
        if member == self.leader {
            return Err(self.precondition("remove_member", Precondition::LeaderCannotLeave));
        }
        if !self.members.remove(&member) {
            return Err(self.precondition("remove_member", Precondition::NotAMember(member)));
        }
        Ok(())
    }

    /// Edit name, topics, or preferred adviser while Pending or Rejected.
    pub fn update_details(
        &mut self,
        name: Option<String>,
        possible_topics: Option<Vec<String>>,
        preferred_adviser: Option<UserId>,
    ) -> Result<(), GradusError> {
        if !matches!(self.status, GroupStatus::Pending | GroupStatus::Rejected) {
            return Err(self.invalid("update"));
        }
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(topics) = possible_topics {
            self.possible_topics = topics;
        }
        if let Some(preferred) = preferred_adviser {
            self.preferred_adviser = Some(preferred);
        }
        Ok(())
    }

    // =========================================================================
    // RELATIONSHIP QUERIES
    // =========================================================================

    /// Check membership (the leader is always a member).
    #[must_use]
    pub fn is_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }

    /// Check whether the user is the assigned adviser.
    #[must_use]
    pub fn is_adviser(&self, user: UserId) -> bool {
        self.adviser == Some(user)
    }

    /// Check whether the user sits on the assigned panel.
    #[must_use]
    pub fn is_panel(&self, user: UserId) -> bool {
        self.panels.contains(&user)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn group_of(leader: u64, others: &[u64]) -> Group {
        let members = others.iter().map(|id| UserId(*id)).collect();
        Group::create(
            GroupId(1),
            "Signal Processing",
            UserId(leader),
            members,
            vec!["fir filters".to_string()],
            None,
        )
        .expect("create")
    }

    #[test]
    fn create_inserts_leader_into_members() {
        let group = group_of(1, &[2, 3]);
        assert!(group.is_member(UserId(1)));
        assert_eq!(group.members.len(), 3);
        assert_eq!(group.status, GroupStatus::Pending);
    }

    #[test]
    fn create_rejects_oversized_group() {
        let members: BTreeSet<UserId> = (2..=5).map(UserId).collect();
        let result = Group::create(GroupId(1), "Too Big", UserId(1), members, vec![], None);
        assert!(matches!(
            result,
            Err(GradusError::PreconditionFailed {
                reason: Precondition::MemberCount(5),
                ..
            })
        ));
    }

    #[test]
    fn solo_group_is_allowed() {
        let group = group_of(1, &[]);
        assert_eq!(group.members.len(), 1);
    }

    #[test]
    fn approve_requires_adviser() {
        let mut group = group_of(1, &[2]);
        let err = group.approve().expect_err("no adviser yet");
        assert!(matches!(
            err,
            GradusError::PreconditionFailed {
                reason: Precondition::AdviserRequired,
                ..
            }
        ));

        group.set_adviser(UserId(9)).expect("assign");
        group.approve().expect("approve");
        assert_eq!(group.status, GroupStatus::Approved);
    }

    #[test]
    fn approve_twice_is_invalid_transition() {
        let mut group = group_of(1, &[2]);
        group.set_adviser(UserId(9)).expect("assign");
        group.approve().expect("approve");
        assert!(matches!(
            group.approve(),
            Err(GradusError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn reject_then_resubmit_clears_reason() {
        let mut group = group_of(1, &[2]);
        group
            .reject(Some("overlapping topics".to_string()))
            .expect("reject");
        assert_eq!(group.status, GroupStatus::Rejected);
        assert!(group.rejection_reason.is_some());

        group.resubmit().expect("resubmit");
        assert_eq!(group.status, GroupStatus::Pending);
        assert!(group.rejection_reason.is_none());
    }

    #[test]
    fn panels_only_while_approved() {
        let mut group = group_of(1, &[2]);
        let panels: BTreeSet<UserId> = [UserId(20), UserId(21)].into();
        assert!(matches!(
            group.set_panels(panels.clone()),
            Err(GradusError::InvalidTransition { .. })
        ));

        group.set_adviser(UserId(9)).expect("assign");
        group.approve().expect("approve");
        group.set_panels(panels).expect("panels");
        assert!(group.is_panel(UserId(20)));
    }

    #[test]
    fn leader_cannot_be_removed() {
        let mut group = group_of(1, &[2]);
        assert!(matches!(
            group.remove_member(UserId(1)),
            Err(GradusError::PreconditionFailed {
                reason: Precondition::LeaderCannotLeave,
                ..
            })
        ));
        group.remove_member(UserId(2)).expect("remove");
        assert!(!group.is_member(UserId(2)));
    }

    #[test]
    fn update_locked_after_approval() {
        let mut group = group_of(1, &[2]);
        group.set_adviser(UserId(9)).expect("assign");
        group.approve().expect("approve");
        assert!(matches!(
            group.update_details(Some("New Name".to_string()), None, None),
            Err(GradusError::InvalidTransition { .. })
        ));
    }
}
