//! # Access Control Predicates
//!
//! The single place that answers "may this user see this group or
//! thesis". The source systems this engine descends from re-derived the
//! member/adviser/panel relationship ad hoc per view, with inconsistent id
//! coercion; here it is one pure, total function over normalized ids,
//! evaluated per item on every read.
//!
//! `can_view` carries no write authority — who may *act* is decided by
//! [`crate::protocol`] against the transition table.

use crate::group::Group;
use crate::thesis::Thesis;
use crate::types::{Role, User};

/// Which partition of a list view an item lands in for a given user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The user is related to the item (proposer, member, adviser, panel).
    Mine,
    /// No relationship. Visible to admins only.
    Other,
}

/// Partition a group for a user by relationship.
///
/// Pure and total; ignores the user's role entirely (a related admin's
/// group still classifies `Mine`).
#[must_use]
pub fn classify_group(user: &User, group: &Group) -> Visibility {
    if group.is_member(user.id) || group.is_adviser(user.id) || group.is_panel(user.id) {
        Visibility::Mine
    } else {
        Visibility::Other
    }
}

/// Partition a thesis (with its owning group) for a user.
#[must_use]
pub fn classify_thesis(user: &User, thesis: &Thesis, group: &Group) -> Visibility {
    if thesis.proposer == user.id {
        return Visibility::Mine;
    }
    classify_group(user, group)
}

/// May the user see this group at all?
///
/// Admin sees everything; everyone else sees what they are related to.
#[must_use]
pub fn can_view_group(user: &User, group: &Group) -> bool {
    user.role == Role::Admin || classify_group(user, group) == Visibility::Mine
}

/// May the user see this thesis at all?
#[must_use]
pub fn can_view_thesis(user: &User, thesis: &Thesis, group: &Group) -> bool {
    user.role == Role::Admin || classify_thesis(user, thesis, group) == Visibility::Mine
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GroupId, ThesisId, UserId};
    use std::collections::BTreeSet;

    fn fixture() -> (Group, Thesis) {
        let mut group = Group::create(
            GroupId(1),
            "Compilers",
            UserId(1),
            [UserId(2)].into(),
            vec![],
            None,
        )
        .expect("create");
        group.set_adviser(UserId(9)).expect("adviser");
        group.approve().expect("approve");
        let panels: BTreeSet<UserId> = [UserId(20)].into();
        group.set_panels(panels).expect("panels");

        let thesis = Thesis::create(
            ThesisId(1),
            "Register Allocation",
            "Graph coloring revisited.",
            vec![],
            GroupId(1),
            UserId(2),
        );
        (group, thesis)
    }

    #[test]
    fn every_related_party_sees_the_thesis() {
        let (group, thesis) = fixture();
        for (id, role) in [
            (1, Role::Student),  // leader
            (2, Role::Student),  // member & proposer
            (9, Role::Adviser),  // adviser
            (20, Role::Panel),   // panel
        ] {
            let user = User::new(UserId(id), "u", role);
            assert!(
                can_view_thesis(&user, &thesis, &group),
                "user {} should see the thesis",
                id
            );
        }
    }

    #[test]
    fn unrelated_users_see_nothing() {
        let (group, thesis) = fixture();
        for role in [Role::Student, Role::Adviser, Role::Panel] {
            let stranger = User::new(UserId(99), "s", role);
            assert!(!can_view_group(&stranger, &group));
            assert!(!can_view_thesis(&stranger, &thesis, &group));
        }
    }

    #[test]
    fn admin_sees_everything_as_other() {
        let (group, thesis) = fixture();
        let admin = User::new(UserId(50), "root", Role::Admin);
        assert!(can_view_group(&admin, &group));
        assert!(can_view_thesis(&admin, &thesis, &group));
        assert_eq!(classify_group(&admin, &group), Visibility::Other);
    }

    #[test]
    fn proposer_relation_survives_leaving_the_group() {
        let (mut group, thesis) = fixture();
        group.remove_member(UserId(2)).expect("remove");
        let proposer = User::new(UserId(2), "p", Role::Student);
        // Still classified Mine via proposership, even after removal.
        assert_eq!(
            classify_thesis(&proposer, &thesis, &group),
            Visibility::Mine
        );
    }
}
