//! # Review Protocol
//!
//! The authority side of the transition table: given an actor, a matched
//! rule, and the aggregates it touches, decide whether the actor holds the
//! required relationship. Pure — no storage, no side effects — so every
//! (role, transition) pair can be tested exhaustively.
//!
//! Failure taxonomy, in the order checked:
//! - `Forbidden` — the actor is inactive or lacks the required relationship.
//! - `PreconditionFailed(ScheduleMissing)` — a panel-gated or scheduling
//!   rule found no `Scheduled` schedule for the thesis/stage. A panel
//!   member of the right group who is simply not named on the existing
//!   schedule gets `Forbidden`, not a precondition failure.

use crate::group::Group;
use crate::schedule::Schedule;
use crate::status::ScheduleStatus;
use crate::thesis::Thesis;
use crate::transitions::{Authority, TransitionRule};
use crate::types::{GradusError, Precondition, Role, Subject, User};

/// Everything a single authorization decision may need to look at.
///
/// The schedule is the record for the thesis' *current* stage, if the
/// roster has one; rules that do not involve defenses ignore it.
#[derive(Debug, Clone, Copy)]
pub struct ReviewContext<'a> {
    /// The thesis being acted on.
    pub thesis: &'a Thesis,
    /// Its owning group.
    pub group: &'a Group,
    /// The schedule record for the current stage, if any.
    pub schedule: Option<&'a Schedule>,
}

impl<'a> ReviewContext<'a> {
    fn forbidden(&self, actor: &User, rule: &TransitionRule) -> GradusError {
        GradusError::Forbidden {
            actor: actor.id,
            action: rule.action.verb(),
            subject: Subject::Thesis(self.thesis.id),
            status: self.thesis.status.to_string(),
        }
    }

    fn schedule_missing(&self, rule: &TransitionRule) -> GradusError {
        // The rule's source status always lies inside a defense band when
        // this is reached; Concept is an unreachable fallback.
        let stage = rule
            .from
            .defense_stage()
            .unwrap_or(crate::status::DefenseStage::Concept);
        GradusError::PreconditionFailed {
            action: rule.action.verb(),
            subject: Subject::Thesis(self.thesis.id),
            status: self.thesis.status.to_string(),
            reason: Precondition::ScheduleMissing(stage),
        }
    }

    fn scheduled(&self) -> Option<&Schedule> {
        self.schedule
            .filter(|s| s.status == ScheduleStatus::Scheduled)
    }
}

/// Check whether `actor` holds the authority a rule requires.
///
/// Does not mutate anything; the engine applies the transition only after
/// this returns `Ok`.
pub fn authorize(
    actor: &User,
    rule: &TransitionRule,
    ctx: &ReviewContext<'_>,
) -> Result<(), GradusError> {
    if !actor.active {
        return Err(ctx.forbidden(actor, rule));
    }

    let granted = match rule.authority {
        // The proposer must also still be a member of the owning group.
        Authority::Proposer => {
            actor.id == ctx.thesis.proposer && ctx.group.is_member(actor.id)
        }
        Authority::GroupAdviser => ctx.group.is_adviser(actor.id),
        Authority::GroupAdviserOrAdmin => {
            let related = ctx.group.is_adviser(actor.id) || actor.role == Role::Admin;
            if related && ctx.scheduled().is_none() {
                return Err(ctx.schedule_missing(rule));
            }
            related
        }
        Authority::ScheduledPanel => {
            if !ctx.group.is_panel(actor.id) {
                return Err(ctx.forbidden(actor, rule));
            }
            let Some(schedule) = ctx.scheduled() else {
                return Err(ctx.schedule_missing(rule));
            };
            schedule.authorizes_panel(actor.id)
        }
        Authority::Admin => actor.role == Role::Admin,
    };

    if granted {
        Ok(())
    } else {
        Err(ctx.forbidden(actor, rule))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{DefenseStage, ThesisStatus};
    use crate::transitions::{ThesisAction, find_transition};
    use crate::types::{GroupId, ScheduleId, ThesisId, UserId};
    use std::collections::BTreeSet;

    struct Fixture {
        group: Group,
        thesis: Thesis,
        schedule: Schedule,
    }

    fn fixture(status: ThesisStatus) -> Fixture {
        let mut group = Group::create(
            GroupId(1),
            "Databases",
            UserId(1),
            [UserId(2)].into(),
            vec![],
            None,
        )
        .expect("create");
        group.set_adviser(UserId(9)).expect("adviser");
        group.approve().expect("approve");
        let panels: BTreeSet<UserId> = [UserId(20), UserId(21)].into();
        group.set_panels(panels).expect("panels");

        let mut thesis = Thesis::create(
            ThesisId(1),
            "Write-Ahead Logging",
            "Recovery from torn pages.",
            vec![],
            GroupId(1),
            UserId(2),
        );
        thesis.status = status;

        // Schedule names only one of the two panel members.
        let schedule = Schedule::create(
            ScheduleId(1),
            ThesisId(1),
            DefenseStage::Concept,
            "2024-11-05T09:00",
            "Room 214",
            [UserId(20)].into(),
        );

        Fixture {
            group,
            thesis,
            schedule,
        }
    }

    fn rule_for(status: ThesisStatus, action: ThesisAction) -> &'static TransitionRule {
        find_transition(status, action).expect("rule exists")
    }

    #[test]
    fn proposer_may_submit() {
        let f = fixture(ThesisStatus::Draft);
        let ctx = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: None,
        };
        let rule = rule_for(ThesisStatus::Draft, ThesisAction::Submit);
        let proposer = User::new(UserId(2), "p", Role::Student);
        authorize(&proposer, rule, &ctx).expect("proposer submits");

        let other_member = User::new(UserId(1), "leader", Role::Student);
        assert!(matches!(
            authorize(&other_member, rule, &ctx),
            Err(GradusError::Forbidden { .. })
        ));
    }

    #[test]
    fn proposer_who_left_the_group_may_not_submit() {
        let mut f = fixture(ThesisStatus::Draft);
        f.group.remove_member(UserId(2)).expect("remove");
        let ctx = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: None,
        };
        let rule = rule_for(ThesisStatus::Draft, ThesisAction::Submit);
        let proposer = User::new(UserId(2), "p", Role::Student);
        assert!(matches!(
            authorize(&proposer, rule, &ctx),
            Err(GradusError::Forbidden { .. })
        ));
    }

    #[test]
    fn only_the_groups_adviser_reviews() {
        let f = fixture(ThesisStatus::TopicSubmitted);
        let ctx = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: None,
        };
        let rule = rule_for(ThesisStatus::TopicSubmitted, ThesisAction::AdviserApprove);

        let adviser = User::new(UserId(9), "a", Role::Adviser);
        authorize(&adviser, rule, &ctx).expect("own adviser");

        let other_adviser = User::new(UserId(8), "b", Role::Adviser);
        assert!(matches!(
            authorize(&other_adviser, rule, &ctx),
            Err(GradusError::Forbidden { .. })
        ));

        // Admins hold no adviser authority.
        let admin = User::new(UserId(50), "root", Role::Admin);
        assert!(matches!(
            authorize(&admin, rule, &ctx),
            Err(GradusError::Forbidden { .. })
        ));
    }

    #[test]
    fn named_panel_acts_unnamed_panel_is_forbidden() {
        let f = fixture(ThesisStatus::ConceptDefended);
        let ctx = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: Some(&f.schedule),
        };
        let rule = rule_for(ThesisStatus::ConceptDefended, ThesisAction::PanelApprove);

        let named = User::new(UserId(20), "x", Role::Panel);
        authorize(&named, rule, &ctx).expect("named panel");

        let unnamed = User::new(UserId(21), "y", Role::Panel);
        assert!(matches!(
            authorize(&unnamed, rule, &ctx),
            Err(GradusError::Forbidden { .. })
        ));
    }

    #[test]
    fn missing_schedule_is_a_precondition_failure() {
        let f = fixture(ThesisStatus::ConceptDefended);
        let ctx = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: None,
        };
        let rule = rule_for(ThesisStatus::ConceptDefended, ThesisAction::PanelApprove);
        let named = User::new(UserId(20), "x", Role::Panel);
        assert!(matches!(
            authorize(&named, rule, &ctx),
            Err(GradusError::PreconditionFailed {
                reason: Precondition::ScheduleMissing(DefenseStage::Concept),
                ..
            })
        ));
    }

    #[test]
    fn cancelled_schedule_counts_as_missing() {
        let mut f = fixture(ThesisStatus::ConceptDefended);
        f.schedule
            .set_status(ScheduleStatus::Cancelled)
            .expect("cancel");
        let ctx = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: Some(&f.schedule),
        };
        let rule = rule_for(ThesisStatus::ConceptDefended, ThesisAction::PanelApprove);
        let named = User::new(UserId(20), "x", Role::Panel);
        assert!(matches!(
            authorize(&named, rule, &ctx),
            Err(GradusError::PreconditionFailed { .. })
        ));
    }

    #[test]
    fn scheduling_requires_the_slot_to_exist() {
        let f = fixture(ThesisStatus::ReadyForConceptDefense);
        let rule = rule_for(
            ThesisStatus::ReadyForConceptDefense,
            ThesisAction::ScheduleDefense,
        );
        let admin = User::new(UserId(50), "root", Role::Admin);

        let without = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: None,
        };
        assert!(matches!(
            authorize(&admin, rule, &without),
            Err(GradusError::PreconditionFailed { .. })
        ));

        let with = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: Some(&f.schedule),
        };
        authorize(&admin, rule, &with).expect("admin schedules");

        let adviser = User::new(UserId(9), "a", Role::Adviser);
        authorize(&adviser, rule, &with).expect("adviser schedules");
    }

    #[test]
    fn inactive_actor_is_always_forbidden() {
        let f = fixture(ThesisStatus::TopicSubmitted);
        let ctx = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: None,
        };
        let rule = rule_for(ThesisStatus::TopicSubmitted, ThesisAction::AdviserApprove);
        let mut adviser = User::new(UserId(9), "a", Role::Adviser);
        adviser.active = false;
        assert!(matches!(
            authorize(&adviser, rule, &ctx),
            Err(GradusError::Forbidden { .. })
        ));
    }

    #[test]
    fn only_admin_archives() {
        let f = fixture(ThesisStatus::FinalApproved);
        let ctx = ReviewContext {
            thesis: &f.thesis,
            group: &f.group,
            schedule: None,
        };
        let rule = rule_for(ThesisStatus::FinalApproved, ThesisAction::Archive);

        let admin = User::new(UserId(50), "root", Role::Admin);
        authorize(&admin, rule, &ctx).expect("admin archives");

        for (id, role) in [(2, Role::Student), (9, Role::Adviser), (20, Role::Panel)] {
            let user = User::new(UserId(id), "u", role);
            assert!(matches!(
                authorize(&user, rule, &ctx),
                Err(GradusError::Forbidden { .. })
            ));
        }
    }
}
