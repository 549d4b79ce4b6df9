//! # Property-Based Tests
//!
//! Verification of the lifecycle engine's invariants with proptest:
//! authority enforcement over the whole (actor, transition) space,
//! milestone ordering along random walks, revision loop closure, access
//! symmetry, and the group approval precondition.

use gradus_core::{
    ALL_STATUSES, Authority, Engine, GradusError, Group, GroupId, GroupStatus, Precondition,
    ReviewContext, Role, Schedule, ScheduleId, Thesis, ThesisId, ThesisStatus, User, UserId,
    authorize, can_view_group, can_view_thesis, find_transition,
};
use gradus_core::{DefenseStage, TRANSITIONS, ThesisAction};
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// FIXTURE
// =============================================================================

const LEADER: UserId = UserId(1);
const PROPOSER: UserId = UserId(2);
const ADVISER: UserId = UserId(9);
const OTHER_ADVISER: UserId = UserId(8);
const NAMED_PANEL: UserId = UserId(20);
const UNNAMED_PANEL: UserId = UserId(21);
const OUTSIDE_PANEL: UserId = UserId(22);
const ADMIN: UserId = UserId(50);
const STRANGER: UserId = UserId(99);

fn approved_group() -> Group {
    let mut group = Group::create(
        GroupId(1),
        "Fixture",
        LEADER,
        [PROPOSER].into(),
        vec![],
        None,
    )
    .expect("create");
    group.set_adviser(ADVISER).expect("adviser");
    group.approve().expect("approve");
    let panels: BTreeSet<UserId> = [NAMED_PANEL, UNNAMED_PANEL].into();
    group.set_panels(panels).expect("panels");
    group
}

fn thesis_in(status: ThesisStatus) -> Thesis {
    let mut thesis = Thesis::create(
        ThesisId(1),
        "Fixture",
        "Abstract.",
        vec![],
        GroupId(1),
        PROPOSER,
    );
    thesis.status = status;
    thesis
}

/// The full cast of actors the authority matrix is checked against.
fn cast() -> Vec<User> {
    vec![
        User::new(LEADER, "leader", Role::Student),
        User::new(PROPOSER, "proposer", Role::Student),
        User::new(ADVISER, "adviser", Role::Adviser),
        User::new(OTHER_ADVISER, "other-adviser", Role::Adviser),
        User::new(NAMED_PANEL, "named-panel", Role::Panel),
        User::new(UNNAMED_PANEL, "unnamed-panel", Role::Panel),
        User::new(OUTSIDE_PANEL, "outside-panel", Role::Panel),
        User::new(ADMIN, "admin", Role::Admin),
        User::new(STRANGER, "stranger", Role::Student),
    ]
}

/// Who a rule's authority admits, given the fixture's relationships and a
/// `Scheduled` schedule naming only `NAMED_PANEL`.
fn expected_grant(authority: Authority, actor: &User) -> bool {
    match authority {
        Authority::Proposer => actor.id == PROPOSER,
        Authority::GroupAdviser => actor.id == ADVISER,
        Authority::GroupAdviserOrAdmin => actor.id == ADVISER || actor.role == Role::Admin,
        Authority::ScheduledPanel => actor.id == NAMED_PANEL,
        Authority::Admin => actor.role == Role::Admin,
    }
}

// =============================================================================
// EXHAUSTIVE AUTHORITY MATRIX
// =============================================================================

/// For every declared rule and every actor in the cast, `authorize` grants
/// exactly the pairs the table's authority column admits; everything else
/// is `Forbidden` (never a state change, never a panic).
#[test]
fn authority_matrix_is_exact() {
    let group = approved_group();
    for rule in TRANSITIONS {
        let thesis = thesis_in(rule.from);
        let schedule = rule.from.defense_stage().map(|stage| {
            Schedule::create(
                ScheduleId(1),
                thesis.id,
                stage,
                "slot",
                "room",
                [NAMED_PANEL].into(),
            )
        });
        let ctx = ReviewContext {
            thesis: &thesis,
            group: &group,
            schedule: schedule.as_ref(),
        };

        for actor in cast() {
            let result = authorize(&actor, rule, &ctx);
            if expected_grant(rule.authority, &actor) {
                assert!(
                    result.is_ok(),
                    "{:?} should drive {} from {}",
                    actor.id,
                    rule.action,
                    rule.from
                );
            } else {
                assert!(
                    matches!(result, Err(GradusError::Forbidden { .. })),
                    "{:?} must be forbidden for {} from {}",
                    actor.id,
                    rule.action,
                    rule.from
                );
            }
        }
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

/// Milestones that must appear in lifecycle order along any walk.
const MILESTONES: &[ThesisStatus] = &[
    ThesisStatus::Draft,
    ThesisStatus::TopicSubmitted,
    ThesisStatus::TopicApproved,
    ThesisStatus::ConceptApproved,
    ThesisStatus::ProposalApproved,
    ThesisStatus::ResearchInProgress,
    ThesisStatus::FinalApproved,
    ThesisStatus::Archived,
];

fn milestone_rank(status: ThesisStatus) -> Option<usize> {
    MILESTONES.iter().position(|m| *m == status)
}

proptest! {
    /// Random walks through the table never visit milestone states out of
    /// order: once a later milestone is reached, an earlier one can never
    /// reappear (revision loops stay within a stage).
    #[test]
    fn monotonic_milestone_progression(choices in proptest::collection::vec(0usize..64, 1..200)) {
        let mut status = ThesisStatus::Draft;
        let mut highest = 0usize;

        for choice in choices {
            let outgoing: Vec<_> = TRANSITIONS.iter().filter(|r| r.from == status).collect();
            if outgoing.is_empty() {
                prop_assert!(status.is_terminal());
                break;
            }
            status = outgoing[choice % outgoing.len()].to;

            if let Some(rank) = milestone_rank(status) {
                prop_assert!(
                    rank >= highest,
                    "milestone {} revisited after rank {}",
                    status,
                    highest
                );
                highest = rank;
            }
        }
    }

    /// From any revisions-required state, resubmit returns to the
    /// corresponding submitted state and the forward path is open again.
    #[test]
    fn revision_loop_closure(index in 0usize..3) {
        let (required, submitted) = [
            (ThesisStatus::ConceptRevisionsRequired, ThesisStatus::ConceptSubmitted),
            (ThesisStatus::ProposalRevisionsRequired, ThesisStatus::ProposalSubmitted),
            (ThesisStatus::FinalRevisionsRequired, ThesisStatus::FinalSubmitted),
        ][index];

        let rule = find_transition(required, ThesisAction::Resubmit).expect("resubmit edge");
        prop_assert_eq!(rule.to, submitted);
        // The normal forward path is reachable again.
        prop_assert!(find_transition(submitted, ThesisAction::AdviserApprove).is_some());
    }

    /// Every related party sees the group and thesis; strangers of any
    /// non-admin role see neither; admin always sees both.
    #[test]
    fn access_symmetry(stranger_role in 0usize..3, stranger_id in 100u64..10_000) {
        let group = approved_group();
        let thesis = thesis_in(ThesisStatus::ResearchInProgress);

        for user in cast() {
            let related = matches!(
                user.id,
                LEADER | PROPOSER | ADVISER | NAMED_PANEL | UNNAMED_PANEL
            );
            if related {
                prop_assert!(can_view_group(&user, &group));
                prop_assert!(can_view_thesis(&user, &thesis, &group));
            }
        }

        let role = [Role::Student, Role::Adviser, Role::Panel][stranger_role];
        let stranger = User::new(UserId(stranger_id), "s", role);
        prop_assert!(!can_view_group(&stranger, &group));
        prop_assert!(!can_view_thesis(&stranger, &thesis, &group));

        let admin = User::new(UserId(stranger_id), "root", Role::Admin);
        prop_assert!(can_view_group(&admin, &group));
        prop_assert!(can_view_thesis(&admin, &thesis, &group));
    }

    /// `approve` fails `AdviserRequired` exactly when the adviser is null,
    /// across every group status (non-pending statuses report the state
    /// error instead).
    #[test]
    fn adviser_required_iff_no_adviser(status_index in 0usize..4, with_adviser in any::<bool>()) {
        let status = [
            GroupStatus::Draft,
            GroupStatus::Pending,
            GroupStatus::Approved,
            GroupStatus::Rejected,
        ][status_index];

        let mut group = Group::create(
            GroupId(1),
            "G",
            LEADER,
            BTreeSet::new(),
            vec![],
            None,
        ).expect("create");
        group.status = status;
        group.adviser = with_adviser.then_some(ADVISER);

        match (status, with_adviser) {
            (GroupStatus::Pending, true) => {
                prop_assert!(group.approve().is_ok());
            }
            (GroupStatus::Pending, false) => {
                prop_assert!(matches!(
                    group.approve(),
                    Err(GradusError::PreconditionFailed {
                        reason: Precondition::AdviserRequired,
                        ..
                    })
                ), "expected AdviserRequired precondition failure");
            }
            _ => {
                prop_assert!(matches!(
                    group.approve(),
                    Err(GradusError::InvalidTransition { .. })
                ), "expected InvalidTransition error");
            }
        }
    }

    /// The same command sequence produces bit-identical roster exports:
    /// the engine is deterministic end to end.
    #[test]
    fn determinism_identical_commands_identical_snapshots(
        names in proptest::collection::vec("[a-z]{1,12}", 1..10)
    ) {
        let run = || -> Vec<u8> {
            let mut engine = Engine::new().expect("engine");
            let admin = engine.register_user(None, "Root", Role::Admin).expect("admin").id;
            for name in &names {
                engine.register_user(Some(admin), name, Role::Student).expect("register");
            }
            gradus_core::roster_to_bytes(&engine.export().expect("export")).expect("bytes")
        };
        prop_assert_eq!(run(), run());
    }
}

// =============================================================================
// TABLE SHAPE
// =============================================================================

/// Every non-terminal status is reachable from Draft and has a way out;
/// the table validation pass agrees.
#[test]
fn table_is_total_and_connected() {
    gradus_core::validate_table().expect("table validates");

    // Reachability from Draft by breadth-first walk.
    let mut reached: BTreeSet<ThesisStatus> = [ThesisStatus::Draft].into();
    let mut frontier = vec![ThesisStatus::Draft];
    while let Some(status) = frontier.pop() {
        for rule in TRANSITIONS.iter().filter(|r| r.from == status) {
            if reached.insert(rule.to) {
                frontier.push(rule.to);
            }
        }
    }
    for status in ALL_STATUSES {
        assert!(reached.contains(status), "{} unreachable from draft", status);
    }
}

/// Schedule-gated rules sit exactly on statuses with a defense stage.
#[test]
fn schedule_gated_rules_have_a_stage() {
    for rule in TRANSITIONS {
        if matches!(rule.authority, Authority::ScheduledPanel)
            || rule.action == ThesisAction::ScheduleDefense
        {
            assert!(
                rule.from.defense_stage().is_some(),
                "{} from {} has no stage for its schedule lookup",
                rule.action,
                rule.from
            );
        }
    }
    // And the stage ladder matches the table's forward order.
    assert!(DefenseStage::Concept < DefenseStage::Proposal);
    assert!(DefenseStage::Proposal < DefenseStage::Final);
}
