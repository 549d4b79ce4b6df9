//! # Core Type Definitions
//!
//! This module contains the identity and error types shared by every part
//! of the Gradus lifecycle engine:
//! - Entity identifiers (`UserId`, `GroupId`, `ThesisId`, `ScheduleId`)
//! - The role model (`Role`, `User`)
//! - Error types (`GradusError`, `Precondition`)
//! - The `Subject` reference carried by every error
//!
//! ## Determinism Guarantees
//!
//! All identifiers are `u64` newtypes implementing `Ord`, so aggregates can
//! live in `BTreeMap`/`BTreeSet` with a deterministic iteration order. The
//! external layer's mixed string/number id typing is a serialization concern
//! and never reaches this crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Unique identifier for a user in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Unique identifier for a student group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

/// Unique identifier for a thesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThesisId(pub u64);

/// Unique identifier for a defense schedule record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScheduleId(pub u64);

// =============================================================================
// ROLE MODEL
// =============================================================================

/// One of the four fixed roles a user holds.
///
/// Roles are immutable for the scope of this engine; role changes are an
/// external administrative concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// A student: forms groups, proposes and submits theses.
    Student,
    /// A faculty adviser: reviews topics and clears submissions for defense.
    Adviser,
    /// A panel member: records defense outcomes when named on a schedule.
    Panel,
    /// An administrator: approves groups, archives theses, sees everything.
    Admin,
}

impl Role {
    /// Get the role name as shown to callers.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Adviser => "adviser",
            Role::Panel => "panel",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A user of the supervision system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The directory identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// The fixed role.
    pub role: Role,
    /// Inactive users may not act or be assigned.
    pub active: bool,
}

impl User {
    /// Create a new active user.
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            active: true,
        }
    }

    /// Check whether this user holds the given role and is active.
    #[must_use]
    pub fn is_active_with_role(&self, role: Role) -> bool {
        self.active && self.role == role
    }
}

// =============================================================================
// SUBJECT REFERENCE
// =============================================================================

/// The aggregate an operation was attempted against.
///
/// Every engine error carries one of these so callers can diagnose which
/// record the failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    /// A group aggregate.
    Group(GroupId),
    /// A thesis aggregate.
    Thesis(ThesisId),
    /// A schedule record.
    Schedule(ScheduleId),
    /// A directory user.
    User(UserId),
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Group(id) => write!(f, "group {}", id.0),
            Subject::Thesis(id) => write!(f, "thesis {}", id.0),
            Subject::Schedule(id) => write!(f, "schedule {}", id.0),
            Subject::User(id) => write!(f, "user {}", id.0),
        }
    }
}

// =============================================================================
// PRECONDITIONS
// =============================================================================

/// The specific precondition a command failed against.
///
/// Preconditions are facts about the world that must hold before a
/// transition is attempted; they are distinct from authority (who may act)
/// and from state validity (which transitions exist).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precondition {
    /// Group approval requires an assigned adviser.
    AdviserRequired,
    /// The user already belongs to a pending or approved group.
    AlreadyInGroup(UserId),
    /// No schedule with status `Scheduled` exists for this thesis and stage.
    ScheduleMissing(crate::status::DefenseStage),
    /// Thesis creation requires the owning group to be approved.
    GroupNotApproved,
    /// Member count must be between 1 and 4 inclusive of the leader.
    MemberCount(usize),
    /// Panel size exceeds the allowed maximum.
    PanelSize(usize),
    /// The group already has an active (non-terminal) thesis.
    ActiveThesisExists(ThesisId),
    /// The group cannot be deleted while it has an active thesis.
    ActiveThesisForGroup(ThesisId),
    /// The user does not hold the role this assignment requires.
    RoleMismatch {
        /// The user whose role was checked.
        user: UserId,
        /// The role the operation requires.
        expected: Role,
    },
    /// The user is deactivated and may not act or be assigned.
    InactiveUser(UserId),
    /// The leader may not leave their own group; deletion is the leader path.
    LeaderCannotLeave,
    /// The user is not a member of the group.
    NotAMember(UserId),
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precondition::AdviserRequired => write!(f, "an adviser must be assigned first"),
            Precondition::AlreadyInGroup(u) => {
                write!(f, "user {} already has a pending or approved group", u.0)
            }
            Precondition::ScheduleMissing(stage) => {
                write!(f, "no scheduled defense exists for the {} stage", stage)
            }
            Precondition::GroupNotApproved => write!(f, "the group is not approved"),
            Precondition::MemberCount(n) => write!(f, "member count {} is outside 1..=4", n),
            Precondition::PanelSize(n) => write!(f, "panel size {} exceeds the maximum", n),
            Precondition::ActiveThesisExists(t) => {
                write!(f, "thesis {} is still active for this group", t.0)
            }
            Precondition::ActiveThesisForGroup(t) => {
                write!(f, "group still owns active thesis {}", t.0)
            }
            Precondition::RoleMismatch { user, expected } => {
                write!(f, "user {} must hold the {} role", user.0, expected)
            }
            Precondition::InactiveUser(u) => write!(f, "user {} is deactivated", u.0),
            Precondition::LeaderCannotLeave => write!(f, "the leader cannot leave the group"),
            Precondition::NotAMember(u) => write!(f, "user {} is not a group member", u.0),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors produced by the Gradus engine.
///
/// All variants are terminal and non-retriable: the caller must correct the
/// request (different actor, different state, supply missing data) and
/// resubmit. A failed guard never leaves an aggregate partially updated.
#[derive(Debug, Clone, Error)]
pub enum GradusError {
    /// The actor lacks the role or relationship authority for the action.
    #[error("user {} may not {action} {subject} (status {status})", actor.0)]
    Forbidden {
        /// Who attempted the action.
        actor: UserId,
        /// The attempted action verb.
        action: &'static str,
        /// The aggregate acted upon.
        subject: Subject,
        /// The aggregate's status at the time of the attempt.
        status: String,
    },

    /// The action is not defined from the aggregate's current status.
    #[error("{action} is not a valid transition for {subject} in status {status}")]
    InvalidTransition {
        /// The attempted action verb.
        action: &'static str,
        /// The aggregate acted upon.
        subject: Subject,
        /// The aggregate's status at the time of the attempt.
        status: String,
    },

    /// A required fact about the world does not hold.
    #[error("{action} on {subject} failed (status {status}): {reason}")]
    PreconditionFailed {
        /// The attempted action verb.
        action: &'static str,
        /// The aggregate acted upon.
        subject: Subject,
        /// The aggregate's status at the time of the attempt.
        status: String,
        /// The specific precondition that failed.
        reason: Precondition,
    },

    /// The referenced aggregate does not exist.
    #[error("{0} not found")]
    NotFound(Subject),

    /// Input failed boundary validation (lengths, counts, formats).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred in a storage backend.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
