//! # gradus-core
//!
//! The deterministic lifecycle engine for Gradus - THE LOGIC.
//!
//! This crate implements the CORE of the thesis supervision system: the
//! finite state machine governing thesis status, the role-gated review
//! protocol that drives its transitions, and the access-control predicate
//! that decides who may view or act on a given thesis or group.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is the ONLY place where domain state exists (stateful)
//! - Is closed: no external logic may be injected
//! - Is minimal: if a rule is not essential to lifecycle decisions, it is removed
//! - Never initiates interaction; only reacts to explicit commands
//! - Has NO async, NO network dependencies (pure Rust)
//!
//! Everything around it - HTTP transport, identity resolution, calendars,
//! notification delivery - is an external collaborator reached through the
//! [`roster::Roster`] and [`events::Notifier`] seams.

// =============================================================================
// MODULES
// =============================================================================

pub mod access;
pub mod engine;
pub mod events;
pub mod formats;
pub mod group;
pub mod limits;
pub mod protocol;
pub mod roster;
pub mod schedule;
pub mod status;
pub mod storage;
pub mod thesis;
pub mod transitions;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    GradusError, GroupId, Precondition, Role, ScheduleId, Subject, ThesisId, User, UserId,
};

// =============================================================================
// RE-EXPORTS: Aggregates & Status Vocabulary
// =============================================================================

pub use group::Group;
pub use schedule::Schedule;
pub use status::{DefenseStage, GroupStatus, ScheduleStatus, ThesisStatus};
pub use thesis::Thesis;

// =============================================================================
// RE-EXPORTS: Engine & Protocol
// =============================================================================

pub use access::{Visibility, can_view_group, can_view_thesis, classify_group, classify_thesis};
pub use engine::{Engine, GroupPartition, ReviewDisposition, StorageBackend, ThesisPartition};
pub use events::{DomainEvent, EventLog, Notifier, NullNotifier};
pub use protocol::{ReviewContext, authorize};
pub use transitions::{
    ALL_ACTIONS, ALL_STATUSES, Authority, TRANSITIONS, ThesisAction, TransitionRule,
    find_transition, validate_table,
};

// =============================================================================
// RE-EXPORTS: Storage & Formats
// =============================================================================

pub use formats::{roster_from_bytes, roster_to_bytes, snapshot_checksum};
pub use roster::{MemoryRoster, NextIds, Roster, RosterCounts, RosterSnapshot};
pub use storage::RedbRoster;
