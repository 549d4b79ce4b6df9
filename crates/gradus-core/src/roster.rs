//! # Roster Storage
//!
//! The persistence collaborator for the engine: users, groups, theses and
//! schedule records behind one trait, with an in-memory implementation
//! here and a redb-backed one in [`crate::storage`].
//!
//! The engine issues reads before guarded writes and exactly one write per
//! accepted transition; the trait therefore exposes whole-aggregate load
//! and store operations, nothing finer-grained.
//!
//! ## Determinism
//!
//! The in-memory roster keeps everything in `BTreeMap`s so listing
//! operations iterate in id order on every backend.

use crate::group::Group;
use crate::schedule::Schedule;
use crate::status::{DefenseStage, ScheduleStatus};
use crate::thesis::Thesis;
use crate::types::{GradusError, GroupId, ScheduleId, ThesisId, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// COUNTS & SNAPSHOT SHAPES
// =============================================================================

/// Aggregate counts for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterCounts {
    /// Registered users.
    pub users: usize,
    /// Groups in any status.
    pub groups: usize,
    /// Theses in any status.
    pub theses: usize,
    /// Schedule records in any status.
    pub schedules: usize,
}

/// The full roster as plain data, the unit of export/import.
///
/// Vectors are kept in id order so the binary snapshot of the same roster
/// is bit-exact regardless of which backend produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    /// All users, ascending by id.
    pub users: Vec<User>,
    /// All groups, ascending by id.
    pub groups: Vec<Group>,
    /// All theses, ascending by id.
    pub theses: Vec<Thesis>,
    /// All schedule records, ascending by id.
    pub schedules: Vec<Schedule>,
    /// Next id to allocate, per aggregate kind.
    pub next_ids: NextIds,
}

/// Id allocation counters carried in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextIds {
    /// Next user id.
    pub user: u64,
    /// Next group id.
    pub group: u64,
    /// Next thesis id.
    pub thesis: u64,
    /// Next schedule id.
    pub schedule: u64,
}

impl Default for NextIds {
    fn default() -> Self {
        Self {
            user: 1,
            group: 1,
            thesis: 1,
            schedule: 1,
        }
    }
}

// =============================================================================
// ROSTER TRAIT
// =============================================================================

/// Whole-aggregate storage operations shared by every backend.
pub trait Roster {
    /// Load a user by id.
    fn user(&self, id: UserId) -> Result<Option<User>, GradusError>;
    /// Store (insert or replace) a user.
    fn put_user(&mut self, user: &User) -> Result<(), GradusError>;
    /// List all users in id order.
    fn users(&self) -> Result<Vec<User>, GradusError>;

    /// Load a group by id.
    fn group(&self, id: GroupId) -> Result<Option<Group>, GradusError>;
    /// Store (insert or replace) a group.
    fn put_group(&mut self, group: &Group) -> Result<(), GradusError>;
    /// Delete a group. Returns whether it existed.
    fn remove_group(&mut self, id: GroupId) -> Result<bool, GradusError>;
    /// List all groups in id order.
    fn groups(&self) -> Result<Vec<Group>, GradusError>;

    /// Load a thesis by id.
    fn thesis(&self, id: ThesisId) -> Result<Option<Thesis>, GradusError>;
    /// Store (insert or replace) a thesis.
    fn put_thesis(&mut self, thesis: &Thesis) -> Result<(), GradusError>;
    /// List all theses in id order.
    fn theses(&self) -> Result<Vec<Thesis>, GradusError>;

    /// Load a schedule record by id.
    fn schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, GradusError>;
    /// Store (insert or replace) a schedule record.
    fn put_schedule(&mut self, schedule: &Schedule) -> Result<(), GradusError>;
    /// Find the schedule guarding panel actions for a thesis stage: the
    /// newest record with status `Scheduled`, if any.
    fn schedule_for(
        &self,
        thesis: ThesisId,
        stage: DefenseStage,
    ) -> Result<Option<Schedule>, GradusError>;

    /// Allocate the next user id.
    fn allocate_user_id(&mut self) -> Result<UserId, GradusError>;
    /// Allocate the next group id.
    fn allocate_group_id(&mut self) -> Result<GroupId, GradusError>;
    /// Allocate the next thesis id.
    fn allocate_thesis_id(&mut self) -> Result<ThesisId, GradusError>;
    /// Allocate the next schedule id.
    fn allocate_schedule_id(&mut self) -> Result<ScheduleId, GradusError>;

    /// Aggregate counts for status reporting.
    fn counts(&self) -> Result<RosterCounts, GradusError>;

    /// Export the entire roster as plain data.
    fn export(&self) -> Result<RosterSnapshot, GradusError>;
    /// Replace the entire roster with the snapshot's contents.
    fn import(&mut self, snapshot: RosterSnapshot) -> Result<(), GradusError>;
}

// =============================================================================
// IN-MEMORY ROSTER
// =============================================================================

/// BTreeMap-backed roster. Fast, volatile unless explicitly exported.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoster {
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    theses: BTreeMap<ThesisId, Thesis>,
    schedules: BTreeMap<ScheduleId, Schedule>,
    next_ids: NextIds,
}

impl MemoryRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Roster for MemoryRoster {
    fn user(&self, id: UserId) -> Result<Option<User>, GradusError> {
        Ok(self.users.get(&id).cloned())
    }

    fn put_user(&mut self, user: &User) -> Result<(), GradusError> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    fn users(&self) -> Result<Vec<User>, GradusError> {
        Ok(self.users.values().cloned().collect())
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>, GradusError> {
        Ok(self.groups.get(&id).cloned())
    }

    fn put_group(&mut self, group: &Group) -> Result<(), GradusError> {
        self.groups.insert(group.id, group.clone());
        Ok(())
    }

    fn remove_group(&mut self, id: GroupId) -> Result<bool, GradusError> {
        Ok(self.groups.remove(&id).is_some())
    }

    fn groups(&self) -> Result<Vec<Group>, GradusError> {
        Ok(self.groups.values().cloned().collect())
    }

    fn thesis(&self, id: ThesisId) -> Result<Option<Thesis>, GradusError> {
        Ok(self.theses.get(&id).cloned())
    }

    fn put_thesis(&mut self, thesis: &Thesis) -> Result<(), GradusError> {
        self.theses.insert(thesis.id, thesis.clone());
        Ok(())
    }

    fn theses(&self) -> Result<Vec<Thesis>, GradusError> {
        Ok(self.theses.values().cloned().collect())
    }

    fn schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, GradusError> {
        Ok(self.schedules.get(&id).cloned())
    }

    fn put_schedule(&mut self, schedule: &Schedule) -> Result<(), GradusError> {
        self.schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    fn schedule_for(
        &self,
        thesis: ThesisId,
        stage: DefenseStage,
    ) -> Result<Option<Schedule>, GradusError> {
        Ok(self
            .schedules
            .values()
            .rev()
            .find(|s| {
                s.thesis == thesis && s.stage == stage && s.status == ScheduleStatus::Scheduled
            })
            .cloned())
    }

    fn allocate_user_id(&mut self) -> Result<UserId, GradusError> {
        let id = self.next_ids.user;
        self.next_ids.user = id.saturating_add(1);
        Ok(UserId(id))
    }

    fn allocate_group_id(&mut self) -> Result<GroupId, GradusError> {
        let id = self.next_ids.group;
        self.next_ids.group = id.saturating_add(1);
        Ok(GroupId(id))
    }

    fn allocate_thesis_id(&mut self) -> Result<ThesisId, GradusError> {
        let id = self.next_ids.thesis;
        self.next_ids.thesis = id.saturating_add(1);
        Ok(ThesisId(id))
    }

    fn allocate_schedule_id(&mut self) -> Result<ScheduleId, GradusError> {
        let id = self.next_ids.schedule;
        self.next_ids.schedule = id.saturating_add(1);
        Ok(ScheduleId(id))
    }

    fn counts(&self) -> Result<RosterCounts, GradusError> {
        Ok(RosterCounts {
            users: self.users.len(),
            groups: self.groups.len(),
            theses: self.theses.len(),
            schedules: self.schedules.len(),
        })
    }

    fn export(&self) -> Result<RosterSnapshot, GradusError> {
        Ok(RosterSnapshot {
            users: self.users.values().cloned().collect(),
            groups: self.groups.values().cloned().collect(),
            theses: self.theses.values().cloned().collect(),
            schedules: self.schedules.values().cloned().collect(),
            next_ids: self.next_ids,
        })
    }

    fn import(&mut self, snapshot: RosterSnapshot) -> Result<(), GradusError> {
        self.users = snapshot.users.into_iter().map(|u| (u.id, u)).collect();
        self.groups = snapshot.groups.into_iter().map(|g| (g.id, g)).collect();
        self.theses = snapshot.theses.into_iter().map(|t| (t.id, t)).collect();
        self.schedules = snapshot.schedules.into_iter().map(|s| (s.id, s)).collect();
        self.next_ids = snapshot.next_ids;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
