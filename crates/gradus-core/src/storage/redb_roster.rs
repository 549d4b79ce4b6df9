//! # redb-backed Roster Storage
//!
//! A disk-backed roster using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! One table per aggregate kind, keyed by the raw `u64` id, with the
//! aggregate postcard-serialized as the value. Id counters live in the
//! metadata table so allocation survives restarts.

use crate::group::Group;
use crate::roster::{NextIds, Roster, RosterCounts, RosterSnapshot};
use crate::schedule::Schedule;
use crate::status::{DefenseStage, ScheduleStatus};
use crate::thesis::Thesis;
use crate::types::{GradusError, GroupId, ScheduleId, ThesisId, User, UserId};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for users: UserId(u64) -> serialized User bytes
const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Table for groups: GroupId(u64) -> serialized Group bytes
const GROUPS: TableDefinition<u64, &[u8]> = TableDefinition::new("groups");

/// Table for theses: ThesisId(u64) -> serialized Thesis bytes
const THESES: TableDefinition<u64, &[u8]> = TableDefinition::new("theses");

/// Table for schedules: ScheduleId(u64) -> serialized Schedule bytes
const SCHEDULES: TableDefinition<u64, &[u8]> = TableDefinition::new("schedules");

/// Table for metadata: key string -> value u64 (id counters)
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_USER_ID: &str = "next_user_id";
const NEXT_GROUP_ID: &str = "next_group_id";
const NEXT_THESIS_ID: &str = "next_thesis_id";
const NEXT_SCHEDULE_ID: &str = "next_schedule_id";

fn io_err(e: impl std::fmt::Display) -> GradusError {
    GradusError::IoError(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> GradusError {
    GradusError::SerializationError(e.to_string())
}

/// A disk-backed roster using redb.
pub struct RedbRoster {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRoster").finish_non_exhaustive()
    }
}

impl RedbRoster {
    /// Open or create a roster database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GradusError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(USERS).map_err(io_err)?;
            let _ = write_txn.open_table(GROUPS).map_err(io_err)?;
            let _ = write_txn.open_table(THESES).map_err(io_err)?;
            let _ = write_txn.open_table(SCHEDULES).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), GradusError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    fn load<T: DeserializeOwned>(
        &self,
        table: TableDefinition<'_, u64, &[u8]>,
        id: u64,
    ) -> Result<Option<T>, GradusError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(table).map_err(io_err)?;
        match table.get(id).map_err(io_err)? {
            Some(bytes) => {
                let value = postcard::from_bytes(bytes.value()).map_err(ser_err)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn store<T: Serialize>(
        &mut self,
        table: TableDefinition<'_, u64, &[u8]>,
        id: u64,
        value: &T,
    ) -> Result<(), GradusError> {
        let bytes = postcard::to_stdvec(value).map_err(ser_err)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(table).map_err(io_err)?;
            table.insert(id, bytes.as_slice()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn load_all<T: DeserializeOwned>(
        &self,
        table: TableDefinition<'_, u64, &[u8]>,
    ) -> Result<Vec<T>, GradusError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(table).map_err(io_err)?;
        let mut values = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, bytes) = entry.map_err(io_err)?;
            values.push(postcard::from_bytes(bytes.value()).map_err(ser_err)?);
        }
        Ok(values)
    }

    fn table_len(
        &self,
        table: TableDefinition<'_, u64, &[u8]>,
    ) -> Result<usize, GradusError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(table).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    fn allocate(&mut self, key: &str) -> Result<u64, GradusError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let id = {
            let mut table = write_txn.open_table(METADATA).map_err(io_err)?;
            let id = table
                .get(key)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(1);
            table.insert(key, id.saturating_add(1)).map_err(io_err)?;
            id
        };
        write_txn.commit().map_err(io_err)?;
        Ok(id)
    }

    fn next_id(&self, key: &str) -> Result<u64, GradusError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(METADATA).map_err(io_err)?;
        Ok(table
            .get(key)
            .map_err(io_err)?
            .map(|v| v.value())
            .unwrap_or(1))
    }
}

impl Roster for RedbRoster {
    fn user(&self, id: UserId) -> Result<Option<User>, GradusError> {
        self.load(USERS, id.0)
    }

    fn put_user(&mut self, user: &User) -> Result<(), GradusError> {
        self.store(USERS, user.id.0, user)
    }

    fn users(&self) -> Result<Vec<User>, GradusError> {
        self.load_all(USERS)
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>, GradusError> {
        self.load(GROUPS, id.0)
    }

    fn put_group(&mut self, group: &Group) -> Result<(), GradusError> {
        self.store(GROUPS, group.id.0, group)
    }

    fn remove_group(&mut self, id: GroupId) -> Result<bool, GradusError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let existed = {
            let mut table = write_txn.open_table(GROUPS).map_err(io_err)?;
            table.remove(id.0).map_err(io_err)?.is_some()
        };
        write_txn.commit().map_err(io_err)?;
        Ok(existed)
    }

    fn groups(&self) -> Result<Vec<Group>, GradusError> {
        self.load_all(GROUPS)
    }

    fn thesis(&self, id: ThesisId) -> Result<Option<Thesis>, GradusError> {
        self.load(THESES, id.0)
    }

    fn put_thesis(&mut self, thesis: &Thesis) -> Result<(), GradusError> {
        self.store(THESES, thesis.id.0, thesis)
    }

    fn theses(&self) -> Result<Vec<Thesis>, GradusError> {
        self.load_all(THESES)
    }

    fn schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, GradusError> {
        self.load(SCHEDULES, id.0)
    }

    fn put_schedule(&mut self, schedule: &Schedule) -> Result<(), GradusError> {
        self.store(SCHEDULES, schedule.id.0, schedule)
    }

    fn schedule_for(
        &self,
        thesis: ThesisId,
        stage: DefenseStage,
    ) -> Result<Option<Schedule>, GradusError> {
        // Schedule sets stay small; a table scan beats a secondary index here.
        let all: Vec<Schedule> = self.load_all(SCHEDULES)?;
        Ok(all
            .into_iter()
            .rev()
            .find(|s| {
                s.thesis == thesis && s.stage == stage && s.status == ScheduleStatus::Scheduled
            }))
    }

    fn allocate_user_id(&mut self) -> Result<UserId, GradusError> {
        Ok(UserId(self.allocate(NEXT_USER_ID)?))
    }

    fn allocate_group_id(&mut self) -> Result<GroupId, GradusError> {
        Ok(GroupId(self.allocate(NEXT_GROUP_ID)?))
    }

    fn allocate_thesis_id(&mut self) -> Result<ThesisId, GradusError> {
        Ok(ThesisId(self.allocate(NEXT_THESIS_ID)?))
    }

    fn allocate_schedule_id(&mut self) -> Result<ScheduleId, GradusError> {
        Ok(ScheduleId(self.allocate(NEXT_SCHEDULE_ID)?))
    }

    fn counts(&self) -> Result<RosterCounts, GradusError> {
        Ok(RosterCounts {
            users: self.table_len(USERS)?,
            groups: self.table_len(GROUPS)?,
            theses: self.table_len(THESES)?,
            schedules: self.table_len(SCHEDULES)?,
        })
    }

    fn export(&self) -> Result<RosterSnapshot, GradusError> {
        Ok(RosterSnapshot {
            users: self.load_all(USERS)?,
            groups: self.load_all(GROUPS)?,
            theses: self.load_all(THESES)?,
            schedules: self.load_all(SCHEDULES)?,
            next_ids: NextIds {
                user: self.next_id(NEXT_USER_ID)?,
                group: self.next_id(NEXT_GROUP_ID)?,
                thesis: self.next_id(NEXT_THESIS_ID)?,
                schedule: self.next_id(NEXT_SCHEDULE_ID)?,
            },
        })
    }

    fn import(&mut self, snapshot: RosterSnapshot) -> Result<(), GradusError> {
        // Single transaction: the import either fully lands or not at all.
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut users = write_txn.open_table(USERS).map_err(io_err)?;
            users.retain(|_, _| false).map_err(io_err)?;
            for user in &snapshot.users {
                let bytes = postcard::to_stdvec(user).map_err(ser_err)?;
                users.insert(user.id.0, bytes.as_slice()).map_err(io_err)?;
            }

            let mut groups = write_txn.open_table(GROUPS).map_err(io_err)?;
            groups.retain(|_, _| false).map_err(io_err)?;
            for group in &snapshot.groups {
                let bytes = postcard::to_stdvec(group).map_err(ser_err)?;
                groups.insert(group.id.0, bytes.as_slice()).map_err(io_err)?;
            }

            let mut theses = write_txn.open_table(THESES).map_err(io_err)?;
            theses.retain(|_, _| false).map_err(io_err)?;
            for thesis in &snapshot.theses {
                let bytes = postcard::to_stdvec(thesis).map_err(ser_err)?;
                theses
                    .insert(thesis.id.0, bytes.as_slice())
                    .map_err(io_err)?;
            }

            let mut schedules = write_txn.open_table(SCHEDULES).map_err(io_err)?;
            schedules.retain(|_, _| false).map_err(io_err)?;
            for schedule in &snapshot.schedules {
                let bytes = postcard::to_stdvec(schedule).map_err(ser_err)?;
                schedules
                    .insert(schedule.id.0, bytes.as_slice())
                    .map_err(io_err)?;
            }

            let mut metadata = write_txn.open_table(METADATA).map_err(io_err)?;
            metadata
                .insert(NEXT_USER_ID, snapshot.next_ids.user)
                .map_err(io_err)?;
            metadata
                .insert(NEXT_GROUP_ID, snapshot.next_ids.group)
                .map_err(io_err)?;
            metadata
                .insert(NEXT_THESIS_ID, snapshot.next_ids.thesis)
                .map_err(io_err)?;
            metadata
                .insert(NEXT_SCHEDULE_ID, snapshot.next_ids.schedule)
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
