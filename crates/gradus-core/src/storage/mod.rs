//! # Persistent Storage Backends
//!
//! Disk-backed [`crate::roster::Roster`] implementations.

mod redb_roster;

pub use redb_roster::RedbRoster;
