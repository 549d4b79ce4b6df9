//! # Serialization Formats
//!
//! Binary snapshot format for roster export and import.

mod snapshot;

pub use snapshot::{
    SnapshotHeader, roster_from_bytes, roster_to_bytes, snapshot_checksum,
};

#[cfg(feature = "crypto-hash")]
pub use snapshot::{snapshot_crypto_hash, verify_crypto_hash};
