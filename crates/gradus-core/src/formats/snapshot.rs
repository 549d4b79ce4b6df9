//! # Snapshot Format
//!
//! Binary serialization for roster snapshots.
//!
//! Format: Header (5 bytes) + postcard-serialized roster data.
//! - 4 bytes: Magic ("GRAD")
//! - 1 byte: Version
//!
//! Snapshots are the source of truth for backup and transfer: the same
//! roster always serializes to the same bytes, whichever storage backend
//! produced it. File I/O lives in the app layer; everything here is a pure
//! byte transformation.
//!
//! ## Validation
//!
//! All structural validation happens before payload deserialization:
//! minimum size, maximum payload size, then header magic and version.

use crate::limits::{FORMAT_VERSION, MAGIC_BYTES, MAX_SNAPSHOT_PAYLOAD_SIZE};
use crate::roster::RosterSnapshot;
use crate::types::GradusError;

/// Minimum valid snapshot size (header only).
const MIN_FILE_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all roster data.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotHeader {
    /// Magic bytes identifying the format.
    pub magic: [u8; 4],
    /// Format version for compatibility.
    pub version: u8,
}

impl SnapshotHeader {
    /// Create a new header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), GradusError> {
        if &self.magic != MAGIC_BYTES {
            return Err(GradusError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(GradusError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 5] {
        let mut bytes = [0u8; 5];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GradusError> {
        if bytes.len() < MIN_FILE_SIZE {
            return Err(GradusError::SerializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a roster snapshot to bytes (header + payload).
pub fn roster_to_bytes(snapshot: &RosterSnapshot) -> Result<Vec<u8>, GradusError> {
    let header = SnapshotHeader::new();
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| GradusError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(MIN_FILE_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);

    Ok(result)
}

/// Deserialize a roster snapshot from bytes.
pub fn roster_from_bytes(bytes: &[u8]) -> Result<RosterSnapshot, GradusError> {
    if bytes.len() < MIN_FILE_SIZE {
        return Err(GradusError::SerializationError(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }

    if bytes.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(GradusError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = &bytes[MIN_FILE_SIZE..];
    postcard::from_bytes(payload).map_err(|e| {
        GradusError::SerializationError(format!("Failed to deserialize roster data: {}", e))
    })
}

// =============================================================================
// CHECKSUMS
// =============================================================================

/// XOR-fold checksum over snapshot bytes.
///
/// Deterministic and dependency-free; enough to catch truncation and bit
/// rot in transit. For tamper evidence use the `crypto-hash` feature.
#[must_use]
pub fn snapshot_checksum(bytes: &[u8]) -> u64 {
    let mut checksum = 0u64;
    for (i, chunk) in bytes.chunks(8).enumerate() {
        let mut word = [0u8; 8];
        word[..chunk.len()].copy_from_slice(chunk);
        checksum ^= u64::from_le_bytes(word).rotate_left((i % 64) as u32);
    }
    checksum
}

/// BLAKE3 fingerprint of a snapshot, hex-encoded.
///
/// Only available with the `crypto-hash` feature enabled.
#[cfg(feature = "crypto-hash")]
pub fn snapshot_crypto_hash(snapshot: &RosterSnapshot) -> Result<String, GradusError> {
    let bytes = roster_to_bytes(snapshot)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Verify a snapshot against an expected BLAKE3 fingerprint.
///
/// Only available with the `crypto-hash` feature enabled.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn verify_crypto_hash(snapshot: &RosterSnapshot, expected_hash: &str) -> bool {
    match snapshot_crypto_hash(snapshot) {
        Ok(actual) => actual == expected_hash,
        Err(_) => false,
    }
}

// =============================================================================
// TESTS
// =============================================================================
