//! # Boundary Limits
//!
//! Hardcoded validation limits and format constants for the Gradus engine.
//!
//! The engine starts with zero data but fixed rules. These limits are
//! compiled into the binary and are immutable at runtime; the HTTP layer
//! validates against them before any payload reaches the core.

/// Minimum members in a group, inclusive of the leader.
pub const MIN_GROUP_MEMBERS: usize = 1;

/// Maximum members in a group, inclusive of the leader.
pub const MAX_GROUP_MEMBERS: usize = 4;

/// Maximum panel members assignable to a group.
pub const MAX_PANEL_SIZE: usize = 8;

/// Maximum length for thesis titles and group names.
///
/// Longer values are rejected at the boundary to prevent memory
/// exhaustion from malformed input.
pub const MAX_TITLE_LENGTH: usize = 256;

/// Maximum length for thesis abstracts and review feedback (64KB).
pub const MAX_TEXT_LENGTH: usize = 65536;

/// Maximum number of keywords on a thesis.
pub const MAX_KEYWORDS: usize = 16;

/// Maximum number of possible topics a group may list.
pub const MAX_TOPICS: usize = 8;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the Gradus binary snapshot header.
///
/// - File Header = Magic Bytes ("GRAD") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"GRAD";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum allowed snapshot payload size (64 MB).
///
/// Validated BEFORE attempting deserialization to prevent allocation-based
/// resource exhaustion from corrupted or malicious snapshot files.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;
