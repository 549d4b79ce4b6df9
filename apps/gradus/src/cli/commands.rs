//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::notify::TracingNotifier;
use gradus_core::{
    Engine, GradusError, Role, UserId, formats, roster_from_bytes, roster_to_bytes,
    snapshot_checksum,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for seed input (10 MB).
///
/// Seed files are small user lists; anything larger is a mistake.
const MAX_SEED_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum file size for import (64 MB).
///
/// Matches the snapshot format's own payload cap.
const MAX_IMPORT_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), GradusError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| GradusError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(GradusError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input file path: canonicalize (resolving symlinks and
/// "..") and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, GradusError> {
    let canonical = path.canonicalize().map_err(|e| {
        GradusError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(GradusError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, GradusError> {
    let parent = path.parent().unwrap_or(Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        GradusError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(GradusError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| GradusError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// CONFIG FILE
// =============================================================================

/// Optional TOML config overriding the CLI's global defaults.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    /// Server bind host.
    pub host: Option<String>,
    /// Server bind port.
    pub port: Option<u16>,
    /// Roster database path.
    pub database: Option<PathBuf>,
    /// Storage backend ("redb" or "memory").
    pub backend: Option<String>,
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig, GradusError> {
    let canonical = validate_file_path(path)?;
    let text = std::fs::read_to_string(&canonical)
        .map_err(|e| GradusError::IoError(format!("Cannot read config: {}", e)))?;
    toml::from_str(&text)
        .map_err(|e| GradusError::SerializationError(format!("Invalid config file: {}", e)))
}

// =============================================================================
// ENGINE LOADING
// =============================================================================

/// Open the engine over the selected backend, with tracing notifications.
fn load_engine(db_path: &Path, backend: &str) -> Result<Engine, GradusError> {
    let engine = match backend {
        "memory" => Engine::new()?,
        "redb" => Engine::with_redb(db_path)?,
        other => {
            return Err(GradusError::InvalidInput(format!(
                "unknown backend '{}' (expected 'redb' or 'memory')",
                other
            )));
        }
    };
    Ok(engine.with_notifier(Box::new(TracingNotifier)))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &Path,
    backend: &str,
    host: &str,
    port: u16,
) -> Result<(), GradusError> {
    let engine = load_engine(db_path, backend)?;

    println!("Gradus Thesis Supervision Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", backend);
    println!("  Database: {:?}", db_path);
    println!();
    println!("Endpoints:");
    println!("  GET  /health  - Health check");
    println!("  GET  /status  - Roster status");
    println!("  POST /users   - Register a user");
    println!("  POST /groups  - Create a group (+ action routes)");
    println!("  POST /theses  - Create a thesis (+ action routes)");
    println!("  POST /export  - Export roster snapshot");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, engine).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show roster status.
pub fn cmd_status(db_path: &Path, backend: &str, json_mode: bool) -> Result<(), GradusError> {
    let engine = load_engine(db_path, backend)?;
    let counts = engine.counts()?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "users": counts.users,
            "groups": counts.groups,
            "theses": counts.theses,
            "schedules": counts.schedules,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Gradus Roster Status");
    println!("====================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!();
    println!("Users:     {}", counts.users);
    println!("Groups:    {}", counts.groups);
    println!("Theses:    {}", counts.theses);
    println!("Schedules: {}", counts.schedules);

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new roster database.
pub fn cmd_init(db_path: &Path, backend: &str, json_mode: bool) -> Result<(), GradusError> {
    if backend == "redb" && db_path.exists() {
        return Err(GradusError::IoError(format!(
            "Database already exists at {:?}",
            db_path
        )));
    }

    let engine = load_engine(db_path, backend)?;
    let counts = engine.counts()?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "created": true,
            "users": counts.users,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Initialized roster database at {:?}", db_path);
        println!("Register the first (admin) user via POST /users or `gradus seed`.");
    }
    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// One user entry in a seed file.
#[derive(Debug, Deserialize)]
struct SeedUser {
    name: String,
    role: String,
}

/// Register users from a JSON file.
///
/// When the directory is empty the first entry bootstraps the directory
/// and must therefore be an admin; later entries are registered with that
/// admin as the acting user.
pub fn cmd_seed(
    db_path: &Path,
    backend: &str,
    file: &Path,
    json_mode: bool,
) -> Result<(), GradusError> {
    let canonical = validate_file_path(file)?;
    validate_file_size(&canonical, MAX_SEED_FILE_SIZE)?;

    let text = std::fs::read_to_string(&canonical)
        .map_err(|e| GradusError::IoError(format!("Cannot read seed file: {}", e)))?;
    let entries: Vec<SeedUser> = serde_json::from_str(&text)
        .map_err(|e| GradusError::SerializationError(format!("Invalid seed file: {}", e)))?;

    let mut engine = load_engine(db_path, backend)?;

    // Find an acting admin, if the directory already has one.
    let mut acting_admin: Option<UserId> = engine
        .export()?
        .users
        .iter()
        .find(|u| u.active && u.role == Role::Admin)
        .map(|u| u.id);

    let mut registered = 0usize;
    for entry in entries {
        let role = api::parse_role(&entry.role)?;
        let user = engine.register_user(acting_admin, &entry.name, role)?;
        if acting_admin.is_none() && user.role == Role::Admin {
            acting_admin = Some(user.id);
        }
        registered += 1;
    }

    if json_mode {
        let output = serde_json::json!({
            "registered": registered,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Registered {} users from {:?}", registered, file);
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the roster snapshot to a file.
pub fn cmd_export(
    db_path: &Path,
    backend: &str,
    output: &Path,
    json_mode: bool,
) -> Result<(), GradusError> {
    let engine = load_engine(db_path, backend)?;
    let snapshot = engine.export()?;
    let bytes = roster_to_bytes(&snapshot)?;
    let checksum = snapshot_checksum(&bytes);

    let out_path = validate_output_path(output)?;
    std::fs::write(&out_path, &bytes)
        .map_err(|e| GradusError::IoError(format!("Cannot write snapshot: {}", e)))?;

    if json_mode {
        let output = serde_json::json!({
            "path": out_path.to_string_lossy(),
            "bytes": bytes.len(),
            "checksum": checksum,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Exported {} bytes to {:?}", bytes.len(), out_path);
        println!("Checksum: {:#018x}", checksum);
    }
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import a roster snapshot from a file, replacing the current roster.
pub fn cmd_import(
    db_path: &Path,
    backend: &str,
    input: &Path,
    json_mode: bool,
) -> Result<(), GradusError> {
    let canonical = validate_file_path(input)?;
    validate_file_size(&canonical, MAX_IMPORT_FILE_SIZE)?;

    let bytes = std::fs::read(&canonical)
        .map_err(|e| GradusError::IoError(format!("Cannot read snapshot: {}", e)))?;
    let snapshot = roster_from_bytes(&bytes)?;

    let mut engine = load_engine(db_path, backend)?;
    engine.import(snapshot)?;
    let counts = engine.counts()?;

    if json_mode {
        let output = serde_json::json!({
            "users": counts.users,
            "groups": counts.groups,
            "theses": counts.theses,
            "schedules": counts.schedules,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!(
            "Imported {} users, {} groups, {} theses, {} schedules",
            counts.users, counts.groups, counts.theses, counts.schedules
        );
    }
    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Compute the BLAKE3 fingerprint of the roster snapshot.
pub fn cmd_hash(db_path: &Path, backend: &str, json_mode: bool) -> Result<(), GradusError> {
    let engine = load_engine(db_path, backend)?;
    let snapshot = engine.export()?;
    let hash = formats::snapshot_crypto_hash(&snapshot)?;

    if json_mode {
        let output = serde_json::json!({ "blake3": hash });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("BLAKE3: {}", hash);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
