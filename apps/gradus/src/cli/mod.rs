//! # Gradus CLI Module
//!
//! This module implements the CLI interface for Gradus.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show roster status
//! - `init` - Initialize a new roster database
//! - `seed` - Register users from a JSON file
//! - `export` - Export the roster snapshot to a file
//! - `import` - Import a roster snapshot from a file
//! - `hash` - Compute the BLAKE3 fingerprint of the roster

mod commands;

use clap::{Parser, Subcommand};
use gradus_core::GradusError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Gradus - Thesis Supervision Server
///
/// The lifecycle engine for staged thesis defenses: groups, reviews,
/// schedules and archives, with role-gated transitions throughout.
#[derive(Parser, Debug)]
#[command(name = "gradus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the roster database
    #[arg(short = 'D', long, global = true, default_value = "gradus.db")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to a TOML config file overriding host/port/database/backend
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show roster status
    Status,

    /// Initialize a new roster database
    Init,

    /// Register users from a JSON file (array of {name, role})
    Seed {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export the roster snapshot to a file
    Export {
        /// Path to the output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a roster snapshot from a file
    Import {
        /// Path to the input file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute the BLAKE3 fingerprint of the roster
    Hash,
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<(), GradusError> {
    // A config file, when given, overrides the global defaults.
    let file_config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let database = file_config.database.unwrap_or(cli.database);
    let backend = file_config.backend.unwrap_or(cli.backend);

    match cli.command.unwrap_or(Commands::Server {
        host: "127.0.0.1".to_string(),
        port: 8080,
    }) {
        Commands::Server { host, port } => {
            let host = file_config.host.unwrap_or(host);
            let port = file_config.port.unwrap_or(port);
            cmd_server(&database, &backend, &host, port).await
        }
        Commands::Status => cmd_status(&database, &backend, cli.json_mode),
        Commands::Init => cmd_init(&database, &backend, cli.json_mode),
        Commands::Seed { file } => cmd_seed(&database, &backend, &file, cli.json_mode),
        Commands::Export { output } => cmd_export(&database, &backend, &output, cli.json_mode),
        Commands::Import { input } => cmd_import(&database, &backend, &input, cli.json_mode),
        Commands::Hash => cmd_hash(&database, &backend, cli.json_mode),
    }
}
