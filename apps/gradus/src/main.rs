//! # Gradus - Thesis Supervision Server
//!
//! The main binary for the Gradus lifecycle engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for roster operations
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                apps/gradus (THE BINARY)              │
//! │                                                      │
//! │   ┌─────────────┐            ┌─────────────┐         │
//! │   │   CLI       │            │   HTTP API  │         │
//! │   │  (clap)     │            │   (axum)    │         │
//! │   └──────┬──────┘            └──────┬──────┘         │
//! │          │                          │                │
//! │          └────────────┬─────────────┘                │
//! │                       ▼                              │
//! │               ┌───────────────┐                      │
//! │               │  gradus-core  │                      │
//! │               │  (THE LOGIC)  │                      │
//! │               └───────────────┘                      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! gradus server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! gradus status
//! gradus seed -f users.json
//! gradus export -o roster.bin
//! ```

use clap::Parser;
use gradus::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — GRADUS_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GRADUS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gradus=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Gradus startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗ ██████╗  █████╗ ██████╗ ██╗   ██╗███████╗
  ██╔════╝ ██╔══██╗██╔══██╗██╔══██╗██║   ██║██╔════╝
  ██║  ███╗██████╔╝███████║██║  ██║██║   ██║███████╗
  ██║   ██║██╔══██╗██╔══██║██║  ██║██║   ██║╚════██║
  ╚██████╔╝██║  ██║██║  ██║██████╔╝╚██████╔╝███████║
   ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚═════╝  ╚═════╝ ╚══════╝

  Thesis Supervision Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
