//! # Gradus Application Library
//!
//! The HTTP API and CLI surfaces over the gradus-core engine. The binary
//! in `main.rs` is a thin wrapper; everything testable lives here so the
//! integration tests can drive the router directly.

pub mod api;
pub mod cli;
pub mod notify;
