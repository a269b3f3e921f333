//! daka - habit check-in calendar
//!
//! This library provides the core functionality for the daka CLI tool: a
//! single-user calendar tracking four daily habits, with a small HTTP server
//! holding the records and a client that syncs optimistically against it.
//!
//! # Core Concepts
//!
//! - **Records**: one JSON map from dates to per-day task flags
//! - **Auth Gate**: shared password, fixed session cookie, binary trust
//! - **Sync Engine**: optimistic toggles, immediate or debounced writes,
//!   whole-session rollback on failure
//! - **Local Cache**: versioned mirror of the last known-good records
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration from `DAKA_*` environment variables
//! - `error`: Error types and result aliases
//! - `records`: Task keys, day records, and record-map operations
//! - `auth`: Password verification and the session cookie
//! - `store`: Record document storage (local file or remote blob)
//! - `server`: HTTP server exposing auth and record endpoints
//! - `client`: HTTP client with session persistence
//! - `sync`: Optimistic sync engine with debounce
//! - `cache`: Client-side record cache
//! - `output`: Shared CLI output formatting

pub mod auth;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod records;
pub mod server;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
