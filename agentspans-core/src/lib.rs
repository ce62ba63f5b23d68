//! # agentspans-core
//!
//! Core library for agentspans - sub-agent span reconstruction for
//! Claude Code session logs.
//!
//! This library provides:
//! - Span reconstruction: `Task` launches correlated with their results,
//!   progress records and `TaskStop` kills, one stream at a time
//! - Bounded-concurrency batch reconstruction over many streams
//! - SAW wave aggregation of coordination-tagged spans
//! - Configuration management and logging infrastructure
//!
//! Nothing is persisted: every call recomputes from the raw logs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use agentspans_core::{aggregate_waves, reconstruct_file};
//! use std::path::Path;
//!
//! let report = reconstruct_file(Path::new("session.jsonl")).expect("failed to open stream");
//! for session in aggregate_waves(&report.spans) {
//!     println!("{}: {} agents", session.session_id, session.total_agents);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use discovery::{discover_streams, StreamSource};
pub use error::{Error, Result};
pub use spans::{
    reconstruct_file, reconstruct_lines, reconstruct_reader, BatchReconstructor, BatchResult,
    SpanReconstructor, StreamReport,
};
pub use types::*;
pub use waves::{aggregate_waves, parse_saw_tag, SawTag};

// Public modules
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod spans;
pub mod timestamp;
pub mod types;
pub mod waves;
