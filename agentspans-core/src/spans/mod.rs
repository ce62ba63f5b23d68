//! Sub-agent span reconstruction from Claude Code JSONL streams.
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌─────────────────┐
//! │ JSONL stream │ ──► │ SpanReconstructor │ ──► │  StreamReport   │
//! │ (one session)│     │  (one per stream) │     │ (Vec<AgentSpan>)│
//! └──────────────┘     └───────────────────┘     └─────────────────┘
//!                                ▲
//!                    ┌───────────┴──────────┐
//!                    │  BatchReconstructor  │  many streams, bounded
//!                    └──────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! - **Malformed JSON lines**: recorded in [`StreamReport::warnings`], skipped.
//! - **Unknown record or block types**: ignored.
//! - **Unmatched results and kills**: ignored; they mean a truncated log or a
//!   correlation that never resolved.
//! - **Stream cannot be opened**: the only error returned to the caller.

mod batch;
pub(crate) mod event;
mod reconstruct;

pub use batch::{BatchReconstructor, BatchResult, StreamSummary};
pub use event::ResultPayload;
pub use reconstruct::{
    reconstruct_file, reconstruct_lines, reconstruct_reader, session_id_from_path,
    SpanReconstructor, StreamReport,
};
