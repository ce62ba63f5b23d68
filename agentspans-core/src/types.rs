//! Core domain types for agentspans
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Stream** | One session's complete, ordered JSONL event log |
//! | **Invocation ID** | The `tool_use` id assigned when a `Task` is launched; its `tool_result` carries the same id |
//! | **Runtime agent ID** | The sub-agent id seen only in `agent_progress` records; `TaskStop` targets this id |
//! | **Span** | The finalized lifecycle of one delegated `Task` |
//! | **SAW tag** | `[SAW:wave<N>:agent-<X>]` prefix in a Task description declaring its wave and agent label |
//! | **Wave** | Tagged spans sharing a session and wave number |
//!
//! Timestamps that the log never provided are `None` rather than a zero
//! sentinel, and durations only exist when both endpoints do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agent type recorded when a `Task` launch omits `subagent_type`.
pub const DEFAULT_AGENT_TYPE: &str = "general-purpose";

/// Maximum number of characters of a Task prompt kept on a span.
pub const PROMPT_EXCERPT_CHARS: usize = 200;

// ============================================
// Spans
// ============================================

/// A finalized record of one delegated sub-agent task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpan {
    /// Session the stream belongs to (derived from the stream name)
    pub session_id: String,
    /// Project the session belongs to; assigned by the caller after reconstruction
    pub project_id: Option<String>,
    /// `subagent_type` of the launch, or [`DEFAULT_AGENT_TYPE`]
    pub agent_type: String,
    /// Full description text
    pub description: String,
    /// First [`PROMPT_EXCERPT_CHARS`] characters of the prompt
    pub prompt_excerpt: String,
    /// Launched with `run_in_background`
    pub background: bool,
    pub started_at: Option<DateTime<Utc>>,
    /// `None` if no matching result ever arrived
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration; only set when both timestamps are known
    pub duration_ms: Option<i64>,
    /// A `TaskStop` was correlated to this span
    pub killed: bool,
    pub success: bool,
    /// Character count of the resolved result payload
    pub result_chars: usize,
    /// Invocation id of the launching `Task` call
    pub tool_use_id: String,
}

impl AgentSpan {
    /// Whether a matching result was ever seen.
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Outcome classification used by the wave aggregator.
    pub fn status(&self) -> AgentRunStatus {
        if self.killed {
            AgentRunStatus::Killed
        } else if !self.success {
            AgentRunStatus::Failed
        } else {
            AgentRunStatus::Completed
        }
    }
}

/// Milliseconds between two optional timestamps.
///
/// Returns `None` unless both endpoints are known.
pub fn duration_between(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
        _ => None,
    }
}

// ============================================
// SAW aggregates
// ============================================

/// Outcome of one agent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRunStatus {
    Completed,
    Failed,
    Killed,
}

impl AgentRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRunStatus::Completed => "completed",
            AgentRunStatus::Failed => "failed",
            AgentRunStatus::Killed => "killed",
        }
    }
}

impl std::fmt::Display for AgentRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(AgentRunStatus::Completed),
            "failed" => Ok(AgentRunStatus::Failed),
            "killed" => Ok(AgentRunStatus::Killed),
            _ => Err(format!("unknown agent run status: {}", s)),
        }
    }
}

/// One tagged span's outcome within a wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SawAgentRun {
    /// Agent label from the SAW tag (`agent-<X>` without the prefix)
    pub agent: String,
    pub agent_type: String,
    pub description: String,
    pub status: AgentRunStatus,
    pub duration_ms: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// All runs sharing a (session, wave number) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SawWave {
    pub wave: u32,
    /// Ordered by agent label
    pub agents: Vec<SawAgentRun>,
    /// Earliest launch across the runs
    pub started_at: Option<DateTime<Utc>>,
    /// Latest completion across the runs
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

/// The waves observed for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SawSession {
    pub session_id: String,
    pub project_id: Option<String>,
    /// Ordered by wave number
    pub waves: Vec<SawWave>,
    /// Sum of runs across all waves
    pub total_agents: usize,
}
