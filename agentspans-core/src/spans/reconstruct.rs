//! Single-stream span reconstruction.
//!
//! A [`SpanReconstructor`] makes one forward pass over a stream, then resolves
//! whatever could not be resolved inline in [`SpanReconstructor::finish`]:
//!
//! 1. `Task` tool calls open a pending span keyed by invocation id.
//! 2. Matching `tool_result` blocks finalize it into the output buffer.
//! 3. `agent_progress` records map runtime agent ids to invocation ids.
//! 4. `TaskStop` calls record runtime agent ids to kill.
//!
//! Kills are joined against the progress mapping only after the whole stream
//! has been read, so the three correlated record kinds may arrive in any order.

use crate::error::{Error, Result};
use crate::spans::event::{
    ContentBlock, LogEvent, RawMessage, ResultPayload, TaskInput, TaskStopInput, TASK_STOP_TOOL,
    TASK_TOOL,
};
use crate::timestamp::parse_timestamp;
use crate::types::{duration_between, AgentSpan, DEFAULT_AGENT_TYPE, PROMPT_EXCERPT_CHARS};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

/// An in-flight `Task` launch.
#[derive(Debug, Clone)]
struct PendingSpan {
    agent_type: String,
    description: String,
    prompt_excerpt: String,
    background: bool,
    started_at: Option<DateTime<Utc>>,
    tool_use_id: String,
    success: bool,
}

impl PendingSpan {
    fn launch(tool_use_id: &str, input: TaskInput, started_at: Option<DateTime<Utc>>) -> Self {
        let agent_type = input
            .subagent_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_AGENT_TYPE.to_string());
        let prompt_excerpt = input
            .prompt
            .unwrap_or_default()
            .chars()
            .take(PROMPT_EXCERPT_CHARS)
            .collect();

        Self {
            agent_type,
            description: input.description.unwrap_or_default(),
            prompt_excerpt,
            background: input.run_in_background.unwrap_or(false),
            started_at,
            tool_use_id: tool_use_id.to_string(),
            success: true,
        }
    }

    fn into_span(
        self,
        session_id: &str,
        completed_at: Option<DateTime<Utc>>,
        success: bool,
        result_chars: usize,
    ) -> AgentSpan {
        AgentSpan {
            session_id: session_id.to_string(),
            project_id: None,
            agent_type: self.agent_type,
            description: self.description,
            prompt_excerpt: self.prompt_excerpt,
            background: self.background,
            started_at: self.started_at,
            completed_at,
            duration_ms: duration_between(self.started_at, completed_at),
            killed: false,
            success,
            result_chars,
            tool_use_id: self.tool_use_id,
        }
    }
}

/// Output of reconstructing one stream.
#[derive(Debug, Default)]
pub struct StreamReport {
    pub session_id: String,
    /// Finalized spans in completion order, followed by never-completed spans
    pub spans: Vec<AgentSpan>,
    /// Non-fatal problems (undecodable lines, read errors)
    pub warnings: Vec<String>,
    /// Lines consumed, including blank and skipped ones
    pub lines_read: usize,
    /// Lines that could not be decoded
    pub lines_skipped: usize,
}

/// Correlation state for one stream.
///
/// Never share an instance between streams: ids are only meaningful within
/// the stream that produced them.
pub struct SpanReconstructor {
    session_id: String,
    pending: HashMap<String, PendingSpan>,
    killed_runtime_ids: BTreeSet<String>,
    runtime_to_invocation: HashMap<String, String>,
    spans: Vec<AgentSpan>,
    /// invocation id -> position in `spans`
    span_index: HashMap<String, usize>,
    warnings: Vec<String>,
    lines_read: usize,
    lines_skipped: usize,
}

impl SpanReconstructor {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            pending: HashMap::new(),
            killed_runtime_ids: BTreeSet::new(),
            runtime_to_invocation: HashMap::new(),
            spans: Vec::new(),
            span_index: HashMap::new(),
            warnings: Vec::new(),
            lines_read: 0,
            lines_skipped: 0,
        }
    }

    /// Consume one raw log line. Undecodable lines are recorded and skipped.
    pub fn feed_line(&mut self, line: &str) {
        self.lines_read += 1;

        if line.trim().is_empty() {
            return;
        }

        let event = match LogEvent::decode(line) {
            Ok(event) => event,
            Err(e) => {
                self.skip_line(format!("Line {}: JSON parse error: {}", self.lines_read, e));
                return;
            }
        };

        match event {
            LogEvent::Assistant { timestamp, message } => {
                if let Some(message) = message {
                    self.on_assistant(timestamp.as_deref(), &message);
                }
            }
            LogEvent::User { timestamp, message } => {
                if let Some(message) = message {
                    self.on_user(timestamp.as_deref(), &message);
                }
            }
            LogEvent::Progress {
                parent_tool_use_id,
                data,
            } => {
                let runtime_id = data.as_ref().and_then(|d| d.runtime_agent_id());
                if let (Some(runtime_id), Some(parent)) =
                    (runtime_id, parent_tool_use_id.filter(|p| !p.is_empty()))
                {
                    self.runtime_to_invocation
                        .insert(runtime_id.to_string(), parent);
                }
            }
            LogEvent::Other => {}
        }
    }

    /// Record a read failure for the current position.
    pub fn record_read_error(&mut self, error: &std::io::Error) {
        self.lines_read += 1;
        self.skip_line(format!("Line {}: read error: {}", self.lines_read, error));
    }

    fn skip_line(&mut self, warning: String) {
        tracing::debug!(session_id = %self.session_id, "{}", warning);
        self.lines_skipped += 1;
        self.warnings.push(warning);
    }

    fn on_assistant(&mut self, timestamp: Option<&str>, message: &RawMessage) {
        let started_at = timestamp.and_then(parse_timestamp);

        for block in message.blocks() {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };

            match name.as_str() {
                TASK_TOOL => {
                    let pending =
                        PendingSpan::launch(&id, TaskInput::from_value(&input), started_at);
                    if self.pending.insert(id.clone(), pending).is_some() {
                        tracing::trace!(tool_use_id = %id, "Task launch replaced a pending launch");
                    }
                }
                TASK_STOP_TOOL => {
                    if let Some(target) = TaskStopInput::target(&input) {
                        self.killed_runtime_ids.insert(target);
                    }
                }
                _ => {}
            }
        }
    }

    fn on_user(&mut self, timestamp: Option<&str>, message: &RawMessage) {
        for block in message.blocks() {
            let ContentBlock::ToolResult {
                tool_use_id,
                content,
                text,
                is_error,
            } = block
            else {
                continue;
            };

            let Some(pending) = self.pending.remove(&tool_use_id) else {
                tracing::trace!(tool_use_id = %tool_use_id, "Unmatched tool result");
                continue;
            };

            let completed_at = timestamp.and_then(parse_timestamp);
            let success = pending.success && !is_error.unwrap_or(false);
            let result_chars =
                ResultPayload::resolve(text.as_deref(), content.as_ref()).char_count();

            let span = pending.into_span(&self.session_id, completed_at, success, result_chars);
            self.push_span(span);
        }
    }

    /// Append a finalized span. When an invocation id is finalized twice, kill
    /// signals resolve against the later span.
    fn push_span(&mut self, span: AgentSpan) {
        let previous = self
            .span_index
            .insert(span.tool_use_id.clone(), self.spans.len());
        if previous.is_some() {
            tracing::trace!(tool_use_id = %span.tool_use_id, "Invocation id finalized twice");
        }
        self.spans.push(span);
    }

    /// Finalize leftovers, apply kill signals and return the stream's spans.
    pub fn finish(mut self) -> StreamReport {
        // Never-completed launches, in a reproducible order
        let mut leftovers: Vec<PendingSpan> = self.pending.drain().map(|(_, p)| p).collect();
        leftovers.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.tool_use_id.cmp(&b.tool_use_id))
        });
        let incomplete = leftovers.len();
        for pending in leftovers {
            let span = pending.into_span(&self.session_id, None, false, 0);
            self.push_span(span);
        }

        let mut killed = 0;
        for runtime_id in &self.killed_runtime_ids {
            let index = self
                .runtime_to_invocation
                .get(runtime_id)
                .and_then(|invocation| self.span_index.get(invocation));

            match index {
                Some(&index) => {
                    let span = &mut self.spans[index];
                    span.killed = true;
                    span.success = false;
                    killed += 1;
                }
                None => {
                    tracing::trace!(runtime_agent_id = %runtime_id, "Unmatched TaskStop");
                }
            }
        }

        tracing::debug!(
            session_id = %self.session_id,
            spans = self.spans.len(),
            incomplete,
            killed,
            skipped = self.lines_skipped,
            "Stream reconstructed"
        );

        StreamReport {
            session_id: self.session_id,
            spans: self.spans,
            warnings: self.warnings,
            lines_read: self.lines_read,
            lines_skipped: self.lines_skipped,
        }
    }
}

/// Reconstruct spans from an in-memory sequence of lines.
pub fn reconstruct_lines<'a, I>(session_id: impl Into<String>, lines: I) -> StreamReport
where
    I: IntoIterator<Item = &'a str>,
{
    let mut reconstructor = SpanReconstructor::new(session_id);
    for line in lines {
        reconstructor.feed_line(line);
    }
    reconstructor.finish()
}

/// Reconstruct spans from a buffered reader.
///
/// Lines that are not valid UTF-8 are skipped. Any other read error ends the
/// stream early; what was read so far is still reconstructed.
pub fn reconstruct_reader<R: BufRead>(session_id: impl Into<String>, reader: R) -> StreamReport {
    let mut reconstructor = SpanReconstructor::new(session_id);

    for line_result in reader.lines() {
        match line_result {
            Ok(line) => reconstructor.feed_line(&line),
            Err(e) if e.kind() == ErrorKind::InvalidData => reconstructor.record_read_error(&e),
            Err(e) => {
                reconstructor.record_read_error(&e);
                break;
            }
        }
    }

    reconstructor.finish()
}

/// Reconstruct spans from a JSONL file.
///
/// The session id is the file stem. Failing to open the file is the only
/// error; everything after that degrades to warnings.
pub fn reconstruct_file(path: &Path) -> Result<StreamReport> {
    let file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;

    Ok(reconstruct_reader(
        session_id_from_path(path),
        BufReader::new(file),
    ))
}

/// Session id for a stream file: its file stem.
pub fn session_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}
