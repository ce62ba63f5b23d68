//! Raw JSONL record shapes relevant to span reconstruction.
//!
//! Only the fields the reconstructor reads are modelled; everything else on a
//! record is ignored. Unknown record and content block types decode to
//! catch-all variants instead of failing the line.

use serde::Deserialize;
use serde_json::Value;

/// Tool name of a sub-agent launch.
pub const TASK_TOOL: &str = "Task";
/// Tool name of a sub-agent termination request.
pub const TASK_STOP_TOOL: &str = "TaskStop";
/// `data.type` of a progress record that carries a runtime agent id.
pub const AGENT_PROGRESS: &str = "agent_progress";

/// One decoded line of the event log.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum LogEvent {
    #[serde(rename = "assistant")]
    Assistant {
        #[serde(default)]
        timestamp: Option<String>,
        #[serde(default)]
        message: Option<RawMessage>,
    },
    #[serde(rename = "user")]
    User {
        #[serde(default)]
        timestamp: Option<String>,
        #[serde(default)]
        message: Option<RawMessage>,
    },
    #[serde(rename = "progress")]
    Progress {
        #[serde(default, rename = "parentToolUseID")]
        parent_tool_use_id: Option<String>,
        #[serde(default)]
        data: Option<ProgressData>,
    },
    #[serde(other)]
    Other,
}

impl LogEvent {
    pub(crate) fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawMessage {
    /// A plain string or an array of content items
    pub content: Option<Value>,
}

impl RawMessage {
    /// Content blocks of the message; plain-string content has none.
    ///
    /// Each item is decoded on its own, so an item that does not fit any block
    /// shape is dropped without losing its siblings.
    pub(crate) fn blocks(&self) -> Vec<ContentBlock> {
        let Some(Value::Array(items)) = &self.content else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| match ContentBlock::deserialize(item) {
                Ok(block) => Some(block),
                Err(e) => {
                    tracing::trace!(error = %e, "Skipping undecodable content item");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ContentBlock {
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Option<Value>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        is_error: Option<bool>,
    },
    #[serde(other)]
    Unknown,
}

/// `data` of a `progress` record.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ProgressData {
    #[serde(rename = "agentId")]
    pub agent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ProgressData {
    /// Runtime agent id, if this is an `agent_progress` update naming one.
    pub(crate) fn runtime_agent_id(&self) -> Option<&str> {
        if self.kind.as_deref() != Some(AGENT_PROGRESS) {
            return None;
        }
        self.agent_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Input of a `Task` tool call.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct TaskInput {
    pub subagent_type: Option<String>,
    pub description: Option<String>,
    pub prompt: Option<String>,
    pub run_in_background: Option<bool>,
}

impl TaskInput {
    /// Decode a launch input, falling back to empty fields for odd shapes.
    pub(crate) fn from_value(input: &Value) -> Self {
        serde_json::from_value(input.clone()).unwrap_or_default()
    }
}

/// Input of a `TaskStop` tool call.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct TaskStopInput {
    pub task_id: Option<String>,
}

impl TaskStopInput {
    pub(crate) fn target(input: &Value) -> Option<String> {
        serde_json::from_value::<Self>(input.clone())
            .ok()
            .and_then(|stop| stop.task_id)
            .filter(|id| !id.is_empty())
    }
}

/// A tool result payload, classified by the shape that determines its size.
///
/// Precedence when resolving: a non-empty sibling `text` field, then string
/// `content`, then an array of `{text}` items, then the raw serialized
/// `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPayload {
    /// Non-empty `text` field next to `content`
    DirectText(String),
    /// `content` is a bare string
    Text(String),
    /// `content` is an array of content items; holds each item's text
    Blocks(Vec<String>),
    /// Anything else, kept as its serialized JSON
    Raw(String),
}

impl ResultPayload {
    pub fn resolve(text: Option<&str>, content: Option<&Value>) -> Self {
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            return ResultPayload::DirectText(text.to_string());
        }

        match content {
            Some(Value::String(s)) => ResultPayload::Text(s.clone()),
            Some(Value::Array(items)) if items.iter().all(Value::is_object) => {
                ResultPayload::Blocks(
                    items
                        .iter()
                        .map(|item| {
                            item.get("text")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string()
                        })
                        .collect(),
                )
            }
            Some(other) => ResultPayload::Raw(other.to_string()),
            None => ResultPayload::Raw(String::new()),
        }
    }

    /// Size of the payload: characters for text shapes, bytes for raw JSON.
    pub fn char_count(&self) -> usize {
        match self {
            ResultPayload::DirectText(s) | ResultPayload::Text(s) => s.chars().count(),
            ResultPayload::Blocks(texts) => texts.iter().map(|t| t.chars().count()).sum(),
            ResultPayload::Raw(raw) => raw.len(),
        }
    }
}
