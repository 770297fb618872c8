//! Host agent event taxonomy
//!
//! The host emits one JSON object per line on the adapter's stdin. Payloads
//! are host-defined; unknown fields are ignored and malformed lines are
//! dropped by the shell, never surfaced as errors.

mod classifier;

pub use classifier::{classify, Action, Counter};

use serde::{Deserialize, Serialize};

/// One event from the host's lifecycle/tool stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HookEvent {
    /// A new logical agent session began
    SessionStart,

    /// The agent session ended
    SessionEnd,

    /// The agent is waiting for input
    SessionIdle,

    /// The user submitted a prompt
    Prompt,

    /// The agent invoked a tool
    ToolUse {
        name: String,

        /// Tool arguments, shape varies per tool
        #[serde(default)]
        input: serde_json::Value,
    },
}

/// Parse one line from the host's event stream
pub fn parse_event(line: &str) -> Result<HookEvent, serde_json::Error> {
    serde_json::from_str(line)
}
