//! Event classifier - maps host events to presence phrases
//!
//! Pure functions, no state; the session manager receives the output.

use super::HookEvent;
use serde_json::Value;

/// Hard display limit on a detail string
const MAX_DETAIL_LEN: usize = 64;

/// Session counter a tool invocation should bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    FilesEdited,
    CommandsRun,
}

/// What the shell should do with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Show a new status
    Update {
        state: String,
        detail: String,
        counter: Option<Counter>,
    },

    /// A new logical session: reset counters, show idle
    NewSession,

    /// Remove the displayed status
    Clear,

    Ignore,
}

impl Action {
    fn update(state: &str, detail: String) -> Self {
        Action::Update {
            state: state.to_string(),
            detail,
            counter: None,
        }
    }

    fn update_counted(state: &str, detail: String, counter: Counter) -> Self {
        Action::Update {
            state: state.to_string(),
            detail,
            counter: Some(counter),
        }
    }
}

/// Classify a host event into a presence action
pub fn classify(event: &HookEvent) -> Action {
    match event {
        HookEvent::SessionStart => Action::NewSession,
        HookEvent::SessionEnd => Action::Clear,
        HookEvent::SessionIdle => Action::update("Idle", String::new()),
        HookEvent::Prompt => Action::update("Thinking...", String::new()),
        HookEvent::ToolUse { name, input } => classify_tool(name, input),
    }
}

fn classify_tool(name: &str, input: &Value) -> Action {
    match name.to_ascii_lowercase().as_str() {
        "read" | "view" | "cat" | "notebookread" => {
            Action::update("Reading files", file_detail(input))
        }
        "edit" | "write" | "patch" | "multiedit" | "notebookedit" => {
            Action::update_counted("Editing code", file_detail(input), Counter::FilesEdited)
        }
        "bash" | "shell" | "exec" | "terminal" => {
            Action::update_counted("Running commands", command_detail(input), Counter::CommandsRun)
        }
        "grep" | "glob" | "search" | "find" | "ls" | "list" => {
            Action::update("Searching the codebase", pattern_detail(input))
        }
        "webfetch" | "websearch" | "fetch" | "browser" => {
            Action::update("Browsing the web", url_detail(input))
        }
        "todowrite" | "todoread" | "task" | "plan" => {
            Action::update("Planning next steps", String::new())
        }
        _ => Action::update(&format!("Using {}", name), String::new()),
    }
}

/// Last path segment of the file the tool touched
fn file_detail(input: &Value) -> String {
    for key in ["file_path", "path", "filePath", "file"] {
        if let Some(path) = input[key].as_str() {
            return truncate(base_name(path));
        }
    }
    String::new()
}

/// Leading program name of a shell command
fn command_detail(input: &Value) -> String {
    input["command"]
        .as_str()
        .map(|command| truncate(first_word(command)))
        .unwrap_or_default()
}

fn pattern_detail(input: &Value) -> String {
    for key in ["pattern", "query"] {
        if let Some(pattern) = input[key].as_str() {
            return truncate(pattern);
        }
    }
    String::new()
}

fn url_detail(input: &Value) -> String {
    input["url"]
        .as_str()
        .map(|url| truncate(host_of(url)))
        .unwrap_or_default()
}

/// Last segment of a path, ignoring a trailing slash
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// First whitespace-separated word
pub fn first_word(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

/// Host portion of a URL, scheme and path stripped
pub fn host_of(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    rest.split('/').next().unwrap_or(rest)
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DETAIL_LEN {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_DETAIL_LEN - 1).collect();
    truncated.push('…');
    truncated
}
