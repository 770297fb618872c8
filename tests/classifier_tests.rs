//! Tests for the host event classifier

use beacon::hooks::{classify, parse_event, Action, Counter, HookEvent};
use serde_json::json;

fn tool(name: &str, input: serde_json::Value) -> HookEvent {
    HookEvent::ToolUse {
        name: name.to_string(),
        input,
    }
}

fn expect_update(action: Action) -> (String, String, Option<Counter>) {
    match action {
        Action::Update {
            state,
            detail,
            counter,
        } => (state, detail, counter),
        other => panic!("expected update, got {:?}", other),
    }
}

#[test]
fn lifecycle_events_map_to_session_actions() {
    assert_eq!(classify(&HookEvent::SessionStart), Action::NewSession);
    assert_eq!(classify(&HookEvent::SessionEnd), Action::Clear);

    let (state, detail, counter) = expect_update(classify(&HookEvent::SessionIdle));
    assert_eq!(state, "Idle");
    assert!(detail.is_empty());
    assert_eq!(counter, None);

    let (state, _, _) = expect_update(classify(&HookEvent::Prompt));
    assert_eq!(state, "Thinking...");
}

#[test]
fn edit_tools_count_file_edits() {
    let event = tool("edit", json!({"file_path": "/home/u/myproj/src/main.go"}));
    let (state, detail, counter) = expect_update(classify(&event));
    assert_eq!(state, "Editing code");
    assert_eq!(detail, "main.go");
    assert_eq!(counter, Some(Counter::FilesEdited));
}

#[test]
fn shell_tools_count_commands() {
    let event = tool("bash", json!({"command": "cargo build --release"}));
    let (state, detail, counter) = expect_update(classify(&event));
    assert_eq!(state, "Running commands");
    assert_eq!(detail, "cargo");
    assert_eq!(counter, Some(Counter::CommandsRun));
}

#[test]
fn read_and_search_tools_are_uncounted() {
    let (state, detail, counter) =
        expect_update(classify(&tool("read", json!({"path": "README.md"}))));
    assert_eq!(state, "Reading files");
    assert_eq!(detail, "README.md");
    assert_eq!(counter, None);

    let (state, detail, _) =
        expect_update(classify(&tool("grep", json!({"pattern": "fn main"}))));
    assert_eq!(state, "Searching the codebase");
    assert_eq!(detail, "fn main");
}

#[test]
fn web_tools_show_the_host() {
    let event = tool("webfetch", json!({"url": "https://docs.rs/tokio/latest"}));
    let (state, detail, _) = expect_update(classify(&event));
    assert_eq!(state, "Browsing the web");
    assert_eq!(detail, "docs.rs");
}

#[test]
fn tool_names_are_case_insensitive() {
    let (state, _, counter) =
        expect_update(classify(&tool("Bash", json!({"command": "ls"}))));
    assert_eq!(state, "Running commands");
    assert_eq!(counter, Some(Counter::CommandsRun));
}

#[test]
fn unknown_tools_fall_back_to_generic_phrase() {
    let (state, detail, counter) = expect_update(classify(&tool("divination", json!({}))));
    assert_eq!(state, "Using divination");
    assert!(detail.is_empty());
    assert_eq!(counter, None);
}

#[test]
fn missing_or_odd_payloads_do_not_panic() {
    expect_update(classify(&tool("edit", json!(null))));
    expect_update(classify(&tool("bash", json!({"command": 42}))));
    expect_update(classify(&tool("webfetch", json!([1, 2, 3]))));
}

#[test]
fn long_details_are_truncated() {
    let long = "x".repeat(500);
    let (_, detail, _) = expect_update(classify(&tool("grep", json!({ "pattern": long }))));
    assert_eq!(detail.chars().count(), 64);
    assert!(detail.ends_with('…'));
}

#[test]
fn events_parse_from_ndjson_lines() {
    let event = parse_event(r#"{"event":"session_start"}"#).unwrap();
    assert!(matches!(event, HookEvent::SessionStart));

    let event =
        parse_event(r#"{"event":"tool_use","name":"bash","input":{"command":"ls -la"}}"#).unwrap();
    match event {
        HookEvent::ToolUse { name, input } => {
            assert_eq!(name, "bash");
            assert_eq!(input["command"], "ls -la");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn tool_use_tolerates_missing_input() {
    let event = parse_event(r#"{"event":"tool_use","name":"read"}"#).unwrap();
    match event {
        HookEvent::ToolUse { input, .. } => assert!(input.is_null()),
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn malformed_and_unknown_events_are_errors() {
    assert!(parse_event("not json").is_err());
    assert!(parse_event(r#"{"event":"telepathy"}"#).is_err());
}
