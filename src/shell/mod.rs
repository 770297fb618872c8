//! Host plugin shell - wires the event stream to the presence session
//!
//! Reads one JSON event per line from stdin, classifies it, and dispatches
//! to the session fire-and-forget: a hook must never wait on presence
//! delivery. Owns process-exit signal wiring.

use crate::config::{Config, CLIENT_ID_ENV};
use crate::hooks::{self, Action, Counter};
use crate::presence::PresenceSession;
use crate::rpc::IpcConnector;
use anyhow::Result;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};

/// Shown when the project directory yields no usable name
const FALLBACK_PROJECT_NAME: &str = "workspace";

/// Display project name: last segment of the project directory
pub fn project_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_PROJECT_NAME)
        .to_string()
}

/// Run the adapter until the event stream ends or a termination signal
pub async fn run(project_dir: &Path, config: Config) -> Result<()> {
    let Some(client_id) = config.client_id() else {
        tracing::warn!(
            "No client id in {} or config file; presence reporting disabled",
            CLIENT_ID_ENV
        );
        return drain_events().await;
    };

    let connector = IpcConnector::new(client_id, config.display_assets());
    let session = PresenceSession::new(
        project_name(project_dir),
        Box::new(connector),
        config.session_options(),
    );

    // A failed first dial is fine; the reconnect loop takes over
    session.connect().await;
    session.update("Idle", "").await;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => handle_line(&session, &line),
                    Ok(None) => break, // host closed the stream
                    Err(err) => {
                        tracing::warn!("Event stream read failed: {}", err);
                        break;
                    }
                }
            }
            _ = sigint.recv() => {
                session.destroy_sync();
                return Ok(());
            }
            _ = sigterm.recv() => {
                session.destroy_sync();
                return Ok(());
            }
        }
    }

    let stats = session.stats().await;
    tracing::info!(
        "Session ended: {} files edited, {} commands run",
        stats.files_edited,
        stats.commands_run
    );
    session.destroy().await;
    Ok(())
}

/// Keep consuming the host's events with presence disabled, so the host
/// never sees a broken pipe
async fn drain_events() -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while lines.next_line().await?.is_some() {}
    Ok(())
}

fn handle_line(session: &PresenceSession, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let event = match hooks::parse_event(line) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!("Ignoring malformed event: {}", err);
            return;
        }
    };
    dispatch(session, hooks::classify(&event));
}

/// Dispatch an action without waiting on its outcome; send errors are
/// already swallowed inside the session
fn dispatch(session: &PresenceSession, action: Action) {
    let session = session.clone();
    tokio::spawn(async move {
        match action {
            Action::Update {
                state,
                detail,
                counter,
            } => {
                match counter {
                    Some(Counter::FilesEdited) => session.record_file_edit().await,
                    Some(Counter::CommandsRun) => session.record_command().await,
                    None => {}
                }
                session.update(&state, &detail).await;
            }
            Action::NewSession => {
                session.reset_session().await;
                session.update("Idle", "").await;
            }
            Action::Clear => session.clear().await,
            Action::Ignore => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_name_is_last_segment() {
        assert_eq!(project_name(Path::new("/home/u/myproj")), "myproj");
        assert_eq!(project_name(Path::new("/home/u/myproj/")), "myproj");
        assert_eq!(project_name(Path::new("myproj")), "myproj");
    }

    #[test]
    fn project_name_falls_back_when_empty() {
        assert_eq!(project_name(Path::new("")), "workspace");
        assert_eq!(project_name(Path::new("/")), "workspace");
    }
}
