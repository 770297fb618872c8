//! Status-service IPC client - socket discovery, handshake, activity commands

use super::wire::{self, Opcode};
use super::{DisplayAssets, Presence, RpcError, StatusConnector, StatusSink};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::net::UnixStream;
use uuid::Uuid;

/// Handshake protocol version expected by the service
const HANDSHAKE_VERSION: u32 = 1;

#[derive(Serialize)]
struct HandshakeRequest<'a> {
    v: u32,
    client_id: &'a str,
}

#[derive(Serialize)]
struct ActivityCommand<'a> {
    cmd: &'static str,
    args: ActivityArgs<'a>,
    nonce: String,
}

#[derive(Serialize)]
struct ActivityArgs<'a> {
    pid: u32,
    activity: Option<Activity<'a>>,
}

#[derive(Serialize)]
struct Activity<'a> {
    details: &'a str,
    state: &'a str,
    timestamps: Timestamps,
    assets: Assets<'a>,
    instance: bool,
}

#[derive(Serialize)]
struct Timestamps {
    start: i64,
}

#[derive(Serialize)]
struct Assets<'a> {
    large_image: &'a str,
    large_text: &'a str,
}

/// Reply envelope; fields vary by command so everything is optional
#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    evt: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// A live connection to the status service
pub struct IpcClient {
    stream: UnixStream,
    pid: u32,
    assets: DisplayAssets,
}

impl IpcClient {
    /// Connect to the service and complete the handshake
    pub async fn connect(client_id: &str, assets: DisplayAssets) -> Result<Self, RpcError> {
        let stream = discover_socket().await?;
        let mut client = Self {
            stream,
            pid: std::process::id(),
            assets,
        };
        client.handshake(client_id).await?;
        Ok(client)
    }

    async fn handshake(&mut self, client_id: &str) -> Result<(), RpcError> {
        let request = HandshakeRequest {
            v: HANDSHAKE_VERSION,
            client_id,
        };
        let payload = serde_json::to_vec(&request)?;
        wire::write_frame(&mut self.stream, Opcode::Handshake, &payload).await?;

        let reply = self.read_reply().await?;
        match reply.evt.as_deref() {
            Some("READY") => Ok(()),
            evt => Err(RpcError::Handshake(format!(
                "expected READY, got {:?}",
                evt
            ))),
        }
    }

    /// Read frames until a command reply arrives, servicing pings in between
    async fn read_reply(&mut self) -> Result<Reply, RpcError> {
        loop {
            match wire::read_frame(&mut self.stream).await? {
                None => return Err(RpcError::Closed("eof".into())),
                Some((Opcode::Ping, payload)) => {
                    wire::write_frame(&mut self.stream, Opcode::Pong, &payload).await?;
                }
                Some((Opcode::Close, payload)) => {
                    return Err(RpcError::Closed(
                        String::from_utf8_lossy(&payload).into_owned(),
                    ));
                }
                Some((_, payload)) => return Ok(serde_json::from_slice(&payload)?),
            }
        }
    }

    /// Serialize an activity command; borrows end before the send
    fn encode_activity(&self, activity: Option<Activity<'_>>) -> Result<Vec<u8>, RpcError> {
        let command = ActivityCommand {
            cmd: "SET_ACTIVITY",
            args: ActivityArgs {
                pid: self.pid,
                activity,
            },
            nonce: Uuid::new_v4().to_string(),
        };
        Ok(serde_json::to_vec(&command)?)
    }

    async fn send_command(&mut self, payload: Vec<u8>) -> Result<(), RpcError> {
        wire::write_frame(&mut self.stream, Opcode::Frame, &payload).await?;

        let reply = self.read_reply().await?;
        if reply.evt.as_deref() == Some("ERROR") {
            let message = reply.data["message"].as_str().unwrap_or("unknown error");
            return Err(RpcError::Closed(message.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StatusSink for IpcClient {
    async fn set_status(&mut self, presence: &Presence) -> Result<(), RpcError> {
        let payload = self.encode_activity(Some(Activity {
            details: &presence.details,
            state: &presence.state,
            timestamps: Timestamps {
                start: presence.start,
            },
            assets: Assets {
                large_image: &self.assets.image_key,
                large_text: &self.assets.image_text,
            },
            instance: false,
        }))?;
        self.send_command(payload).await
    }

    async fn clear_status(&mut self) -> Result<(), RpcError> {
        let payload = self.encode_activity(None)?;
        self.send_command(payload).await
    }

    async fn close(&mut self) {
        // Dropping the stream closes the socket; the Close frame is a courtesy
        let _ = wire::write_frame(&mut self.stream, Opcode::Close, b"{}").await;
    }
}

/// Factory for [`IpcClient`] connections
pub struct IpcConnector {
    client_id: String,
    assets: DisplayAssets,
}

impl IpcConnector {
    pub fn new(client_id: String, assets: DisplayAssets) -> Self {
        Self { client_id, assets }
    }
}

#[async_trait]
impl StatusConnector for IpcConnector {
    async fn connect(&self) -> Result<Box<dyn StatusSink>, RpcError> {
        let client = IpcClient::connect(&self.client_id, self.assets.clone()).await?;
        Ok(Box::new(client))
    }
}

/// Candidate socket paths, most specific first
///
/// Sandboxed installs (flatpak, snap) nest the socket under an app subdir.
fn socket_candidates() -> Vec<PathBuf> {
    let mut bases = Vec::new();
    for var in ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"] {
        if let Ok(dir) = std::env::var(var) {
            if !dir.is_empty() {
                bases.push(PathBuf::from(dir));
            }
        }
    }
    bases.push(PathBuf::from("/tmp"));

    let mut candidates = Vec::new();
    for base in &bases {
        for subdir in ["", "app/com.discordapp.Discord", "snap.discord"] {
            let dir = if subdir.is_empty() {
                base.clone()
            } else {
                base.join(subdir)
            };
            for index in 0..10 {
                candidates.push(dir.join(format!("discord-ipc-{}", index)));
            }
        }
    }
    candidates
}

async fn discover_socket() -> Result<UnixStream, RpcError> {
    for path in socket_candidates() {
        if let Ok(stream) = UnixStream::connect(&path).await {
            tracing::debug!("Connected to status service at {}", path.display());
            return Ok(stream);
        }
    }
    Err(RpcError::SocketNotFound)
}
