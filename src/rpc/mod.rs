//! Client for the external status display service
//!
//! The session manager never talks to the service directly; it goes through
//! the [`StatusConnector`] / [`StatusSink`] trait pair so tests can substitute
//! an in-memory sink. [`IpcConnector`] is the production implementation,
//! speaking Discord's local IPC protocol.

mod client;
pub mod wire;

pub use client::{IpcClient, IpcConnector};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the status-service transport
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("no status-service socket found")]
    SocketNotFound,

    #[error("handshake rejected: {0}")]
    Handshake(String),

    #[error("connection closed by remote: {0}")]
    Closed(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: u32, max: u32 },

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A presence payload as displayed by the status service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// First display line
    pub details: String,

    /// Second display line
    pub state: String,

    /// Unix timestamp the "elapsed" clock counts from
    pub start: i64,
}

/// Fixed art shown next to every status
#[derive(Debug, Clone)]
pub struct DisplayAssets {
    pub image_key: String,
    pub image_text: String,
}

/// Establishes connections to the status service
#[async_trait]
pub trait StatusConnector: Send + Sync {
    /// Connect and complete the handshake, returning a live sink
    async fn connect(&self) -> Result<Box<dyn StatusSink>, RpcError>;
}

/// An established status-service connection
#[async_trait]
pub trait StatusSink: Send {
    /// Display a presence payload
    async fn set_status(&mut self, presence: &Presence) -> Result<(), RpcError>;

    /// Remove the displayed status
    async fn clear_status(&mut self) -> Result<(), RpcError>;

    /// Best-effort goodbye; dropping the sink closes the connection either way
    async fn close(&mut self);
}
