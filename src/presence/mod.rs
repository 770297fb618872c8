//! Presence session management
//!
//! Owns the one logical connection to the status service for the lifetime of
//! the host process: caches the latest requested presence, replays it after a
//! reconnect, and heartbeats so the remote side does not expire the status.

mod session;

pub use session::{ConnectionState, PresenceSession, SessionOptions, SessionStats};
