//! beacon - mirrors coding-agent activity onto Discord Rich Presence
//!
//! This crate provides the core functionality for beacon, including:
//! - The presence session manager (connection state machine, heartbeat,
//!   reconnect)
//! - The status-service IPC client
//! - The host event taxonomy and classifier
//!
//! # Architecture
//!
//! beacon sits between a host agent process and the status service:
//! - The host writes lifecycle/tool events as JSON lines to beacon's stdin
//! - The classifier maps each event to a `(state, detail)` phrase pair
//! - The session manager projects the latest phrase onto the service,
//!   surviving disconnects and keeping long-idle statuses alive

pub mod config;
pub mod hooks;
pub mod presence;
pub mod rpc;
pub mod shell;
