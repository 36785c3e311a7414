//! # EECP Relay
//!
//! The zero-knowledge Relay Core (C7) and Temporal Cleanup (C8): workspace
//! lifecycle, participant handshake and routing, rate limiting, offline
//! buffering, and periodic key destruction.

#![forbid(unsafe_code)]

pub mod buffer;
pub mod core;
pub mod handshake;
pub mod rate_limit;
pub mod workspace;

pub use core::{HandshakeOutcome, RelayCore, RoutingOutcome};
pub use handshake::{PendingChallenge, SessionState};
pub use workspace::{Workspace, WorkspaceConfig, WorkspaceStatus};
