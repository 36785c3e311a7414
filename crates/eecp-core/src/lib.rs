//! # EECP Core — Foundation
//!
//! Shared identifiers, time/window arithmetic, the plaintext CRDT operation
//! data model, persistence-adapter capability traits, and the unified error
//! taxonomy used by every other crate in this workspace.
//!
//! Nothing in this crate depends on any other EECP crate.

#![forbid(unsafe_code)]

pub mod errors;
pub mod identifiers;
pub mod operation;
pub mod store;
pub mod time;

pub use errors::{EecpError, Result};
pub use identifiers::{ChallengeId, MessageId, OperationId, ParticipantId, WorkspaceId};
pub use operation::{Operation, OperationKind, OperationType};
pub use time::{now_ms, KeyId, Millis, RotationInterval, TimeWindow};

/// Common imports for downstream crates.
pub mod prelude {
    pub use crate::errors::{EecpError, Result};
    pub use crate::identifiers::{ChallengeId, MessageId, OperationId, ParticipantId, WorkspaceId};
    pub use crate::operation::{Operation, OperationKind, OperationType};
    pub use crate::time::{now_ms, KeyId, Millis, RotationInterval, TimeWindow};
}

/// EECP wire protocol version (spec §6). A handshake with any other value
/// is a fatal `AUTH_FAILED`.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Maximum entries in a per-participant offline buffer (spec §3).
pub const MAX_OFFLINE_BUFFER: usize = 1000;

/// Offline buffer entry TTL, purged by Temporal Cleanup (spec §3, §4.8).
pub const OFFLINE_BUFFER_TTL_MS: Millis = 3_600_000;

/// Temporal Cleanup tick interval (spec §4.8).
pub const CLEANUP_TICK_MS: Millis = 60_000;

/// Handshake challenge validity (spec §4.7).
pub const CHALLENGE_TTL_MS: Millis = 60_000;

/// Maximum allowed skew between a handshake's claimed timestamp and the
/// relay's clock (spec §4.7).
pub const HANDSHAKE_TIMESTAMP_SKEW_MS: Millis = 60_000;

/// Default per-session operation rate limit (spec §4.7).
pub const DEFAULT_OPERATIONS_PER_SECOND: u32 = 100;

/// Key recovery retry budget (spec §4.6).
pub const KEY_RECOVERY_MAX_ATTEMPTS: u32 = 3;

/// Key recovery retry spacing (spec §4.6).
pub const KEY_RECOVERY_RETRY_MS: Millis = 2_000;

/// Maximum reconnect attempts before a client session abandons (spec §4.5).
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
