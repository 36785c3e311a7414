//! Unified error taxonomy for EECP
//!
//! A single enum covering every failure kind named in the specification's
//! error handling design, instead of one error type per crate. Every other
//! crate in this workspace re-exports `EecpError`/`Result` rather than
//! minting its own.

use serde::{Deserialize, Serialize};

/// Unified error type for all EECP operations.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum EecpError {
    /// Invalid duration, invalid rotation interval, or other misconfiguration.
    #[error("config error: {message}")]
    Config {
        /// Human-readable detail.
        message: String,
    },

    /// Protocol mismatch, bad proof, revoked participant, missing session.
    #[error("auth error: {message}")]
    Auth {
        /// Human-readable detail.
        message: String,
    },

    /// Workspace not found, expired, or revoked.
    #[error("workspace error: {message}")]
    Workspace {
        /// Human-readable detail.
        message: String,
    },

    /// Operations-per-second or participants-per-workspace limit exceeded.
    #[error("rate limit error: {message}")]
    RateLimit {
        /// Human-readable detail.
        message: String,
    },

    /// Key-id mismatch, auth tag failure, destroyed key, bad signature.
    #[error("crypto error: {message}")]
    Crypto {
        /// Human-readable detail.
        message: String,
    },

    /// Truncated ciphertext or malformed payload.
    #[error("codec error: {message}")]
    Codec {
        /// Human-readable detail.
        message: String,
    },

    /// Transport timeout or closed connection.
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable detail.
        message: String,
    },
}

impl EecpError {
    /// Build a `Config` error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Build an `Auth` error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Build a `Workspace` error.
    pub fn workspace(message: impl Into<String>) -> Self {
        Self::Workspace {
            message: message.into(),
        }
    }

    /// Build a `RateLimit` error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }

    /// Build a `Crypto` error.
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Build a `Codec` error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Build a `Transport` error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RateLimit { .. })
    }

    /// The taxonomy category, for metrics/log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Auth { .. } => "auth",
            Self::Workspace { .. } => "workspace",
            Self::RateLimit { .. } => "rate_limit",
            Self::Crypto { .. } => "crypto",
            Self::Codec { .. } => "codec",
            Self::Transport { .. } => "transport",
        }
    }
}

/// Standard result type for EECP operations.
pub type Result<T> = std::result::Result<T, EecpError>;

impl From<serde_json::Error> for EecpError {
    fn from(err: serde_json::Error) -> Self {
        Self::codec(format!("json: {err}"))
    }
}
