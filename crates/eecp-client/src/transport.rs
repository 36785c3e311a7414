//! The transport capability a [`crate::session::ClientSession`] is built
//! over (spec §9 "Prototype-chained crypto service" / "Interfaces-as-duck-
//! types" notes: express the duck-typed transport as an explicit trait,
//! injected, never module-global).

use async_trait::async_trait;
use eecp_core::Result;
use eecp_protocol::MessageEnvelope;

/// A full-duplex channel carrying [`MessageEnvelope`]s to and from a relay.
///
/// Implementations are transport-agnostic per spec §6 — a WebSocket, an
/// in-process channel for tests, anything that can move framed envelopes.
#[async_trait]
pub trait Transport: Send {
    /// Send one envelope. Returns an error (typically `Transport`) if the
    /// connection is down; the session treats this as a disconnect.
    async fn send(&mut self, envelope: MessageEnvelope) -> Result<()>;

    /// Receive the next envelope, or `None` if the peer closed cleanly.
    async fn recv(&mut self) -> Result<Option<MessageEnvelope>>;
}
