//! Persistence-adapter capability traits (spec §6, §9).
//!
//! The core is in-memory by design (§1 Non-goals: no persistent plaintext
//! storage). These traits exist so a concrete persistence adapter — a
//! database-backed key store, say — can be injected without the core ever
//! depending on a concrete database crate, per design note §9
//! ("IndexedDB-as-ambient-singleton... inject a key-store trait").
//!
//! No concrete persistent implementation ships in this workspace; database
//! adapters are explicitly out of scope (§1).

use crate::errors::Result;
use crate::identifiers::{ParticipantId, WorkspaceId};
use crate::time::KeyId;
use async_trait::async_trait;

/// A 32-byte symmetric key, opaque to the store.
pub type KeyMaterial = [u8; 32];

/// Storage contract for temporal key material.
///
/// Implementations must scrub material on delete: overwrite with random
/// bytes, then zero, before releasing the backing memory (spec §6).
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Persist `material` under `(workspace_id, key_id)`.
    async fn store_key(
        &self,
        workspace_id: WorkspaceId,
        key_id: KeyId,
        material: KeyMaterial,
    ) -> Result<()>;

    /// Fetch the material for a specific key id, if present.
    async fn get_key_by_id(
        &self,
        workspace_id: WorkspaceId,
        key_id: KeyId,
    ) -> Result<Option<KeyMaterial>>;

    /// Fetch whichever key id the store considers current for this
    /// workspace, if any has been recorded.
    async fn get_current_key(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<(KeyId, KeyMaterial)>>;

    /// Securely scrub and remove every key recorded for a workspace.
    async fn delete_workspace_keys(&self, workspace_id: WorkspaceId) -> Result<()>;
}

/// Storage contract for a participant's signing keypair.
#[async_trait]
pub trait ParticipantKeyStore: Send + Sync {
    /// Persist a participant's keypair.
    async fn store_participant_key(
        &self,
        participant_id: ParticipantId,
        private: [u8; 32],
        public: [u8; 32],
    ) -> Result<()>;

    /// Fetch a participant's private key material, if present.
    async fn get_participant_private(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Option<[u8; 32]>>;
}
