//! Relay Core (RC, component C7, spec §4.7).
//!
//! One `Arc<RwLock<WorkspaceEntry>>` per workspace inside an outer
//! `Arc<RwLock<HashMap<...>>>` registry (spec §5 "Locking discipline"), so
//! sessions in different workspaces never contend and mutations within one
//! workspace serialize through its own lock.

use crate::buffer::OfflineBuffer;
use crate::handshake::{self, PendingChallenge, SessionState};
use crate::rate_limit::RateLimiter;
use crate::workspace::{Workspace, WorkspaceConfig, WorkspaceStatus};
use ed25519_dalek::VerifyingKey;
use eecp_core::{
    ChallengeId, EecpError, KeyId, Millis, ParticipantId, Result, WorkspaceId,
    DEFAULT_OPERATIONS_PER_SECOND, PROTOCOL_VERSION,
};
use eecp_crypto::{derive_key, TemporalKey};
use eecp_ledger::{Commitment, CommitmentLedger};
use eecp_protocol::EncryptedOperation;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct WorkspaceEntry {
    workspace: Workspace,
    workspace_secret: Vec<u8>,
    sessions: HashMap<ParticipantId, SessionState>,
    challenges: HashMap<ChallengeId, PendingChallenge>,
    offline_buffers: HashMap<ParticipantId, OfflineBuffer>,
    operation_log: Vec<EncryptedOperation>,
    key_cache: HashMap<KeyId, TemporalKey>,
    rate_limiters: HashMap<ParticipantId, RateLimiter>,
}

impl WorkspaceEntry {
    fn ensure_key_cached(&mut self, key_id: KeyId, now: Millis) -> Result<()> {
        if self.key_cache.contains_key(&key_id) {
            return Ok(());
        }
        let key = derive_key(&self.workspace_secret, &self.workspace.time_window, key_id)?;
        let _ = now;
        self.key_cache.insert(key_id, key);
        Ok(())
    }
}

/// The relay's view of a successful handshake, echoed to the caller so it
/// can build a `handshake_ack` (spec §6).
pub struct HandshakeOutcome {
    pub current_key_id: KeyId,
    pub server_time: Millis,
}

/// Where a routed operation must be delivered (spec §4.7 action 6): live
/// for sessions currently authenticated, buffered for the rest.
pub struct RoutingOutcome {
    pub deliver_live: Vec<ParticipantId>,
    pub server_timestamp: Millis,
}

/// The zero-knowledge relay: it derives temporal keys for lifecycle
/// management only (see `SPEC_FULL.md` §4.7, "Relay custody of
/// `workspace_secret`") and never calls `AE::decrypt` on a participant
/// operation's ciphertext.
#[derive(Clone)]
pub struct RelayCore {
    workspaces: Arc<RwLock<HashMap<WorkspaceId, Arc<RwLock<WorkspaceEntry>>>>>,
    ledger: CommitmentLedger,
    operations_per_second: u32,
}

impl Default for RelayCore {
    fn default() -> Self {
        Self::new(DEFAULT_OPERATIONS_PER_SECOND)
    }
}

impl RelayCore {
    pub fn new(operations_per_second: u32) -> Self {
        Self {
            workspaces: Arc::new(RwLock::new(HashMap::new())),
            ledger: CommitmentLedger::new(),
            operations_per_second,
        }
    }

    pub fn ledger(&self) -> &CommitmentLedger {
        &self.ledger
    }

    /// Create a workspace (spec §4.7 "Create"). `workspace_secret` is
    /// supplied out-of-band, as the custody note describes.
    pub fn create_workspace(
        &self,
        now: Millis,
        config: WorkspaceConfig,
        workspace_secret: Vec<u8>,
    ) -> Result<WorkspaceId> {
        let workspace = Workspace::create(now, config)?;
        let workspace_id = WorkspaceId::new();
        let entry = WorkspaceEntry {
            workspace,
            workspace_secret,
            sessions: HashMap::new(),
            challenges: HashMap::new(),
            offline_buffers: HashMap::new(),
            operation_log: Vec::new(),
            key_cache: HashMap::new(),
            rate_limiters: HashMap::new(),
        };
        self.workspaces
            .write()
            .insert(workspace_id, Arc::new(RwLock::new(entry)));
        tracing::info!(workspace_id = %workspace_id, "workspace created");
        Ok(workspace_id)
    }

    fn entry(&self, workspace_id: WorkspaceId) -> Result<Arc<RwLock<WorkspaceEntry>>> {
        self.workspaces
            .read()
            .get(&workspace_id)
            .cloned()
            .ok_or_else(|| EecpError::workspace("workspace not found"))
    }

    pub fn extend_workspace(&self, workspace_id: WorkspaceId, minutes: u32) -> Result<()> {
        self.entry(workspace_id)?.write().workspace.extend(minutes)
    }

    /// Revoke immediately: close all sessions, keep the entry addressable
    /// for one grace period (spec §4.7 "Revoke"); actual removal from the
    /// registry is a Temporal Cleanup concern, not modeled here since this
    /// core holds no removal timer of its own.
    pub fn revoke_workspace(&self, workspace_id: WorkspaceId, now: Millis) -> Result<()> {
        let entry = self.entry(workspace_id)?;
        let mut guard = entry.write();
        guard.workspace.revoke(now);
        for state in guard.sessions.values_mut() {
            *state = SessionState::Disconnected;
        }
        guard.operation_log.clear();
        Ok(())
    }

    /// Begin a handshake: issue a challenge (spec §4.7, `DISCONNECTED ->
    /// CHALLENGED`).
    pub fn connect(&self, workspace_id: WorkspaceId, now: Millis) -> Result<PendingChallenge> {
        let entry = self.entry(workspace_id)?;
        let mut guard = entry.write();
        if !guard.workspace.is_active() {
            return Err(EecpError::workspace("workspace is not active"));
        }
        let challenge = PendingChallenge::new(now);
        guard.challenges.insert(challenge.challenge_id, challenge.clone());
        Ok(challenge)
    }

    /// Complete a handshake (spec §4.7, `CHALLENGED -> AUTHENTICATED`).
    /// Validations run in the exact order the spec lists, so the first
    /// failure determines the error returned.
    #[allow(clippy::too_many_arguments)]
    pub fn handshake(
        &self,
        workspace_id: WorkspaceId,
        challenge_id: ChallengeId,
        participant_id: ParticipantId,
        public_key: &VerifyingKey,
        protocol_version: &str,
        signature: &[u8],
        timestamp: Millis,
        now: Millis,
    ) -> Result<HandshakeOutcome> {
        let entry = self.entry(workspace_id)?;
        let mut guard = entry.write();

        if protocol_version != PROTOCOL_VERSION {
            guard.challenges.remove(&challenge_id);
            return Err(EecpError::auth("protocol version mismatch"));
        }
        if !guard.workspace.is_active() {
            return Err(EecpError::workspace("workspace is not active"));
        }
        let authenticated_count = guard
            .sessions
            .values()
            .filter(|s| **s == SessionState::Authenticated)
            .count();
        if authenticated_count as u32 >= guard.workspace.max_participants {
            return Err(EecpError::rate_limit("workspace is full"));
        }

        let Some(challenge) = guard.challenges.get(&challenge_id).cloned() else {
            return Err(EecpError::auth("unknown or expired challenge"));
        };
        if challenge.is_expired(now) {
            guard.challenges.remove(&challenge_id);
            return Err(EecpError::auth("challenge expired"));
        }
        if !handshake::verify_proof(&challenge, participant_id, public_key, signature, timestamp, now) {
            guard.challenges.remove(&challenge_id);
            return Err(EecpError::auth("handshake proof invalid"));
        }

        guard.challenges.remove(&challenge_id);
        guard.sessions.insert(participant_id, SessionState::Authenticated);
        guard.rate_limiters.entry(participant_id).or_insert_with(|| RateLimiter::new(self.operations_per_second));

        let key_id = guard.workspace.time_window.current_key_id(now);
        guard.ensure_key_cached(key_id, now)?;

        Ok(HandshakeOutcome {
            current_key_id: key_id,
            server_time: now,
        })
    }

    /// A transport closed for `participant_id`; return to `Disconnected`,
    /// preserving its offline buffer (spec §4.7 "Cancellation").
    pub fn mark_disconnected(&self, workspace_id: WorkspaceId, participant_id: ParticipantId) -> Result<()> {
        let entry = self.entry(workspace_id)?;
        if let Some(state) = entry.write().sessions.get_mut(&participant_id) {
            *state = SessionState::Disconnected;
        }
        Ok(())
    }

    /// Route an `operation` message (spec §4.7 "Operation routing").
    pub fn submit_operation(
        &self,
        workspace_id: WorkspaceId,
        sender: ParticipantId,
        envelope: EncryptedOperation,
        now: Millis,
    ) -> Result<RoutingOutcome> {
        let entry = self.entry(workspace_id)?;
        let mut guard = entry.write();

        if guard.sessions.get(&sender) != Some(&SessionState::Authenticated) {
            return Err(EecpError::auth("session is not authenticated"));
        }
        if !guard.workspace.is_active() {
            return Err(EecpError::workspace("workspace expired"));
        }
        let admitted = guard
            .rate_limiters
            .entry(sender)
            .or_insert_with(|| RateLimiter::new(self.operations_per_second))
            .try_admit(now);
        if !admitted {
            return Err(EecpError::rate_limit("operations per second exceeded"));
        }
        if envelope.workspace_id != workspace_id || envelope.participant_id != sender {
            return Err(EecpError::auth("envelope does not match session"));
        }

        guard.operation_log.push(envelope.clone());

        let mut deliver_live = Vec::new();
        let recipients: Vec<ParticipantId> = guard.sessions.keys().copied().filter(|p| *p != sender).collect();
        for recipient in recipients {
            match guard.sessions.get(&recipient) {
                Some(SessionState::Authenticated) => deliver_live.push(recipient),
                Some(SessionState::Disconnected) => {
                    guard
                        .offline_buffers
                        .entry(recipient)
                        .or_default()
                        .push(envelope.clone(), now);
                }
                _ => {}
            }
        }

        Ok(RoutingOutcome {
            deliver_live,
            server_timestamp: now,
        })
    }

    /// Answer a `sync_request` (spec §4.7 "Sync").
    pub fn sync(
        &self,
        workspace_id: WorkspaceId,
        participant_id: ParticipantId,
        from_timestamp: Millis,
    ) -> Result<(Vec<EncryptedOperation>, Vec<u8>)> {
        let entry = self.entry(workspace_id)?;
        let guard = entry.read();
        if guard.sessions.get(&participant_id) != Some(&SessionState::Authenticated) {
            return Err(EecpError::auth("session is not authenticated"));
        }
        let ops = guard
            .operation_log
            .iter()
            .filter(|op| op.timestamp > from_timestamp)
            .cloned()
            .collect();
        let snapshot = guard.workspace.current_state_snapshot.clone().unwrap_or_default();
        Ok((ops, snapshot))
    }

    /// Drain a disconnected participant's buffered envelopes (e.g. once
    /// their transport reconnects and a fresh live-delivery path exists).
    pub fn drain_buffer(&self, workspace_id: WorkspaceId, participant_id: ParticipantId) -> Result<Vec<EncryptedOperation>> {
        let entry = self.entry(workspace_id)?;
        let mut guard = entry.write();
        Ok(guard
            .offline_buffers
            .get_mut(&participant_id)
            .map(OfflineBuffer::drain)
            .unwrap_or_default())
    }

    /// Record the most recently observed opaque CRDT snapshot, echoed back
    /// verbatim on the next `sync_response` (spec §4.7, resolves Open
    /// Question 3). The relay never constructs or interprets this value.
    pub fn update_state_snapshot(&self, workspace_id: WorkspaceId, snapshot: Vec<u8>) -> Result<()> {
        self.entry(workspace_id)?.write().workspace.current_state_snapshot = Some(snapshot);
        Ok(())
    }

    /// Temporal Cleanup sweep (spec §4.8). Returns the number of
    /// workspaces that transitioned to `expired` this tick, for
    /// diagnostics.
    pub fn run_cleanup_tick(&self, now: Millis) -> usize {
        let mut newly_expired = 0;
        let workspaces: Vec<(WorkspaceId, Arc<RwLock<WorkspaceEntry>>)> =
            self.workspaces.read().iter().map(|(id, e)| (*id, e.clone())).collect();

        for (workspace_id, entry) in workspaces {
            let mut guard = entry.write();

            if guard.workspace.expire_if_due(now) {
                newly_expired += 1;
                guard.operation_log.clear();
                for state in guard.sessions.values_mut() {
                    *state = SessionState::Disconnected;
                }
                tracing::info!(workspace_id = %workspace_id, "workspace expired");
            }

            let due: Vec<KeyId> = guard
                .key_cache
                .iter()
                .filter(|(_, key)| now > key.grace_period_end())
                .map(|(id, _)| *id)
                .collect();
            for key_id in due {
                if !self.ledger.has_commitment(workspace_id, key_id) {
                    if let Some(key) = guard.key_cache.get(&key_id) {
                        if let Ok(material) = key.material() {
                            let commitment = Commitment::new(
                                material,
                                key_id,
                                now,
                                key.valid_from(),
                                key.valid_until(),
                            );
                            self.ledger.append(workspace_id, commitment);
                        }
                    }
                }
                if let Some(key) = guard.key_cache.get_mut(&key_id) {
                    key.destroy();
                }
                guard.key_cache.remove(&key_id);
            }

            for buffer in guard.offline_buffers.values_mut() {
                buffer.purge_expired(now);
            }

            guard.challenges.retain(|_, c| !c.is_expired(now));
        }

        newly_expired
    }
}
