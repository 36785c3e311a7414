//! Client Session (CS, component C6, spec §4.5).

use crate::buffer::OfflineBuffer;
use crate::transport::Transport;
use ed25519_dalek::{SigningKey, VerifyingKey};
use eecp_core::{
    now_ms, EecpError, KeyId, Millis, ParticipantId, Result, TimeWindow, WorkspaceId,
    MAX_RECONNECT_ATTEMPTS,
};
use eecp_crdt::CrdtDocument;
use eecp_crypto::{derive_key, TemporalKey};
use eecp_protocol::{EncryptedOperation, MessageEnvelope, MessagePayload};
use std::collections::HashMap;
use std::time::Duration;

/// Owns a CRDT document, a local key cache, an offline buffer, and a
/// transport handle for one participant in one workspace.
///
/// Single-threaded cooperative by design (spec §5): every method takes
/// `&mut self`, so callers serialize access (e.g. by running the session
/// on one task) rather than the session locking internally.
pub struct ClientSession<T: Transport> {
    workspace_id: WorkspaceId,
    participant_id: ParticipantId,
    signing_key: SigningKey,
    workspace_secret: Vec<u8>,
    time_window: TimeWindow,
    document: CrdtDocument,
    key_cache: HashMap<KeyId, TemporalKey>,
    participant_keys: HashMap<ParticipantId, VerifyingKey>,
    offline_buffer: OfflineBuffer,
    transport: Option<T>,
    reconnect_attempt: u32,
    change_subscribers: Vec<Box<dyn Fn(&str) + Send + Sync>>,
}

impl<T: Transport> ClientSession<T> {
    pub fn new(
        workspace_id: WorkspaceId,
        participant_id: ParticipantId,
        signing_key: SigningKey,
        workspace_secret: Vec<u8>,
        time_window: TimeWindow,
    ) -> Self {
        Self {
            workspace_id,
            participant_id,
            signing_key,
            workspace_secret,
            time_window,
            document: CrdtDocument::new(workspace_id),
            key_cache: HashMap::new(),
            participant_keys: HashMap::new(),
            offline_buffer: OfflineBuffer::new(),
            transport: None,
            reconnect_attempt: 0,
            change_subscribers: Vec::new(),
        }
    }

    /// Register the verifying key for another participant, needed to
    /// check signatures on their envelopes.
    pub fn register_participant_key(&mut self, participant_id: ParticipantId, key: VerifyingKey) {
        self.participant_keys.insert(participant_id, key);
    }

    /// Subscribe to text changes. Called synchronously from whichever edit
    /// or receive triggered the change (spec §4.5); must not block.
    pub fn on_change(&mut self, callback: impl Fn(&str) + Send + Sync + 'static) {
        self.change_subscribers.push(Box::new(callback));
    }

    fn notify_subscribers(&self) {
        let text = self.document.get_text();
        for cb in &self.change_subscribers {
            cb(&text);
        }
    }

    pub fn get_text(&self) -> String {
        self.document.get_text()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Attach a transport, reset backoff state, and drain any buffered
    /// envelopes in order.
    pub async fn connect(&mut self, transport: T) -> Result<()> {
        self.transport = Some(transport);
        self.reconnect_attempt = 0;
        self.drain_offline_buffer().await;
        Ok(())
    }

    /// User-initiated disconnect. Cancels any pending reconnect (there is
    /// none to cancel once the transport is gone — reconnection is driven
    /// externally via [`Self::reconnect_delay`]).
    pub fn disconnect(&mut self) {
        self.transport = None;
    }

    /// The backoff delay before reconnect attempt `self.reconnect_attempt`,
    /// or `None` once [`MAX_RECONNECT_ATTEMPTS`] has been exhausted
    /// (spec §4.5, invariant 12: `min(2^n · 1000, 30_000)` ms).
    pub fn reconnect_delay(&self) -> Option<Duration> {
        if self.reconnect_attempt >= MAX_RECONNECT_ATTEMPTS {
            return None;
        }
        let ms = 2u64.saturating_pow(self.reconnect_attempt).saturating_mul(1000).min(30_000);
        Some(Duration::from_millis(ms))
    }

    /// Record a failed reconnect attempt, advancing the backoff counter.
    pub fn note_reconnect_failure(&mut self) {
        self.reconnect_attempt = self.reconnect_attempt.saturating_add(1);
    }

    async fn drain_offline_buffer(&mut self) {
        let envelopes = self.offline_buffer.drain_sorted();
        for envelope in envelopes {
            if let Some(transport) = self.transport.as_mut() {
                let env = MessageEnvelope::new(now_ms(), MessagePayload::Operation { operation: envelope.clone() });
                if transport.send(env).await.is_err() {
                    tracing::warn!("transport closed mid-drain, re-buffering remainder");
                    self.offline_buffer.push(envelope, now_ms());
                }
            } else {
                self.offline_buffer.push(envelope, now_ms());
            }
        }
    }

    fn current_or_cached_key(&mut self, key_id: KeyId) -> Result<&TemporalKey> {
        if !self.key_cache.contains_key(&key_id) {
            let key = derive_key(&self.workspace_secret, &self.time_window, key_id)?;
            self.key_cache.insert(key_id, key);
        }
        Ok(self.key_cache.get(&key_id).expect("just inserted"))
    }

    /// Insert `text` at `pos`, authored locally (spec §4.5 local edit
    /// path): apply to the document immediately, encode, send-or-buffer,
    /// then notify subscribers.
    pub async fn insert(&mut self, pos: u64, text: String) -> Result<()> {
        let op = self.document.local_insert(pos, text, self.participant_id);
        self.encode_and_dispatch(op).await
    }

    /// Delete `length` characters at `pos`, authored locally.
    pub async fn delete(&mut self, pos: u64, length: u64) -> Result<()> {
        let op = self.document.local_delete(pos, length, self.participant_id);
        self.encode_and_dispatch(op).await
    }

    async fn encode_and_dispatch(&mut self, op: eecp_core::Operation) -> Result<()> {
        let now = now_ms();
        let key_id = self.time_window.current_key_id(now);
        let key = self.current_or_cached_key(key_id)?;
        let envelope = eecp_codec::encrypt_operation(&op, key, &self.signing_key)?;

        if let Some(transport) = self.transport.as_mut() {
            let msg = MessageEnvelope::new(now, MessagePayload::Operation { operation: envelope.clone() });
            if transport.send(msg).await.is_err() {
                self.transport = None;
                self.offline_buffer.push(envelope, now);
            }
        } else {
            self.offline_buffer.push(envelope, now);
        }

        self.notify_subscribers();
        Ok(())
    }

    /// Remote edit path (spec §4.5): verify, look up (recovering if
    /// necessary) the decrypting key, decrypt, apply, notify.
    ///
    /// Never returns an error for a bad or undecryptable envelope — those
    /// are logged and dropped, per spec §4.6 ("never abort the session").
    pub async fn handle_incoming(&mut self, envelope: EncryptedOperation) {
        let Some(verifying_key) = self.participant_keys.get(&envelope.participant_id).copied() else {
            tracing::warn!(participant_id = %envelope.participant_id, "unknown participant, dropping envelope");
            return;
        };
        if !eecp_codec::verify(&envelope, &verifying_key) {
            tracing::warn!(operation_id = %envelope.operation_id, "bad signature, dropping envelope");
            return;
        }
        if eecp_codec::check_workspace(&envelope, self.workspace_id).is_err() {
            tracing::warn!(operation_id = %envelope.operation_id, "workspace mismatch, dropping envelope");
            return;
        }

        let now = now_ms();
        let key_id = self.time_window.current_key_id(envelope.timestamp.min(now));
        if let Err(err) = self.ensure_key_available(key_id, now).await {
            tracing::warn!(operation_id = %envelope.operation_id, error = %err, "key recovery failed, dropping envelope");
            return;
        }

        let key = self.key_cache.get(&key_id).expect("ensure_key_available populated cache");
        match eecp_codec::decrypt_operation(&envelope, key, key_id) {
            Ok(op) => {
                self.document.apply_remote(op);
                self.notify_subscribers();
            }
            Err(err) => {
                tracing::warn!(operation_id = %envelope.operation_id, error = %err, "decryption failed, dropping envelope");
            }
        }
    }

    /// Key recovery (spec §4.6): derive locally if the derived key's
    /// grace period has not lapsed; otherwise request fresh metadata via
    /// sync, retrying up to [`eecp_core::KEY_RECOVERY_MAX_ATTEMPTS`] times,
    /// spaced [`eecp_core::KEY_RECOVERY_RETRY_MS`] apart.
    async fn ensure_key_available(&mut self, key_id: KeyId, now: Millis) -> Result<()> {
        if self.key_cache.contains_key(&key_id) {
            return Ok(());
        }
        if self.try_derive_and_cache(key_id, now) {
            return Ok(());
        }

        for _ in 0..eecp_core::KEY_RECOVERY_MAX_ATTEMPTS {
            if let Some(transport) = self.transport.as_mut() {
                let _ = transport
                    .send(MessageEnvelope::new(
                        now_ms(),
                        MessagePayload::SyncRequest { from_timestamp: now },
                    ))
                    .await;
            }
            tokio::time::sleep(Duration::from_millis(eecp_core::KEY_RECOVERY_RETRY_MS)).await;
            if self.try_derive_and_cache(key_id, now_ms()) {
                return Ok(());
            }
        }
        Err(EecpError::crypto(format!("key recovery exhausted for {key_id}")))
    }

    fn try_derive_and_cache(&mut self, key_id: KeyId, now: Millis) -> bool {
        if !self.time_window.is_valid(key_id, now) {
            return false;
        }
        match derive_key(&self.workspace_secret, &self.time_window, key_id) {
            Ok(key) => {
                self.key_cache.insert(key_id, key);
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use eecp_core::RotationInterval;
    use rand::rngs::OsRng;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<MessageEnvelope>>>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&mut self, envelope: MessageEnvelope) -> Result<()> {
            if self.fail {
                return Err(EecpError::transport("closed"));
            }
            self.sent.lock().unwrap().push(envelope);
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<MessageEnvelope>> {
            Ok(None)
        }
    }

    fn window() -> TimeWindow {
        TimeWindow::new(0, 30 * 60_000, RotationInterval::Fifteen, 5_000).unwrap()
    }

    #[tokio::test]
    async fn local_insert_sends_when_connected() {
        let mut session = ClientSession::new(
            WorkspaceId::new(),
            ParticipantId::new(),
            SigningKey::generate(&mut OsRng),
            b"workspace-secret".to_vec(),
            window(),
        );
        let transport = RecordingTransport::default();
        let sent = transport.sent.clone();
        session.connect(transport).await.unwrap();

        session.insert(0, "Hi".into()).await.unwrap();
        assert_eq!(session.get_text(), "Hi");
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn local_insert_buffers_when_disconnected() {
        let mut session = ClientSession::new(
            WorkspaceId::new(),
            ParticipantId::new(),
            SigningKey::generate(&mut OsRng),
            b"workspace-secret".to_vec(),
            window(),
        );
        session.insert(0, "Hi".into()).await.unwrap();
        assert_eq!(session.get_text(), "Hi");
        assert_eq!(session.offline_buffer.len(), 1);
    }

    #[tokio::test]
    async fn reconnect_backoff_follows_the_doubling_schedule() {
        let mut session = ClientSession::new(
            WorkspaceId::new(),
            ParticipantId::new(),
            SigningKey::generate(&mut OsRng),
            b"workspace-secret".to_vec(),
            window(),
        );
        let expected = [1000, 2000, 4000, 8000, 16000];
        for exp in expected {
            assert_eq!(session.reconnect_delay().unwrap().as_millis() as u64, exp);
            session.note_reconnect_failure();
        }
        assert!(session.reconnect_delay().is_none());
    }

    #[tokio::test]
    async fn remote_round_trip_between_two_sessions() {
        let ws = WorkspaceId::new();
        let secret = b"workspace-secret".to_vec();
        let alice_signing = SigningKey::generate(&mut OsRng);
        let bob_signing = SigningKey::generate(&mut OsRng);
        let alice_id = ParticipantId::new();
        let bob_id = ParticipantId::new();

        let mut alice = ClientSession::<RecordingTransport>::new(
            ws,
            alice_id,
            alice_signing.clone(),
            secret.clone(),
            window(),
        );
        let mut bob = ClientSession::<RecordingTransport>::new(ws, bob_id, bob_signing, secret, window());
        bob.register_participant_key(alice_id, alice_signing.verifying_key());

        alice.insert(0, "Hi".into()).await.unwrap();
        let envelope = alice.offline_buffer.drain_sorted().into_iter().next().unwrap();

        bob.handle_incoming(envelope).await;
        assert_eq!(bob.get_text(), "Hi");
    }
}
