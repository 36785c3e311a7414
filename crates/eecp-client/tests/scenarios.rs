//! End-to-end scenarios driven entirely through [`ClientSession`]'s public
//! API, with a bare in-process [`Transport`] double standing in for a
//! relay connection.

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use eecp_client::{ClientSession, Transport};
use eecp_core::{EecpError, ParticipantId, Result, RotationInterval, TimeWindow, WorkspaceId};
use eecp_protocol::MessageEnvelope;
use rand::rngs::OsRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default, Clone)]
struct RecordingTransport {
    sent: Arc<Mutex<Vec<MessageEnvelope>>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&mut self, envelope: MessageEnvelope) -> Result<()> {
        self.sent.lock().unwrap().push(envelope);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<MessageEnvelope>> {
        Ok(None)
    }
}

struct DeadTransport;

#[async_trait]
impl Transport for DeadTransport {
    async fn send(&mut self, _envelope: MessageEnvelope) -> Result<()> {
        Err(EecpError::transport("closed"))
    }

    async fn recv(&mut self) -> Result<Option<MessageEnvelope>> {
        Ok(None)
    }
}

fn window_anchored_at(start: u64) -> TimeWindow {
    TimeWindow::new(start, start + 30 * 60_000, RotationInterval::Fifteen, 5_000).unwrap()
}

/// S2: three edits made while disconnected are flushed, on reconnect, in
/// non-decreasing timestamp order, and a peer applying them in that order
/// converges to the same text Alice holds locally.
#[tokio::test]
async fn s2_offline_edits_flush_in_order_on_reconnect() {
    let workspace_id = WorkspaceId::new();
    let secret = b"workspace-secret".to_vec();
    let window = window_anchored_at(eecp_core::now_ms());

    let alice_signing = SigningKey::generate(&mut OsRng);
    let bob_signing = SigningKey::generate(&mut OsRng);
    let alice_id = ParticipantId::new();
    let bob_id = ParticipantId::new();

    let mut alice = ClientSession::<RecordingTransport>::new(
        workspace_id,
        alice_id,
        alice_signing.clone(),
        secret.clone(),
        window,
    );
    let mut bob = ClientSession::<RecordingTransport>::new(workspace_id, bob_id, bob_signing, secret, window);
    bob.register_participant_key(alice_id, alice_signing.verifying_key());

    // Alice is offline: every edit lands in her buffer. Real millisecond
    // ticks between calls keep their timestamps strictly increasing, as the
    // scenario assumes.
    alice.insert(0, "A".into()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    alice.insert(1, "B".into()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    alice.insert(2, "C".into()).await.unwrap();
    assert_eq!(alice.get_text(), "ABC");

    // Reconnect: the offline buffer drains, sorted, onto the transport.
    let transport = RecordingTransport::default();
    let sent = transport.sent.clone();
    alice.connect(transport).await.unwrap();

    let envelopes: Vec<_> = sent
        .lock()
        .unwrap()
        .iter()
        .map(|env| match &env.payload {
            eecp_protocol::MessagePayload::Operation { operation } => operation.clone(),
            other => panic!("unexpected payload: {other:?}"),
        })
        .collect();
    assert_eq!(envelopes.len(), 3);
    let timestamps: Vec<u64> = envelopes.iter().map(|e| e.timestamp).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted, "flushed in non-decreasing timestamp order");

    for envelope in envelopes {
        bob.handle_incoming(envelope).await;
    }
    assert_eq!(bob.get_text(), "ABC");
}

/// S6 (accept half): an operation encrypted under the current key, while
/// its grace period has not lapsed, decrypts and applies normally for a
/// peer who never held that key cached.
#[tokio::test]
async fn s6_key_still_in_grace_decrypts_successfully() {
    let workspace_id = WorkspaceId::new();
    let secret = b"workspace-secret".to_vec();
    let window = window_anchored_at(eecp_core::now_ms());

    let alice_signing = SigningKey::generate(&mut OsRng);
    let bob_signing = SigningKey::generate(&mut OsRng);
    let alice_id = ParticipantId::new();
    let bob_id = ParticipantId::new();

    let mut alice = ClientSession::<DeadTransport>::new(
        workspace_id,
        alice_id,
        alice_signing.clone(),
        secret.clone(),
        window,
    );
    let mut bob = ClientSession::<DeadTransport>::new(workspace_id, bob_id, bob_signing, secret, window);
    bob.register_participant_key(alice_id, alice_signing.verifying_key());

    // Alice has no transport yet, so the insert lands in her offline
    // buffer; connecting flushes it onto whatever transport she attaches.
    alice.insert(0, "Hi".into()).await.unwrap();
    let transport = RecordingTransport::default();
    let sent = transport.sent.clone();
    alice.connect(transport).await.unwrap();

    let envelope = sent
        .lock()
        .unwrap()
        .iter()
        .find_map(|env| match &env.payload {
            eecp_protocol::MessagePayload::Operation { operation } => Some(operation.clone()),
            _ => None,
        })
        .expect("alice's buffered insert was flushed on connect");

    bob.handle_incoming(envelope).await;
    assert_eq!(bob.get_text(), "Hi");
}

/// S6 (reject half): once a key's grace period has fully lapsed relative to
/// a peer's own clock, that peer can no longer recover it locally and the
/// envelope is dropped rather than applied.
#[tokio::test(start_paused = true)]
async fn s6_key_past_grace_is_dropped_not_applied() {
    let workspace_id = WorkspaceId::new();
    let secret = b"workspace-secret".to_vec();
    // Anchored at the Unix epoch: by the time this test runs, real
    // wall-clock time is always past this window's grace period.
    let long_expired_window = window_anchored_at(0);

    let alice_signing = SigningKey::generate(&mut OsRng);
    let bob_signing = SigningKey::generate(&mut OsRng);
    let alice_id = ParticipantId::new();
    let bob_id = ParticipantId::new();

    let key_id = long_expired_window.current_key_id(0);
    let key = eecp_crypto::derive_key(&secret, &long_expired_window, key_id).unwrap();
    let op = eecp_core::Operation {
        operation_id: eecp_core::OperationId::new(),
        workspace_id,
        participant_id: alice_id,
        timestamp: 0,
        position: 0,
        kind: eecp_core::OperationKind::Insert {
            content: "late".into(),
        },
    };
    let envelope = eecp_codec::encrypt_operation(&op, &key, &alice_signing).unwrap();

    let mut bob = ClientSession::<DeadTransport>::new(
        workspace_id,
        bob_id,
        bob_signing,
        secret,
        long_expired_window,
    );
    bob.register_participant_key(alice_id, alice_signing.verifying_key());

    bob.handle_incoming(envelope).await;
    assert_eq!(bob.get_text(), "");
}
