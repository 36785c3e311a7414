//! Operation Codec (OC, component C4, spec §4.4).
//!
//! `encrypt_operation` turns a plaintext [`Operation`] into the opaque,
//! signed [`EncryptedOperation`] envelope; `decrypt_operation` and `verify`
//! invert and check it.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use eecp_core::{EecpError, KeyId, Operation, OperationKind, OperationType, Result, WorkspaceId};
use eecp_crypto::{aead, TemporalKey};
use eecp_protocol::EncryptedOperation;
use serde::{Deserialize, Serialize};

/// The type-specific payload that gets encrypted, with no `type` tag of its
/// own — `operation_type` already travels in the clear on the envelope
/// (spec §4.4).
#[derive(Serialize, Deserialize)]
struct InsertPayload {
    content: String,
}

#[derive(Serialize, Deserialize)]
struct DeletePayload {
    length: u64,
}

fn payload_bytes(kind: &OperationKind) -> Result<Vec<u8>> {
    let json = match kind {
        OperationKind::Insert { content } => serde_json::to_vec(&InsertPayload {
            content: content.clone(),
        }),
        OperationKind::Delete { length } => {
            serde_json::to_vec(&DeletePayload { length: *length })
        }
    };
    json.map_err(EecpError::from)
}

fn kind_from_payload(operation_type: OperationType, bytes: &[u8]) -> Result<OperationKind> {
    match operation_type {
        OperationType::Insert => {
            let p: InsertPayload = serde_json::from_slice(bytes).map_err(EecpError::from)?;
            Ok(OperationKind::Insert { content: p.content })
        }
        OperationType::Delete => {
            let p: DeletePayload = serde_json::from_slice(bytes).map_err(EecpError::from)?;
            Ok(OperationKind::Delete { length: p.length })
        }
    }
}

/// Encrypt and sign `op` into its wire envelope.
///
/// The payload is encrypted with empty caller AAD (the envelope's own
/// fields are authenticated separately, by the signature).
pub fn encrypt_operation(
    op: &Operation,
    key: &TemporalKey,
    signing_key: &SigningKey,
) -> Result<EncryptedOperation> {
    let plaintext = payload_bytes(&op.kind)?;
    let encrypted_content = aead::encrypt(key, &plaintext, &[])?;

    let mut env = EncryptedOperation {
        operation_id: op.operation_id,
        workspace_id: op.workspace_id,
        participant_id: op.participant_id,
        timestamp: op.timestamp,
        position: op.position,
        operation_type: op.operation_type(),
        encrypted_content,
        signature: Vec::new(),
    };
    let signature: Signature = signing_key.sign(&env.signing_bytes());
    env.signature = signature.to_bytes().to_vec();
    Ok(env)
}

/// Verify `env`'s signature under `verifying_key`. Never panics on a
/// malformed signature; a bad length simply fails verification.
pub fn verify(env: &EncryptedOperation, verifying_key: &VerifyingKey) -> bool {
    let Ok(bytes) = <[u8; 64]>::try_from(env.signature.as_slice()) else {
        return false;
    };
    let signature = Signature::from_bytes(&bytes);
    verifying_key
        .verify(&env.signing_bytes(), &signature)
        .is_ok()
}

/// Decrypt `env` into a plaintext [`Operation`], given it has already
/// passed [`verify`] and a workspace-id check (spec §4.4 verification
/// order). Does not itself re-check the signature or workspace id.
///
/// `key_id` is the id the caller looked `key` up under (the envelope's
/// implied key id); it is checked against the key's own id ahead of the
/// cipher, so a stale cache hit is distinguishable from a tampered
/// ciphertext rather than surfacing the same generic failure.
pub fn decrypt_operation(env: &EncryptedOperation, key: &TemporalKey, key_id: KeyId) -> Result<Operation> {
    if env.encrypted_content.len() < 28 {
        return Err(EecpError::codec("ciphertext truncated"));
    }
    let plaintext = aead::decrypt(key, key_id, &env.encrypted_content, &[])
        .map_err(|_| EecpError::codec("decryption failed"))?;
    let kind = kind_from_payload(env.operation_type, &plaintext)?;
    Ok(Operation {
        operation_id: env.operation_id,
        workspace_id: env.workspace_id,
        participant_id: env.participant_id,
        timestamp: env.timestamp,
        position: env.position,
        kind,
    })
}

/// Check `env.workspace_id` matches `expected` (spec §4.4, step 2 of
/// verification order).
pub fn check_workspace(env: &EncryptedOperation, expected: WorkspaceId) -> Result<()> {
    if env.workspace_id != expected {
        return Err(EecpError::codec("workspace id mismatch"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eecp_core::{KeyId, OperationId, ParticipantId, RotationInterval, TimeWindow};
    use eecp_crypto::derive_key;
    use rand::rngs::OsRng;

    fn window() -> TimeWindow {
        TimeWindow::new(0, 30 * 60_000, RotationInterval::Fifteen, 5_000).unwrap()
    }

    fn op(kind: OperationKind) -> Operation {
        Operation {
            operation_id: OperationId::new(),
            workspace_id: WorkspaceId::new(),
            participant_id: ParticipantId::new(),
            timestamp: 1_000,
            position: 0,
            kind,
        }
    }

    #[test]
    fn round_trips_insert() {
        let w = window();
        let key = derive_key(b"secret", &w, KeyId::from_slot(0)).unwrap();
        let signing_key = SigningKey::generate(&mut OsRng);
        let plain = op(OperationKind::Insert {
            content: "hi".into(),
        });

        let env = encrypt_operation(&plain, &key, &signing_key).unwrap();
        assert!(verify(&env, &signing_key.verifying_key()));
        check_workspace(&env, plain.workspace_id).unwrap();

        let decoded = decrypt_operation(&env, &key, key.id()).unwrap();
        assert_eq!(decoded, plain);
    }

    #[test]
    fn round_trips_delete() {
        let w = window();
        let key = derive_key(b"secret", &w, KeyId::from_slot(0)).unwrap();
        let signing_key = SigningKey::generate(&mut OsRng);
        let plain = op(OperationKind::Delete { length: 3 });

        let env = encrypt_operation(&plain, &key, &signing_key).unwrap();
        let decoded = decrypt_operation(&env, &key, key.id()).unwrap();
        assert_eq!(decoded, plain);
    }

    #[test]
    fn tampered_field_fails_verification() {
        let w = window();
        let key = derive_key(b"secret", &w, KeyId::from_slot(0)).unwrap();
        let signing_key = SigningKey::generate(&mut OsRng);
        let plain = op(OperationKind::Insert {
            content: "hi".into(),
        });

        let mut env = encrypt_operation(&plain, &key, &signing_key).unwrap();
        env.position = 99;
        assert!(!verify(&env, &signing_key.verifying_key()));
    }

    #[test]
    fn wrong_verifying_key_fails() {
        let w = window();
        let key = derive_key(b"secret", &w, KeyId::from_slot(0)).unwrap();
        let signing_key = SigningKey::generate(&mut OsRng);
        let other_key = SigningKey::generate(&mut OsRng);
        let plain = op(OperationKind::Insert {
            content: "hi".into(),
        });

        let env = encrypt_operation(&plain, &key, &signing_key).unwrap();
        assert!(!verify(&env, &other_key.verifying_key()));
    }

    #[test]
    fn workspace_mismatch_is_detected() {
        let w = window();
        let key = derive_key(b"secret", &w, KeyId::from_slot(0)).unwrap();
        let signing_key = SigningKey::generate(&mut OsRng);
        let plain = op(OperationKind::Insert {
            content: "hi".into(),
        });

        let env = encrypt_operation(&plain, &key, &signing_key).unwrap();
        assert!(check_workspace(&env, WorkspaceId::new()).is_err());
    }

    #[test]
    fn truncated_ciphertext_is_rejected() {
        let w = window();
        let key = derive_key(b"secret", &w, KeyId::from_slot(0)).unwrap();
        let signing_key = SigningKey::generate(&mut OsRng);
        let plain = op(OperationKind::Insert {
            content: "hi".into(),
        });

        let mut env = encrypt_operation(&plain, &key, &signing_key).unwrap();
        env.encrypted_content.truncate(10);
        assert!(decrypt_operation(&env, &key, key.id()).is_err());
    }
}
