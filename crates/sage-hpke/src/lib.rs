//! SAGE HPKE - component 4.C: HPKE Session Manager.
//!
//! Gives each ordered (local DID, peer DID) pair a long-lived authenticated
//! channel keyed by `kid`, using the `hpke` crate's DHKEM(P-256) /
//! HKDF-SHA256 / ChaCha20Poly1305 ciphersuite, stored behind `dashmap` the
//! way the teacher keeps shared mutable state throughout its state layer.

mod error;
mod manager;
mod session;

pub use error::{HpkeResult, HpkeSessionError};
pub use manager::{HandshakeRequest, HandshakeResponse, SessionManager};
pub use session::{private_key_from_bytes, public_key_from_bytes, PrivateKey, PublicKey};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn keypair() -> (PrivateKey, PublicKey) {
        use hpke::kem::Kem as KemTrait;
        let mut csprng = StdRng::from_entropy();
        session::Kem::gen_keypair(&mut csprng)
    }

    #[test]
    fn handshake_then_data_mode_round_trip() {
        let (initiator_sk, initiator_pk) = keypair();
        let (responder_sk, responder_pk) = keypair();

        let initiator = SessionManager::new();
        let responder = SessionManager::new();

        let (request, initiator_send_ctx) = initiator.begin_handshake(&responder_pk).unwrap();
        let response = responder.accept_handshake(&request, &responder_sk, &initiator_pk).unwrap();
        assert!(!response.kid.is_empty());

        initiator.finish_initiator("did:sage:ethereum:0xresponder", &response, initiator_send_ctx, &initiator_sk).unwrap();

        let kid = initiator.active_kid("did:sage:ethereum:0xresponder").unwrap();
        assert_eq!(kid, response.kid);

        let ct = initiator.encrypt(&kid, b"hello responder").unwrap();
        let pt = responder.decrypt(&kid, &ct).unwrap();
        assert_eq!(pt, b"hello responder");
    }

    #[test]
    fn unknown_kid_is_rejected() {
        let manager = SessionManager::new();
        let result = manager.encrypt("no-such-kid", b"data");
        assert!(matches!(result, Err(HpkeSessionError::UnknownKid(_))));
    }

    #[test]
    fn decrypt_with_tampered_ciphertext_fails() {
        let (initiator_sk, initiator_pk) = keypair();
        let (responder_sk, responder_pk) = keypair();

        let initiator = SessionManager::new();
        let responder = SessionManager::new();

        let (request, initiator_send_ctx) = initiator.begin_handshake(&responder_pk).unwrap();
        let response = responder.accept_handshake(&request, &responder_sk, &initiator_pk).unwrap();
        initiator.finish_initiator("did:sage:ethereum:0xresponder", &response, initiator_send_ctx, &initiator_sk).unwrap();

        let kid = initiator.active_kid("did:sage:ethereum:0xresponder").unwrap();
        let mut ct = initiator.encrypt(&kid, b"hello responder").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0xFF;

        let result = responder.decrypt(&kid, &ct);
        assert!(result.is_err());
    }
}
