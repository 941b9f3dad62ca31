//! Session table keyed by `kid`, one entry per (local DID, peer DID) pair,
//! per spec.md §4.C. Reads and writes are concurrent across keys (each
//! `dashmap` shard locks independently); Enable/Disable for a given target
//! serialize naturally because they only ever touch that target's entry.

use base64::Engine;
use dashmap::DashMap;

use crate::error::{HpkeResult, HpkeSessionError};
use crate::session::{self, PrivateKey, PublicKey, RecvCtx, SendCtx};

/// A live duplex channel to one peer: a context to encrypt outbound traffic
/// and a context to decrypt inbound traffic, both installed by the same
/// handshake round-trip.
struct Channel {
    send: Option<SendCtx>,
    recv: Option<RecvCtx>,
}

/// What a handshake initiator ships in its handshake SecureMessage payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HandshakeRequest {
    pub encapped_key: String,
}

/// What a handshake responder ships back: its own encapsulated key (for the
/// reverse direction) plus the `kid` naming the new channel.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HandshakeResponse {
    pub kid: String,
    pub encapped_key: String,
}

pub struct SessionManager {
    channels: DashMap<String, Channel>,
    /// Persisted `HPKEState`: which `kid` is active for a given peer DID, so
    /// data-mode sends after the handshake don't need to look anything else
    /// up (spec.md §4.C step 4).
    active_kid_by_peer: DashMap<String, String>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            active_kid_by_peer: DashMap::new(),
        }
    }

    /// Initiator step: encapsulate to the peer's public key. The caller
    /// signs and ships `HandshakeRequest` in handshake mode (4.D); once the
    /// responder's `HandshakeResponse` comes back, call
    /// [`Self::finish_initiator`].
    pub fn begin_handshake(&self, peer_public_key: &PublicKey) -> HpkeResult<(HandshakeRequest, SendCtx)> {
        let (encapped_key, send_ctx) = session::setup_sender(peer_public_key)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(session::encapped_key_bytes(&encapped_key));
        Ok((HandshakeRequest { encapped_key: encoded }, send_ctx))
    }

    /// Responder step: accept an inbound handshake, allocate a `kid`, store
    /// the receive session, and build the encapsulation to send back.
    pub fn accept_handshake(&self, request: &HandshakeRequest, local_private_key: &PrivateKey, responder_public_key_for_peer: &PublicKey) -> HpkeResult<HandshakeResponse> {
        let encapped_bytes = base64::engine::general_purpose::STANDARD.decode(&request.encapped_key)
            .map_err(|e| HpkeSessionError::Handshake(e.to_string()))?;
        let encapped_key = session::encapped_key_from_bytes(&encapped_bytes)?;
        let recv_ctx = session::setup_receiver(&encapped_key, local_private_key)?;

        let (reverse_encapped, send_ctx) = session::setup_sender(responder_public_key_for_peer)?;
        let reverse_encoded = base64::engine::general_purpose::STANDARD.encode(session::encapped_key_bytes(&reverse_encapped));

        let kid = uuid::Uuid::new_v4().to_string();
        if kid.is_empty() {
            return Err(HpkeSessionError::InitEmptyKid);
        }
        self.channels.insert(
            kid.clone(),
            Channel {
                send: Some(send_ctx),
                recv: Some(recv_ctx),
            },
        );
        Ok(HandshakeResponse {
            kid,
            encapped_key: reverse_encoded,
        })
    }

    /// Initiator step: having received the responder's `HandshakeResponse`,
    /// install the send session under `kid` and derive the matching receive
    /// session from the responder's reverse encapsulation.
    pub fn finish_initiator(&self, peer_did: &str, response: &HandshakeResponse, initiator_send_ctx: SendCtx, local_private_key: &PrivateKey) -> HpkeResult<()> {
        if response.kid.is_empty() {
            return Err(HpkeSessionError::InitEmptyKid);
        }
        let encapped_bytes = base64::engine::general_purpose::STANDARD.decode(&response.encapped_key)
            .map_err(|e| HpkeSessionError::Handshake(e.to_string()))?;
        let encapped_key = session::encapped_key_from_bytes(&encapped_bytes)?;
        let recv_ctx = session::setup_receiver(&encapped_key, local_private_key)?;

        self.channels.insert(
            response.kid.clone(),
            Channel {
                send: Some(initiator_send_ctx),
                recv: Some(recv_ctx),
            },
        );
        self.active_kid_by_peer.insert(peer_did.to_string(), response.kid.clone());
        Ok(())
    }

    /// The `kid` currently active for a peer, if a handshake has completed.
    pub fn active_kid(&self, peer_did: &str) -> Option<String> {
        self.active_kid_by_peer.get(peer_did).map(|e| e.clone())
    }

    /// Data-mode encrypt: spec.md §4.C, `ct = Encrypt(kid, P)`.
    pub fn encrypt(&self, kid: &str, plaintext: &[u8]) -> HpkeResult<Vec<u8>> {
        let mut entry = self.channels.get_mut(kid).ok_or_else(|| HpkeSessionError::UnknownKid(kid.to_string()))?;
        let send = entry.send.as_mut().ok_or_else(|| HpkeSessionError::UnknownKid(kid.to_string()))?;
        send.seal(plaintext, kid.as_bytes())
    }

    /// Data-mode decrypt.
    pub fn decrypt(&self, kid: &str, ciphertext: &[u8]) -> HpkeResult<Vec<u8>> {
        let mut entry = self.channels.get_mut(kid).ok_or_else(|| HpkeSessionError::UnknownKid(kid.to_string()))?;
        let recv = entry.recv.as_mut().ok_or_else(|| HpkeSessionError::UnknownKid(kid.to_string()))?;
        recv.open(ciphertext, kid.as_bytes())
    }

    /// Disable (tear down) the channel for a peer, e.g. on re-handshake.
    pub fn disable(&self, peer_did: &str) {
        if let Some((_, kid)) = self.active_kid_by_peer.remove(peer_did) {
            self.channels.remove(&kid);
        }
    }

    pub fn has_active_session(&self, kid: &str) -> bool {
        self.channels.contains_key(kid)
    }
}

pub use session::{private_key_from_bytes, public_key_from_bytes};
