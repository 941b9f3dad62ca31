//! The HPKE primitive wrapper: one ciphersuite (DHKEM(P-256) / HKDF-SHA256 /
//! ChaCha20Poly1305), direction-local sequence counters for replay defense
//! per spec.md §4.C.

use hpke::aead::{AeadTag, ChaCha20Poly1305};
use hpke::kdf::HkdfSha256;
use hpke::kem::DhP256HkdfSha256;
use hpke::{aead::Aead as AeadTrait, kem::Kem as KemTrait, Deserializable, OpModeR, OpModeS, Serializable};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{HpkeResult, HpkeSessionError};

pub type Kem = DhP256HkdfSha256;
pub type Kdf = HkdfSha256;
pub type Aead = ChaCha20Poly1305;

pub type PublicKey = <Kem as KemTrait>::PublicKey;
pub type PrivateKey = <Kem as KemTrait>::PrivateKey;
pub type EncappedKey = <Kem as KemTrait>::EncappedKey;

/// Bytes a handshake ships over the wire: the HPKE encapsulated key.
pub fn encapped_key_bytes(key: &EncappedKey) -> Vec<u8> {
    key.to_bytes().to_vec()
}

pub fn public_key_from_bytes(bytes: &[u8]) -> HpkeResult<PublicKey> {
    PublicKey::from_bytes(bytes).map_err(|e| HpkeSessionError::Handshake(e.to_string()))
}

pub fn private_key_from_bytes(bytes: &[u8]) -> HpkeResult<PrivateKey> {
    PrivateKey::from_bytes(bytes).map_err(|e| HpkeSessionError::Handshake(e.to_string()))
}

pub fn encapped_key_from_bytes(bytes: &[u8]) -> HpkeResult<EncappedKey> {
    EncappedKey::from_bytes(bytes).map_err(|e| HpkeSessionError::Handshake(e.to_string()))
}

/// One directional send context plus a monotonic counter. The underlying
/// AEAD context already refuses to seal out of order; the counter exists so
/// callers can report a replay window violation with the same shape as any
/// other transport-level replay check.
pub struct SendCtx {
    ctx: hpke::aead::AeadCtxS<Aead, Kdf, Kem>,
    counter: u64,
}

pub struct RecvCtx {
    ctx: hpke::aead::AeadCtxR<Aead, Kdf, Kem>,
    counter: u64,
}

impl SendCtx {
    /// Seal plaintext into `ciphertext || tag`. The AEAD context encrypts
    /// in place and hands back the tag separately.
    pub fn seal(&mut self, plaintext: &[u8], aad: &[u8]) -> HpkeResult<Vec<u8>> {
        let mut buf = plaintext.to_vec();
        let tag = self.ctx.seal(&mut buf, aad).map_err(|e| HpkeSessionError::Decrypt(e.to_string()))?;
        buf.extend_from_slice(&tag_bytes(&tag));
        self.counter += 1;
        Ok(buf)
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }
}

impl RecvCtx {
    pub fn open(&mut self, ciphertext: &[u8], aad: &[u8]) -> HpkeResult<Vec<u8>> {
        let tag_len = <Aead as AeadTrait>::AeadImpl::TAG_SIZE;
        if ciphertext.len() < tag_len {
            return Err(HpkeSessionError::Decrypt("ciphertext shorter than AEAD tag".into()));
        }
        let (body, tag_bytes_slice) = ciphertext.split_at(ciphertext.len() - tag_len);
        let tag = AeadTag::<Aead>::from_bytes(tag_bytes_slice).map_err(|e| HpkeSessionError::Decrypt(e.to_string()))?;
        let mut buf = body.to_vec();
        self.ctx.open(&mut buf, aad, &tag).map_err(|e| HpkeSessionError::Decrypt(e.to_string()))?;
        self.counter += 1;
        Ok(buf)
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }
}

fn tag_bytes(tag: &AeadTag<Aead>) -> Vec<u8> {
    tag.to_bytes().to_vec()
}

const INFO: &[u8] = b"sage-router/hpke/v1";

/// Initiator side of the handshake (spec.md §4.C step 1-2): encapsulate to
/// the peer's public key, producing the bytes to ship in the handshake
/// SecureMessage plus a live send context.
pub fn setup_sender(peer_public_key: &PublicKey) -> HpkeResult<(EncappedKey, SendCtx)> {
    let mut csprng = StdRng::from_entropy();
    let (encapped_key, ctx) = hpke::setup_sender::<Aead, Kdf, Kem, _>(&OpModeS::Base, peer_public_key, INFO, &mut csprng)
        .map_err(|e| HpkeSessionError::Handshake(e.to_string()))?;
    Ok((encapped_key, SendCtx { ctx, counter: 0 }))
}

/// Responder side of the handshake (spec.md §4.C step 3): derive the shared
/// secret from the initiator's encapsulated key and this agent's private key.
pub fn setup_receiver(encapped_key: &EncappedKey, local_private_key: &PrivateKey) -> HpkeResult<RecvCtx> {
    let ctx = hpke::setup_receiver::<Aead, Kdf, Kem>(&OpModeR::Base, local_private_key, encapped_key, INFO)
        .map_err(|e| HpkeSessionError::Handshake(e.to_string()))?;
    Ok(RecvCtx { ctx, counter: 0 })
}
