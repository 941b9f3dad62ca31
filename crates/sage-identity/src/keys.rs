//! Key loading and the three signing algorithms RFC 9421 signatures may use.

use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signer as Ed25519Signer, SigningKey as Ed25519SigningKey, Verifier as Ed25519Verifier, VerifyingKey as Ed25519VerifyingKey};
use k256::ecdsa::signature::{Signer as EcdsaSigner, Verifier as EcdsaVerifier};
use k256::ecdsa::{Signature as K256Signature, SigningKey as K256SigningKey, VerifyingKey as K256VerifyingKey};
use p256::ecdsa::{Signature as P256Signature, SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};

/// The three signing algorithms spec.md §4.B names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    Ed25519,
    EcdsaP256Sha256,
    EcdsaSecp256k1,
}

impl KeyAlgorithm {
    /// The token used in the `Signature-Input` header's `alg` parameter.
    pub fn wire_name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
            KeyAlgorithm::EcdsaP256Sha256 => "ecdsa-p256-sha256",
            KeyAlgorithm::EcdsaSecp256k1 => "ecdsa-secp256k1",
        }
    }
}

/// The minimal JWK shape this loader understands: an octet-key-pair (Ed25519)
/// or an EC key (P-256 / secp256k1), private scalar in `d`.
#[derive(Debug, Deserialize)]
struct JwkFile {
    kty: String,
    crv: String,
    d: String,
}

fn b64url_decode(s: &str) -> IdentityResult<Vec<u8>> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(s.as_bytes())
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(s.as_bytes()))
        .map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))
}

/// A loaded signing identity, one of the three supported algorithms.
pub enum Signer {
    Ed25519(Box<Ed25519SigningKey>),
    EcdsaP256(Box<P256SigningKey>),
    EcdsaSecp256k1(Box<K256SigningKey>),
}

impl Signer {
    /// Load a signer from a JWK file on disk. Missing file is fatal, per
    /// spec.md §4.A.
    pub fn load_jwk(path: impl AsRef<Path>) -> IdentityResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| IdentityError::KeyFileUnreadable(format!("{}: {}", path.as_ref().display(), e)))?;
        let jwk: JwkFile = serde_json::from_str(&contents)
            .map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;
        let d = b64url_decode(&jwk.d)?;

        match (jwk.kty.as_str(), jwk.crv.as_str()) {
            ("OKP", "Ed25519") => {
                let bytes: [u8; 32] = d
                    .as_slice()
                    .try_into()
                    .map_err(|_| IdentityError::InvalidKeyFormat("Ed25519 seed must be 32 bytes".into()))?;
                Ok(Signer::Ed25519(Box::new(Ed25519SigningKey::from_bytes(&bytes))))
            }
            ("EC", "P-256") => {
                let key = P256SigningKey::from_slice(&d).map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;
                Ok(Signer::EcdsaP256(Box::new(key)))
            }
            ("EC", "secp256k1") => {
                let key = K256SigningKey::from_slice(&d).map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;
                Ok(Signer::EcdsaSecp256k1(Box::new(key)))
            }
            (kty, crv) => Err(IdentityError::UnsupportedAlgorithm(format!("{}/{}", kty, crv))),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Signer::Ed25519(_) => KeyAlgorithm::Ed25519,
            Signer::EcdsaP256(_) => KeyAlgorithm::EcdsaP256Sha256,
            Signer::EcdsaSecp256k1(_) => KeyAlgorithm::EcdsaSecp256k1,
        }
    }

    /// Sign a message, returning raw (non-DER) signature bytes.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Signer::Ed25519(key) => key.sign(message).to_bytes().to_vec(),
            Signer::EcdsaP256(key) => {
                let sig: P256Signature = key.sign(message);
                sig.to_bytes().to_vec()
            }
            Signer::EcdsaSecp256k1(key) => {
                let sig: K256Signature = key.sign(message);
                sig.to_bytes().to_vec()
            }
        }
    }

    /// Canonical public key bytes: 32-byte Ed25519 point, or SEC1-compressed
    /// (33-byte) EC point.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            Signer::Ed25519(key) => key.verifying_key().to_bytes().to_vec(),
            Signer::EcdsaP256(key) => key.verifying_key().to_encoded_point(true).as_bytes().to_vec(),
            Signer::EcdsaSecp256k1(key) => key.verifying_key().to_encoded_point(true).as_bytes().to_vec(),
        }
    }
}

/// Verify a raw signature against a canonical public key, for a given
/// algorithm. Used by the signature codec (`sage-sigs`) on the inbound path.
pub fn verify(algorithm: KeyAlgorithm, public_key_bytes: &[u8], message: &[u8], signature: &[u8]) -> IdentityResult<bool> {
    match algorithm {
        KeyAlgorithm::Ed25519 => {
            let bytes: [u8; 32] = public_key_bytes
                .try_into()
                .map_err(|_| IdentityError::InvalidKeyFormat("Ed25519 public key must be 32 bytes".into()))?;
            let verifying_key = Ed25519VerifyingKey::from_bytes(&bytes)
                .map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;
            let sig_bytes: [u8; 64] = signature
                .try_into()
                .map_err(|_| IdentityError::InvalidKeyFormat("Ed25519 signature must be 64 bytes".into()))?;
            let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
            Ok(verifying_key.verify(message, &sig).is_ok())
        }
        KeyAlgorithm::EcdsaP256Sha256 => {
            let verifying_key = P256VerifyingKey::from_sec1_bytes(public_key_bytes)
                .map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;
            let sig = P256Signature::from_slice(signature).map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;
            Ok(verifying_key.verify(message, &sig).is_ok())
        }
        KeyAlgorithm::EcdsaSecp256k1 => {
            let verifying_key = K256VerifyingKey::from_sec1_bytes(public_key_bytes)
                .map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;
            let sig = K256Signature::from_slice(signature).map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;
            Ok(verifying_key.verify(message, &sig).is_ok())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn ed25519_jwk() -> String {
        let key = Ed25519SigningKey::generate(&mut OsRng);
        let d = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key.to_bytes());
        format!(r#"{{"kty":"OKP","crv":"Ed25519","d":"{}"}}"#, d)
    }

    #[test]
    fn load_ed25519_jwk_and_sign_verify() {
        let dir = std::env::temp_dir().join(format!("sage-test-{}", uuid_like()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("key.jwk.json");
        std::fs::write(&path, ed25519_jwk()).unwrap();

        let signer = Signer::load_jwk(&path).unwrap();
        assert_eq!(signer.algorithm(), KeyAlgorithm::Ed25519);

        let message = b"hello sage";
        let sig = signer.sign(message);
        let ok = verify(signer.algorithm(), &signer.public_key_bytes(), message, &sig).unwrap();
        assert!(ok);

        let tampered = verify(signer.algorithm(), &signer.public_key_bytes(), b"tampered", &sig).unwrap();
        assert!(!tampered);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_key_file_is_an_error() {
        let result = Signer::load_jwk("/nonexistent/path/key.jwk.json");
        assert!(result.is_err());
    }

    fn uuid_like() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos() as u64
    }
}
