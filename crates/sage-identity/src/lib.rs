//! SAGE Identity - component 4.A: Identity & Key Store.
//!
//! Loads a DID and its private key, exposes the signing primitive, and
//! reads the flat peer-alias catalog. DID resolution against the on-chain
//! registry lives in `sage-didreg` (an external collaborator adapter per
//! spec.md §1/§4.J).

pub mod did;
pub mod error;
pub mod keys;
pub mod peers;

pub use did::Did;
pub use error::{IdentityError, IdentityResult};
pub use keys::{verify, KeyAlgorithm, Signer};
pub use peers::PeerMap;

/// Load a signer and derive its DID, per spec.md §4.A `Load(didSpec, keyFile)`.
///
/// `did_spec` is an explicit DID string (e.g. from `ROOT_DID`); when absent
/// the DID is derived from the key (`<chain>` defaults to `sage`).
pub fn load(did_spec: Option<&str>, key_file: impl AsRef<std::path::Path>, chain: &str) -> IdentityResult<(Did, Signer)> {
    let signer = Signer::load_jwk(key_file)?;
    let did = match did_spec {
        Some(spec) => Did::parse(spec)?,
        None => Did::new(chain, Did::derive_address(&signer.public_key_bytes())),
    };
    Ok((did, signer))
}
