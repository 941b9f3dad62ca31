//! Local HPKE static keypair + per-peer HPKE public key catalog.
//!
//! Separate from `sage_identity`'s signing keys/DID registry: a peer's HPKE
//! public key is KEM material, not a verification key, so it gets its own
//! flat-file catalog in the same `[{...}]` convention
//! `sage_identity::PeerMap` and `sage_didreg::FileDidResolver` use.

use std::collections::HashMap;
use std::path::Path;

use sage_hpke::{private_key_from_bytes, public_key_from_bytes, PrivateKey, PublicKey};
use sage_identity::Did;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LocalKeyFile {
    #[serde(rename = "privateKeyHex")]
    private_key_hex: String,
    #[serde(rename = "publicKeyHex")]
    public_key_hex: String,
}

pub fn load_local_keypair(path: impl AsRef<Path>) -> anyhow::Result<(PrivateKey, PublicKey)> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let file: LocalKeyFile = serde_json::from_str(&contents)?;
    let private_key = private_key_from_bytes(&hex::decode(file.private_key_hex.trim_start_matches("0x"))?)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let public_key = public_key_from_bytes(&hex::decode(file.public_key_hex.trim_start_matches("0x"))?)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok((private_key, public_key))
}

#[derive(Debug, Deserialize)]
struct PeerKeyRecord {
    did: String,
    #[serde(rename = "hpkePublicKeyHex")]
    hpke_public_key_hex: String,
}

#[derive(Default)]
pub struct HpkeKeyCatalog {
    by_did: HashMap<Did, PublicKey>,
}

impl HpkeKeyCatalog {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<PeerKeyRecord> = serde_json::from_str(&contents)?;
        let mut by_did = HashMap::with_capacity(records.len());
        for record in records {
            let did = Did::parse(&record.did).map_err(|e| anyhow::anyhow!("{e}"))?;
            let key = public_key_from_bytes(&hex::decode(record.hpke_public_key_hex.trim_start_matches("0x"))?)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            by_did.insert(did, key);
        }
        Ok(Self { by_did })
    }

    pub fn get(&self, did: &Did) -> Option<&PublicKey> {
        self.by_did.get(did)
    }
}
