//! `FileDidResolver`: a flat-file DID registry, for tests and local
//! operation. The on-chain registry an `ETH_RPC_URL`/`SAGE_REGISTRY_ADDRESS`
//! resolver would talk to is explicitly out of scope (spec.md §1) -- this
//! is the one concrete implementation this crate ships.
//!
//! Catalog shape grounded on `sage_identity::PeerMap::load`'s flat
//! `[{name, did}]` JSON file convention, extended with the public key
//! material a registry entry actually needs to carry.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use sage_identity::{Did, KeyAlgorithm};

use crate::error::{DidRegError, DidRegResult};
use crate::resolver::{DidResolver, ResolvedKey};

#[derive(Debug, Deserialize)]
struct RegistryRecord {
    did: String,
    algorithm: KeyAlgorithm,
    #[serde(rename = "publicKeyHex")]
    public_key_hex: String,
}

/// A DID registry backed by a flat JSON file of `{did, algorithm,
/// publicKeyHex}` records, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct FileDidResolver {
    by_did: HashMap<Did, ResolvedKeyOwned>,
}

#[derive(Debug, Clone)]
struct ResolvedKeyOwned {
    algorithm: KeyAlgorithm,
    public_key_bytes: Vec<u8>,
}

impl FileDidResolver {
    pub fn load(path: impl AsRef<Path>) -> DidRegResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DidRegError::RegistryUnreadable(format!("{}: {}", path.as_ref().display(), e)))?;
        let records: Vec<RegistryRecord> =
            serde_json::from_str(&contents).map_err(|e| DidRegError::RegistryUnreadable(e.to_string()))?;

        let mut by_did = HashMap::with_capacity(records.len());
        for record in records {
            let did = Did::parse(&record.did).map_err(|e| DidRegError::RegistryUnreadable(e.to_string()))?;
            let public_key_bytes = hex::decode(record.public_key_hex.trim_start_matches("0x"))
                .map_err(|e| DidRegError::RegistryUnreadable(e.to_string()))?;
            by_did.insert(did, ResolvedKeyOwned { algorithm: record.algorithm, public_key_bytes });
        }
        Ok(Self { by_did })
    }

    pub fn insert(&mut self, did: Did, algorithm: KeyAlgorithm, public_key_bytes: Vec<u8>) {
        self.by_did.insert(did, ResolvedKeyOwned { algorithm, public_key_bytes });
    }
}

#[async_trait]
impl DidResolver for FileDidResolver {
    async fn resolve(&self, did: &Did) -> DidRegResult<ResolvedKey> {
        self.by_did
            .get(did)
            .map(|entry| ResolvedKey { algorithm: entry.algorithm, public_key_bytes: entry.public_key_bytes.clone() })
            .ok_or_else(|| DidRegError::Unresolvable(did.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_catalog_and_resolves_by_did() {
        let dir = std::env::temp_dir().join(format!("sage-didreg-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("registry.json");
        std::fs::write(
            &path,
            r#"[{"did":"did:sage:ethereum:0xabc","algorithm":"ed25519","publicKeyHex":"0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20"}]"#,
        )
        .unwrap();

        let registry = FileDidResolver::load(&path).unwrap();
        let did = Did::parse("did:sage:ethereum:0xabc").unwrap();
        let resolved = registry.resolve(&did).await.unwrap();
        assert_eq!(resolved.algorithm, KeyAlgorithm::Ed25519);
        assert_eq!(resolved.public_key_bytes.len(), 32);

        let unknown = Did::parse("did:sage:ethereum:0xdead").unwrap();
        assert!(registry.resolve(&unknown).await.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
