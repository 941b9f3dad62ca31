//! Peer alias catalog: a flat `[{name, did}]` file mapping logical peer names
//! (payment|medical|planning) to their DID, per spec.md §4.A/§6. Default
//! filename `merged_agent_keys.json`, overridable via `HPKE_KEYS` /
//! `ROOT_HPKE_KEYS` / `HPKE_KEYS_PATH`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::did::Did;
use crate::error::{IdentityError, IdentityResult};

#[derive(Debug, Deserialize)]
struct PeerRecord {
    name: String,
    did: String,
}

/// Resolves a logical peer name (e.g. "payment") to its DID.
#[derive(Debug, Clone, Default)]
pub struct PeerMap {
    by_name: HashMap<String, Did>,
}

impl PeerMap {
    pub fn load(path: impl AsRef<Path>) -> IdentityResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| IdentityError::PeerMapUnreadable(format!("{}: {}", path.as_ref().display(), e)))?;
        let records: Vec<PeerRecord> = serde_json::from_str(&contents)
            .map_err(|e| IdentityError::PeerMapUnreadable(e.to_string()))?;

        let mut by_name = HashMap::with_capacity(records.len());
        for record in records {
            let did = Did::parse(&record.did)?;
            by_name.insert(record.name, did);
        }
        Ok(Self { by_name })
    }

    /// Resolve the default peer-map path from the environment, per spec.md §6:
    /// `HPKE_KEYS` / `ROOT_HPKE_KEYS` / `HPKE_KEYS_PATH`, falling back to
    /// `merged_agent_keys.json`.
    pub fn default_path_from_env() -> String {
        std::env::var("HPKE_KEYS")
            .or_else(|_| std::env::var("ROOT_HPKE_KEYS"))
            .or_else(|_| std::env::var("HPKE_KEYS_PATH"))
            .unwrap_or_else(|_| "merged_agent_keys.json".to_string())
    }

    pub fn resolve(&self, name: &str) -> IdentityResult<&Did> {
        self.by_name.get(name).ok_or_else(|| IdentityError::UnknownPeer(name.to_string()))
    }

    pub fn insert(&mut self, name: impl Into<String>, did: Did) {
        self.by_name.insert(name.into(), did);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_flat_catalog_and_resolves_by_name() {
        let dir = std::env::temp_dir().join(format!("sage-peermap-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("peers.json");
        std::fs::write(
            &path,
            r#"[{"name":"payment","did":"did:sage:ethereum:0xabc"},{"name":"medical","did":"did:sage:ethereum:0xdef"}]"#,
        )
        .unwrap();

        let map = PeerMap::load(&path).unwrap();
        assert_eq!(map.resolve("payment").unwrap().to_string(), "did:sage:ethereum:0xabc");
        assert!(map.resolve("planning").is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
