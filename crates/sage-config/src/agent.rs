//! Per-agent records, per spec.md §4.J: `{name, did, endpoint,
//! capabilities{…}}`. Catalog loading mirrors
//! `sage_identity::PeerMap::load`'s flat-JSON-file convention, extended with
//! the endpoint/capability fields a routing decision actually needs.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use sage_identity::Did;

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub did: Did,
    pub endpoint: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// A by-name catalog of known peer agents.
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    by_name: HashMap<String, AgentRecord>,
}

impl AgentCatalog {
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::CatalogUnreadable(format!("{}: {}", path.as_ref().display(), e)))?;
        let records: Vec<AgentRecord> =
            serde_json::from_str(&contents).map_err(|e| ConfigError::CatalogUnreadable(e.to_string()))?;
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<AgentRecord>) -> Self {
        let by_name = records.into_iter().map(|r| (r.name.clone(), r)).collect();
        Self { by_name }
    }

    /// Build a catalog from the three named peer-endpoint env vars
    /// (spec.md §6: `PAYMENT_URL`, `MEDICAL_EXTERNAL_URL`,
    /// `PLANNING_EXTERNAL_URL`), joined with DIDs from a loaded peer map.
    /// Agents whose endpoint env var is unset are omitted.
    pub fn from_env(peers: &sage_identity::PeerMap) -> Self {
        let mut by_name = HashMap::new();
        for (name, env_key) in [("payment", "PAYMENT_URL"), ("medical", "MEDICAL_EXTERNAL_URL"), ("planning", "PLANNING_EXTERNAL_URL")] {
            let Ok(endpoint) = std::env::var(env_key) else { continue };
            let Ok(did) = peers.resolve(name) else { continue };
            by_name.insert(name.to_string(), AgentRecord { name: name.to_string(), did: did.clone(), endpoint, capabilities: Vec::new() });
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> ConfigResult<&AgentRecord> {
        self.by_name.get(name).ok_or_else(|| ConfigError::UnknownAgent(name.to_string()))
    }

    pub fn insert(&mut self, record: AgentRecord) {
        self.by_name.insert(record.name.clone(), record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRecord> {
        self.by_name.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_catalog_file_and_resolves_by_name() {
        let dir = std::env::temp_dir().join(format!("sage-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("agents.json");
        std::fs::write(
            &path,
            r#"[{"name":"payment","did":"did:sage:ethereum:0xabc","endpoint":"http://localhost:9001","capabilities":["transfer"]}]"#,
        )
        .unwrap();

        let catalog = AgentCatalog::load(&path).unwrap();
        let record = catalog.get("payment").unwrap();
        assert_eq!(record.endpoint, "http://localhost:9001");
        assert_eq!(record.capabilities, vec!["transfer".to_string()]);
        assert!(catalog.get("medical").is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
