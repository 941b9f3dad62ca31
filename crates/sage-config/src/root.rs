//! The root service's own environment-derived configuration (spec.md §6),
//! distinct from `AgentCatalog`/`NetworkConfig` in that it describes *this*
//! process rather than its peers.

#[derive(Debug, Clone)]
pub struct RootConfig {
    pub jwk_file: Option<String>,
    pub did: Option<String>,
    pub sage_enabled: bool,
    pub intent_mode: String,
    pub hpke_keys_path: Option<String>,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            jwk_file: None,
            did: None,
            sage_enabled: true,
            intent_mode: "hybrid".to_string(),
            hpke_keys_path: None,
        }
    }
}

impl RootConfig {
    pub fn from_env() -> Self {
        Self {
            jwk_file: std::env::var("ROOT_JWK_FILE").ok(),
            did: std::env::var("ROOT_DID").ok(),
            sage_enabled: std::env::var("ROOT_SAGE_ENABLED").map(|v| v != "false").unwrap_or(true),
            intent_mode: std::env::var("ROOT_INTENT_MODE").unwrap_or_else(|_| "hybrid".to_string()),
            hpke_keys_path: std::env::var("HPKE_KEYS")
                .or_else(|_| std::env::var("ROOT_HPKE_KEYS"))
                .or_else(|_| std::env::var("HPKE_KEYS_PATH"))
                .ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_hybrid_and_enabled() {
        let config = RootConfig::default();
        assert!(config.sage_enabled);
        assert_eq!(config.intent_mode, "hybrid");
    }
}
