//! A network descriptor selecting the on-chain DID registry, per spec.md
//! §6's `ETH_RPC_URL` / `SAGE_REGISTRY_ADDRESS` / `SAGE_EXTERNAL_KEY` trio.
//! This crate only describes the selection; the resolver implementation
//! itself lives in `sage_didreg` and is explicitly out of scope for an
//! on-chain backend (spec.md §1).

#[derive(Debug, Clone, Default)]
pub struct NetworkConfig {
    pub eth_rpc_url: Option<String>,
    pub registry_address: Option<String>,
    pub external_key: Option<String>,
}

impl NetworkConfig {
    pub fn from_env() -> Self {
        Self {
            eth_rpc_url: std::env::var("ETH_RPC_URL").ok(),
            registry_address: std::env::var("SAGE_REGISTRY_ADDRESS").ok(),
            external_key: std::env::var("SAGE_EXTERNAL_KEY").ok(),
        }
    }

    /// Whether enough fields are present to talk to an on-chain registry.
    /// Always `false` in this deployment since no on-chain resolver is
    /// implemented (spec.md §1) -- present so callers can decide to fall
    /// back to `sage_didreg::FileDidResolver` without guessing.
    pub fn is_configured(&self) -> bool {
        self.eth_rpc_url.is_some() && self.registry_address.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_by_default() {
        let config = NetworkConfig { eth_rpc_url: None, registry_address: None, external_key: None };
        assert!(!config.is_configured());
    }

    #[test]
    fn configured_when_url_and_address_present() {
        let config = NetworkConfig {
            eth_rpc_url: Some("https://rpc.example".into()),
            registry_address: Some("0xdead".into()),
            external_key: None,
        };
        assert!(config.is_configured());
    }
}
