//! SAGE Config - component 4.J: configuration.
//!
//! A strongly-typed view over per-agent records (`AgentCatalog`), a network
//! descriptor selecting the DID registry (`NetworkConfig`), and the root
//! service's own environment-derived settings (`RootConfig`).

mod agent;
mod error;
mod network;
mod root;

pub use agent::{AgentCatalog, AgentRecord};
pub use error::{ConfigError, ConfigResult};
pub use network::NetworkConfig;
pub use root::RootConfig;
