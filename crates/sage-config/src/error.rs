use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("agent catalog file unreadable: {0}")]
    CatalogUnreadable(String),
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
