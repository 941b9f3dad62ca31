use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("key file not found or unreadable: {0}")]
    KeyFileUnreadable(String),
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),
    #[error("unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("invalid DID: {0}")]
    InvalidDid(String),
    #[error("peer map file not found or unreadable: {0}")]
    PeerMapUnreadable(String),
    #[error("unknown peer: {0}")]
    UnknownPeer(String),
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;
