use sage_types::error::{SageError, SageErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HpkeSessionError {
    #[error("handshake produced an empty kid")]
    InitEmptyKid,

    #[error("no session for kid {0}")]
    UnknownKid(String),

    #[error("hpke decrypt failed: {0}")]
    Decrypt(String),

    #[error("hpke handshake failed: {0}")]
    Handshake(String),

    #[error("replay detected: counter {got} not greater than last seen {last}")]
    Replay { last: u64, got: u64 },
}

pub type HpkeResult<T> = Result<T, HpkeSessionError>;

impl From<HpkeSessionError> for SageError {
    fn from(err: HpkeSessionError) -> Self {
        let code = match &err {
            HpkeSessionError::InitEmptyKid => SageErrorCode::HpkeInitEmptyKid,
            HpkeSessionError::UnknownKid(_) => SageErrorCode::HpkeUnknownKid,
            HpkeSessionError::Decrypt(_) | HpkeSessionError::Replay { .. } => SageErrorCode::HpkeDecrypt,
            HpkeSessionError::Handshake(_) => SageErrorCode::HpkeDecrypt,
        };
        SageError::new(code, err.to_string())
    }
}
