use thiserror::Error;

use sage_types::error::{SageError, SageErrorCode};

#[derive(Debug, Error)]
pub enum DidRegError {
    #[error("DID unresolvable: {0}")]
    Unresolvable(String),
    #[error("DID resolution timed out after retries")]
    TimedOut,
    #[error("resolver registry file unreadable: {0}")]
    RegistryUnreadable(String),
}

pub type DidRegResult<T> = Result<T, DidRegError>;

impl From<DidRegError> for SageError {
    fn from(err: DidRegError) -> Self {
        let code = match err {
            DidRegError::TimedOut => SageErrorCode::Timeout,
            DidRegError::Unresolvable(_) | DidRegError::RegistryUnreadable(_) => SageErrorCode::DidUnresolvable,
        };
        SageError::new(code, err.to_string())
    }
}
