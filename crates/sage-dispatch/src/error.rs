use sage_types::error::{SageError, SageErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("stale confirm token")]
    StaleConfirmToken,
    #[error(transparent)]
    Transport(#[from] sage_transport::TransportError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

impl From<DispatchError> for SageError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::StaleConfirmToken => SageError::new(SageErrorCode::StaleConfirmToken, err.to_string()),
            DispatchError::Transport(transport_err) => transport_err.into(),
        }
    }
}
