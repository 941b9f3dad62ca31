use sage_types::error::{SageError, SageErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Signature(#[from] sage_sigs::SigError),

    #[error(transparent)]
    Hpke(#[from] sage_hpke::HpkeSessionError),

    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("message timestamp skew outside the configured window")]
    ExpiredMessage,

    #[error("duplicate message id {0} seen within the replay window")]
    ReplayedMessage(String),

    #[error("hpke payload received without a valid SAGE signature")]
    HpkeWithoutSage,
}

pub type TransportResult<T> = Result<T, TransportError>;

impl From<TransportError> for SageError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Hpke(hpke_err) => hpke_err.into(),
            TransportError::InvalidSignature | TransportError::Signature(_) => {
                SageError::new(SageErrorCode::InvalidSignature, err.to_string())
            }
            TransportError::ExpiredMessage => SageError::new(SageErrorCode::ExpiredMessage, err.to_string()),
            TransportError::HpkeWithoutSage => SageError::new(SageErrorCode::HpkeWithoutSage, err.to_string()),
            TransportError::Upstream { .. } | TransportError::Http(_) => SageError::new(SageErrorCode::UpstreamError, err.to_string()),
            TransportError::MissingHeader(_) | TransportError::ReplayedMessage(_) => SageError::new(SageErrorCode::BadRequest, err.to_string()),
        }
    }
}
