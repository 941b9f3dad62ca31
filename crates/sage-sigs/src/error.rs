use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigError {
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    #[error("no signatures present")]
    NoSignatures,

    #[error("unknown covered component: {0}")]
    UnknownComponent(String),

    #[error("algorithm mismatch: expected {expected}, found {found}")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("signature verification error: {0}")]
    Verification(String),
}

pub type SigResult<T> = Result<T, SigError>;
