use sage_types::error::{SageError, SageErrorCode};

use crate::types::LLMError;

impl From<LLMError> for SageError {
    fn from(err: LLMError) -> Self {
        let code = match err {
            LLMError::TimedOut(_) => SageErrorCode::Timeout,
            LLMError::Canceled
            | LLMError::ProviderNotAvailable { .. }
            | LLMError::RequestFailed { .. }
            | LLMError::InvalidResponse { .. }
            | LLMError::RateLimited { .. }
            | LLMError::ContextLengthExceeded { .. }
            | LLMError::ConfigurationError { .. }
            | LLMError::NetworkError { .. } => SageErrorCode::LlmUnavailable,
        };
        SageError::new(code, err.to_string())
    }
}
