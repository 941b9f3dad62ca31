//! The convenience entry point the rest of the router calls through:
//! `chat(system, user)`, bounded by an 8s deadline and cooperative
//! cancellation, per spec.md §4.J/§5.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::router::LLMRouter;
use crate::types::{CompletionRequest, LLMError, Message, Result};

/// Default LLM call deadline. Overridable via `SAGE_LLM_TIMEOUT_SECONDS`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

pub fn timeout_from_env() -> Duration {
    std::env::var("SAGE_LLM_TIMEOUT_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

/// Single-turn chat completion: `system` sets behavior, `user` is the
/// one message sent. Races the call against both a deadline and a
/// cancellation token; callers that don't need cancellation can pass
/// `CancellationToken::new()` and never fire it.
pub async fn chat(router: &LLMRouter, cancel: &CancellationToken, system: &str, user: &str) -> Result<String> {
    chat_with_timeout(router, cancel, system, user, timeout_from_env()).await
}

pub async fn chat_with_timeout(router: &LLMRouter, cancel: &CancellationToken, system: &str, user: &str, timeout: Duration) -> Result<String> {
    if cancel.is_cancelled() {
        return Err(LLMError::Canceled);
    }

    let request = CompletionRequest::new(vec![Message::user(user)]).with_system(system);

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LLMError::Canceled),
        result = tokio::time::timeout(timeout, router.complete_with_fallback(request)) => {
            match result {
                Ok(inner) => inner.map(|response| response.content),
                Err(_) => Err(LLMError::TimedOut(timeout)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::DeterministicProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn chat_returns_deterministic_fallback_content() {
        let router = LLMRouter::builder().with_primary(Arc::new(DeterministicProvider::new())).build();
        let cancel = CancellationToken::new();
        let text = chat(&router, &cancel, "be terse", "hello").await.expect("deterministic provider never fails");
        assert!(text.contains("deterministic fallback"));
    }

    #[tokio::test]
    async fn chat_returns_canceled_when_token_already_fired() {
        let router = LLMRouter::builder().with_primary(Arc::new(DeterministicProvider::new())).build();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = chat(&router, &cancel, "be terse", "hello").await;
        assert!(matches!(result, Err(LLMError::Canceled)));
    }

    #[tokio::test]
    async fn chat_times_out_when_deadline_is_zero() {
        let router = LLMRouter::builder().with_primary(Arc::new(DeterministicProvider::new())).build();
        let cancel = CancellationToken::new();
        let result = chat_with_timeout(&router, &cancel, "be terse", "hello", Duration::from_nanos(1)).await;
        assert!(matches!(result, Err(LLMError::TimedOut(_))));
    }
}
