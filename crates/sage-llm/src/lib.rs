//! SAGE LLM - component 4.J: LLM collaborator adapter.
//!
//! A provider-agnostic chat client. `LLMRouter` picks a primary backend
//! from `SAGE_LLM_PROVIDER` (Ollama by default, matching the teacher's
//! local-first posture) with a deterministic fallback that never fails,
//! and `chat()` wraps a single call with the deadline and cancellation
//! semantics the rest of the router needs.

mod chat;
mod error;
mod providers;
mod router;
mod types;

pub use chat::{chat, chat_with_timeout, timeout_from_env, DEFAULT_TIMEOUT};
pub use providers::{
    AnthropicConfig, AnthropicProvider, DeterministicProvider, LLMProvider, OllamaConfig, OllamaProvider, OpenAICompatConfig, OpenAICompatProvider, OpenAIConfig, OpenAIProvider,
};
pub use router::{LLMRouter, LLMRouterBuilder};
pub use types::{CompletionRequest, CompletionResponse, LLMError, Message, MessageRole, ProviderKind, Result, TokenUsage};
