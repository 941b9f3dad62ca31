//! Step 3 of the decision procedure: ask the LLM for a single JSON object
//! and accept it only if the domain is one of the four recognized values.

use tokio_util::sync::CancellationToken;

use crate::domain::{Domain, Lang};

const SYSTEM_PROMPT: &str = "You are an intent classifier for a Korean/English messaging assistant. \
Given a user's message, respond with exactly one JSON object and nothing else: \
{\"domain\": one of \"payment\"|\"medical\"|\"planning\"|\"chat\", \"lang\": one of \"ko\"|\"en\"}. \
Payment covers sending money, transfers, purchases, orders. Medical covers symptoms, conditions, \
health questions. Planning covers scheduling, itineraries, plans. Everything else is chat.";

#[derive(Debug, serde::Deserialize)]
struct LlmDecision {
    domain: String,
    lang: String,
}

/// Ask the LLM to classify `text`. Returns `None` if the call fails, the
/// output doesn't parse, or the domain isn't one of the four recognized
/// values -- callers fall back to chat in that case.
pub async fn classify(router: &sage_llm::LLMRouter, cancel: &CancellationToken, text: &str) -> Option<(Domain, Lang)> {
    let raw = sage_llm::chat(router, cancel, SYSTEM_PROMPT, text).await.ok()?;
    let decision: LlmDecision = serde_json::from_str(raw.trim()).ok()?;
    let domain = Domain::parse(&decision.domain)?;
    let lang = Lang::parse(&decision.lang).unwrap_or_else(|| Lang::detect(text));
    Some((domain, lang))
}
