//! LLM-based structured extraction with a tight JSON schema, per spec.md
//! §4.H step 1. Falls through to the regex rules in [`crate::payment_regex`]
//! when the LLM is unavailable or its output fails to parse.

use tokio_util::sync::CancellationToken;

use sage_types::slots::PaymentSlots;

const SYSTEM_PROMPT: &str = "Extract payment slot fields from the user's message as a single JSON object. \
Fields (all optional, omit what isn't present): \
\"mode\" (\"purchase\" or \"transfer\"), \"recipient\" (string), \"amountKRW\" (integer won), \
\"budgetKRW\" (integer won), \"method\" (payment method string), \"item\" (string), \"model\" (string), \
\"merchant\" (string), \"shipping\" (string), \"cardLast4\" (4-digit string), \"note\" (string). \
Respond with exactly one JSON object and nothing else.";

pub async fn extract_with_llm(router: &sage_llm::LLMRouter, cancel: &CancellationToken, text: &str) -> Option<PaymentSlots> {
    let raw = sage_llm::chat(router, cancel, SYSTEM_PROMPT, text).await.ok()?;
    serde_json::from_str(raw.trim()).ok()
}
