//! SAGE Slots - component 4.H: Slot Extractor.
//!
//! LLM-first extraction with a regex fallback, per spec.md §4.H. Extracted
//! fields are merged onto existing conversation slots by the caller via
//! `PaymentSlots::merge` (newer non-empty value wins) -- this crate only
//! produces the *incoming* partial slot set for a single turn's text.

mod confirm;
mod krw;
mod llm_extract;
mod payment_regex;

pub use confirm::{build_confirm_prompt, build_preview, classify, classify_lexical, YesNo};
pub use krw::parse_amount_krw;

use tokio_util::sync::CancellationToken;

use sage_types::slots::PaymentSlots;

/// Regex-only extraction, used as the fallback when no LLM is configured or
/// its output didn't parse.
pub fn extract_regex(text: &str) -> PaymentSlots {
    let parsed_amount = krw::parse_amount_krw(text);
    let is_budget = parsed_amount.is_some() && krw::is_budget_phrasing(text);

    PaymentSlots {
        mode: payment_regex::extract_mode(text),
        recipient: payment_regex::extract_recipient(text),
        amount_krw: if is_budget { None } else { parsed_amount },
        budget_krw: if is_budget { parsed_amount } else { None },
        method: payment_regex::extract_method(text),
        item: payment_regex::extract_item(text),
        model: payment_regex::extract_model(text),
        merchant: payment_regex::extract_merchant(text),
        shipping: payment_regex::extract_shipping(text),
        card_last4: payment_regex::extract_card_last4(text),
        note: None,
    }
}

/// Extract a partial `PaymentSlots` from `text`: try the LLM first, and
/// fall back to the regex rules if the LLM is unavailable or its answer
/// fails to parse as the expected JSON shape.
pub async fn extract(router: Option<&sage_llm::LLMRouter>, cancel: &CancellationToken, text: &str) -> PaymentSlots {
    if let Some(router) = router {
        if let Some(slots) = llm_extract::extract_with_llm(router, cancel, text).await {
            return slots;
        }
    }
    extract_regex(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_extraction_fills_recipient_method_and_amount() {
        let slots = extract_regex("철수한테 카드로 5만원 보내줘");
        assert_eq!(slots.recipient.as_deref(), Some("철수"));
        assert_eq!(slots.method.as_deref(), Some("카드"));
        assert_eq!(slots.amount_krw, Some(50_000));
    }

    #[tokio::test]
    async fn extract_without_llm_falls_back_to_regex() {
        let cancel = CancellationToken::new();
        let slots = extract(None, &cancel, "철수한테 5만원 송금").await;
        assert_eq!(slots.recipient.as_deref(), Some("철수"));
        assert_eq!(slots.amount_krw, Some(50_000));
    }

    #[test]
    fn budget_phrasing_fills_budget_not_amount() {
        let slots = extract_regex("쿠팡에서 맥북 프로 200만 원 이내로 토스로 결제해줘, 수령자 김영희 서울 강남구");
        assert_eq!(slots.budget_krw, Some(2_000_000));
        assert_eq!(slots.amount_krw, None);
    }
}
