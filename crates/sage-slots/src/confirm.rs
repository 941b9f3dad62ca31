//! Confirm-prompt generation and yes/no/unclear parsing, per spec.md §4.H.

use tokio_util::sync::CancellationToken;

use sage_types::slots::PaymentSlots;

const CONFIRM_SYSTEM_PROMPT: &str = "Given this payment preview, write exactly one short confirmation question \
asking the user to say yes or no to proceed. Respond with only the question, no preamble.";

const CANNED_CONFIRM_QUESTION: &str = "위 내용으로 진행할까요? (예/아니오)";

/// Build the 5-6 line human preview the dispatcher shows once all required
/// slots are filled: item, method, shipping, budget/amount, merchant, memo.
pub fn build_preview(slots: &PaymentSlots) -> String {
    let mut lines = Vec::with_capacity(6);
    if let Some(item) = &slots.item {
        let item_line = match &slots.model {
            Some(model) => format!("상품: {} ({})", item, model),
            None => format!("상품: {}", item),
        };
        lines.push(item_line);
    }
    if let Some(method) = &slots.method {
        lines.push(format!("결제수단: {}", method));
    }
    if let Some(shipping) = &slots.shipping {
        lines.push(format!("배송지: {}", shipping));
    }
    if let Some(amount) = slots.amount_krw {
        lines.push(format!("금액: {}원", amount));
    } else if let Some(budget) = slots.budget_krw {
        lines.push(format!("예산: {}원 이내", budget));
    }
    if let Some(merchant) = &slots.merchant {
        lines.push(format!("판매처: {}", merchant));
    }
    if let Some(note) = &slots.note {
        lines.push(format!("메모: {}", note));
    }
    lines.join("\n")
}

/// Append a confirmation question to the preview, generated by the LLM
/// when available, falling back to a canned phrasing otherwise.
pub async fn build_confirm_prompt(router: Option<&sage_llm::LLMRouter>, cancel: &CancellationToken, slots: &PaymentSlots) -> String {
    let preview = build_preview(slots);
    let question = match router {
        Some(router) => sage_llm::chat(router, cancel, CONFIRM_SYSTEM_PROMPT, &preview).await.ok().filter(|q| !q.trim().is_empty()).unwrap_or_else(|| CANNED_CONFIRM_QUESTION.to_string()),
        None => CANNED_CONFIRM_QUESTION.to_string(),
    };
    format!("{}\n\n{}", preview, question.trim())
}

/// The outcome of classifying a confirmation reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
    Unclear,
}

static POSITIVE_CUES: &[&str] = &["예", "네", "넹", "웅", "ok", "okay", "yes", "진행", "구매", "결제", "ㄱㄱ", "좋아", "go"];
static NEGATIVE_CUES: &[&str] = &["아니오", "아니요", "아니", "취소", "no", "그만", "싫어", "cancel", "stop"];

/// Lexical yes/no classification. `None` means neither list matched and the
/// caller should escalate to the LLM.
pub fn classify_lexical(text: &str) -> Option<YesNo> {
    let lower = text.trim().to_lowercase();
    if POSITIVE_CUES.iter().any(|cue| lower.contains(cue)) {
        return Some(YesNo::Yes);
    }
    if NEGATIVE_CUES.iter().any(|cue| lower.contains(cue)) {
        return Some(YesNo::No);
    }
    None
}

const CLASSIFY_SYSTEM_PROMPT: &str = "The user was asked to confirm or cancel a pending action. \
Classify their reply as exactly one word: yes, no, or unclear. Respond with only that word.";

/// Classify a confirmation reply: lexical cues first, then a one-shot LLM
/// escalation constrained to `yes|no|unclear` for ambiguous input.
pub async fn classify(router: Option<&sage_llm::LLMRouter>, cancel: &CancellationToken, text: &str) -> YesNo {
    if let Some(result) = classify_lexical(text) {
        return result;
    }

    let Some(router) = router else {
        return YesNo::Unclear;
    };

    match sage_llm::chat(router, cancel, CLASSIFY_SYSTEM_PROMPT, text).await {
        Ok(reply) => match reply.trim().to_lowercase().as_str() {
            "yes" => YesNo::Yes,
            "no" => YesNo::No,
            _ => YesNo::Unclear,
        },
        Err(_) => YesNo::Unclear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_slots() -> PaymentSlots {
        PaymentSlots {
            item: Some("무선 키보드".into()),
            method: Some("카드".into()),
            shipping: Some("서울".into()),
            amount_krw: Some(50_000),
            merchant: Some("쿠팡".into()),
            ..Default::default()
        }
    }

    #[test]
    fn preview_includes_all_present_fields() {
        let preview = build_preview(&sample_slots());
        assert!(preview.contains("무선 키보드"));
        assert!(preview.contains("카드"));
        assert!(preview.contains("서울"));
        assert!(preview.contains("50000원"));
        assert!(preview.contains("쿠팡"));
    }

    #[test]
    fn lexical_classifier_recognizes_positive_cue() {
        assert_eq!(classify_lexical("네 진행할게요"), Some(YesNo::Yes));
    }

    #[test]
    fn lexical_classifier_recognizes_negative_cue() {
        assert_eq!(classify_lexical("아니요 취소할게요"), Some(YesNo::No));
    }

    #[test]
    fn lexical_classifier_returns_none_for_ambiguous_text() {
        assert_eq!(classify_lexical("음 글쎄요"), None);
    }

    #[tokio::test]
    async fn classify_falls_back_to_unclear_with_no_llm_and_ambiguous_text() {
        let cancel = CancellationToken::new();
        let result = classify(None, &cancel, "음 글쎄요").await;
        assert_eq!(result, YesNo::Unclear);
    }

    #[tokio::test]
    async fn classify_uses_lexical_cue_without_calling_llm() {
        let cancel = CancellationToken::new();
        let result = classify(None, &cancel, "네 좋아요").await;
        assert_eq!(result, YesNo::Yes);
    }
}
