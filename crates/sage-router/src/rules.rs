//! Deterministic pure-function predicates over lowercased text, per spec.md
//! §4.G step 2. No crate here does NLP; these are regex cue-counters.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::Domain;

static QUESTION_KO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(까요|나요|을까|ㄹ까|인가요|맞나요)\s*[\?]?\s*$").unwrap());

static ACTION_VERBS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(보내|송금|결제|구매|주문|이체|send|transfer|pay\b|order\b|purchase)").unwrap());

static AMOUNT_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d[\d,]*\s*(원|만원|억원|krw)|\$\s*\d)").unwrap());

static METHOD_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(카드|계좌이체|계좌|현금|페이|pay\b|card\b|account\b)").unwrap());

static RECIPIENT_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(한테|에게|\bto\s+\w+)").unwrap());

static CONDITION_TOKENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(감기|두통|열나|기침|몸살|알레르기|아파|아픈|symptom|fever|headache|cold\b|flu\b|pain\b)").unwrap());

static INFORMATIONAL_VERB: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(뭐예요|무엇|궁금|알려줘|what is|tell me about)").unwrap());

static PLANNING_TOKENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(일정|계획|스케줄|예약|plan\b|schedule\b|itinerary)").unwrap());

fn is_question(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.ends_with('?') || QUESTION_KO.is_match(trimmed)
}

/// Strong payment action intent: either an explicit action verb outside a
/// bare question, or two-or-more of {amount, method, recipient} cues.
pub fn is_payment_action_intent(lower_text: &str) -> bool {
    let question = is_question(lower_text);
    let has_action_verb = ACTION_VERBS.is_match(lower_text);
    if has_action_verb && !question {
        return true;
    }

    let cue_count = [AMOUNT_CUE.is_match(lower_text), METHOD_CUE.is_match(lower_text), RECIPIENT_CUE.is_match(lower_text)].into_iter().filter(|b| *b).count();
    cue_count >= 2
}

/// Medical domain intent: a condition token by itself, or an informational
/// verb combined with question framing.
pub fn is_medical_action_intent(lower_text: &str) -> bool {
    CONDITION_TOKENS.is_match(lower_text) || (INFORMATIONAL_VERB.is_match(lower_text) && is_question(lower_text))
}

/// Planning domain intent: schedule/plan tokens in a non-question sentence.
pub fn is_planning_action_intent(lower_text: &str) -> bool {
    PLANNING_TOKENS.is_match(lower_text) && !is_question(lower_text)
}

/// Step 2 of the decision procedure: apply the three predicates in the
/// priority order spec.md §4.G implies (payment first, since it carries the
/// stronger "2+ cue" signal; medical and planning are mutually exclusive
/// content domains so order between them doesn't matter in practice).
pub fn rule_layer(lower_text: &str) -> Option<Domain> {
    if is_payment_action_intent(lower_text) {
        return Some(Domain::Payment);
    }
    if is_medical_action_intent(lower_text) {
        return Some(Domain::Medical);
    }
    if is_planning_action_intent(lower_text) {
        return Some(Domain::Planning);
    }
    if is_question(lower_text) {
        return Some(Domain::Chat);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_verb_outside_question_is_payment() {
        assert!(is_payment_action_intent("철수한테 5만원 송금해줘"));
    }

    #[test]
    fn bare_question_is_not_payment_by_verb_alone() {
        assert!(!is_payment_action_intent("송금이 뭐예요?"));
    }

    #[test]
    fn two_slot_cues_is_payment() {
        assert!(is_payment_action_intent("카드로 5만원 결제할게"));
    }

    #[test]
    fn single_cue_is_not_enough() {
        assert!(!is_payment_action_intent("카드 좋아하세요"));
    }

    #[test]
    fn condition_token_is_medical() {
        assert!(is_medical_action_intent("두통이 심해요"));
    }

    #[test]
    fn informational_question_is_medical() {
        assert!(is_medical_action_intent("감기 뭐예요?"));
    }

    #[test]
    fn plan_token_in_statement_is_planning() {
        assert!(is_planning_action_intent("다음 주 일정 잡아줘"));
    }

    #[test]
    fn plan_token_in_question_is_not_planning() {
        assert!(!is_planning_action_intent("일정이 뭐예요?"));
    }

    #[test]
    fn rule_layer_prefers_payment_signal() {
        assert_eq!(rule_layer("철수한테 10만원 계좌이체 해줘"), Some(Domain::Payment));
    }

    #[test]
    fn rule_layer_returns_none_when_nothing_matches() {
        assert_eq!(rule_layer("안녕하세요"), None);
    }
}
