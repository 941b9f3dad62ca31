//! Regex-rule fallback for payment slot extraction, used when the LLM is
//! unavailable or its output fails to parse (spec.md §4.H step 2).

use once_cell::sync::Lazy;
use regex::Regex;

use sage_types::slots::PaymentMode;

static RECIPIENT_KO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S+?)(?:한테|에게)").unwrap());
static RECIPIENT_EN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bto\s+([A-Za-z][\w.-]*)").unwrap());

static METHOD_CUES: &[(&str, &str)] = &[
    ("카카오페이", "카카오페이"),
    ("네이버페이", "네이버페이"),
    ("토스페이", "토스페이"),
    ("삼성페이", "삼성페이"),
    ("페이팔", "페이팔"),
    ("paypal", "페이팔"),
    ("계좌이체", "계좌이체"),
    ("계좌", "계좌이체"),
    ("현금", "현금"),
    ("신용카드", "카드"),
    ("체크카드", "카드"),
    ("카드", "카드"),
    ("card", "카드"),
];

static MERCHANT_WHITELIST: &[&str] = &["쿠팡", "무신사", "29cm", "마켓컬리", "지마켓", "11번가", "아마존", "amazon", "coupang", "musinsa"];

static SHIPPING_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S+?)(?:로|으로)\s*(?:배송|보내|발송)").unwrap());

static QUOTED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new("[\"'\u{201c}\u{2018}]([^\"'\u{201d}\u{2019}]+)[\"'\u{201d}\u{2019}]").unwrap());
static ACCUSATIVE_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S+?)(?:을|를)\s*(?:주문|구매|결제)").unwrap());
static MODEL_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Za-z]+\s?\d+[A-Za-z0-9]*)\b").unwrap());

static CARD_LAST4: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:카드\s*(?:끝)?\s*(?:번호)?\s*)(\d{4})\s*$|(?:ending\s+in\s+)(\d{4})").unwrap());

static TRANSFER_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(송금|이체|transfer)").unwrap());
static PURCHASE_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(구매|주문|결제|purchase|order|buy)").unwrap());

pub fn extract_recipient(text: &str) -> Option<String> {
    if let Some(cap) = RECIPIENT_KO.captures(text) {
        return Some(cap[1].to_string());
    }
    if let Some(cap) = RECIPIENT_EN.captures(text) {
        return Some(cap[1].to_string());
    }
    None
}

pub fn extract_method(text: &str) -> Option<String> {
    for (cue, label) in METHOD_CUES {
        if text.contains(cue) {
            return Some((*label).to_string());
        }
    }
    None
}

pub fn extract_merchant(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    MERCHANT_WHITELIST.iter().find(|m| lower.contains(&m.to_lowercase())).map(|m| m.to_string())
}

pub fn extract_shipping(text: &str) -> Option<String> {
    SHIPPING_HINT.captures(text).map(|cap| cap[1].to_string())
}

pub fn extract_item(text: &str) -> Option<String> {
    if let Some(cap) = QUOTED_ITEM.captures(text) {
        return Some(cap[1].trim().to_string());
    }
    ACCUSATIVE_ITEM.captures(text).map(|cap| cap[1].to_string())
}

pub fn extract_model(text: &str) -> Option<String> {
    MODEL_CUE.captures(text).map(|cap| cap[1].replace(' ', ""))
}

pub fn extract_card_last4(text: &str) -> Option<String> {
    CARD_LAST4.captures(text).and_then(|cap| cap.get(1).or_else(|| cap.get(2))).map(|m| m.as_str().to_string())
}

pub fn extract_mode(text: &str) -> Option<PaymentMode> {
    if TRANSFER_CUE.is_match(text) {
        return Some(PaymentMode::Transfer);
    }
    if PURCHASE_CUE.is_match(text) {
        return Some(PaymentMode::Purchase);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_from_korean_particle() {
        assert_eq!(extract_recipient("철수한테 보내줘"), Some("철수".to_string()));
    }

    #[test]
    fn recipient_from_english_to() {
        assert_eq!(extract_recipient("send it to James please"), Some("James".to_string()));
    }

    #[test]
    fn method_matches_specific_wallet_before_generic_card() {
        assert_eq!(extract_method("카카오페이로 결제할게"), Some("카카오페이".to_string()));
    }

    #[test]
    fn merchant_whitelist_hit() {
        assert_eq!(extract_merchant("쿠팡에서 주문했어"), Some("쿠팡".to_string()));
    }

    #[test]
    fn item_from_quotes() {
        assert_eq!(extract_item("\"무선 키보드\" 주문해줘"), Some("무선 키보드".to_string()));
    }

    #[test]
    fn item_from_accusative_pattern() {
        assert_eq!(extract_item("키보드를 주문해줘"), Some("키보드".to_string()));
    }

    #[test]
    fn model_cue_strips_internal_space() {
        assert_eq!(extract_model("iphone 15 사줘"), Some("iphone15".to_string()));
    }

    #[test]
    fn mode_prefers_transfer_cue() {
        assert_eq!(extract_mode("철수한테 송금해줘"), Some(PaymentMode::Transfer));
    }
}
