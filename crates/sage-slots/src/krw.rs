//! KRW amount parsing: `만` = 10^4, `억` = 10^8, decimal-with-unit
//! (`1.5억원`), per spec.md §4.H.

use once_cell::sync::Lazy;
use regex::Regex;

static AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:(\d+(?:\.\d+)?)\s*억)?\s*(?:(\d+(?:\.\d+)?)\s*만)?\s*(\d+(?:\.\d+)?)?\s*원").unwrap());

static BUDGET_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(이내|이하|미만|within)").unwrap());

/// Whether `text` frames its amount as a ceiling ("200만 원 이내로") rather
/// than an exact figure, per spec.md §8 Scenario 1 -- a budget phrasing
/// fills `budgetKRW`, not `amountKRW`.
pub fn is_budget_phrasing(text: &str) -> bool {
    BUDGET_CUE.is_match(text)
}

/// Parse the first KRW amount found in `text`, returning the value in won.
/// Returns `None` if no `억`/`만`/plain-digit component precedes a `원`.
pub fn parse_amount_krw(text: &str) -> Option<i64> {
    for cap in AMOUNT.captures_iter(text) {
        let eok = cap.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
        let man = cap.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
        let rem = cap.get(3).and_then(|m| m.as_str().parse::<f64>().ok());
        if eok.is_none() && man.is_none() && rem.is_none() {
            continue;
        }
        let total = eok.unwrap_or(0.0) * 1e8 + man.unwrap_or(0.0) * 1e4 + rem.unwrap_or(0.0);
        if total > 0.0 {
            return Some(total.round() as i64);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_man_suffix() {
        assert_eq!(parse_amount_krw("5만원 보내줘"), Some(50_000));
    }

    #[test]
    fn parses_plain_digits() {
        assert_eq!(parse_amount_krw("30000원만 보내줘"), Some(30_000));
    }

    #[test]
    fn parses_decimal_eok() {
        assert_eq!(parse_amount_krw("1.5억원 송금"), Some(150_000_000));
    }

    #[test]
    fn parses_combined_eok_and_man() {
        assert_eq!(parse_amount_krw("1억 5000만원"), Some(150_000_000));
    }

    #[test]
    fn no_amount_returns_none() {
        assert_eq!(parse_amount_krw("안녕하세요"), None);
    }

    #[test]
    fn budget_phrasing_cue_detected() {
        assert!(is_budget_phrasing("200만 원 이내로 결제해줘"));
        assert!(!is_budget_phrasing("5만원 보내줘"));
    }
}
