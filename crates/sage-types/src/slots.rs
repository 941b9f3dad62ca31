//! Per-domain slot structs.
//!
//! Slots are the union of fields collected across turns of a conversation.
//! Merge semantics are monotone: a newer non-empty value wins field-by-field,
//! and a field once set is never cleared by a subsequent turn that leaves it
//! blank (invariant 7 in spec.md §8).

use serde::{Deserialize, Serialize};

/// The payment conversation's transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Purchase,
    Transfer,
}

/// The union of fields collected for a payment conversation.
///
/// `recipient` and `to` are the same field in this model (the duplicated
/// `to`/`recipient` naming in the original source is collapsed per the
/// design note in spec.md §9: always mirror `recipient` into `to`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentSlots {
    pub mode: Option<PaymentMode>,
    pub recipient: Option<String>,
    #[serde(rename = "amountKRW")]
    pub amount_krw: Option<i64>,
    #[serde(rename = "budgetKRW")]
    pub budget_krw: Option<i64>,
    pub method: Option<String>,
    pub item: Option<String>,
    pub model: Option<String>,
    pub merchant: Option<String>,
    pub shipping: Option<String>,
    #[serde(rename = "cardLast4")]
    pub card_last4: Option<String>,
    pub note: Option<String>,
}

/// The minimum viable slot set for a payment send: method, recipient,
/// shipping, and either an exact amount or a budget ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSlot {
    Method,
    Recipient,
    Shipping,
    AmountOrBudget,
}

impl MissingSlot {
    pub fn label(&self) -> &'static str {
        match self {
            MissingSlot::Method => "method",
            MissingSlot::Recipient => "recipient",
            MissingSlot::Shipping => "shipping",
            MissingSlot::AmountOrBudget => "amountKRW",
        }
    }
}

fn merge_opt<T: Clone>(current: &Option<T>, incoming: &Option<T>) -> Option<T> {
    match incoming {
        Some(v) => Some(v.clone()),
        None => current.clone(),
    }
}

fn merge_opt_string(current: &Option<String>, incoming: &Option<String>) -> Option<String> {
    match incoming {
        Some(v) if !v.is_empty() => Some(v.clone()),
        _ => current.clone(),
    }
}

impl PaymentSlots {
    /// Merge `incoming` onto `self`, field-by-field, newer non-empty value
    /// wins. Shipping defaults to `recipient` when omitted by both sides,
    /// per the design note in spec.md §9.
    pub fn merge(&self, incoming: &PaymentSlots) -> PaymentSlots {
        let mut merged = PaymentSlots {
            mode: merge_opt(&self.mode, &incoming.mode),
            recipient: merge_opt_string(&self.recipient, &incoming.recipient),
            amount_krw: merge_opt(&self.amount_krw, &incoming.amount_krw),
            budget_krw: merge_opt(&self.budget_krw, &incoming.budget_krw),
            method: merge_opt_string(&self.method, &incoming.method),
            item: merge_opt_string(&self.item, &incoming.item),
            model: merge_opt_string(&self.model, &incoming.model),
            merchant: merge_opt_string(&self.merchant, &incoming.merchant),
            shipping: merge_opt_string(&self.shipping, &incoming.shipping),
            card_last4: merge_opt_string(&self.card_last4, &incoming.card_last4),
            note: merge_opt_string(&self.note, &incoming.note),
        };

        if merged.shipping.is_none() {
            merged.shipping = merged.recipient.clone();
        }

        merged
    }

    pub fn missing(&self) -> Vec<MissingSlot> {
        let mut missing = Vec::new();
        if self.method.is_none() {
            missing.push(MissingSlot::Method);
        }
        if self.recipient.is_none() {
            missing.push(MissingSlot::Recipient);
        }
        if self.shipping.is_none() {
            missing.push(MissingSlot::Shipping);
        }
        if self.amount_krw.is_none() && self.budget_krw.is_none() {
            missing.push(MissingSlot::AmountOrBudget);
        }
        missing
    }

    pub fn is_empty(&self) -> bool {
        *self == PaymentSlots::default()
    }
}

/// A hint for what the medical extractor should ask about next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicalAwaitHint {
    Symptoms,
    Condition,
}

/// The union of fields collected for a medical (informational) conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalSlots {
    pub condition: Option<String>,
    pub symptoms: Option<String>,
    pub topic: Option<String>,
    pub audience: Option<String>,
    pub duration: Option<String>,
    pub age: Option<String>,
    pub medications: Option<String>,
    #[serde(rename = "await")]
    pub await_hint: Option<MedicalAwaitHint>,
}

impl MedicalSlots {
    pub fn merge(&self, incoming: &MedicalSlots) -> MedicalSlots {
        MedicalSlots {
            condition: merge_opt_string(&self.condition, &incoming.condition),
            symptoms: merge_opt_string(&self.symptoms, &incoming.symptoms),
            topic: merge_opt_string(&self.topic, &incoming.topic),
            audience: merge_opt_string(&self.audience, &incoming.audience),
            duration: merge_opt_string(&self.duration, &incoming.duration),
            age: merge_opt_string(&self.age, &incoming.age),
            medications: merge_opt_string(&self.medications, &incoming.medications),
            await_hint: merge_opt(&self.await_hint, &incoming.await_hint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_monotone() {
        let a = PaymentSlots {
            method: Some("toss".into()),
            ..Default::default()
        };
        let b = PaymentSlots::default();
        let merged = a.merge(&b);
        assert_eq!(merged.method.as_deref(), Some("toss"));
    }

    #[test]
    fn newer_nonempty_value_wins() {
        let a = PaymentSlots {
            method: Some("toss".into()),
            ..Default::default()
        };
        let b = PaymentSlots {
            method: Some("card".into()),
            ..Default::default()
        };
        let merged = a.merge(&b);
        assert_eq!(merged.method.as_deref(), Some("card"));
    }

    #[test]
    fn shipping_defaults_to_recipient() {
        let slots = PaymentSlots {
            recipient: Some("김영희".into()),
            ..Default::default()
        };
        let merged = slots.merge(&PaymentSlots::default());
        assert_eq!(merged.shipping.as_deref(), Some("김영희"));
    }

    #[test]
    fn missing_slots_lists_amount_or_budget_once() {
        let slots = PaymentSlots {
            method: Some("toss".into()),
            recipient: Some("김영희".into()),
            shipping: Some("서울".into()),
            ..Default::default()
        };
        let missing = slots.missing();
        assert_eq!(missing, vec![MissingSlot::AmountOrBudget]);
    }
}
