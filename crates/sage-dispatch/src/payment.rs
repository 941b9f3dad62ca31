//! The payment state machine of spec.md §4.I: Idle -> Collect ->
//! AwaitConfirm -> (Sent | Cancelled).

use tokio_util::sync::CancellationToken;

use sage_conversation::{ConversationStore, PaymentConversation};
use sage_identity::{Did, Signer};
use sage_types::message::AgentMessage;
use sage_types::metadata::{metadata_insert, Metadata};
use sage_types::secure::{SecureMessage, SecureRole};
use sage_types::slots::{MissingSlot, PaymentSlots};
use sage_types::stage::Stage;
use sage_transport::{FramingMode, TransportOutcome};

use crate::error::{DispatchError, DispatchResult};
use crate::token_guard::TokenGuard;

/// Everything needed to actually send the framed payment request to the
/// payment peer once a turn resolves to *yes*. `None` when no peer is
/// configured for this process (e.g. a dry-run / test dispatcher).
pub struct PaymentSendContext<'a> {
    pub client: &'a reqwest::Client,
    pub base_url: &'a str,
    pub local_did: &'a Did,
    pub signer: Option<&'a Signer>,
    pub kid: Option<&'a str>,
    pub sessions: Option<&'a sage_hpke::SessionManager>,
}

fn clarify_question(missing: &[MissingSlot]) -> String {
    let labels: Vec<&str> = missing.iter().map(|m| m.label()).collect();
    format!("다음 정보를 알려주세요: {}", labels.join(", "))
}

fn slots_to_metadata(slots: &PaymentSlots) -> Metadata {
    let mut metadata = Metadata::new();
    if let Some(method) = &slots.method {
        metadata_insert(&mut metadata, "payment.method", method.as_str());
    }
    if let Some(recipient) = &slots.recipient {
        metadata_insert(&mut metadata, "payment.to", recipient.as_str());
    }
    if let Some(amount) = slots.amount_krw {
        metadata_insert(&mut metadata, "payment.amountKRW", amount);
    }
    if let Some(budget) = slots.budget_krw {
        metadata_insert(&mut metadata, "payment.budgetKRW", budget);
    }
    if let Some(item) = &slots.item {
        metadata_insert(&mut metadata, "payment.item", item.as_str());
    }
    if let Some(merchant) = &slots.merchant {
        metadata_insert(&mut metadata, "payment.merchant", merchant.as_str());
    }
    if let Some(shipping) = &slots.shipping {
        metadata_insert(&mut metadata, "payment.shipping", shipping.as_str());
    }
    if let Some(card_last4) = &slots.card_last4 {
        metadata_insert(&mut metadata, "payment.cardLast4", card_last4.as_str());
    }
    metadata
}

async fn send_payment(ctx: &PaymentSendContext<'_>, slots: &PaymentSlots, context_id: Option<String>) -> DispatchResult<()> {
    let outbound = AgentMessage::request(ctx.local_did.to_string(), "payment", "", context_id.clone()).with_metadata(slots_to_metadata(slots));
    let payload = serde_json::to_vec(&outbound).expect("AgentMessage always serializes");
    let secure = SecureMessage::new(ctx.local_did.to_string(), payload, SecureRole::Agent).with_context(context_id, None);

    let mode = if ctx.kid.is_some() { FramingMode::HPKE_DATA } else { FramingMode::SIGNED };
    // Data mode always, never handshake -- the peer's /process response body
    // is opaque to us here; a non-2xx status already surfaced as an error.
    let _: TransportOutcome = sage_transport::send(ctx.client, ctx.base_url, ctx.local_did, ctx.signer, ctx.kid, ctx.sessions, &secure, mode).await?;
    Ok(())
}

async fn advance_collect(
    store: &ConversationStore<PaymentConversation>,
    llm: Option<&sage_llm::LLMRouter>,
    cancel: &CancellationToken,
    conversation_id: &str,
    root_name: &str,
    context_id: Option<String>,
    merged: PaymentSlots,
) -> AgentMessage {
    let missing = merged.missing();
    if !missing.is_empty() {
        store.put(conversation_id, PaymentConversation { slots: merged, stage: Stage::Collect, confirm_token: String::new() });
        AgentMessage::clarify(root_name, "payment", clarify_question(&missing), context_id)
    } else {
        let token = format!("tok_{}", uuid::Uuid::new_v4());
        let prompt = sage_slots::build_confirm_prompt(llm, cancel, &merged).await;
        store.put(conversation_id, PaymentConversation { slots: merged, stage: Stage::AwaitConfirm, confirm_token: token });
        AgentMessage::confirm(root_name, "payment", prompt, context_id)
    }
}

async fn handle_yes(
    store: &ConversationStore<PaymentConversation>,
    token_guard: &TokenGuard,
    conversation_id: &str,
    root_name: &str,
    context_id: Option<String>,
    existing: PaymentConversation,
    send_ctx: Option<&PaymentSendContext<'_>>,
) -> AgentMessage {
    if existing.confirm_token.is_empty() {
        return AgentMessage::error(root_name, "payment", "missing confirm token", context_id);
    }
    if !token_guard.try_claim(&existing.confirm_token) {
        // A prior attempt with this token already succeeded, or is racing
        // this one. Replay its response verbatim (spec.md §7/§9) rather than
        // erroring; if the prior attempt hasn't recorded one yet (still
        // in flight), surface STALE_CONFIRM_TOKEN.
        return token_guard.cached_response(&existing.confirm_token).unwrap_or_else(|| {
            AgentMessage::error(root_name, "payment", DispatchError::StaleConfirmToken.to_string(), context_id)
        });
    }

    let Some(send_ctx) = send_ctx else {
        token_guard.release(&existing.confirm_token);
        return AgentMessage::error(root_name, "payment", "no payment peer configured", context_id);
    };

    match send_payment(send_ctx, &existing.slots, context_id.clone()).await {
        Ok(()) => {
            store.delete(conversation_id);
            let response = AgentMessage::response(root_name, "payment", "결제가 완료되었습니다.", context_id);
            token_guard.record_response(&existing.confirm_token, response.clone());
            response
        }
        Err(err) => {
            // Keep state for retry per spec.md §4.I; release the claim so a
            // retried *yes* with the same token can try again.
            token_guard.release(&existing.confirm_token);
            AgentMessage::error(root_name, "payment", err.to_string(), context_id)
        }
    }
}

/// Run one turn of the payment state machine for `conversation_id`.
#[allow(clippy::too_many_arguments)]
pub async fn handle_turn(
    store: &ConversationStore<PaymentConversation>,
    token_guard: &TokenGuard,
    llm: Option<&sage_llm::LLMRouter>,
    cancel: &CancellationToken,
    conversation_id: &str,
    text: &str,
    root_name: &str,
    context_id: Option<String>,
    send_ctx: Option<&PaymentSendContext<'_>>,
) -> AgentMessage {
    let existing = store.get(conversation_id).unwrap_or_default();

    match existing.stage {
        Stage::Idle | Stage::Sent | Stage::Cancelled => {
            let incoming = sage_slots::extract(llm, cancel, text).await;
            let merged = PaymentSlots::default().merge(&incoming);
            advance_collect(store, llm, cancel, conversation_id, root_name, context_id, merged).await
        }
        Stage::Collect => {
            let incoming = sage_slots::extract(llm, cancel, text).await;
            let merged = existing.slots.merge(&incoming);
            advance_collect(store, llm, cancel, conversation_id, root_name, context_id, merged).await
        }
        Stage::AwaitConfirm => match sage_slots::classify(llm, cancel, text).await {
            sage_slots::YesNo::Yes => handle_yes(store, token_guard, conversation_id, root_name, context_id, existing, send_ctx).await,
            sage_slots::YesNo::No => {
                store.put(conversation_id, PaymentConversation { slots: existing.slots, stage: Stage::Collect, confirm_token: String::new() });
                AgentMessage::clarify(root_name, "payment", "어떤 부분을 변경할까요?", context_id)
            }
            sage_slots::YesNo::Unclear => {
                let prompt = sage_slots::build_confirm_prompt(llm, cancel, &existing.slots).await;
                AgentMessage::confirm(root_name, "payment", prompt, context_id)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store() -> ConversationStore<PaymentConversation> {
        ConversationStore::new(Duration::from_secs(1800))
    }

    #[tokio::test]
    async fn idle_turn_with_all_slots_present_goes_straight_to_confirm() {
        let store = store();
        let guard = TokenGuard::default();
        let cancel = CancellationToken::new();
        let message = handle_turn(&store, &guard, None, &cancel, "c1", "철수한테 카드로 5만원 서울로 보내줘", "sage-root", None, None).await;
        assert_eq!(message.message_type, sage_types::message::MessageType::Confirm);
        let convo = store.get("c1").unwrap();
        assert_eq!(convo.stage, Stage::AwaitConfirm);
        assert!(!convo.confirm_token.is_empty());
    }

    #[tokio::test]
    async fn idle_turn_missing_slots_emits_clarify() {
        let store = store();
        let guard = TokenGuard::default();
        let cancel = CancellationToken::new();
        let message = handle_turn(&store, &guard, None, &cancel, "c2", "결제하고 싶어요", "sage-root", None, None).await;
        assert_eq!(message.message_type, sage_types::message::MessageType::Clarify);
        let convo = store.get("c2").unwrap();
        assert_eq!(convo.stage, Stage::Collect);
    }

    #[tokio::test]
    async fn await_confirm_no_returns_to_collect() {
        let store = store();
        let guard = TokenGuard::default();
        let cancel = CancellationToken::new();
        store.put("c3", PaymentConversation { slots: PaymentSlots::default(), stage: Stage::AwaitConfirm, confirm_token: "tok-1".into() });
        let message = handle_turn(&store, &guard, None, &cancel, "c3", "아니요 취소할게요", "sage-root", None, None).await;
        assert_eq!(message.message_type, sage_types::message::MessageType::Clarify);
        assert_eq!(store.get("c3").unwrap().stage, Stage::Collect);
    }

    #[tokio::test]
    async fn await_confirm_yes_without_peer_errors_but_keeps_state_releasing_token() {
        let store = store();
        let guard = TokenGuard::default();
        let cancel = CancellationToken::new();
        store.put("c4", PaymentConversation { slots: PaymentSlots::default(), stage: Stage::AwaitConfirm, confirm_token: "tok-2".into() });
        let message = handle_turn(&store, &guard, None, &cancel, "c4", "네 진행할게요", "sage-root", None, None).await;
        assert_eq!(message.message_type, sage_types::message::MessageType::Error);
        // No peer configured releases the claim rather than consuming it.
        assert!(guard.try_claim("tok-2"));
    }

    #[tokio::test]
    async fn await_confirm_unclear_reprompts_same_confirmation() {
        let store = store();
        let guard = TokenGuard::default();
        let cancel = CancellationToken::new();
        store.put("c5", PaymentConversation { slots: PaymentSlots::default(), stage: Stage::AwaitConfirm, confirm_token: "tok-3".into() });
        let message = handle_turn(&store, &guard, None, &cancel, "c5", "음 글쎄요", "sage-root", None, None).await;
        assert_eq!(message.message_type, sage_types::message::MessageType::Confirm);
        assert_eq!(store.get("c5").unwrap().stage, Stage::AwaitConfirm);
    }
}
