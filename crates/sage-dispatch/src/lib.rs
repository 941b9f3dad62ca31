//! SAGE Dispatch - component 4.I: Dispatcher.
//!
//! Orchestrates G (intent router) -> H (slot extractor) -> F (conversation
//! store), and calls into `sage-transport` (D) for the outbound send on a
//! payment *yes*. Medical gets the reduced two-state form spec.md §4.I
//! describes; planning has no slot model in the data model (spec.md §3
//! defines payment and medical conversations only) so it's handled as a
//! single chat-style reply -- noted as an open question decision in
//! DESIGN.md.

mod error;
mod medical;
mod payment;
mod token_guard;

pub use error::{DispatchError, DispatchResult};
pub use medical::MedicalSendContext;
pub use payment::PaymentSendContext;
pub use token_guard::TokenGuard;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use sage_conversation::{ConversationStore, MedicalConversation, PaymentConversation, DEFAULT_TTL};
use sage_router::{Domain, IntentRouter};
use sage_types::message::AgentMessage;
use sage_types::stage::Stage;

pub struct Dispatcher {
    router: IntentRouter,
    llm: Option<sage_llm::LLMRouter>,
    payment_store: Arc<ConversationStore<PaymentConversation>>,
    medical_store: Arc<ConversationStore<MedicalConversation>>,
    token_guard: TokenGuard,
}

impl Dispatcher {
    pub fn new(router: IntentRouter, llm: Option<sage_llm::LLMRouter>) -> Self {
        Self::with_ttl(router, llm, DEFAULT_TTL)
    }

    pub fn with_ttl(router: IntentRouter, llm: Option<sage_llm::LLMRouter>, ttl: Duration) -> Self {
        Self {
            router,
            llm,
            payment_store: Arc::new(ConversationStore::new(ttl)),
            medical_store: Arc::new(ConversationStore::new(ttl)),
            token_guard: TokenGuard::new(ttl),
        }
    }

    /// Spawn the background eviction sweeps for both conversation stores.
    /// Returns the join handles so callers can hold or abort them.
    pub fn spawn_eviction_sweeps(&self) -> (tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>) {
        (self.payment_store.spawn_eviction_sweep(), self.medical_store.spawn_eviction_sweep())
    }

    pub fn payment_store(&self) -> &Arc<ConversationStore<PaymentConversation>> {
        &self.payment_store
    }

    pub fn medical_store(&self) -> &Arc<ConversationStore<MedicalConversation>> {
        &self.medical_store
    }

    /// Run one full turn: classify the domain, then hand off to the
    /// relevant state machine.
    #[allow(clippy::too_many_arguments)]
    pub async fn dispatch(
        &self,
        message: &AgentMessage,
        conversation_id: &str,
        lang_header: Option<&str>,
        root_name: &str,
        payment_send_ctx: Option<&PaymentSendContext<'_>>,
        medical_send_ctx: Option<&MedicalSendContext<'_>>,
        cancel: &CancellationToken,
    ) -> AgentMessage {
        let metadata_lang = message.metadata.get("lang").and_then(|v| v.as_str());
        let existing_payment = self.payment_store.get(conversation_id);
        let stage = existing_payment.as_ref().map(|c| c.stage).unwrap_or(Stage::Idle);
        let payment_non_empty = existing_payment.as_ref().map(|c| !c.slots.is_empty()).unwrap_or(false);

        let route = self.router.route(&message.content, stage, payment_non_empty, lang_header, metadata_lang, cancel).await;

        match route.domain {
            Domain::Payment => payment::handle_turn(&self.payment_store, &self.token_guard, self.llm.as_ref(), cancel, conversation_id, &message.content, root_name, message.context_id.clone(), payment_send_ctx).await,
            Domain::Medical => medical::handle_turn(&self.medical_store, self.llm.as_ref(), cancel, conversation_id, &message.content, root_name, message.context_id.clone(), medical_send_ctx).await,
            Domain::Planning => AgentMessage::response(root_name, "planning", "일정 관리 기능은 준비 중입니다.", message.context_id.clone()),
            Domain::Chat => AgentMessage::response(root_name, "chat", "무엇을 도와드릴까요?", message.context_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_router::RouterMode;

    #[tokio::test]
    async fn plain_greeting_routes_to_chat() {
        let dispatcher = Dispatcher::new(IntentRouter::new(RouterMode::Rules, None), None);
        let cancel = CancellationToken::new();
        let message = AgentMessage::request("user-1", "sage-root", "안녕하세요", None);
        let response = dispatcher.dispatch(&message, "from:user-1", None, "sage-root", None, None, &cancel).await;
        assert_eq!(response.destination, "chat");
    }

    #[tokio::test]
    async fn payment_action_routes_through_to_clarify_or_confirm() {
        let dispatcher = Dispatcher::new(IntentRouter::new(RouterMode::Rules, None), None);
        let cancel = CancellationToken::new();
        let message = AgentMessage::request("user-1", "sage-root", "철수한테 카드로 5만원 서울로 보내줘", None);
        let response = dispatcher.dispatch(&message, "from:user-1", None, "sage-root", None, None, &cancel).await;
        assert_eq!(response.destination, "payment");
        assert_eq!(response.message_type, sage_types::message::MessageType::Confirm);
    }
}
