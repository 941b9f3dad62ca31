//! The reduced two-state form for medical turns, per spec.md §4.I: collect,
//! then a single-shot call with no explicit confirmation step (medical is
//! informational, not transactional).

use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use sage_conversation::{ConversationStore, MedicalConversation};
use sage_identity::{Did, Signer};
use sage_types::message::AgentMessage;
use sage_types::metadata::{metadata_insert, Metadata};
use sage_types::secure::{SecureMessage, SecureRole};
use sage_types::slots::{MedicalAwaitHint, MedicalSlots};
use sage_types::stage::Stage;
use sage_transport::{FramingMode, TransportOutcome};

use crate::error::DispatchResult;

static CONDITION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(당뇨병|당뇨|고혈압|저혈압|감기|두통|몸살|알레르기|비염|천식|관절염|fever|headache|cold\b|flu\b|diabetes|hypertension)").unwrap());
static SYMPTOM_PHRASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S+(?:이|가)?\s*아파|\S+(?:이|가)?\s*아픈|열나\S*|기침\S*)").unwrap());
static TOPIC_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(식단\s*관리|식이요법|예방법|치료법|관리\s*방법|부작용|복용법|처방)").unwrap());
static DURATION_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\s*(?:일|주|개월|달)째|\d+\s*(?:일|주|개월|년))").unwrap());
static AGE_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\s*세|\d+\s*살|신생아|영유아|소아|청소년|성인|노인)").unwrap());
static AUDIENCE_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(임산부|수유부|소아|영유아|노인|당뇨\s*환자|고혈압\s*환자)").unwrap());

/// Not medical advice, per spec.md §8 Scenario 6 -- attached to every
/// medical response regardless of whether the answer came from the local
/// LLM or an upstream peer.
const DISCLAIMER: &str = "※ 본 답변은 의료 자문이 아닌 참고용 정보입니다. 증상이 지속되면 전문의와 상담하세요.";

/// Everything needed to forward a completed medical turn to the external
/// medical peer. `None` when `MEDICAL_EXTERNAL_URL` isn't configured, in
/// which case the answer comes from the local LLM instead.
pub struct MedicalSendContext<'a> {
    pub client: &'a reqwest::Client,
    pub base_url: &'a str,
    pub local_did: &'a Did,
    pub signer: Option<&'a Signer>,
    pub kid: Option<&'a str>,
    pub sessions: Option<&'a sage_hpke::SessionManager>,
}

fn missing_field(slots: &MedicalSlots) -> Option<MedicalAwaitHint> {
    if slots.condition.is_none() && slots.symptoms.is_none() {
        Some(MedicalAwaitHint::Symptoms)
    } else {
        None
    }
}

/// Extract free-text medical fields with cue regexes mirroring the way
/// `sage-slots`' payment extractor pulls method/merchant/shipping cues out
/// of free text, generalized to the medical slot shape.
fn extract_medical(text: &str) -> MedicalSlots {
    MedicalSlots {
        condition: CONDITION_TOKEN.find(text).map(|m| m.as_str().to_string()),
        symptoms: SYMPTOM_PHRASE.find(text).map(|m| m.as_str().to_string()),
        topic: TOPIC_CUE.find(text).map(|m| m.as_str().to_string()),
        audience: AUDIENCE_CUE.find(text).map(|m| m.as_str().to_string()),
        duration: DURATION_CUE.find(text).map(|m| m.as_str().to_string()),
        age: AGE_CUE.find(text).map(|m| m.as_str().to_string()),
        medications: None,
        await_hint: None,
    }
}

fn slots_to_metadata(slots: &MedicalSlots) -> Metadata {
    let mut metadata = Metadata::new();
    if let Some(condition) = &slots.condition {
        metadata_insert(&mut metadata, "medical.condition", condition.as_str());
    }
    if let Some(symptoms) = &slots.symptoms {
        metadata_insert(&mut metadata, "medical.symptoms", symptoms.as_str());
    }
    if let Some(topic) = &slots.topic {
        metadata_insert(&mut metadata, "medical.topic", topic.as_str());
    }
    if let Some(audience) = &slots.audience {
        metadata_insert(&mut metadata, "medical.audience", audience.as_str());
    }
    if let Some(duration) = &slots.duration {
        metadata_insert(&mut metadata, "medical.duration", duration.as_str());
    }
    if let Some(age) = &slots.age {
        metadata_insert(&mut metadata, "medical.age", age.as_str());
    }
    metadata
}

/// Truncate an LLM answer to at most `max_lines` non-empty lines, leaving
/// room for the disclaimer line spec.md §8 Scenario 6 caps at five total.
fn truncate_lines(text: &str, max_lines: usize) -> String {
    text.lines().filter(|l| !l.trim().is_empty()).take(max_lines).collect::<Vec<_>>().join("\n")
}

async fn local_answer(llm: Option<&sage_llm::LLMRouter>, cancel: &CancellationToken, slots: &MedicalSlots) -> String {
    let topic = slots.topic.as_deref().or(slots.condition.as_deref()).unwrap_or("증상");
    match llm {
        Some(router) => {
            let system = "당신은 의료 정보를 요약하는 도우미입니다. 진단이나 처방 없이, 일반적인 참고 정보만 4줄 이내로 답하세요.";
            let user = format!("{}에 대해 알려주세요.", topic);
            match sage_llm::chat(router, cancel, system, &user).await {
                Ok(answer) => truncate_lines(&answer, 4),
                Err(_) => format!("{} 관련 정보를 지금은 안내해드리기 어렵습니다.", topic),
            }
        }
        None => format!("{} 관련 일반 정보입니다. 구체적인 진단은 의료진과 상담하세요.", topic),
    }
}

async fn send_to_peer(ctx: &MedicalSendContext<'_>, slots: &MedicalSlots, context_id: Option<String>) -> DispatchResult<String> {
    let outbound = AgentMessage::request(ctx.local_did.to_string(), "medical", "", context_id.clone()).with_metadata(slots_to_metadata(slots));
    let payload = serde_json::to_vec(&outbound).expect("AgentMessage always serializes");
    let secure = SecureMessage::new(ctx.local_did.to_string(), payload, SecureRole::Agent).with_context(context_id, None);

    let mode = if ctx.kid.is_some() { FramingMode::HPKE_DATA } else { FramingMode::SIGNED };
    let outcome: TransportOutcome = sage_transport::send(ctx.client, ctx.base_url, ctx.local_did, ctx.signer, ctx.kid, ctx.sessions, &secure, mode).await?;

    let content = match outcome {
        TransportOutcome::Data(bytes) => serde_json::from_slice::<AgentMessage>(&bytes).ok().map(|m| m.content),
        TransportOutcome::Handshake(_) => None,
    };
    Ok(content.unwrap_or_else(|| "관련 정보를 안내해드릴게요.".to_string()))
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_turn(
    store: &ConversationStore<MedicalConversation>,
    llm: Option<&sage_llm::LLMRouter>,
    cancel: &CancellationToken,
    conversation_id: &str,
    text: &str,
    root_name: &str,
    context_id: Option<String>,
    send_ctx: Option<&MedicalSendContext<'_>>,
) -> AgentMessage {
    let existing = store.get(conversation_id).unwrap_or_default();
    let incoming = extract_medical(text);
    let merged = existing.slots.merge(&incoming);

    match missing_field(&merged) {
        Some(hint) => {
            store.put(conversation_id, MedicalConversation { slots: merged, stage: Stage::Collect });
            let question = match hint {
                MedicalAwaitHint::Symptoms => "어떤 증상이 있으신가요?",
                MedicalAwaitHint::Condition => "어떤 질환에 대해 알고 싶으신가요?",
            };
            AgentMessage::clarify(root_name, "medical", question, context_id)
        }
        None => {
            // Single-shot call: the conversation is done after one response,
            // whether or not this turn started mid-collection.
            store.delete(conversation_id);
            let answer = match send_ctx {
                Some(ctx) => match send_to_peer(ctx, &merged, context_id.clone()).await {
                    Ok(content) => content,
                    Err(err) => return AgentMessage::error(root_name, "medical", err.to_string(), context_id),
                },
                None => local_answer(llm, cancel, &merged).await,
            };
            let content = format!("{answer}\n\n{DISCLAIMER}");
            AgentMessage::response(root_name, "medical", content, context_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store() -> ConversationStore<MedicalConversation> {
        ConversationStore::new(Duration::from_secs(1800))
    }

    #[tokio::test]
    async fn condition_token_present_completes_single_shot() {
        let store = store();
        let cancel = CancellationToken::new();
        let message = handle_turn(&store, None, &cancel, "m1", "두통이 심해요", "sage-root", None, None).await;
        assert_eq!(message.message_type, sage_types::message::MessageType::Response);
        assert!(message.content.contains("의료 자문이 아닌"));
        assert!(store.get("m1").is_none());
    }

    #[tokio::test]
    async fn diabetes_condition_token_is_recognized() {
        let store = store();
        let cancel = CancellationToken::new();
        let message = handle_turn(&store, None, &cancel, "m3", "당뇨병 식단 관리 방법 알려줘", "sage-root", None, None).await;
        assert_eq!(message.message_type, sage_types::message::MessageType::Response);
        assert!(store.get("m3").is_none());
    }

    #[tokio::test]
    async fn no_condition_token_asks_for_symptoms() {
        let store = store();
        let cancel = CancellationToken::new();
        let message = handle_turn(&store, None, &cancel, "m2", "안녕하세요", "sage-root", None, None).await;
        assert_eq!(message.message_type, sage_types::message::MessageType::Clarify);
        assert_eq!(store.get("m2").unwrap().stage, Stage::Collect);
    }

    #[test]
    fn extract_medical_fills_topic_duration_and_age() {
        let slots = extract_medical("당뇨병 식단 관리 방법 알려줘, 70세 기준으로");
        assert_eq!(slots.condition.as_deref(), Some("당뇨병"));
        assert_eq!(slots.topic.as_deref(), Some("식단 관리"));
        assert_eq!(slots.age.as_deref(), Some("70세"));
    }
}
