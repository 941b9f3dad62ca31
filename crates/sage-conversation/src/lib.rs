//! SAGE Conversation - component 4.F: Conversation Store.
//!
//! A process-local `conversation id -> conversation` map behind `dashmap`,
//! evicted on a TTL rather than held open indefinitely (open question
//! resolved in DESIGN.md: no additional size bound).

mod id;
mod store;

pub use id::{derive, ConversationIdInputs};
pub use store::{ConversationStore, MedicalConversation, PaymentConversation, DEFAULT_TTL};
