//! A process-local `conversation id -> conversation` map, per spec.md §4.F.
//! `dashmap` gives concurrent reads/writes without holding a lock across I/O;
//! entries are evicted by a background sweep after a TTL of inactivity
//! rather than by a size bound (see DESIGN.md for the reasoning).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sage_types::slots::{MedicalSlots, PaymentSlots};
use sage_types::stage::Stage;

/// Everything the dispatcher needs to resume a payment thread.
#[derive(Debug, Clone, Default)]
pub struct PaymentConversation {
    pub slots: PaymentSlots,
    pub stage: Stage,
    pub confirm_token: String,
}

/// Medical threads are informational: slots plus whatever the last await
/// hint was, no confirm token.
#[derive(Debug, Clone, Default)]
pub struct MedicalConversation {
    pub slots: MedicalSlots,
    pub stage: Stage,
}

struct Entry<T> {
    value: T,
    last_touched: DateTime<Utc>,
}

/// One store per domain; the dispatcher owns one `ConversationStore<PaymentConversation>`
/// and one `ConversationStore<MedicalConversation>`.
pub struct ConversationStore<T> {
    entries: Arc<DashMap<String, Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> ConversationStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, conversation_id: &str) -> Option<T> {
        self.entries.get(conversation_id).map(|e| e.value.clone())
    }

    pub fn put(&self, conversation_id: impl Into<String>, value: T) {
        self.entries.insert(
            conversation_id.into(),
            Entry {
                value,
                last_touched: Utc::now(),
            },
        );
    }

    pub fn delete(&self, conversation_id: &str) {
        self.entries.remove(conversation_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries untouched for longer than the TTL. Called by the
    /// background sweep task, but exposed directly for tests.
    pub fn evict_stale(&self) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.last_touched < cutoff)
            .map(|e| e.key().clone())
            .collect();
        for key in &stale {
            self.entries.remove(key);
        }
        stale.len()
    }

    /// Spawn the default 30-minute-inactivity sweep (spec.md §4.F), checking
    /// every minute. Returns the task handle so callers can hold/cancel it.
    pub fn spawn_eviction_sweep(self: &Arc<Self>) -> tokio::task::JoinHandle<()>
    where
        T: Send + Sync + 'static,
    {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let evicted = store.evict_stale();
                if evicted > 0 {
                    tracing::debug!(evicted, "evicted stale conversations");
                }
            }
        })
    }
}

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store: ConversationStore<PaymentConversation> = ConversationStore::new(DEFAULT_TTL);
        let mut convo = PaymentConversation::default();
        convo.stage = Stage::Collect;
        store.put("from:user-1", convo.clone());

        let fetched = store.get("from:user-1").unwrap();
        assert_eq!(fetched.stage, Stage::Collect);
    }

    #[test]
    fn delete_removes_entry() {
        let store: ConversationStore<PaymentConversation> = ConversationStore::new(DEFAULT_TTL);
        store.put("id", PaymentConversation::default());
        store.delete("id");
        assert!(store.get("id").is_none());
    }

    #[test]
    fn evict_stale_drops_entries_past_ttl() {
        let store: ConversationStore<PaymentConversation> = ConversationStore::new(Duration::from_secs(0));
        store.put("id", PaymentConversation::default());
        std::thread::sleep(std::time::Duration::from_millis(10));
        let evicted = store.evict_stale();
        assert_eq!(evicted, 1);
        assert!(store.get("id").is_none());
    }
}
