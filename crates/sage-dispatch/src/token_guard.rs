//! Confirm-token idempotency, per spec.md §7/§9: a send under token `t`
//! that completes with 2xx records the resulting response under `t` for the
//! dedup window, so a replayed *yes* returns the same body verbatim rather
//! than erroring; sends that fail release the claim without recording one.
//!
//! Same shape as `sage_transport::ReplayGuard`: a dashmap of claimed keys,
//! swept on a TTL, check-and-insert at the point of use.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use sage_types::message::AgentMessage;

struct Claim {
    claimed_at: Instant,
    response: Option<AgentMessage>,
}

pub struct TokenGuard {
    claimed: DashMap<String, Claim>,
    ttl: Duration,
}

impl TokenGuard {
    pub fn new(ttl: Duration) -> Self {
        Self { claimed: DashMap::new(), ttl }
    }

    /// Atomically claim `token` for a send attempt. Returns `false` if it's
    /// already claimed (a prior attempt already succeeded, or is racing
    /// this one) -- the caller should then use [`Self::cached_response`] to
    /// replay the earlier result.
    pub fn try_claim(&self, token: &str) -> bool {
        self.evict_stale();
        match self.claimed.entry(token.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(Claim { claimed_at: Instant::now(), response: None });
                true
            }
        }
    }

    /// Record the successful response for a claimed token, so a duplicate
    /// `yes` racing or replaying the same token gets the same body back.
    pub fn record_response(&self, token: &str, response: AgentMessage) {
        if let Some(mut claim) = self.claimed.get_mut(token) {
            claim.response = Some(response);
        }
    }

    /// The response recorded for an already-claimed token, if the first
    /// attempt has completed successfully.
    pub fn cached_response(&self, token: &str) -> Option<AgentMessage> {
        self.claimed.get(token).and_then(|claim| claim.response.clone())
    }

    /// Release a claim after a failed send, so the caller can retry the
    /// same token.
    pub fn release(&self, token: &str) {
        self.claimed.remove(token);
    }

    fn evict_stale(&self) {
        let ttl = self.ttl;
        self.claimed.retain(|_, claim| claim.claimed_at.elapsed() < ttl);
    }
}

impl Default for TokenGuard {
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_succeeds_second_is_rejected() {
        let guard = TokenGuard::new(Duration::from_secs(60));
        assert!(guard.try_claim("tok-1"));
        assert!(!guard.try_claim("tok-1"));
    }

    #[test]
    fn release_allows_reclaim() {
        let guard = TokenGuard::new(Duration::from_secs(60));
        assert!(guard.try_claim("tok-1"));
        guard.release("tok-1");
        assert!(guard.try_claim("tok-1"));
    }
}
