use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use sage_config::AgentCatalog;
use sage_didreg::{FileDidResolver, RetryingResolver};
use sage_dispatch::Dispatcher;
use sage_hpke::{PrivateKey as HpkePrivateKey, PublicKey as HpkePublicKey, SessionManager};
use sage_identity::{Did, PeerMap, Signer};
use sage_transport::ReplayGuard;

use crate::hpke_keys::HpkeKeyCatalog;

/// Everything a `/process` turn or an operational endpoint needs, shared
/// behind `Arc` across the handlers.
pub struct AppState {
    pub local_did: Did,
    pub signer: Option<Signer>,
    pub peers: PeerMap,
    pub agent_catalog: AgentCatalog,
    pub resolver: RetryingResolver<FileDidResolver>,
    pub sessions: SessionManager,
    pub hpke_keys: HpkeKeyCatalog,
    pub local_hpke_keypair: Option<(HpkePrivateKey, HpkePublicKey)>,
    pub dispatcher: Dispatcher,
    pub client: reqwest::Client,
    pub replay_guard: ReplayGuard,
    pub sage_enabled: AtomicBool,
    pub hpke_enabled: DashMap<String, bool>,
    pub require_signed: bool,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn status_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "did": self.local_did.to_string(),
            "sageEnabled": self.sage_enabled.load(Ordering::Relaxed),
            "requireSigned": self.require_signed,
            "uptimeSeconds": (Utc::now() - self.started_at).num_seconds(),
            "payment": self.payment_store_len(),
            "medical": self.medical_store_len(),
        })
    }

    fn payment_store_len(&self) -> usize {
        self.dispatcher.payment_store().len()
    }

    fn medical_store_len(&self) -> usize {
        self.dispatcher.medical_store().len()
    }

    pub fn hpke_enabled_for(&self, target: &str) -> bool {
        self.hpke_enabled.get(target).map(|v| *v).unwrap_or(false)
    }
}

pub const REPLAY_WINDOW: Duration = Duration::from_secs(300);
