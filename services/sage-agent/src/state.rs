use std::time::Duration;

use chrono::{DateTime, Utc};

use sage_didreg::{FileDidResolver, RetryingResolver};
use sage_hpke::{PrivateKey as HpkePrivateKey, PublicKey as HpkePublicKey, SessionManager};
use sage_identity::{Did, Signer};
use sage_transport::ReplayGuard;

use crate::hpke_keys::HpkeKeyCatalog;

/// Everything a domain agent's `/process` handler needs. One instance,
/// shared behind `Arc` - mirrors `sage-root`'s `AppState`, minus the
/// intent-routing and conversation machinery a generic peer has no use for.
pub struct AppState {
    pub local_did: Did,
    pub signer: Option<Signer>,
    pub resolver: RetryingResolver<FileDidResolver>,
    pub sessions: SessionManager,
    pub hpke_keys: HpkeKeyCatalog,
    pub local_hpke_keypair: Option<(HpkePrivateKey, HpkePublicKey)>,
    pub replay_guard: ReplayGuard,
    pub require_signed: bool,
    pub domain: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn status_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "did": self.local_did.to_string(),
            "domain": self.domain,
            "requireSigned": self.require_signed,
            "uptimeSeconds": (Utc::now() - self.started_at).num_seconds(),
        })
    }
}

pub const REPLAY_WINDOW: Duration = Duration::from_secs(300);
