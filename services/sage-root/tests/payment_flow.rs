//! End-to-end coverage of two of the scenarios a deployment actually hits
//! in practice: a payment turn that runs collect -> confirm -> send, and a
//! request rejected for asking for HPKE framing without SAGE signing.
//! Drives `sage_root::router()` directly via `tower::ServiceExt::oneshot`,
//! so no TCP listener of this process's own is needed; the payment peer
//! itself is a tiny in-process axum double on an ephemeral port.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::Router;
use base64::Engine;
use dashmap::DashMap;
use tower::ServiceExt;

use sage_config::{AgentCatalog, AgentRecord};
use sage_didreg::{FileDidResolver, RetryingResolver};
use sage_dispatch::Dispatcher;
use sage_hpke::SessionManager;
use sage_identity::Did;
use sage_router::{IntentRouter, RouterMode};
use sage_transport::ReplayGuard;
use sage_types::message::{AgentMessage, MessageType};

use sage_root::{router, AppState, REPLAY_WINDOW};

/// Writes a throwaway Ed25519 JWK file and loads it the way `sage-sigs`'s
/// own tests do, giving the node a real signing identity without touching
/// any file the workspace ships.
fn test_signer() -> (Did, sage_identity::Signer) {
    let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    let d = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(signing_key.to_bytes());
    let jwk = serde_json::json!({"kty": "OKP", "crv": "Ed25519", "d": d});

    let path = std::env::temp_dir().join(format!("sage-root-test-signer-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, jwk.to_string()).unwrap();
    let result = sage_identity::load(None, &path, "sage").unwrap();
    std::fs::remove_file(&path).ok();
    result
}

/// A trivial stand-in for a payment peer's `/process`: accepts anything and
/// reports 200, counting how many requests actually arrived.
async fn spawn_payment_double() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counted = hits.clone();

    let app = Router::new().route(
        "/process",
        post(move |_body: axum::body::Bytes| {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                axum::Json(serde_json::json!({"success": true}))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), hits)
}

async fn build_state(payment_url: &str) -> Arc<AppState> {
    let (local_did, signer) = test_signer();
    let payment_did = Did::new("sage", "0xpaymentpeer");

    let agent_catalog = AgentCatalog::from_records(vec![AgentRecord {
        name: "payment".to_string(),
        did: payment_did,
        endpoint: payment_url.to_string(),
        capabilities: vec![],
    }]);

    let resolver = RetryingResolver::new(FileDidResolver::default());
    let dispatcher = Dispatcher::new(IntentRouter::new(RouterMode::Rules, None), None);

    Arc::new(AppState {
        local_did,
        signer: Some(signer),
        peers: sage_identity::PeerMap::default(),
        agent_catalog,
        resolver,
        sessions: SessionManager::new(),
        hpke_keys: sage_root::hpke_keys::HpkeKeyCatalog::default(),
        local_hpke_keypair: None,
        dispatcher,
        client: reqwest::Client::new(),
        replay_guard: ReplayGuard::new(REPLAY_WINDOW),
        sage_enabled: AtomicBool::new(true),
        hpke_enabled: DashMap::new(),
        require_signed: false,
        started_at: chrono::Utc::now(),
    })
}

async fn post_process(app: &Router, message: &AgentMessage, extra_headers: &[(&str, &str)]) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("POST").uri("/process").header("content-type", "application/json");
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(serde_json::to_vec(message).unwrap())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

#[tokio::test]
async fn payment_turn_collects_then_sends_on_confirmation() {
    let (payment_url, hits) = spawn_payment_double().await;
    let state = build_state(&payment_url).await;
    let app = router(state);

    let ask = AgentMessage::request("test-user", "sage-root", "철수한테 카드로 5만원 서울로 보내줘", None);
    let (status, body) = post_process(&app, &ask, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"].as_str().unwrap(), "confirm");

    let confirm = AgentMessage::request("test-user", "sage-root", "네 맞아요", None);
    let (status, body) = post_process(&app, &confirm, &[]).await;
    assert_eq!(status, StatusCode::OK);
    let message_type: MessageType = serde_json::from_value(body["type"].clone()).unwrap();
    assert_eq!(message_type, MessageType::Response);
    assert_eq!(body["content"].as_str().unwrap(), "결제가 완료되었습니다.");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hpke_without_sage_is_rejected() {
    let (payment_url, _hits) = spawn_payment_double().await;
    let state = build_state(&payment_url).await;
    let app = router(state);

    let message = AgentMessage::request("test-user", "sage-root", "안녕하세요", None);
    let (status, body) = post_process(&app, &message, &[("x-sage-enabled", "false"), ("x-hpke-enabled", "true")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"].as_str().unwrap(), "HPKE_WITHOUT_SAGE");
}
