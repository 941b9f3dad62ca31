//! sage-root - accepts natural-language requests from the façade, routes
//! intent, and forwards signed/HPKE-framed requests to external domain
//! agents.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use dashmap::DashMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sage_config::AgentCatalog;
use sage_didreg::{FileDidResolver, RetryingResolver};
use sage_dispatch::Dispatcher;
use sage_hpke::SessionManager;
use sage_identity::{Did, PeerMap};
use sage_router::{IntentRouter, RouterMode};
use sage_transport::ReplayGuard;

use sage_root::{hpke_keys, router, AppState, REPLAY_WINDOW};

/// SAGE root node.
#[derive(Parser, Debug)]
#[command(name = "sage-root", about = "SAGE root node: intent routing and secure transport to domain agents", version)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "PORT")]
    port: u16,

    /// Host to bind to.
    #[arg(long, default_value = "0.0.0.0", env = "ROOT_HOST")]
    host: String,

    /// Log output shape: pretty (human-readable) or json.
    #[arg(long = "log-format", default_value = "pretty", env = "LOG_FORMAT")]
    log_format: String,

    /// JWK file for this node's RFC 9421 signing identity.
    #[arg(long = "sign-jwk", env = "ROOT_JWK_FILE")]
    sign_jwk: Option<String>,

    /// Explicit DID; derived from the signing key when absent.
    #[arg(long, env = "ROOT_DID")]
    did: Option<String>,

    /// Chain segment used when deriving a DID from the key.
    #[arg(long = "chain", default_value = "sage", env = "SAGE_CHAIN")]
    chain: String,

    /// Local HPKE static keypair file.
    #[arg(long = "kem-jwk", env = "ROOT_KEM_KEYFILE")]
    kem_jwk: Option<String>,

    /// Peer alias / HPKE public key catalog file.
    #[arg(long = "keys", env = "HPKE_KEYS", default_value = "merged_agent_keys.json")]
    keys: String,

    /// Require a valid signature on inbound `/process` calls.
    #[arg(long, default_value_t = false, env = "ROOT_REQUIRE_SIGNED")]
    require: bool,

    /// Intent router mode: rules | hybrid | llm.
    #[arg(long = "intent-mode", default_value = "hybrid", env = "ROOT_INTENT_MODE")]
    intent_mode: String,

    /// LLM provider (see `sage_llm::ProviderKind`).
    #[arg(long = "llm-provider", env = "SAGE_LLM_PROVIDER")]
    llm_provider: Option<String>,

    /// LLM call deadline in seconds.
    #[arg(long = "llm-timeout-seconds", env = "SAGE_LLM_TIMEOUT_SECONDS")]
    llm_timeout_seconds: Option<u64>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_format);

    if let Some(provider) = &args.llm_provider {
        std::env::set_var("SAGE_LLM_PROVIDER", provider);
    }
    if let Some(timeout) = args.llm_timeout_seconds {
        std::env::set_var("SAGE_LLM_TIMEOUT_SECONDS", timeout.to_string());
    }

    print_banner();

    let (local_did, signer) = match &args.sign_jwk {
        Some(path) => match sage_identity::load(args.did.as_deref(), path, &args.chain) {
            Ok((did, signer)) => {
                tracing::info!(did = %did, "loaded signing identity");
                (did, Some(signer))
            }
            Err(e) => {
                tracing::error!("failed to load signing key from {path}: {e}");
                std::process::exit(1);
            }
        },
        None => {
            let did = match &args.did {
                Some(spec) => Did::parse(spec).unwrap_or_else(|e| {
                    tracing::error!("invalid ROOT_DID: {e}");
                    std::process::exit(1);
                }),
                None => Did::new(args.chain.clone(), "0xunsigned"),
            };
            tracing::warn!(did = %did, "no sign-jwk provided, running without an outbound signing identity");
            (did, None)
        }
    };

    let peers = match PeerMap::load(&args.keys) {
        Ok(peers) => peers,
        Err(e) => {
            tracing::warn!("peer map unreadable at {}: {e}, starting with an empty catalog", args.keys);
            PeerMap::default()
        }
    };

    let agent_catalog = AgentCatalog::from_env(&peers);
    for agent in agent_catalog.iter() {
        tracing::info!(name = %agent.name, endpoint = %agent.endpoint, "registered domain agent peer");
    }

    let resolver = RetryingResolver::new(FileDidResolver::load(&args.keys).unwrap_or_default());

    let local_hpke_keypair = args.kem_jwk.as_deref().and_then(|path| match hpke_keys::load_local_keypair(path) {
        Ok(pair) => Some(pair),
        Err(e) => {
            tracing::warn!("local HPKE keypair unreadable at {path}: {e}, HPKE handshakes are unavailable");
            None
        }
    });
    let hpke_keys = hpke_keys::HpkeKeyCatalog::load(&args.keys).unwrap_or_default();

    let mode = match args.intent_mode.as_str() {
        "rules" => RouterMode::Rules,
        "llm" => RouterMode::Llm,
        _ => RouterMode::Hybrid,
    };
    let llm = if mode == RouterMode::Rules { None } else { Some(sage_llm::LLMRouter::from_env()) };
    let intent_router = IntentRouter::new(mode, llm);
    let llm_for_dispatch = if mode == RouterMode::Rules { None } else { Some(sage_llm::LLMRouter::from_env()) };
    let dispatcher = Dispatcher::new(intent_router, llm_for_dispatch);
    let (_payment_sweep, _medical_sweep) = dispatcher.spawn_eviction_sweeps();

    let sage_enabled = std::env::var("ROOT_SAGE_ENABLED").map(|v| v != "false").unwrap_or(true);

    let state = Arc::new(AppState {
        local_did,
        signer,
        peers,
        agent_catalog,
        resolver,
        sessions: SessionManager::new(),
        hpke_keys,
        local_hpke_keypair,
        dispatcher,
        client: reqwest::Client::new(),
        replay_guard: ReplayGuard::new(REPLAY_WINDOW),
        sage_enabled: AtomicBool::new(sage_enabled),
        hpke_enabled: DashMap::new(),
        require_signed: args.require,
        started_at: chrono::Utc::now(),
    });

    let app = router(state);

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("sage-root listening on http://{addr}");
    tracing::info!("process:  POST http://{addr}/process");
    tracing::info!("status:   GET  http://{addr}/status");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(log_format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match log_format {
        "json" => {
            tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

fn print_banner() {
    eprintln!(
        r#"
 ____    _    ____ _____
/ ___|  / \  / ___| ____|
\___ \ / _ \| |  _|  _|
 ___) / ___ \ |_| | |___
|____/_/   \_\____|_____|

sage-root -- trust-bearing multi-agent message router
"#
    );
}
