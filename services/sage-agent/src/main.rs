//! sage-agent - a generic external domain-agent peer: the responder side
//! of the signed/HPKE wire protocol between root and its external agents.
//! Actual payment/medical/planning business logic is unspecified once the
//! framed request is delivered; this binary provides the wire contract
//! every concrete domain agent would share.

mod hpke_keys;
mod http;
mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sage_didreg::{FileDidResolver, RetryingResolver};
use sage_hpke::SessionManager;
use sage_identity::Did;
use sage_transport::ReplayGuard;

use state::{AppState, REPLAY_WINDOW};

#[derive(Parser, Debug)]
#[command(name = "sage-agent", about = "Generic SAGE domain-agent peer: wire contract for /process", version)]
struct Args {
    #[arg(long, default_value_t = 8081, env = "PORT")]
    port: u16,

    #[arg(long, default_value = "0.0.0.0", env = "AGENT_HOST")]
    host: String,

    /// Log output shape: pretty (human-readable) or json.
    #[arg(long = "log-format", default_value = "pretty", env = "LOG_FORMAT")]
    log_format: String,

    /// Which domain this instance answers as (payment | medical | planning).
    #[arg(long, default_value = "payment", env = "AGENT_DOMAIN")]
    domain: String,

    #[arg(long = "sign-jwk", env = "AGENT_JWK_FILE")]
    sign_jwk: Option<String>,

    #[arg(long, env = "AGENT_DID")]
    did: Option<String>,

    #[arg(long = "chain", default_value = "sage", env = "SAGE_CHAIN")]
    chain: String,

    /// Local HPKE static keypair file (responder side).
    #[arg(long = "kem-jwk", env = "AGENT_KEM_KEYFILE")]
    kem_jwk: Option<String>,

    /// Peer alias / DID registry / HPKE public key catalog file.
    #[arg(long = "keys", env = "HPKE_KEYS", default_value = "merged_agent_keys.json")]
    keys: String,

    /// Require a valid signature on inbound `/process` calls.
    #[arg(long, default_value_t = false, env = "AGENT_REQUIRE_SIGNED")]
    require: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_format);

    print_banner(&args.domain);

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
                    tracing::error!("invalid AGENT_DID: {e}");
                    std::process::exit(1);
                }),
                None => Did::new(args.chain.clone(), "0xunsigned"),
            };
            tracing::warn!(did = %did, "no sign-jwk provided, running without an outbound signing identity");
            (did, None)
        }
    };

    let resolver = RetryingResolver::new(FileDidResolver::load(&args.keys).unwrap_or_else(|e| {
        tracing::warn!("DID registry unreadable at {}: {e}, starting with an empty registry", args.keys);
        FileDidResolver::default()
    }));

    let local_hpke_keypair = args.kem_jwk.as_deref().and_then(|path| match hpke_keys::load_local_keypair(path) {
        Ok(pair) => Some(pair),
        Err(e) => {
            tracing::warn!("local HPKE keypair unreadable at {path}: {e}, HPKE handshakes are unavailable");
            None
        }
    });
    let hpke_keys = hpke_keys::HpkeKeyCatalog::load(&args.keys).unwrap_or_default();

    let state = Arc::new(AppState {
        local_did,
        signer,
        resolver,
        sessions: SessionManager::new(),
        hpke_keys,
        local_hpke_keypair,
        replay_guard: ReplayGuard::new(REPLAY_WINDOW),
        require_signed: args.require,
        domain: args.domain.clone(),
        started_at: chrono::Utc::now(),
    });

    let app = Router::new()
        .route("/process", post(http::process_handler))
        .route("/status", get(http::status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("sage-agent ({}) listening on http://{addr}", args.domain);
    tracing::info!("process:  POST http://{addr}/process");

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

fn print_banner(domain: &str) {
    eprintln!(
        r#"
 ____    _    ____ _____
/ ___|  / \  / ___| ____|
\___ \ / _ \| |  _|  _|
 ___) / ___ \ |_| | |___
|____/_/   \_\____|_____|

sage-agent ({domain}) -- external domain-agent peer
"#
    );
}
