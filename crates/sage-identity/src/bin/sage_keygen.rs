//! sage-keygen - generate a JWK signing key and print/register its DID.
//!
//! ```bash
//! sage-keygen --alg ed25519 --out root.jwk.json --chain ethereum
//! sage-keygen --alg ecdsa-p256-sha256 --out payment.jwk.json --peer-map merged_agent_keys.json --peer-name payment
//! ```

use std::path::PathBuf;

use base64::Engine;
use clap::{Parser, ValueEnum};
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use k256::ecdsa::SigningKey as K256SigningKey;
use p256::ecdsa::SigningKey as P256SigningKey;
use rand::rngs::OsRng;
use sage_identity::{Did, Signer};
use serde_json::json;

#[derive(Clone, Copy, ValueEnum)]
enum Alg {
    Ed25519,
    EcdsaP256Sha256,
    EcdsaSecp256k1,
}

#[derive(Parser)]
#[command(name = "sage-keygen", about = "Generate a SAGE signing key and DID")]
struct Args {
    /// Key algorithm to generate
    #[arg(long, value_enum, default_value = "ed25519")]
    alg: Alg,

    /// Output JWK file path
    #[arg(long, default_value = "sage.jwk.json")]
    out: PathBuf,

    /// Chain segment of the derived DID (did:sage:<chain>:<address>)
    #[arg(long, default_value = "sage")]
    chain: String,

    /// Optional peer-map file to append {name, did} to
    #[arg(long)]
    peer_map: Option<PathBuf>,

    /// Logical peer name to register in --peer-map (required if --peer-map is set)
    #[arg(long)]
    peer_name: Option<String>,
}

fn main() {
    let args = Args::parse();

    let jwk = match args.alg {
        Alg::Ed25519 => {
            let key = Ed25519SigningKey::generate(&mut OsRng);
            let d = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key.to_bytes());
            json!({"kty": "OKP", "crv": "Ed25519", "d": d})
        }
        Alg::EcdsaP256Sha256 => {
            let key = P256SigningKey::random(&mut OsRng);
            let d = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key.to_bytes());
            json!({"kty": "EC", "crv": "P-256", "d": d})
        }
        Alg::EcdsaSecp256k1 => {
            let key = K256SigningKey::random(&mut OsRng);
            let d = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key.to_bytes());
            json!({"kty": "EC", "crv": "secp256k1", "d": d})
        }
    };

    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("failed to create output directory");
        }
    }
    std::fs::write(&args.out, serde_json::to_string_pretty(&jwk).unwrap()).expect("failed to write key file");

    let signer = Signer::load_jwk(&args.out).expect("generated key file failed to reload");
    let did = Did::new(&args.chain, Did::derive_address(&signer.public_key_bytes()));

    println!("wrote key:  {}", args.out.display());
    println!("derived DID: {}", did);

    if let Some(peer_map_path) = args.peer_map {
        let peer_name = args.peer_name.expect("--peer-name is required with --peer-map");
        let mut records: Vec<serde_json::Value> = if peer_map_path.exists() {
            let contents = std::fs::read_to_string(&peer_map_path).expect("failed to read peer map");
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Vec::new()
        };
        records.retain(|r| r.get("name").and_then(|n| n.as_str()) != Some(peer_name.as_str()));
        records.push(json!({"name": peer_name, "did": did.to_string()}));
        std::fs::write(&peer_map_path, serde_json::to_string_pretty(&records).unwrap()).expect("failed to write peer map");
        println!("registered '{}' in {}", peer_name, peer_map_path.display());
    }
}
