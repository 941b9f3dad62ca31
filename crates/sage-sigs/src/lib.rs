//! SAGE Sigs - component 4.B: the RFC 9421 signature codec.
//!
//! Signs a fixed set of HTTP components (method, path, content-type, date,
//! and the `X-SAGE-DID` header) and emits/verifies the `Signature-Input` /
//! `Signature` header pair over an asymmetric, component-based signature
//! base.

mod error;

pub use error::{SigError, SigResult};

use std::collections::BTreeMap;

use base64::Engine;
use sage_identity::{verify as identity_verify, KeyAlgorithm, Signer};

/// The fixed set of components covered by every SAGE signature, in order.
pub const COVERED_COMPONENTS: [&str; 5] = ["@method", "@path", "content-type", "date", "x-sage-did"];

/// The request-shaped data needed to build or verify a signature base. Kept
/// independent of any particular HTTP crate's request type so both the
/// outbound client (`reqwest`) and the inbound server (`axum`) can build one.
#[derive(Debug, Clone)]
pub struct SignableRequest {
    pub method: String,
    pub path: String,
    pub content_type: String,
    pub date: String,
    pub sage_did: String,
}

impl SignableRequest {
    fn component_value(&self, name: &str) -> SigResult<String> {
        match name {
            "@method" => Ok(self.method.to_uppercase()),
            "@path" => Ok(self.path.clone()),
            "content-type" => Ok(self.content_type.clone()),
            "date" => Ok(self.date.clone()),
            "x-sage-did" => Ok(self.sage_did.clone()),
            other => Err(SigError::UnknownComponent(other.to_string())),
        }
    }
}

/// The parsed `Signature-Input` parameters for one label.
#[derive(Debug, Clone)]
pub struct SignatureParams {
    pub label: String,
    pub components: Vec<String>,
    pub key_id: String,
    pub alg: String,
    pub created: i64,
}

impl SignatureParams {
    fn params_line(&self) -> String {
        let components = self
            .components
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "\"@signature-params\": ({});created={};keyid=\"{}\";alg=\"{}\"",
            components, self.created, self.key_id, self.alg
        )
    }

    /// Render the `Signature-Input` header value for this label.
    pub fn to_header_value(&self) -> String {
        let components = self
            .components
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "{}=({});created={};keyid=\"{}\";alg=\"{}\"",
            self.label, components, self.created, self.key_id, self.alg
        )
    }
}

/// Build the RFC 9421 signature base: one `"name": value` line per covered
/// component, terminated by the signature-params line.
fn signature_base(request: &SignableRequest, params: &SignatureParams) -> SigResult<String> {
    let mut lines = Vec::with_capacity(params.components.len() + 1);
    for component in &params.components {
        let value = request.component_value(component)?;
        lines.push(format!("\"{}\": {}", component, value));
    }
    lines.push(params.params_line());
    Ok(lines.join("\n"))
}

/// Sign a request, returning the `(Signature-Input, Signature)` header
/// values for label `sig1`.
pub fn sign(signer: &Signer, did_header: &str, request: &SignableRequest, created: i64) -> SigResult<(String, String)> {
    let params = SignatureParams {
        label: "sig1".to_string(),
        components: COVERED_COMPONENTS.iter().map(|s| s.to_string()).collect(),
        key_id: did_header.to_string(),
        alg: signer.algorithm().wire_name().to_string(),
        created,
    };

    let mut req = request.clone();
    req.sage_did = did_header.to_string();
    let base = signature_base(&req, &params)?;
    let signature = signer.sign(base.as_bytes());
    let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature);

    let signature_input = params.to_header_value();
    let signature_header = format!("{}=:{}:", params.label, signature_b64);
    Ok((signature_input, signature_header))
}

/// Parse a `Signature-Input` header that may carry multiple labels, each
/// `label=(...);created=...;keyid="...";alg="..."`. Per spec.md §4.B's
/// tie-break rule, callers should pick the lexicographically first label
/// when more than one is present.
pub fn parse_signature_input(header_value: &str) -> SigResult<BTreeMap<String, SignatureParams>> {
    let mut result = BTreeMap::new();
    for entry in split_top_level_commas(header_value) {
        let entry = entry.trim();
        let eq = entry.find('=').ok_or_else(|| SigError::MalformedHeader("missing '='".into()))?;
        let label = entry[..eq].trim().to_string();
        let rest = &entry[eq + 1..];

        let open = rest.find('(').ok_or_else(|| SigError::MalformedHeader("missing '('".into()))?;
        let close = rest.find(')').ok_or_else(|| SigError::MalformedHeader("missing ')'".into()))?;
        let components: Vec<String> = rest[open + 1..close]
            .split_whitespace()
            .map(|s| s.trim_matches('"').to_string())
            .collect();

        let params_str = &rest[close + 1..];
        let created = extract_param(params_str, "created")
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| SigError::MalformedHeader("missing created".into()))?;
        let key_id = extract_param(params_str, "keyid").ok_or_else(|| SigError::MalformedHeader("missing keyid".into()))?;
        let alg = extract_param(params_str, "alg").ok_or_else(|| SigError::MalformedHeader("missing alg".into()))?;

        result.insert(
            label.clone(),
            SignatureParams {
                label,
                components,
                key_id,
                alg,
                created,
            },
        );
    }
    Ok(result)
}

fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}

fn extract_param(s: &str, key: &str) -> Option<String> {
    let needle = format!("{}=", key);
    let idx = s.find(&needle)?;
    let rest = &s[idx + needle.len()..];
    if let Some(stripped) = rest.strip_prefix('"') {
        let end = stripped.find('"')?;
        Some(stripped[..end].to_string())
    } else {
        let end = rest.find(';').unwrap_or(rest.len());
        Some(rest[..end].trim().to_string())
    }
}

/// Parse a `Signature` header that may carry multiple labels:
/// `label=:base64:`.
pub fn parse_signature_header(header_value: &str) -> SigResult<BTreeMap<String, Vec<u8>>> {
    let mut result = BTreeMap::new();
    for entry in header_value.split(',') {
        let entry = entry.trim();
        let eq = entry.find('=').ok_or_else(|| SigError::MalformedHeader("missing '='".into()))?;
        let label = entry[..eq].trim().to_string();
        let rest = entry[eq + 1..].trim();
        let inner = rest
            .strip_prefix(':')
            .and_then(|s| s.strip_suffix(':'))
            .ok_or_else(|| SigError::MalformedHeader("signature not wrapped in ':'".into()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inner)
            .map_err(|e| SigError::MalformedHeader(e.to_string()))?;
        result.insert(label, bytes);
    }
    Ok(result)
}

/// Verify an inbound request's signature headers against a resolved public
/// key. Applies the lexicographically-first-label tie-break when multiple
/// signatures are present.
pub fn verify(
    request: &SignableRequest,
    signature_input_header: &str,
    signature_header: &str,
    algorithm: KeyAlgorithm,
    public_key_bytes: &[u8],
) -> SigResult<bool> {
    let inputs = parse_signature_input(signature_input_header)?;
    let signatures = parse_signature_header(signature_header)?;

    let label = inputs.keys().next().ok_or(SigError::NoSignatures)?.clone();
    let params = inputs.get(&label).ok_or(SigError::NoSignatures)?;
    let signature = signatures.get(&label).ok_or(SigError::NoSignatures)?;

    if params.alg != algorithm.wire_name() {
        return Err(SigError::AlgorithmMismatch {
            expected: algorithm.wire_name().to_string(),
            found: params.alg.clone(),
        });
    }

    let mut req = request.clone();
    req.sage_did = params.key_id.clone();
    let base = signature_base(&req, params)?;

    identity_verify(algorithm, public_key_bytes, base.as_bytes(), signature).map_err(|e| SigError::Verification(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_identity::Signer;

    fn write_ed25519_key() -> std::path::PathBuf {
        use base64::Engine;
        use ed25519_dalek::SigningKey;
        use rand::rngs::OsRng;

        let key = SigningKey::generate(&mut OsRng);
        let d = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key.to_bytes());
        let dir = std::env::temp_dir().join(format!("sage-sigs-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("key.jwk.json");
        std::fs::write(&path, format!(r#"{{"kty":"OKP","crv":"Ed25519","d":"{}"}}"#, d)).unwrap();
        path
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let path = write_ed25519_key();
        let signer = Signer::load_jwk(&path).unwrap();

        let request = SignableRequest {
            method: "POST".into(),
            path: "/process".into(),
            content_type: "application/json".into(),
            date: "Tue, 07 Jun 2026 20:51:35 GMT".into(),
            sage_did: String::new(),
        };

        let (sig_input, sig) = sign(&signer, "did:sage:ethereum:0xabc", &request, 1_700_000_000).unwrap();
        let ok = verify(&request, &sig_input, &sig, signer.algorithm(), &signer.public_key_bytes()).unwrap();
        assert!(ok);
    }

    #[test]
    fn tampered_path_fails_verification() {
        let path = write_ed25519_key();
        let signer = Signer::load_jwk(&path).unwrap();

        let request = SignableRequest {
            method: "POST".into(),
            path: "/process".into(),
            content_type: "application/json".into(),
            date: "Tue, 07 Jun 2026 20:51:35 GMT".into(),
            sage_did: String::new(),
        };

        let (sig_input, sig) = sign(&signer, "did:sage:ethereum:0xabc", &request, 1_700_000_000).unwrap();

        let mut tampered = request.clone();
        tampered.path = "/process-tampered".into();
        let ok = verify(&tampered, &sig_input, &sig, signer.algorithm(), &signer.public_key_bytes()).unwrap();
        assert!(!ok);
    }

    #[test]
    fn multiple_labels_picks_lexicographically_first() {
        let path = write_ed25519_key();
        let signer = Signer::load_jwk(&path).unwrap();

        let request = SignableRequest {
            method: "POST".into(),
            path: "/process".into(),
            content_type: "application/json".into(),
            date: "Tue, 07 Jun 2026 20:51:35 GMT".into(),
            sage_did: String::new(),
        };

        let (sig_input, sig) = sign(&signer, "did:sage:ethereum:0xabc", &request, 1_700_000_000).unwrap();
        // "sig0" sorts before "sig1"; point it at garbage so we can tell which one wins.
        let bogus_input = format!("sig0=(\"@method\");created=1;keyid=\"x\";alg=\"ed25519\",{}", sig_input);
        let bogus_sig = format!("sig0=:AAAA:,{}", sig);

        let inputs = parse_signature_input(&bogus_input).unwrap();
        let chosen = inputs.keys().next().unwrap();
        assert_eq!(chosen, "sig0");

        // Verifying against the bogus first label must fail even though sig1 was valid.
        let ok = verify(&request, &bogus_input, &bogus_sig, signer.algorithm(), &signer.public_key_bytes());
        assert!(ok.is_err() || !ok.unwrap());
    }
}
