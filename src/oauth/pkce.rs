use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// Per-login PKCE parameters. Held by the caller until the redirect completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceParams {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceParams {
    pub async fn generate() -> Self {
        let verifier = generate_verifier();
        let challenge = generate_challenge(&verifier).await;
        Self {
            verifier,
            challenge,
            state: generate_state(),
        }
    }
}

fn random_base64url<const N: usize>() -> String {
    use rand::prelude::*;

    let mut buf = [0u8; N];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

pub fn generate_verifier() -> String {
    random_base64url::<VERIFIER_BYTES>()
}

pub fn generate_state() -> String {
    random_base64url::<STATE_BYTES>()
}

/// Base64url SHA-256 digest of the verifier's UTF-8 bytes (the `S256` method).
pub async fn generate_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Compose the authorization redirect URL.
///
/// Components are substituted verbatim: nothing is percent-encoded here, so
/// callers must pre-encode anything untrusted (see [`encode_component`]).
/// No `code_challenge_method` is emitted; the server default applies.
pub fn build_authorization_url(
    auth_base: &str,
    client_id: &str,
    redirect_uri: &str,
    challenge: &str,
    state: &str,
) -> String {
    format!(
        "{auth_base}/oauth/authorize?client_id={client_id}&redirect_uri={redirect_uri}&code_challenge={challenge}&state={state}"
    )
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn encode_component(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(b as char);
            }
            _ => result.push_str(&format!("%{b:02X}")),
        }
    }
    result
}
