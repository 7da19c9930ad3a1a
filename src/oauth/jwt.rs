use std::marker::PhantomData;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Turns a raw access token into the caller's decoded representation.
pub trait TokenDecoder<T>: Send + Sync {
    fn decode(&self, token: &str) -> T;
}

impl<T, F> TokenDecoder<T> for F
where
    F: Fn(&str) -> T + Send + Sync,
{
    fn decode(&self, token: &str) -> T {
        self(token)
    }
}

/// Registered claims most issuers set, plus whatever else the payload carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JwtClaims {
    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.exp
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(expires) => chrono::Utc::now() >= expires,
            None => false,
        }
    }
}

/// Decode the payload segment of a compact JWT. The signature is not verified.
pub fn decode_claims<C: DeserializeOwned>(token: &str) -> Result<C, AuthError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(AuthError::InvalidToken(
                "expected three dot-separated segments".to_string(),
            ))
        }
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::InvalidToken(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidToken(format!("payload is not valid claims JSON: {e}")))
}

/// Decoder yielding `Some(claims)` for well-formed JWTs and `None` otherwise.
pub struct JwtDecoder<C> {
    _claims: PhantomData<fn() -> C>,
}

impl<C> JwtDecoder<C> {
    pub fn new() -> Self {
        Self {
            _claims: PhantomData,
        }
    }
}

impl<C> Default for JwtDecoder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for JwtDecoder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder").finish()
    }
}

impl<C: DeserializeOwned> TokenDecoder<Option<C>> for JwtDecoder<C> {
    fn decode(&self, token: &str) -> Option<C> {
        match decode_claims(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!("Ignoring undecodable access token: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn encode_test_jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_registered_and_extra_claims() {
        let token = encode_test_jwt(&serde_json::json!({
            "sub": "user-1",
            "exp": 4102444800i64,
            "role": "admin"
        }));
        let claims: JwtClaims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.extra["role"], "admin");
        assert!(!claims.is_expired());
        assert_eq!(claims.expires_at().unwrap().timestamp(), 4102444800);
    }

    #[test]
    fn decode_tolerates_padding() {
        let token = encode_test_jwt(&serde_json::json!({"sub": "a"}));
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        parts[1].push_str("==");
        let claims: JwtClaims = decode_claims(&parts.join(".")).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("a"));
    }

    #[test]
    fn decode_rejects_wrong_segment_count() {
        let err = decode_claims::<JwtClaims>("only.two").unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
        assert!(decode_claims::<JwtClaims>("a.b.c.d").is_err());
    }

    #[test]
    fn decode_rejects_non_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode("not json");
        let err = decode_claims::<JwtClaims>(&format!("h.{payload}.s")).unwrap_err();
        assert!(err.to_string().contains("claims JSON"));
    }

    #[test]
    fn claims_expired_when_past() {
        let claims = JwtClaims {
            exp: Some(chrono::Utc::now().timestamp() - 60),
            ..Default::default()
        };
        assert!(claims.is_expired());
    }

    #[test]
    fn claims_not_expired_without_exp() {
        assert!(!JwtClaims::default().is_expired());
    }

    #[test]
    fn jwt_decoder_maps_malformed_to_none() {
        let decoder = JwtDecoder::<JwtClaims>::new();
        assert!(decoder.decode("garbage").is_none());
        let token = encode_test_jwt(&serde_json::json!({"sub": "x"}));
        assert_eq!(decoder.decode(&token).unwrap().sub.as_deref(), Some("x"));
    }

    #[test]
    fn closures_are_decoders() {
        let decoder = |token: &str| token.len();
        assert_eq!(TokenDecoder::decode(&decoder, "abcd"), 4);
    }
}
