pub mod http_mock;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jwt_auth::{AuthError, RefreshedToken, TokenRefresher};

/// Unsigned JWT carrying the given claims.
#[allow(dead_code)]
pub fn jwt(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

/// Refresher that counts its calls and resolves after `delay`.
#[allow(dead_code)]
pub fn slow_refresher(
    calls: Arc<AtomicUsize>,
    delay: Duration,
    outcome: Result<&'static str, &'static str>,
) -> impl TokenRefresher + 'static {
    move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            outcome
                .map(RefreshedToken::from)
                .map_err(|e| AuthError::OAuthError(e.to_string()))
        }
    }
}

/// Create a temp directory with a settings file pointing storage inside it.
#[allow(dead_code)]
pub fn temp_settings_dir(extra: serde_json::Value) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = serde_json::json!({
        "storagePath": dir.path().join("storage.json"),
    });
    if let (Some(obj), Some(extra)) = (settings.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();
    (dir, config_path)
}
