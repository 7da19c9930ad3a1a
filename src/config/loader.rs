use std::path::{Path, PathBuf};

use crate::error::AuthError;

use super::types::AuthSettings;

pub const CONFIG_ENV: &str = "JWT_AUTH_CONFIG";

/// Pick the settings file.
///
/// Precedence:
/// 1. `--config` CLI flag
/// 2. `JWT_AUTH_CONFIG` env var
/// 3. `~/.jwt-auth/config.json`
///
/// The first two must exist; the home-level file is optional.
fn resolve_config_path(cli_config: Option<&Path>) -> (Option<PathBuf>, bool) {
    if let Some(path) = cli_config {
        return (Some(path.to_path_buf()), true);
    }
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.is_empty() {
            return (Some(PathBuf::from(env_path)), true);
        }
    }
    let home = dirs::home_dir().map(|h| h.join(".jwt-auth").join("config.json"));
    (home, false)
}

fn load_settings_file(path: &Path) -> Result<AuthSettings, AuthError> {
    let content = std::fs::read_to_string(path).map_err(|e| AuthError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {e}"),
    })?;
    serde_json::from_str(&content).map_err(|e| AuthError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Invalid JSON: {e}"),
    })
}

/// Overlay `JWT_AUTH_*` variables onto file settings.
pub fn apply_env_overrides<F>(settings: &mut AuthSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
    if let Some(v) = non_empty("JWT_AUTH_URL") {
        settings.auth_url = Some(v);
    }
    if let Some(v) = non_empty("JWT_AUTH_CLIENT_ID") {
        settings.client_id = Some(v);
    }
    if let Some(v) = non_empty("JWT_AUTH_REDIRECT_URI") {
        settings.redirect_uri = Some(v);
    }
    if let Some(v) = non_empty("JWT_AUTH_STORAGE") {
        settings.storage_path = Some(PathBuf::from(v));
    }
}

pub fn load_settings(cli_config: Option<&Path>) -> Result<AuthSettings, AuthError> {
    let (path, required) = resolve_config_path(cli_config);
    let mut settings = match path {
        Some(path) if required || path.exists() => {
            tracing::debug!(path = %path.display(), "Loading settings");
            load_settings_file(&path)?
        }
        _ => AuthSettings::default(),
    };
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}
