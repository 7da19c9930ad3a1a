use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::oauth::storage::default_storage_path;
use crate::oauth::store::{DEFAULT_REFRESH_TOKEN_KEY, DEFAULT_TOKEN_KEY};

fn default_token_key() -> String {
    DEFAULT_TOKEN_KEY.to_string()
}

fn default_refresh_token_key() -> String {
    DEFAULT_REFRESH_TOKEN_KEY.to_string()
}

fn default_callback_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSettings {
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    /// Defaults to a loopback callback on an ephemeral port.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_token_key")]
    pub token_key: String,
    #[serde(default = "default_refresh_token_key")]
    pub refresh_token_key: String,
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    #[serde(default = "default_callback_timeout_secs")]
    pub callback_timeout_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            auth_url: None,
            client_id: None,
            redirect_uri: None,
            token_key: default_token_key(),
            refresh_token_key: default_refresh_token_key(),
            storage_path: None,
            callback_timeout_secs: default_callback_timeout_secs(),
        }
    }
}

impl AuthSettings {
    pub fn storage_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(default_storage_path)
    }

    pub fn require_auth_url(&self) -> Result<&str, AuthError> {
        self.auth_url
            .as_deref()
            .ok_or(AuthError::NotConfigured("authUrl"))
    }

    pub fn require_client_id(&self) -> Result<&str, AuthError> {
        self.client_id
            .as_deref()
            .ok_or(AuthError::NotConfigured("clientId"))
    }
}
