use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0} is not configured; initialize the auth config before sending requests")]
    NotConfigured(&'static str),

    #[error("Auth config has already been initialized")]
    AlreadyInitialized,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Token refresh was abandoned before it completed")]
    RefreshAbandoned,

    #[error("No refresh token is stored. Run: jwt-auth login")]
    MissingRefreshToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Storage error for key '{key}': {detail}")]
    Storage { key: String, detail: String },

    #[error("Auth server returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request to {url} failed with status {status}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OAuth error: {0}")]
    OAuthError(String),

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuthError {
    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NotConfigured(_) => "not_configured",
            AuthError::AlreadyInitialized => "already_initialized",
            AuthError::RefreshFailed(_) => "refresh_failed",
            AuthError::RefreshAbandoned => "refresh_abandoned",
            AuthError::MissingRefreshToken => "missing_refresh_token",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::Storage { .. } => "storage_error",
            AuthError::Http { .. } => "http_error",
            AuthError::UnexpectedStatus { .. } => "unexpected_status",
            AuthError::Transport(_) => "transport_error",
            AuthError::OAuthError(_) => "oauth_error",
            AuthError::ConfigError { .. } => "config_error",
            AuthError::IoError(_) => "io_error",
            AuthError::Json(_) => "parse_error",
        }
    }

    /// Configuration errors are fatal and must never be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuthError::NotConfigured(_)
                | AuthError::AlreadyInitialized
                | AuthError::ConfigError { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Http { status, .. } | AuthError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            AuthError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(status) = self.status() {
            obj.insert("status".into(), serde_json::Value::from(status));
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        serde_json::json!({ "error": obj })
    }
}
