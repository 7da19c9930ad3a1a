use std::sync::Arc;

use crate::config::AuthSettings;
use crate::error::AuthError;
use crate::oauth::api::{ApiRefresher, AuthApi};
use crate::oauth::coordinator::{AuthConfig, RefreshCoordinator};
use crate::oauth::interceptor::AuthInterceptor;
use crate::oauth::jwt::{JwtClaims, JwtDecoder, TokenDecoder};
use crate::oauth::storage::{FileStore, KeyValueStore};
use crate::oauth::store::{TokenSink, TokenStore};

/// A token store, its refresh coordinator and an intercepting HTTP client,
/// wired together from settings.
pub struct AuthSession<T> {
    settings: AuthSettings,
    store: Arc<TokenStore<T>>,
    interceptor: AuthInterceptor,
}

impl<T> std::fmt::Debug for AuthSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("settings", &self.settings)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> AuthSession<T> {
    /// Refreshes use the `refresh_token` grant against `authUrl` when one is
    /// configured; without it a 401 fails with a configuration error.
    pub fn open(
        settings: AuthSettings,
        storage: Arc<dyn KeyValueStore>,
        decoder: impl TokenDecoder<T> + 'static,
    ) -> Result<Self, AuthError> {
        let store = Arc::new(TokenStore::with_keys(
            storage,
            decoder,
            &settings.token_key,
            &settings.refresh_token_key,
        )?);

        let getter_store = Arc::clone(&store);
        let mut config = AuthConfig::new()
            .with_token_getter(move || match getter_store.get_token() {
                Ok(token) => token,
                Err(e) => {
                    tracing::warn!("Cannot read stored access token; sending without it: {e}");
                    None
                }
            })
            .with_token_sink(Arc::clone(&store) as Arc<dyn TokenSink>)
            .on_refresh_failed(|e| tracing::warn!("Session refresh failed: {e}"));
        if let Some(auth_url) = settings.auth_url.as_deref() {
            config = config.with_refresher(ApiRefresher::new(
                AuthApi::new(auth_url),
                Arc::clone(&store),
            ));
        }

        let coordinator = Arc::new(RefreshCoordinator::with_config(config));
        Ok(Self {
            settings,
            store,
            interceptor: AuthInterceptor::new(reqwest::Client::new(), coordinator),
        })
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<TokenStore<T>> {
        &self.store
    }

    pub fn interceptor(&self) -> &AuthInterceptor {
        &self.interceptor
    }
}

impl AuthSession<Option<JwtClaims>> {
    /// File-backed session decoding access tokens as JWT claims.
    pub fn from_settings(settings: AuthSettings) -> Result<Self, AuthError> {
        let storage = Arc::new(FileStore::new(settings.storage_path()));
        Self::open(settings, storage, JwtDecoder::<JwtClaims>::new())
    }
}
