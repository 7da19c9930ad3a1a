use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::AuthError;
use crate::oauth::jwt::TokenDecoder;
use crate::oauth::storage::KeyValueStore;

pub const DEFAULT_TOKEN_KEY: &str = "a_tkn";
pub const DEFAULT_REFRESH_TOKEN_KEY: &str = "a_rfsh";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a refresh call. A missing `refresh_token` keeps the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl From<String> for RefreshedToken {
    fn from(access_token: String) -> Self {
        Self {
            access_token,
            refresh_token: None,
        }
    }
}

impl From<&str> for RefreshedToken {
    fn from(access_token: &str) -> Self {
        access_token.to_string().into()
    }
}

/// Where the refresh coordinator persists newly issued tokens.
pub trait TokenSink: Send + Sync {
    fn store_refreshed(&self, refreshed: &RefreshedToken) -> Result<(), AuthError>;
}

/// Persists the access/refresh pair under two keys and caches the decoded
/// access token.
///
/// Writers and pair readers share one critical section, so a reader never
/// observes half of a pair.
pub struct TokenStore<T> {
    storage: Arc<dyn KeyValueStore>,
    decoder: Box<dyn TokenDecoder<T>>,
    token_key: String,
    refresh_token_key: String,
    token_data: Mutex<Option<T>>,
}

impl<T> std::fmt::Debug for TokenStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("token_key", &self.token_key)
            .field("refresh_token_key", &self.refresh_token_key)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send> TokenStore<T> {
    /// Open a store with the default `a_tkn` / `a_rfsh` keys.
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        decoder: impl TokenDecoder<T> + 'static,
    ) -> Result<Self, AuthError> {
        Self::with_keys(
            storage,
            decoder,
            DEFAULT_TOKEN_KEY,
            DEFAULT_REFRESH_TOKEN_KEY,
        )
    }

    /// Open a store and load any pair already persisted under the given keys.
    pub fn with_keys(
        storage: Arc<dyn KeyValueStore>,
        decoder: impl TokenDecoder<T> + 'static,
        token_key: &str,
        refresh_token_key: &str,
    ) -> Result<Self, AuthError> {
        let store = Self {
            storage,
            decoder: Box::new(decoder),
            token_key: token_key.to_string(),
            refresh_token_key: refresh_token_key.to_string(),
            token_data: Mutex::new(None),
        };
        store.load_tokens()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.token_data.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load_tokens(&self) -> Result<(), AuthError> {
        let mut data = self.lock();
        let token = self.storage.get(&self.token_key)?;
        let refresh_token = self.storage.get(&self.refresh_token_key)?;
        match (token, refresh_token) {
            (Some(token), Some(refresh)) if !token.is_empty() && !refresh.is_empty() => {
                tracing::debug!(key = %self.token_key, "Loaded persisted token pair");
                *data = Some(self.decoder.decode(&token));
            }
            _ => *data = None,
        }
        Ok(())
    }

    pub fn set_tokens(&self, token: &str, refresh_token: &str) -> Result<(), AuthError> {
        let mut data = self.lock();
        self.storage.set_all(&[
            (self.token_key.as_str(), token),
            (self.refresh_token_key.as_str(), refresh_token),
        ])?;
        *data = Some(self.decoder.decode(token));
        Ok(())
    }

    pub fn clear_tokens(&self) -> Result<(), AuthError> {
        let mut data = self.lock();
        *data = None;
        self.storage
            .remove_all(&[self.token_key.as_str(), self.refresh_token_key.as_str()])
    }

    pub fn get_token_data(&self) -> Option<T> {
        self.lock().clone()
    }

    /// Raw read from storage, not from the cache.
    pub fn get_token(&self) -> Result<Option<String>, AuthError> {
        let _data = self.lock();
        self.storage.get(&self.token_key)
    }

    /// Raw read from storage, not from the cache.
    pub fn get_refresh_token(&self) -> Result<Option<String>, AuthError> {
        let _data = self.lock();
        self.storage.get(&self.refresh_token_key)
    }

    /// Both tokens, or `None` when either one is missing.
    pub fn token_pair(&self) -> Result<Option<TokenPair>, AuthError> {
        let _data = self.lock();
        let token = self.storage.get(&self.token_key)?;
        let refresh_token = self.storage.get(&self.refresh_token_key)?;
        Ok(token.zip(refresh_token).map(|(access_token, refresh_token)| TokenPair {
            access_token,
            refresh_token,
        }))
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    pub fn refresh_token_key(&self) -> &str {
        &self.refresh_token_key
    }
}

impl<T: Clone + Send> TokenSink for TokenStore<T> {
    fn store_refreshed(&self, refreshed: &RefreshedToken) -> Result<(), AuthError> {
        let refresh_token = match &refreshed.refresh_token {
            Some(rotated) => rotated.clone(),
            None => self
                .get_refresh_token()?
                .ok_or(AuthError::MissingRefreshToken)?,
        };
        self.set_tokens(&refreshed.access_token, &refresh_token)
    }
}
