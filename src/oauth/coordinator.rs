//! Single-flight token refresh.
//!
//! Every refresh cycle owns a one-shot `watch` channel created when the cycle
//! starts. The caller that starts a cycle (the leader) performs the refresh and
//! publishes the outcome; callers that arrive while the cycle is open (waiters)
//! subscribe to that channel instead of starting a second refresh.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::AuthError;
use crate::oauth::store::{RefreshedToken, TokenSink};

/// Performs the network refresh and returns the new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<RefreshedToken, AuthError>;
}

#[async_trait]
impl<F, Fut> TokenRefresher for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<RefreshedToken, AuthError>> + Send + 'static,
{
    async fn refresh(&self) -> Result<RefreshedToken, AuthError> {
        self().await
    }
}

pub type TokenGetter = Arc<dyn Fn() -> Option<String> + Send + Sync>;
pub type RefreshFailedCallback = Arc<dyn Fn(&AuthError) + Send + Sync>;

/// Strategy bundle supplied once by the integrating application.
#[derive(Clone, Default)]
pub struct AuthConfig {
    refresher: Option<Arc<dyn TokenRefresher>>,
    token_getter: Option<TokenGetter>,
    on_refresh_failed: Option<RefreshFailedCallback>,
    token_sink: Option<Arc<dyn TokenSink>>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("refresher_set", &self.refresher.is_some())
            .field("token_getter_set", &self.token_getter.is_some())
            .field("on_refresh_failed_set", &self.on_refresh_failed.is_some())
            .field("token_sink_set", &self.token_sink.is_some())
            .finish()
    }
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refresher(mut self, refresher: impl TokenRefresher + 'static) -> Self {
        self.refresher = Some(Arc::new(refresher));
        self
    }

    pub fn with_token_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.token_getter = Some(Arc::new(getter));
        self
    }

    pub fn on_refresh_failed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AuthError) + Send + Sync + 'static,
    {
        self.on_refresh_failed = Some(Arc::new(callback));
        self
    }

    /// Persist refreshed tokens here (usually the session's `TokenStore`).
    pub fn with_token_sink(mut self, sink: Arc<dyn TokenSink>) -> Self {
        self.token_sink = Some(sink);
        self
    }
}

/// Outcome broadcast to waiters. Errors travel as text since `AuthError`
/// is not `Clone`.
type CycleOutcome = Result<String, String>;
type CycleReceiver = watch::Receiver<Option<CycleOutcome>>;

enum Role {
    Leader(CycleGuard),
    Waiter(CycleReceiver),
}

/// Owns the open cycle. Finishing it (or dropping it mid-refresh) closes the
/// cycle slot before waiters are released.
struct CycleGuard {
    slot: Arc<Mutex<Option<CycleReceiver>>>,
    tx: Option<watch::Sender<Option<CycleOutcome>>>,
}

impl CycleGuard {
    fn finish(mut self, outcome: CycleOutcome) {
        close_slot(&self.slot);
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(outcome));
        }
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!("Token refresh dropped before completion; releasing waiters");
            close_slot(&self.slot);
        }
    }
}

fn lock_slot(slot: &Mutex<Option<CycleReceiver>>) -> MutexGuard<'_, Option<CycleReceiver>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

fn close_slot(slot: &Mutex<Option<CycleReceiver>>) {
    *lock_slot(slot) = None;
}

/// Serializes concurrent refresh attempts into one network call per cycle.
#[derive(Default)]
pub struct RefreshCoordinator {
    config: OnceLock<AuthConfig>,
    cycle: Arc<Mutex<Option<CycleReceiver>>>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("config", &self.config.get())
            .field("is_refreshing", &self.is_refreshing())
            .finish()
    }
}

impl RefreshCoordinator {
    /// An unconfigured coordinator; call [`initialize`](Self::initialize) before use.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let coordinator = Self::new();
        let _ = coordinator.config.set(config);
        coordinator
    }

    /// Install the strategy bundle. Only the first call succeeds.
    pub fn initialize(&self, config: AuthConfig) -> Result<(), AuthError> {
        self.config
            .set(config)
            .map_err(|_| AuthError::AlreadyInitialized)
    }

    pub fn is_refreshing(&self) -> bool {
        lock_slot(&self.cycle).is_some()
    }

    fn config(&self) -> Option<&AuthConfig> {
        self.config.get()
    }

    /// Current bearer token from the configured getter.
    pub fn current_token(&self) -> Result<Option<String>, AuthError> {
        let getter = self
            .config()
            .and_then(|c| c.token_getter.as_ref())
            .ok_or(AuthError::NotConfigured("jwt_token_getter"))?;
        Ok(getter())
    }

    /// Obtain a freshly refreshed token, joining the open cycle if there is one.
    ///
    /// The caller that opens a cycle receives the refresher's own error on
    /// failure; callers that joined it receive [`AuthError::RefreshFailed`].
    pub async fn refreshed_token(&self) -> Result<String, AuthError> {
        let refresher = self
            .config()
            .and_then(|c| c.refresher.clone())
            .ok_or(AuthError::NotConfigured("refresh_token_fn"))?;

        match self.join_or_start() {
            Role::Waiter(rx) => wait_for_cycle(rx).await,
            Role::Leader(guard) => self.lead_cycle(guard, refresher.as_ref()).await,
        }
    }

    fn join_or_start(&self) -> Role {
        let mut slot = lock_slot(&self.cycle);
        if let Some(rx) = slot.as_ref() {
            tracing::debug!("Refresh already in flight; waiting for its token");
            return Role::Waiter(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        *slot = Some(rx);
        tracing::debug!("Starting token refresh");
        Role::Leader(CycleGuard {
            slot: Arc::clone(&self.cycle),
            tx: Some(tx),
        })
    }

    async fn lead_cycle(
        &self,
        guard: CycleGuard,
        refresher: &dyn TokenRefresher,
    ) -> Result<String, AuthError> {
        match refresher.refresh().await {
            Ok(refreshed) => {
                if let Some(sink) = self.config().and_then(|c| c.token_sink.as_ref()) {
                    if let Err(e) = sink.store_refreshed(&refreshed) {
                        tracing::warn!("Refreshed token could not be persisted: {e}");
                    }
                }
                let token = refreshed.access_token;
                guard.finish(Ok(token.clone()));
                tracing::debug!("Token refresh completed");
                Ok(token)
            }
            Err(e) => {
                guard.finish(Err(e.to_string()));
                tracing::debug!("Token refresh failed: {e}");
                if let Some(callback) = self.config().and_then(|c| c.on_refresh_failed.as_ref()) {
                    callback(&e);
                }
                Err(e)
            }
        }
    }
}

async fn wait_for_cycle(mut rx: CycleReceiver) -> Result<String, AuthError> {
    let outcome = rx
        .wait_for(Option::is_some)
        .await
        .map_err(|_| AuthError::RefreshAbandoned)?
        .clone();
    match outcome {
        Some(Ok(token)) => Ok(token),
        Some(Err(reason)) => Err(AuthError::RefreshFailed(reason)),
        None => Err(AuthError::RefreshAbandoned),
    }
}
