pub mod cli;
pub mod config;
pub mod error;
pub mod oauth;
pub mod session;

pub use config::{load_settings, AuthSettings};
pub use error::AuthError;
pub use oauth::{
    AuthConfig, AuthInterceptor, JwtClaims, PkceParams, RefreshCoordinator, RefreshedToken,
    TokenRefresher, TokenStore,
};
pub use session::AuthSession;
