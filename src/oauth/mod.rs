pub mod api;
pub mod callback;
pub mod coordinator;
pub mod flow;
pub mod interceptor;
pub mod jwt;
pub mod pkce;
pub mod storage;
pub mod store;

pub use api::{ApiRefresher, AuthApi, GrantType, JwtAuthRequest, TokenResponse};
pub use callback::{listen_for_callback, CallbackParams};
pub use coordinator::{AuthConfig, RefreshCoordinator, TokenRefresher};
pub use flow::run_login;
pub use interceptor::{AuthInterceptor, RequestHandler};
pub use jwt::{decode_claims, JwtClaims, JwtDecoder, TokenDecoder};
pub use pkce::{
    build_authorization_url, encode_component, generate_challenge, generate_state,
    generate_verifier, PkceParams,
};
pub use storage::{default_storage_path, FileStore, KeyValueStore, MemoryStore};
pub use store::{
    RefreshedToken, TokenPair, TokenSink, TokenStore, DEFAULT_REFRESH_TOKEN_KEY,
    DEFAULT_TOKEN_KEY,
};
