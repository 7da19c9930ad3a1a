use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::AuthSettings;
use crate::error::AuthError;
use crate::oauth::api::{AuthApi, JwtAuthRequest, TokenResponse};
use crate::oauth::callback::listen_for_callback;
use crate::oauth::pkce::{build_authorization_url, encode_component, PkceParams};
use crate::oauth::store::TokenStore;

/// Run the browser login: PKCE, redirect, code exchange, then persist the pair.
pub async fn run_login<T: Clone + Send>(
    settings: &AuthSettings,
    store: &TokenStore<T>,
) -> Result<TokenResponse, AuthError> {
    let auth_url = settings.require_auth_url()?;
    let client_id = settings.require_client_id()?;

    let pkce = PkceParams::generate().await;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let redirect_uri = settings
        .redirect_uri
        .clone()
        .unwrap_or_else(|| format!("http://localhost:{port}/callback"));

    // The URL builder substitutes verbatim, so encode the redirect here.
    let login_url = build_authorization_url(
        auth_url,
        &encode_component(client_id),
        &encode_component(&redirect_uri),
        &pkce.challenge,
        &pkce.state,
    );

    if webbrowser::open(&login_url).is_err() {
        tracing::warn!("Could not open browser automatically. Please visit:\n{login_url}");
    }

    let callback = listen_for_callback(
        listener,
        Duration::from_secs(settings.callback_timeout_secs),
    )
    .await?;
    verify_state(&pkce.state, callback.state.as_deref())?;

    let token: TokenResponse = AuthApi::new(auth_url)
        .login(&JwtAuthRequest::authorization_code(
            &callback.code,
            &pkce.verifier,
        ))
        .await?;

    let refresh_token = token
        .refresh_token
        .as_deref()
        .ok_or(AuthError::MissingRefreshToken)?;
    store.set_tokens(&token.access_token, refresh_token)?;

    Ok(token)
}

fn verify_state(expected: &str, returned: Option<&str>) -> Result<(), AuthError> {
    match returned {
        Some(state) if state == expected => Ok(()),
        Some(_) => Err(AuthError::OAuthError(
            "State mismatch in OAuth callback; possible CSRF attempt".to_string(),
        )),
        None => Err(AuthError::OAuthError(
            "OAuth callback did not include a state parameter".to_string(),
        )),
    }
}
