use crate::cli::output::{is_tty, pkce_json, print_status};
use crate::config::AuthSettings;
use crate::error::AuthError;
use crate::oauth::flow::run_login;
use crate::oauth::pkce::{build_authorization_url, PkceParams};
use crate::session::AuthSession;

pub async fn run_pkce() -> Result<(), AuthError> {
    let params = PkceParams::generate().await;
    println!("{}", serde_json::to_string_pretty(&pkce_json(&params))?);
    Ok(())
}

/// Print an authorization URL. Missing challenge/state are generated; a
/// generated challenge's verifier goes to stderr for the later code exchange.
pub async fn run_url(
    settings: &AuthSettings,
    client_id: Option<&str>,
    redirect_uri: Option<&str>,
    challenge: Option<&str>,
    state: Option<&str>,
) -> Result<(), AuthError> {
    let auth_url = settings.require_auth_url()?;
    let client_id = match client_id {
        Some(id) => id,
        None => settings.require_client_id()?,
    };
    let redirect_uri = redirect_uri
        .or(settings.redirect_uri.as_deref())
        .ok_or(AuthError::NotConfigured("redirectUri"))?;

    let verifier_needed = challenge.is_none();
    let generated = match (challenge, state) {
        (Some(_), Some(_)) => None,
        _ => Some(PkceParams::generate().await),
    };
    let challenge = challenge
        .or(generated.as_ref().map(|p| p.challenge.as_str()))
        .unwrap_or_default();
    let state = state
        .or(generated.as_ref().map(|p| p.state.as_str()))
        .unwrap_or_default();

    println!(
        "{}",
        build_authorization_url(auth_url, client_id, redirect_uri, challenge, state)
    );
    if let (true, Some(params)) = (verifier_needed, &generated) {
        eprintln!("verifier: {}", params.verifier);
    }
    Ok(())
}

pub async fn run_login_command(settings: AuthSettings) -> Result<(), AuthError> {
    let session = AuthSession::from_settings(settings)?;
    run_login(session.settings(), session.store()).await?;
    println!("Login successful; tokens stored");
    Ok(())
}

pub fn run_status(settings: AuthSettings) -> Result<(), AuthError> {
    let session = AuthSession::from_settings(settings)?;
    let store = session.store();
    let pair = store.token_pair()?;
    let claims = store.get_token_data().flatten();
    print_status(
        pair.as_ref().map(|p| p.access_token.as_str()),
        pair.is_some(),
        claims.as_ref(),
        is_tty(),
    );
    Ok(())
}

pub fn run_logout(settings: AuthSettings) -> Result<(), AuthError> {
    let session = AuthSession::from_settings(settings)?;
    session.store().clear_tokens()?;
    println!("Logged out");
    Ok(())
}

/// GET `url` through the intercepting client and print status and body.
pub async fn run_request(settings: AuthSettings, url: &str) -> Result<(), AuthError> {
    let session = AuthSession::from_settings(settings)?;
    let interceptor = session.interceptor();
    let response = interceptor.send(interceptor.http().get(url)).await?;
    let status = response.status();
    let body = response.text().await?;
    eprintln!("HTTP {status}");
    println!("{body}");
    check_resource_status(status, url)
}

fn check_resource_status(status: reqwest::StatusCode, url: &str) -> Result<(), AuthError> {
    if status.is_success() {
        return Ok(());
    }
    Err(AuthError::UnexpectedStatus {
        status: status.as_u16(),
        url: url.to_string(),
    })
}
