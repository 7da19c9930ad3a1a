use std::io::IsTerminal;

use colored::Colorize;

use crate::error::AuthError;
use crate::oauth::jwt::JwtClaims;
use crate::oauth::pkce::PkceParams;

pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

fn label(text: &str, is_tty: bool) -> String {
    if is_tty {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

pub fn pkce_json(params: &PkceParams) -> serde_json::Value {
    serde_json::json!({
        "verifier": params.verifier,
        "challenge": params.challenge,
        "state": params.state,
    })
}

/// Shorten a secret for display, keeping a recognizable prefix.
pub fn redact(token: &str) -> String {
    const VISIBLE: usize = 8;
    if token.chars().count() <= VISIBLE {
        return "*".repeat(token.chars().count());
    }
    let prefix: String = token.chars().take(VISIBLE).collect();
    format!("{prefix}…")
}

pub fn print_status(
    access_token: Option<&str>,
    refresh_present: bool,
    claims: Option<&JwtClaims>,
    is_tty: bool,
) {
    let Some(access_token) = access_token else {
        let msg = "Not logged in";
        if is_tty {
            println!("{}", msg.yellow());
        } else {
            println!("{msg}");
        }
        return;
    };

    println!("{}: {}", label("Access token", is_tty), redact(access_token));
    println!(
        "{}: {}",
        label("Refresh token", is_tty),
        if refresh_present { "stored" } else { "missing" }
    );

    let Some(claims) = claims else {
        println!("{}: (not a decodable JWT)", label("Claims", is_tty));
        return;
    };
    if let Some(sub) = &claims.sub {
        println!("{}: {}", label("Subject", is_tty), sub);
    }
    if let Some(iss) = &claims.iss {
        println!("{}: {}", label("Issuer", is_tty), iss);
    }
    if let Some(expires) = claims.expires_at() {
        let when = expires.to_rfc3339();
        let text = if claims.is_expired() {
            format!("{when} (expired)")
        } else {
            when
        };
        let text = if is_tty && claims.is_expired() {
            text.red().to_string()
        } else {
            text
        };
        println!("{}: {}", label("Expires", is_tty), text);
    }
}

pub fn print_error(err: &AuthError, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&err.to_json()).unwrap_or_default());
    } else {
        eprintln!("Error: {err}");
    }
}
