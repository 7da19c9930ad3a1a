use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::AuthError;

/// Query parameters delivered to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: Option<String>,
}

/// Accept a single redirect on `listener` and return its parameters.
pub async fn listen_for_callback(
    listener: TcpListener,
    timeout: Duration,
) -> Result<CallbackParams, AuthError> {
    let accept_future = async {
        let (mut stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "Received OAuth redirect");

        let mut buf = vec![0u8; 8192];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]);
        let outcome = parse_callback_request(&request);

        let (heading, detail) = match &outcome {
            Ok(_) => (
                "Login complete",
                "You can close this window and return to the terminal.",
            ),
            Err(_) => ("Login failed", "Check the terminal for details."),
        };
        let body = format!(
            "<!DOCTYPE html><html><body><h1>{heading}</h1><p>{detail}</p></body></html>"
        );
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;

        outcome
    };

    tokio::time::timeout(timeout, accept_future)
        .await
        .map_err(|_| {
            AuthError::OAuthError(format!(
                "Timed out waiting for OAuth callback after {}s",
                timeout.as_secs()
            ))
        })?
}

fn parse_callback_request(request: &str) -> Result<CallbackParams, AuthError> {
    // "GET /callback?code=...&state=... HTTP/1.1"
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| AuthError::OAuthError("Malformed callback request".to_string()))?;
    let params = parse_query(target.split_once('?').map(|(_, q)| q).unwrap_or(""));

    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .map(|d| format!(": {d}"))
            .unwrap_or_default();
        return Err(AuthError::OAuthError(format!(
            "Authorization server returned '{error}'{description}"
        )));
    }

    let code = params
        .get("code")
        .filter(|c| !c.is_empty())
        .cloned()
        .ok_or_else(|| {
            AuthError::OAuthError("No authorization code found in callback request".to_string())
        })?;

    Ok(CallbackParams {
        code,
        state: params.get("state").cloned(),
    })
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(key), percent_decode(value))
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let decoded = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_code_and_state() {
        let request = "GET /callback?code=abc123&state=xyz HTTP/1.1\r\nHost: localhost\r\n";
        let params = parse_callback_request(request).unwrap();
        assert_eq!(params.code, "abc123");
        assert_eq!(params.state.as_deref(), Some("xyz"));
    }

    #[test]
    fn parse_code_without_state() {
        let request = "GET /callback?code=abc HTTP/1.1\r\n";
        assert!(parse_callback_request(request).unwrap().state.is_none());
    }

    #[test]
    fn parse_code_missing() {
        let request = "GET /callback?state=xyz HTTP/1.1\r\nHost: localhost\r\n";
        let err = parse_callback_request(request).unwrap_err();
        assert!(err.to_string().contains("No authorization code"));
    }

    #[test]
    fn parse_empty_code_value() {
        let request = "GET /callback?code=&state=xyz HTTP/1.1\r\n";
        assert!(parse_callback_request(request).is_err());
    }

    #[test]
    fn parse_error_param() {
        let request = "GET /callback?error=access_denied&error_description=User+declined HTTP/1.1\r\n";
        let err = parse_callback_request(request).unwrap_err();
        assert_eq!(
            err.to_string(),
            "OAuth error: Authorization server returned 'access_denied': User declined"
        );
    }

    #[test]
    fn parse_malformed_request_line() {
        assert!(parse_callback_request("").is_err());
    }

    #[test]
    fn percent_decode_utf8_and_plus() {
        assert_eq!(percent_decode("hello%20world"), "hello world");
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("caf%C3%A9"), "café");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[tokio::test]
    async fn listener_returns_params() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(listen_for_callback(listener, Duration::from_secs(5)));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /callback?code=c%2F1&state=s1 HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert!(reply.starts_with("HTTP/1.1 200 OK"));
        assert!(reply.contains("Login complete"));

        let params = server.await.unwrap().unwrap();
        assert_eq!(params.code, "c/1");
        assert_eq!(params.state.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn listener_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let err = listen_for_callback(listener, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }
}
