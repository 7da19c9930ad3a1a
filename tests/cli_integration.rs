use assert_cmd::Command;
use predicates::prelude::*;

mod common;

fn jwt_auth_cmd() -> Command {
    let mut cmd = Command::cargo_bin("jwt-auth").unwrap();
    for var in [
        "JWT_AUTH_CONFIG",
        "JWT_AUTH_URL",
        "JWT_AUTH_CLIENT_ID",
        "JWT_AUTH_REDIRECT_URI",
        "JWT_AUTH_STORAGE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn pkce_prints_url_safe_json() {
    let output = jwt_auth_cmd().arg("pkce").output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    for field in ["verifier", "challenge", "state"] {
        let value = json[field].as_str().unwrap();
        assert!(!value.is_empty());
        assert!(!value.contains(['+', '/', '=']), "{field}: {value}");
    }
    assert_eq!(json["verifier"].as_str().unwrap().len(), 43);
}

#[test]
fn url_substitutes_parameters_verbatim() {
    let (_dir, config) = common::temp_settings_dir(serde_json::json!({
        "authUrl": "https://auth.example.com",
        "clientId": "dots-app"
    }));
    jwt_auth_cmd()
        .args([
            "url",
            "--redirect-uri",
            "https://app.example.com/cb",
            "--challenge",
            "CH",
            "--state",
            "ST",
        ])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://auth.example.com/oauth/authorize?client_id=dots-app\
             &redirect_uri=https://app.example.com/cb&code_challenge=CH&state=ST",
        ));
}

#[test]
fn url_generates_pkce_when_missing() {
    let (_dir, config) = common::temp_settings_dir(serde_json::json!({
        "authUrl": "https://auth.example.com",
        "redirectUri": "https://app.example.com/cb"
    }));
    jwt_auth_cmd()
        .args(["url", "--client-id", "cli-app"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("code_challenge="))
        .stderr(predicate::str::contains("verifier: "));
}

#[test]
fn url_without_auth_url_fails() {
    let (_dir, config) = common::temp_settings_dir(serde_json::json!({}));
    jwt_auth_cmd()
        .args(["url", "--client-id", "a", "--redirect-uri", "b"])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("authUrl is not configured"));
}

#[test]
fn status_when_logged_out() {
    let (_dir, config) = common::temp_settings_dir(serde_json::json!({}));
    jwt_auth_cmd()
        .arg("status")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn status_shows_claims_then_logout_clears() {
    let (dir, config) = common::temp_settings_dir(serde_json::json!({}));
    let access = common::jwt(serde_json::json!({"sub": "user-1", "iss": "dots"}));
    std::fs::write(
        dir.path().join("storage.json"),
        serde_json::json!({"a_tkn": access, "a_rfsh": "refresh"}).to_string(),
    )
    .unwrap();

    jwt_auth_cmd()
        .arg("status")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Subject: user-1"))
        .stdout(predicate::str::contains("Issuer: dots"))
        .stdout(predicate::str::contains("Refresh token: stored"));

    jwt_auth_cmd()
        .arg("logout")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    jwt_auth_cmd()
        .arg("status")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn missing_config_file_is_reported() {
    jwt_auth_cmd()
        .args(["status", "--config", "/nonexistent/jwt-auth/config.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error in config"));
}

#[test]
fn json_flag_reports_error_object() {
    let (_dir, config) = common::temp_settings_dir(serde_json::json!({}));
    let output = jwt_auth_cmd()
        .args(["url", "--json", "--client-id", "a", "--redirect-uri", "b"])
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"]["code"], "not_configured");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("authUrl is not configured"));
    assert!(json["error"].get("status").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn request_reports_resource_status_not_auth_server() {
    let server = common::http_mock::start_guarded_server("A1").await;
    let (dir, config) = common::temp_settings_dir(serde_json::json!({}));
    std::fs::write(
        dir.path().join("storage.json"),
        serde_json::json!({"a_tkn": "A1", "a_rfsh": "R1"}).to_string(),
    )
    .unwrap();
    wiremock::Mock::given(wiremock::matchers::path("/broken"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = format!("{}/broken", server.uri());
    let output = tokio::task::spawn_blocking(move || {
        jwt_auth_cmd()
            .args(["request", "--json", url.as_str()])
            .arg("--config")
            .arg(&config)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let error_json = stdout
        .find("{\n")
        .map(|start| &stdout[start..])
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(error_json).unwrap();
    assert_eq!(json["error"]["code"], "unexpected_status");
    assert_eq!(json["error"]["status"], 503);
    assert!(!json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Auth server"));
    assert_eq!(
        common::http_mock::seen_bearers(&server).await,
        ["Bearer A1"]
    );
    drop(dir);
}
