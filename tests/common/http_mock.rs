use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A resource at `GET /data` that only accepts `Bearer {valid}`; anything
/// else gets a 401.
#[allow(dead_code)]
pub async fn start_guarded_server(valid: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_guarded(&server, valid).await;
    server
}

#[allow(dead_code)]
pub async fn mount_guarded(server: &MockServer, valid: &str) {
    Mock::given(method("GET"))
        .and(path("/data"))
        .and(header("Authorization", format!("Bearer {valid}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("protected data"))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .with_priority(2)
        .mount(server)
        .await;
}

/// Bearer values of every request the server has seen, in arrival order.
#[allow(dead_code)]
pub async fn seen_bearers(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| r.headers.get("Authorization"))
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect()
}
