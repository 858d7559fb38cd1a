//! Shared helpers for client integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mdmforge_client::{Credentials, JamfClient, MemoryStore};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn test_credentials() -> Credentials {
    Credentials {
        username: "admin".to_string(),
        password: SecretString::new("hunter2".into()),
    }
}

/// Client with an in-memory secret store and short timeouts.
pub fn build_client() -> JamfClient {
    JamfClient::builder()
        .secret_store(Arc::new(MemoryStore::new()))
        .request_timeout(Duration::from_secs(5))
        .resource_timeout(Duration::from_secs(10))
        .build()
        .expect("client should build")
}

/// Auth endpoint response body with an expiry relative to now.
pub fn auth_body(token: &str, expires_in_secs: i64) -> serde_json::Value {
    json!({
        "token": token,
        "expires": (Utc::now() + chrono::Duration::seconds(expires_in_secs)).to_rfc3339(),
    })
}

/// Mount the endpoints `connect` walks through: health check, token issue,
/// version lookup.
pub async fn mount_connect_endpoints(server: &MockServer, token: &str, expires_in_secs: i64) {
    Mock::given(method("GET"))
        .and(path("/healthCheck.html"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(token, expires_in_secs)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jamf-pro-version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"version": "11.5.1", "build-date": "2025-06-01"})),
        )
        .mount(server)
        .await;
}

/// A client already connected to the mock server, holding `token` with the
/// given remaining lifetime.
pub async fn connected_client(
    server: &MockServer,
    token: &str,
    expires_in_secs: i64,
) -> JamfClient {
    mount_connect_endpoints(server, token, expires_in_secs).await;
    let client = build_client();
    client
        .connect(&server.uri(), test_credentials())
        .await
        .expect("connect should succeed");
    client
}
