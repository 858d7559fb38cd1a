//! Profile upload, list, scope and delete operations.

mod common;

use common::{auth_body, build_client, connected_client};
use mdmforge_client::{ApiError, ProfileScopeUpdate};
use mdmforge_model::{Payload, Profile, WifiPayload};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROFILES_PATH: &str = "/api/v1/os-x-configuration-profiles";

fn sample_profile() -> Profile {
    let mut profile = Profile::new("Office Wi-Fi", Some("com.example.office"), "Example Corp");
    profile.description = "Corporate wireless".to_string();
    profile.add_payload(Payload::Wifi(WifiPayload::new(
        "com.example.office.wifi",
        "Office Wi-Fi",
        "CorpNet",
    )));
    profile
}

#[tokio::test]
async fn upload_returns_remote_identity() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("POST"))
        .and(path(PROFILES_PATH))
        .and(body_partial_json(json!({
            "general": {"name": "Office Wi-Fi", "level": "User"}
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 101, "name": "Office Wi-Fi"})),
        )
        .mount(&server)
        .await;

    let created = client.upload_profile(&sample_profile()).await.unwrap();
    assert_eq!(created.id, 101);
    assert_eq!(created.name, "Office Wi-Fi");
}

#[tokio::test]
async fn upload_name_collision_maps_to_409() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("POST"))
        .and(path(PROFILES_PATH))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let err = client.upload_profile(&sample_profile()).await.unwrap_err();
    assert_eq!(err, ApiError::UploadFailed(409));
}

#[tokio::test]
async fn upload_bad_request_maps_to_400() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("POST"))
        .and(path(PROFILES_PATH))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let err = client.upload_profile(&sample_profile()).await.unwrap_err();
    assert_eq!(err, ApiError::UploadFailed(400));
}

#[tokio::test]
async fn invalid_profile_never_reaches_the_network() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("POST"))
        .and(path(PROFILES_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut profile = sample_profile();
    if let Payload::Wifi(wifi) = &mut profile.payloads[0] {
        wifi.ssid = String::new();
    }

    let err = client.upload_profile(&profile).await.unwrap_err();
    match err {
        ApiError::Validation(violations) => {
            assert!(violations[0].contains("SSID is required"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_retries_once_with_a_refreshed_token() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("POST"))
        .and(path(PROFILES_PATH))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/keep-alive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-2", 1800)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PROFILES_PATH))
        .and(header("Authorization", "Bearer tok-2"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 102, "name": "Office Wi-Fi"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = client.upload_profile(&sample_profile()).await.unwrap();
    assert_eq!(created.id, 102);
    assert!(client.is_connected());
}

#[tokio::test]
async fn second_401_surfaces_token_expired_and_disconnects() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("POST"))
        .and(path(PROFILES_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/keep-alive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("tok-2", 1800)))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.upload_profile(&sample_profile()).await.unwrap_err();
    assert_eq!(err, ApiError::TokenExpired);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn list_profiles_parses_results() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("GET"))
        .and(path(PROFILES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalCount": 2,
            "results": [
                {"id": 101, "name": "Office Wi-Fi", "level": "System"},
                {"id": 102, "name": "Field VPN", "description": "IKEv2"}
            ]
        })))
        .mount(&server)
        .await;

    let list = client.list_profiles().await.unwrap();
    assert_eq!(list.total_count, 2);
    assert_eq!(list.results[0].id, 101);
    assert_eq!(list.results[0].name, "Office Wi-Fi");
    assert_eq!(list.results[1].id, 102);
    assert_eq!(list.results[1].description.as_deref(), Some("IKEv2"));
}

#[tokio::test]
async fn update_scope_sends_camel_case_body() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("PUT"))
        .and(path(format!("{PROFILES_PATH}/101")))
        .and(body_partial_json(json!({
            "targets": {"allDevices": true}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .update_scope(101, &ProfileScopeUpdate::all_devices())
        .await
        .unwrap();
}

#[tokio::test]
async fn update_scope_failure_is_typed() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("PUT"))
        .and(path(format!("{PROFILES_PATH}/999")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client
        .update_scope(999, &ProfileScopeUpdate::all_devices())
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::ScopeAssignmentFailed(404));
}

#[tokio::test]
async fn delete_profile_accepts_204() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{PROFILES_PATH}/101")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_profile(101).await.unwrap();
}

#[tokio::test]
async fn delete_profile_failure_is_typed() {
    let server = MockServer::start().await;
    let client = connected_client(&server, "tok-1", 1800).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{PROFILES_PATH}/999")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.delete_profile(999).await.unwrap_err();
    assert_eq!(err, ApiError::DeleteFailed(404));
}

#[tokio::test]
async fn disconnected_upload_fails_not_connected_before_validation() {
    let client = build_client();

    let mut profile = sample_profile();
    if let Payload::Wifi(wifi) = &mut profile.payloads[0] {
        wifi.ssid = String::new();
    }

    // The session check comes first; validation is not even consulted.
    let err = client.upload_profile(&profile).await.unwrap_err();
    assert_eq!(err, ApiError::NotConnected);
}
