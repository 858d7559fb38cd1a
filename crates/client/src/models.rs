//! Wire types for the management API.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Response body of the token and keep-alive endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// Response body of the server-version endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VersionInfo {
    pub version: String,
    #[serde(rename = "build-date", default)]
    pub build_date: Option<String>,
}

/// What the client knows about the connected server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub url: String,
    pub version: VersionInfo,
}

/// Login credentials for a management server.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Connection state, observable through [`crate::JamfClient::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// A profile as listed by the server.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProfile {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub distribution_method: Option<String>,
}

/// Paged list response for the profile collection endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProfileList {
    pub total_count: u64,
    pub results: Vec<RemoteProfile>,
}

/// Server acknowledgement of a profile upload.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteProfileResponse {
    pub id: u32,
    pub name: String,
}

/// Upload envelope wrapping the serialized profile bytes.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpload {
    pub general: ProfileGeneral,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileGeneral {
    pub name: String,
    pub description: String,
    /// Deployment level, `User` or `System`.
    pub level: String,
    /// Base64-encoded property-list bytes.
    pub payloads: String,
}

/// Device targets a profile is scoped to.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeTargets {
    pub all_devices: bool,
    pub device_ids: Vec<String>,
    pub device_group_ids: Vec<String>,
    pub site_ids: Vec<String>,
    pub org_unit_ids: Vec<String>,
}

/// Device targets excluded from a profile's scope. Mirrors the inclusion
/// collections.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeExclusions {
    pub device_ids: Vec<String>,
    pub device_group_ids: Vec<String>,
    pub site_ids: Vec<String>,
    pub org_unit_ids: Vec<String>,
}

/// Scope update request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileScopeUpdate {
    pub targets: ScopeTargets,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<ScopeExclusions>,
}

impl ProfileScopeUpdate {
    /// Scope covering every enrolled device.
    pub fn all_devices() -> Self {
        Self {
            targets: ScopeTargets {
                all_devices: true,
                ..ScopeTargets::default()
            },
            exclusions: None,
        }
    }

    /// Scope covering an explicit device list.
    pub fn devices(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            targets: ScopeTargets {
                device_ids: ids.into_iter().collect(),
                ..ScopeTargets::default()
            },
            exclusions: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "admin".to_string(),
            password: SecretString::new("hunter2".into()),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_profile_list_deserializes_wire_shape() {
        let body = serde_json::json!({
            "totalCount": 2,
            "results": [
                {"id": 101, "name": "Office Wi-Fi", "level": "System"},
                {"id": 102, "name": "VPN", "description": "Field VPN",
                 "distributionMethod": "Install Automatically"}
            ]
        });
        let list: RemoteProfileList = serde_json::from_value(body).unwrap();
        assert_eq!(list.total_count, 2);
        assert_eq!(list.results[0].id, 101);
        assert_eq!(list.results[0].level.as_deref(), Some("System"));
        assert_eq!(
            list.results[1].distribution_method.as_deref(),
            Some("Install Automatically")
        );
    }

    #[test]
    fn test_scope_update_serializes_camel_case() {
        let scope = ProfileScopeUpdate::devices(["12".to_string(), "15".to_string()]);
        let value = serde_json::to_value(&scope).unwrap();
        assert_eq!(value["targets"]["allDevices"], false);
        assert_eq!(value["targets"]["deviceIds"][1], "15");
        assert_eq!(value["targets"]["siteIds"], serde_json::json!([]));
        assert_eq!(value["targets"]["orgUnitIds"], serde_json::json!([]));
        assert!(value.get("exclusions").is_none());
    }

    #[test]
    fn test_scope_exclusions_mirror_inclusion_collections() {
        let scope = ProfileScopeUpdate {
            targets: ScopeTargets {
                org_unit_ids: vec!["7".to_string()],
                ..ScopeTargets::default()
            },
            exclusions: Some(ScopeExclusions {
                site_ids: vec!["3".to_string()],
                org_unit_ids: vec!["9".to_string()],
                ..ScopeExclusions::default()
            }),
        };
        let value = serde_json::to_value(&scope).unwrap();
        assert_eq!(value["targets"]["orgUnitIds"][0], "7");
        assert_eq!(value["exclusions"]["siteIds"][0], "3");
        assert_eq!(value["exclusions"]["orgUnitIds"][0], "9");
        assert_eq!(value["exclusions"]["deviceIds"], serde_json::json!([]));
        assert_eq!(value["exclusions"]["deviceGroupIds"], serde_json::json!([]));
    }
}
