//! Async client for a JAMF-style device management API.
//!
//! Handles the full session lifecycle: connect (health check, authenticate, fetch
//! server info), bearer-token keep-alive with single-flight refresh, profile
//! upload/list/scope/delete, and best-effort disconnect. Credentials persist
//! in a pluggable [`SecretStore`] backed by the OS credential vault.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod secret_store;
pub mod settings;

pub use auth::{AuthToken, REFRESH_LOOKAHEAD_SECS, TokenManager};
pub use client::{JamfClient, JamfClientBuilder};
pub use error::{ApiError, Result};
pub use models::{
    ConnectionStatus, Credentials, ProfileScopeUpdate, RemoteProfile, RemoteProfileList,
    RemoteProfileResponse, ScopeExclusions, ScopeTargets, ServerInfo, VersionInfo,
};
pub use secret_store::{KEYRING_SERVICE, KeyringStore, MemoryStore, SecretStore};
pub use settings::ClientSettings;
