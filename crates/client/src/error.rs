//! Error types for the management API client.
//!
//! Every public client operation resolves to either a success value or one of
//! these variants. The enum is `Clone` because an in-flight token refresh is
//! shared between concurrent waiters, each of which receives its outcome.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur during management API operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The server URL could not be parsed.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// An authenticated operation was attempted without a session.
    #[error("Not connected to a server")]
    NotConnected,

    /// The server responded with a body the client could not interpret.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// The credential exchange was rejected.
    #[error("Authentication failed (status {0})")]
    AuthenticationFailed(u16),

    /// Network failure or timeout reaching the server.
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    /// The bearer token was rejected and could not be renewed.
    #[error("Session token expired")]
    TokenExpired,

    /// The keep-alive call failed for a reason other than token rejection.
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Profile upload rejected by the server.
    #[error("Profile upload failed (status {0})")]
    UploadFailed(u16),

    /// A read request returned a non-success status.
    #[error("Request failed (status {0})")]
    RequestFailed(u16),

    /// Profile deletion rejected by the server.
    #[error("Profile deletion failed (status {0})")]
    DeleteFailed(u16),

    /// Scope update rejected by the server.
    #[error("Scope assignment failed (status {0})")]
    ScopeAssignmentFailed(u16),

    /// The secret store could not be read or written.
    #[error("Secret storage error: {0}")]
    Storage(String),

    /// The profile failed validation before upload.
    #[error("Profile validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The profile could not be serialized for upload.
    #[error("Profile serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Wrap a transport-level failure. Timeouts and connection errors both
    /// land here; callers never need to distinguish them.
    pub(crate) fn network(err: &reqwest::Error) -> Self {
        Self::ServerUnreachable(err.to_string())
    }

    /// Check if this error indicates the session is no longer usable.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::TokenExpired | Self::NotConnected
        )
    }
}

impl From<keyring::Error> for ApiError {
    fn from(err: keyring::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<mdmforge_model::ModelError> for ApiError {
    fn from(err: mdmforge_model::ModelError) -> Self {
        match err {
            mdmforge_model::ModelError::Validation(violations) => Self::Validation(violations),
            other => Self::Serialization(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_auth_error() {
        assert!(ApiError::AuthenticationFailed(401).is_auth_error());
        assert!(ApiError::TokenExpired.is_auth_error());
        assert!(ApiError::NotConnected.is_auth_error());
        assert!(!ApiError::UploadFailed(409).is_auth_error());
        assert!(!ApiError::ServerUnreachable("refused".to_string()).is_auth_error());
    }

    #[test]
    fn test_validation_error_joins_messages() {
        let err = ApiError::Validation(vec![
            "SSID is required".to_string(),
            "Server is required".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Profile validation failed: SSID is required; Server is required"
        );
    }

    #[test]
    fn test_model_error_conversion() {
        let err: ApiError =
            mdmforge_model::ModelError::Validation(vec!["SSID is required".to_string()]).into();
        assert!(matches!(err, ApiError::Validation(_)));

        let err: ApiError =
            mdmforge_model::ModelError::Serialization("truncated".to_string()).into();
        assert!(matches!(err, ApiError::Serialization(_)));
    }
}
