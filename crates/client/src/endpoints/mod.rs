//! HTTP endpoint functions for the management API.
//!
//! Each function performs one request and maps the response status to the
//! typed error taxonomy. Session handling and retries live in the client.

pub mod auth;
pub mod profiles;
pub mod server;

use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};

/// Join a base URL and an endpoint path without doubling slashes.
pub(crate) fn api_url(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

/// Decode a JSON response body, surfacing malformed bodies as
/// [`ApiError::InvalidResponse`].
pub(crate) async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::InvalidResponse(err.to_string()))
}
