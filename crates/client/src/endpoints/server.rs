//! Server liveness and version endpoints.

use crate::error::{ApiError, Result};
use crate::models::VersionInfo;

use super::{api_url, parse_json};

/// Unauthenticated liveness check.
pub async fn health_check(http: &reqwest::Client, base_url: &str) -> Result<()> {
    let response = http
        .get(api_url(base_url, "/healthCheck.html"))
        .send()
        .await
        .map_err(|err| ApiError::network(&err))?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::ServerUnreachable(format!(
            "health check returned status {}",
            status.as_u16()
        )))
    }
}

/// Fetch the server's version info.
pub async fn version(
    http: &reqwest::Client,
    base_url: &str,
    token: &str,
) -> Result<VersionInfo> {
    let response = http
        .get(api_url(base_url, "/api/v1/jamf-pro-version"))
        .bearer_auth(token)
        .send()
        .await
        .map_err(|err| ApiError::network(&err))?;

    let status = response.status();
    match status.as_u16() {
        200 => parse_json(response).await,
        401 => Err(ApiError::TokenExpired),
        code => Err(ApiError::RequestFailed(code)),
    }
}
