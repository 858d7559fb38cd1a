//! Configuration profile endpoints.

use tracing::debug;

use crate::error::{ApiError, Result};
use crate::models::{ProfileScopeUpdate, ProfileUpload, RemoteProfileList, RemoteProfileResponse};

use super::{api_url, parse_json};

const PROFILES_PATH: &str = "/api/v1/os-x-configuration-profiles";

/// Upload a serialized profile. 201 on success.
pub async fn upload(
    http: &reqwest::Client,
    base_url: &str,
    token: &str,
    body: &ProfileUpload,
) -> Result<RemoteProfileResponse> {
    let response = http
        .post(api_url(base_url, PROFILES_PATH))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .map_err(|err| ApiError::network(&err))?;

    let status = response.status();
    match status.as_u16() {
        201 => {
            let created: RemoteProfileResponse = parse_json(response).await?;
            debug!(id = %created.id, name = %created.name, "profile uploaded");
            Ok(created)
        }
        401 => Err(ApiError::TokenExpired),
        code => Err(ApiError::UploadFailed(code)),
    }
}

/// List profiles known to the server.
pub async fn list(
    http: &reqwest::Client,
    base_url: &str,
    token: &str,
) -> Result<RemoteProfileList> {
    let response = http
        .get(api_url(base_url, PROFILES_PATH))
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

/// Replace a remote profile's scope. 200 or 204 on success.
pub async fn update_scope(
    http: &reqwest::Client,
    base_url: &str,
    token: &str,
    remote_id: u32,
    scope: &ProfileScopeUpdate,
) -> Result<()> {
    let response = http
        .put(api_url(base_url, &format!("{PROFILES_PATH}/{remote_id}")))
        .bearer_auth(token)
        .json(scope)
        .send()
        .await
        .map_err(|err| ApiError::network(&err))?;

    match response.status().as_u16() {
        200 | 204 => Ok(()),
        401 => Err(ApiError::TokenExpired),
        code => Err(ApiError::ScopeAssignmentFailed(code)),
    }
}

/// Delete a remote profile. 204 on success.
pub async fn delete(
    http: &reqwest::Client,
    base_url: &str,
    token: &str,
    remote_id: u32,
) -> Result<()> {
    let response = http
        .delete(api_url(base_url, &format!("{PROFILES_PATH}/{remote_id}")))
        .bearer_auth(token)
        .send()
        .await
        .map_err(|err| ApiError::network(&err))?;

    match response.status().as_u16() {
        204 => Ok(()),
        401 => Err(ApiError::TokenExpired),
        code => Err(ApiError::DeleteFailed(code)),
    }
}
