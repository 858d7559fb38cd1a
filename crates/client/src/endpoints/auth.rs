//! Token endpoints: issue, keep-alive, invalidate.

use secrecy::ExposeSecret;
use tracing::debug;

use crate::auth::AuthToken;
use crate::error::{ApiError, Result};
use crate::models::{AuthResponse, Credentials};

use super::{api_url, parse_json};

/// Exchange Basic-auth credentials for a bearer token.
pub async fn request_token(
    http: &reqwest::Client,
    base_url: &str,
    credentials: &Credentials,
) -> Result<AuthToken> {
    let response = http
        .post(api_url(base_url, "/api/v1/auth/token"))
        .basic_auth(
            &credentials.username,
            Some(credentials.password.expose_secret()),
        )
        .send()
        .await
        .map_err(|err| ApiError::network(&err))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::AuthenticationFailed(status.as_u16()));
    }

    let body: AuthResponse = parse_json(response).await?;
    debug!(expires = %body.expires, "token issued");
    Ok(AuthToken::new(body.token, body.expires))
}

/// Trade the current token for a fresh one before it expires.
pub async fn keep_alive(
    http: &reqwest::Client,
    base_url: &str,
    token: &str,
) -> Result<AuthToken> {
    let response = http
        .post(api_url(base_url, "/api/v1/auth/keep-alive"))
        .bearer_auth(token)
        .send()
        .await
        .map_err(|err| ApiError::network(&err))?;

    let status = response.status();
    match status.as_u16() {
        200 => {
            let body: AuthResponse = parse_json(response).await?;
            debug!(expires = %body.expires, "token refreshed");
            Ok(AuthToken::new(body.token, body.expires))
        }
        401 => Err(ApiError::TokenExpired),
        code => Err(ApiError::TokenRefreshFailed(format!(
            "keep-alive returned status {code}"
        ))),
    }
}

/// Revoke the token server-side. 204 on success.
pub async fn invalidate(http: &reqwest::Client, base_url: &str, token: &str) -> Result<()> {
    let response = http
        .post(api_url(base_url, "/api/v1/auth/invalidate-token"))
        .bearer_auth(token)
        .send()
        .await
        .map_err(|err| ApiError::network(&err))?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::RequestFailed(status.as_u16()))
    }
}
