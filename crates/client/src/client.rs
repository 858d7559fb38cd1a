//! Management API client.
//!
//! Owns the HTTP transport, the token lifecycle and the connection session.
//! Safe for concurrent use: callers share the client behind `Arc`, the token
//! manager serializes refreshes, and connection state changes are broadcast
//! through a watch channel.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::FutureExt;
use futures::future::BoxFuture;
use mdmforge_model::Profile;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::auth::{AuthToken, TokenManager};
use crate::endpoints;
use crate::error::{ApiError, Result};
use crate::models::{
    ConnectionStatus, Credentials, ProfileGeneral, ProfileScopeUpdate, ProfileUpload,
    RemoteProfileList, RemoteProfileResponse, ServerInfo,
};
use crate::secret_store::{KeyringStore, SecretStore};
use crate::settings::ClientSettings;

/// Builder for creating a new [`JamfClient`].
pub struct JamfClientBuilder {
    secret_store: Option<Arc<dyn SecretStore>>,
    request_timeout: Duration,
    resource_timeout: Duration,
}

impl Default for JamfClientBuilder {
    fn default() -> Self {
        Self {
            secret_store: None,
            request_timeout: Duration::from_secs(30),
            resource_timeout: Duration::from_secs(60),
        }
    }
}

impl JamfClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take timeouts from settings.
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            secret_store: None,
            request_timeout: settings.request_timeout,
            resource_timeout: settings.resource_timeout,
        }
    }

    /// Inject a secret store. Defaults to the OS credential vault.
    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    /// Per-request timeout applied by the transport.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Total-operation timeout applied around every endpoint call.
    pub fn resource_timeout(mut self, timeout: Duration) -> Self {
        self.resource_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<JamfClient> {
        let http = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|err| ApiError::ServerUnreachable(err.to_string()))?;

        let (status, _) = watch::channel(ConnectionStatus::Disconnected);

        Ok(JamfClient {
            http,
            tokens: TokenManager::new(),
            secrets: self
                .secret_store
                .unwrap_or_else(|| Arc::new(KeyringStore::new())),
            session: Mutex::new(Session::default()),
            status,
            resource_timeout: self.resource_timeout,
        })
    }
}

#[derive(Default)]
struct Session {
    base_url: Option<String>,
    server_info: Option<ServerInfo>,
}

/// Async client for a device management server.
pub struct JamfClient {
    http: reqwest::Client,
    tokens: TokenManager,
    secrets: Arc<dyn SecretStore>,
    session: Mutex<Session>,
    status: watch::Sender<ConnectionStatus>,
    resource_timeout: Duration,
}

impl JamfClient {
    pub fn builder() -> JamfClientBuilder {
        JamfClientBuilder::new()
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to connection status changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn server_info(&self) -> Option<ServerInfo> {
        self.session().server_info.clone()
    }

    pub fn base_url(&self) -> Option<String> {
        self.session().base_url.clone()
    }

    /// Validate the URL, check the server is reachable, authenticate and fetch server
    /// info. Connected state flips to true only after every step succeeds;
    /// a failure at any step leaves the client disconnected.
    pub async fn connect(
        &self,
        server_url: &str,
        credentials: Credentials,
    ) -> Result<ServerInfo> {
        let base_url = normalize_server_url(server_url)?;
        self.status.send_replace(ConnectionStatus::Connecting);

        match self.try_connect(&base_url, &credentials).await {
            Ok(info) => {
                self.status.send_replace(ConnectionStatus::Connected);
                Ok(info)
            }
            Err(err) => {
                self.tokens.clear();
                *self.session() = Session::default();
                self.status.send_replace(ConnectionStatus::Failed);
                Err(err)
            }
        }
    }

    async fn try_connect(&self, base_url: &str, credentials: &Credentials) -> Result<ServerInfo> {
        self.bounded(endpoints::server::health_check(&self.http, base_url))
            .await?;

        let token = self
            .bounded(endpoints::auth::request_token(
                &self.http, base_url, credentials,
            ))
            .await?;

        let version = self
            .bounded(endpoints::server::version(
                &self.http,
                base_url,
                token.bearer(),
            ))
            .await?;

        self.secrets.put(
            &credential_key(base_url, "username"),
            &SecretString::new(credentials.username.clone().into()),
        )?;
        self.secrets.put(
            &credential_key(base_url, "password"),
            &credentials.password,
        )?;

        self.tokens.install(token);
        let info = ServerInfo {
            url: base_url.to_string(),
            version,
        };
        {
            let mut session = self.session();
            session.base_url = Some(base_url.to_string());
            session.server_info = Some(info.clone());
        }

        info!(server = %base_url, version = %info.version.version, "connected");
        Ok(info)
    }

    /// Revoke the token server-side and clear all local session state.
    ///
    /// Revocation is best-effort: a network failure is logged and the local
    /// cleanup still runs.
    pub async fn disconnect(&self) {
        let base_url = self.base_url();
        let token = self.tokens.current();

        if let (Some(base_url), Some(token)) = (&base_url, &token)
            && let Err(err) = self
                .bounded(endpoints::auth::invalidate(
                    &self.http,
                    base_url,
                    token.bearer(),
                ))
                .await
        {
            warn!(error = %err, "token invalidation failed, clearing local state anyway");
        }

        if let Some(base_url) = &base_url {
            for field in ["username", "password"] {
                if let Err(err) = self.secrets.delete(&credential_key(base_url, field)) {
                    warn!(error = %err, "failed to remove stored credential");
                }
            }
        }

        self.tokens.clear();
        *self.session() = Session::default();
        self.status.send_replace(ConnectionStatus::Disconnected);
        info!("disconnected");
    }

    /// Credentials previously stored for a server, if any.
    pub fn stored_credentials(&self, server_url: &str) -> Result<Option<Credentials>> {
        let base_url = normalize_server_url(server_url)?;
        let username = self.secrets.get(&credential_key(&base_url, "username"))?;
        let password = self.secrets.get(&credential_key(&base_url, "password"))?;
        Ok(match (username, password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.expose_secret().to_string(),
                password,
            }),
            _ => None,
        })
    }

    /// Upload a profile: token check first, then validate and serialize.
    /// A disconnected caller sees `NotConnected` even for an invalid profile.
    pub async fn upload_profile(&self, profile: &Profile) -> Result<RemoteProfileResponse> {
        let base_url = self.base_url().ok_or(ApiError::NotConnected)?;
        let token = self.ensure_valid().await?;

        let violations = profile.validate();
        if !violations.is_empty() {
            return Err(ApiError::Validation(violations));
        }

        let bytes = mdmforge_model::plist::encode(profile)?;
        let body = ProfileUpload {
            general: ProfileGeneral {
                name: profile.display_name.clone(),
                description: profile.description.clone(),
                level: profile.scope.as_str().to_string(),
                payloads: BASE64.encode(&bytes),
            },
        };

        let result = self
            .bounded(endpoints::profiles::upload(
                &self.http,
                &base_url,
                token.bearer(),
                &body,
            ))
            .await;

        match result {
            Err(ApiError::TokenExpired) => {
                info!("token rejected during upload, refreshing and retrying once");
                let token = self.refreshed_token().await?;
                match self
                    .bounded(endpoints::profiles::upload(
                        &self.http,
                        &base_url,
                        token.bearer(),
                        &body,
                    ))
                    .await
                {
                    Err(ApiError::TokenExpired) => Err(self.drop_session()),
                    other => other,
                }
            }
            other => other,
        }
    }

    /// List profiles on the server.
    pub async fn list_profiles(&self) -> Result<RemoteProfileList> {
        let base_url = self.base_url().ok_or(ApiError::NotConnected)?;
        let token = self.ensure_valid().await?;

        let result = self
            .bounded(endpoints::profiles::list(
                &self.http,
                &base_url,
                token.bearer(),
            ))
            .await;

        match result {
            Err(ApiError::TokenExpired) => {
                info!("token rejected during list, refreshing and retrying once");
                let token = self.refreshed_token().await?;
                match self
                    .bounded(endpoints::profiles::list(
                        &self.http,
                        &base_url,
                        token.bearer(),
                    ))
                    .await
                {
                    Err(ApiError::TokenExpired) => Err(self.drop_session()),
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Replace the scope of a profile on the server.
    pub async fn update_scope(&self, remote_id: u32, scope: &ProfileScopeUpdate) -> Result<()> {
        let base_url = self.base_url().ok_or(ApiError::NotConnected)?;
        let token = self.ensure_valid().await?;

        let result = self
            .bounded(endpoints::profiles::update_scope(
                &self.http,
                &base_url,
                token.bearer(),
                remote_id,
                scope,
            ))
            .await;

        match result {
            Err(ApiError::TokenExpired) => {
                info!("token rejected during scope update, refreshing and retrying once");
                let token = self.refreshed_token().await?;
                match self
                    .bounded(endpoints::profiles::update_scope(
                        &self.http,
                        &base_url,
                        token.bearer(),
                        remote_id,
                        scope,
                    ))
                    .await
                {
                    Err(ApiError::TokenExpired) => Err(self.drop_session()),
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Delete a profile from the server.
    pub async fn delete_profile(&self, remote_id: u32) -> Result<()> {
        let base_url = self.base_url().ok_or(ApiError::NotConnected)?;
        let token = self.ensure_valid().await?;

        let result = self
            .bounded(endpoints::profiles::delete(
                &self.http,
                &base_url,
                token.bearer(),
                remote_id,
            ))
            .await;

        match result {
            Err(ApiError::TokenExpired) => {
                info!("token rejected during delete, refreshing and retrying once");
                let token = self.refreshed_token().await?;
                match self
                    .bounded(endpoints::profiles::delete(
                        &self.http,
                        &base_url,
                        token.bearer(),
                        remote_id,
                    ))
                    .await
                {
                    Err(ApiError::TokenExpired) => Err(self.drop_session()),
                    other => other,
                }
            }
            other => other,
        }
    }

    /// A token valid for at least the refresh lookahead window.
    async fn ensure_valid(&self) -> Result<AuthToken> {
        let refresh = self.keep_alive_refresh()?;
        match self.tokens.ensure_valid(refresh).await {
            Err(err @ (ApiError::TokenExpired | ApiError::AuthenticationFailed(_))) => {
                self.drop_session();
                Err(err)
            }
            other => other,
        }
    }

    /// Force a refresh for the one permitted mid-call retry.
    async fn refreshed_token(&self) -> Result<AuthToken> {
        let refresh = self.keep_alive_refresh()?;
        match self.tokens.force_refresh(refresh).await {
            Err(err @ (ApiError::TokenExpired | ApiError::AuthenticationFailed(_))) => {
                self.drop_session();
                Err(err)
            }
            other => other,
        }
    }

    fn keep_alive_refresh(
        &self,
    ) -> Result<impl FnOnce(String) -> BoxFuture<'static, Result<AuthToken>> + use<>> {
        let http = self.http.clone();
        let base_url = self.base_url().ok_or(ApiError::NotConnected)?;
        Ok(move |token: String| {
            async move { endpoints::auth::keep_alive(&http, &base_url, &token).await }.boxed()
        })
    }

    /// Tear down local session state after an unrecoverable token rejection.
    /// Stored credentials are kept so the caller can reconnect.
    fn drop_session(&self) -> ApiError {
        warn!("session no longer valid, dropping local state");
        self.tokens.clear();
        *self.session() = Session::default();
        self.status.send_replace(ConnectionStatus::Disconnected);
        ApiError::TokenExpired
    }

    /// Cap an endpoint call at the total-resource timeout.
    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.resource_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::ServerUnreachable(format!(
                "operation exceeded {:?}",
                self.resource_timeout
            ))),
        }
    }
}

/// Syntactic URL validation plus trailing-slash normalization.
fn normalize_server_url(server_url: &str) -> Result<String> {
    let parsed = url::Url::parse(server_url)
        .map_err(|err| ApiError::InvalidUrl(format!("{server_url}: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl(format!(
            "{server_url}: unsupported scheme {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(ApiError::InvalidUrl(format!("{server_url}: missing host")));
    }
    Ok(server_url.trim_end_matches('/').to_string())
}

fn credential_key(base_url: &str, field: &str) -> String {
    format!("{base_url}#{field}")
}
