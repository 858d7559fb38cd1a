//! Bearer-token lifecycle with single-flight refresh.
//!
//! The manager tracks one token and its expiry. `ensure_valid` hands back the
//! stored token while it is comfortably inside its lifetime and refreshes it
//! once the expiry is within the lookahead window. At most one refresh is in
//! flight at a time: late-arriving callers await the existing attempt instead
//! of issuing their own, and the refresh runs on a detached task so a caller
//! abandoning its await does not tear the shared state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::error::{ApiError, Result};

/// Refresh the token once it is due to expire within this window.
pub const REFRESH_LOOKAHEAD_SECS: i64 = 300;

/// A bearer token and its server-assigned expiry.
#[derive(Clone)]
pub struct AuthToken {
    value: SecretString,
    expires: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(value: impl Into<String>, expires: DateTime<Utc>) -> Self {
        let value: String = value.into();
        Self {
            value: SecretString::new(value.into()),
            expires,
        }
    }

    /// The raw token for the `Authorization` header.
    pub fn bearer(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires
    }

    /// True once the expiry is within the refresh lookahead window.
    pub fn expires_soon(&self) -> bool {
        Utc::now() + Duration::seconds(REFRESH_LOOKAHEAD_SECS) >= self.expires
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"[REDACTED]")
            .field("expires", &self.expires)
            .finish()
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<AuthToken>>>;

#[derive(Default)]
struct TokenCell {
    token: Option<AuthToken>,
    refresh: Option<RefreshFuture>,
}

/// Shared token state. Cloning yields another handle to the same state.
#[derive(Clone, Default)]
pub struct TokenManager {
    cell: Arc<Mutex<TokenCell>>,
}

impl TokenManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TokenCell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a freshly issued token, replacing any previous one.
    pub fn install(&self, token: AuthToken) {
        self.lock().token = Some(token);
    }

    /// Drop the stored token. Any in-flight refresh still completes, but its
    /// result is discarded for state purposes by the waiters that observe it.
    pub fn clear(&self) {
        self.lock().token = None;
    }

    pub fn current(&self) -> Option<AuthToken> {
        self.lock().token.clone()
    }

    pub fn has_token(&self) -> bool {
        self.lock().token.is_some()
    }

    /// Return a token that is valid for at least the lookahead window,
    /// refreshing first when needed. `refresh` receives the current raw token
    /// and performs the keep-alive exchange.
    pub async fn ensure_valid<F>(&self, refresh: F) -> Result<AuthToken>
    where
        F: FnOnce(String) -> BoxFuture<'static, Result<AuthToken>>,
    {
        let wait = {
            let mut cell = self.lock();
            match &cell.token {
                None => return Err(ApiError::NotConnected),
                Some(token) if !token.expires_soon() => return Ok(token.clone()),
                Some(token) => {
                    debug!(expires = %token.expires(), "token near expiry, refreshing");
                    let bearer = token.bearer().to_string();
                    self.join_or_begin_refresh(&mut cell, refresh, bearer)
                }
            }
        };
        wait.await
    }

    /// Refresh unconditionally, joining an in-flight refresh if one exists.
    /// Used for the one permitted retry after a mid-call 401.
    pub async fn force_refresh<F>(&self, refresh: F) -> Result<AuthToken>
    where
        F: FnOnce(String) -> BoxFuture<'static, Result<AuthToken>>,
    {
        let wait = {
            let mut cell = self.lock();
            match &cell.token {
                None => return Err(ApiError::NotConnected),
                Some(token) => {
                    let bearer = token.bearer().to_string();
                    self.join_or_begin_refresh(&mut cell, refresh, bearer)
                }
            }
        };
        wait.await
    }

    fn join_or_begin_refresh<F>(
        &self,
        cell: &mut TokenCell,
        refresh: F,
        bearer: String,
    ) -> RefreshFuture
    where
        F: FnOnce(String) -> BoxFuture<'static, Result<AuthToken>>,
    {
        if let Some(inflight) = &cell.refresh {
            return inflight.clone();
        }

        let fut = refresh(bearer);
        let state = Arc::clone(&self.cell);
        // Detached task: the refresh outcome lands in shared state even if
        // every waiter is cancelled.
        let handle = tokio::spawn(async move {
            let result = fut.await;
            let mut cell = state.lock().unwrap_or_else(PoisonError::into_inner);
            cell.refresh = None;
            match &result {
                Ok(token) => cell.token = Some(token.clone()),
                Err(ApiError::TokenExpired) | Err(ApiError::AuthenticationFailed(_)) => {
                    warn!("token refresh rejected, clearing session");
                    cell.token = None;
                }
                Err(err) => warn!(error = %err, "token refresh failed"),
            }
            result
        });

        let shared: RefreshFuture = async move {
            handle
                .await
                .unwrap_or_else(|err| Err(ApiError::TokenRefreshFailed(err.to_string())))
        }
        .boxed()
        .shared();
        cell.refresh = Some(shared.clone());
        shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token_expiring_in(seconds: i64) -> AuthToken {
        AuthToken::new("tok-1", Utc::now() + Duration::seconds(seconds))
    }

    #[test]
    fn test_expiry_windows() {
        assert!(!token_expiring_in(3600).expires_soon());
        assert!(token_expiring_in(240).expires_soon());
        assert!(token_expiring_in(-1).is_expired());
        assert!(token_expiring_in(240).expires_soon() && !token_expiring_in(240).is_expired());
    }

    #[test]
    fn test_debug_redacts_token_value() {
        let token = token_expiring_in(3600);
        assert!(!format!("{token:?}").contains("tok-1"));
    }

    #[tokio::test]
    async fn test_ensure_valid_without_token_fails() {
        let manager = TokenManager::new();
        let err = manager
            .ensure_valid(|_| async { panic!("refresh must not run") }.boxed())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::NotConnected);
    }

    #[tokio::test]
    async fn test_fresh_token_skips_refresh() {
        let manager = TokenManager::new();
        manager.install(token_expiring_in(3600));

        let token = manager
            .ensure_valid(|_| async { panic!("refresh must not run") }.boxed())
            .await
            .unwrap();
        assert_eq!(token.bearer(), "tok-1");
    }

    #[tokio::test]
    async fn test_near_expiry_token_is_refreshed() {
        let manager = TokenManager::new();
        manager.install(token_expiring_in(240));

        let token = manager
            .ensure_valid(|old| {
                async move {
                    assert_eq!(old, "tok-1");
                    Ok(AuthToken::new("tok-2", Utc::now() + Duration::seconds(1800)))
                }
                .boxed()
            })
            .await
            .unwrap();

        assert_eq!(token.bearer(), "tok-2");
        assert_eq!(manager.current().unwrap().bearer(), "tok-2");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let manager = TokenManager::new();
        manager.install(token_expiring_in(240));

        let calls = Arc::new(AtomicUsize::new(0));
        let refresh = |calls: Arc<AtomicUsize>| {
            move |_old: String| {
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    Ok(AuthToken::new("tok-2", Utc::now() + Duration::seconds(1800)))
                }
                .boxed()
            }
        };

        let (a, b) = tokio::join!(
            manager.ensure_valid(refresh(calls.clone())),
            manager.ensure_valid(refresh(calls.clone())),
        );

        assert_eq!(a.unwrap().bearer(), "tok-2");
        assert_eq!(b.unwrap().bearer(), "tok-2");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_refresh_still_lands() {
        let manager = TokenManager::new();
        manager.install(token_expiring_in(240));

        let worker = manager.clone();
        let waiter = tokio::spawn(async move {
            worker
                .ensure_valid(|_| {
                    async move {
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        Ok(AuthToken::new("tok-2", Utc::now() + Duration::seconds(1800)))
                    }
                    .boxed()
                })
                .await
        });
        // Let the waiter start the refresh, then cancel it mid-flight.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        waiter.abort();

        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        assert_eq!(manager.current().unwrap().bearer(), "tok-2");
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_token() {
        let manager = TokenManager::new();
        manager.install(token_expiring_in(240));

        let err = manager
            .ensure_valid(|_| async { Err(ApiError::TokenExpired) }.boxed())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::TokenExpired);
        assert!(!manager.has_token());
    }

    #[tokio::test]
    async fn test_force_refresh_ignores_remaining_lifetime() {
        let manager = TokenManager::new();
        manager.install(token_expiring_in(3600));

        let token = manager
            .force_refresh(|_| {
                async move { Ok(AuthToken::new("tok-2", Utc::now() + Duration::seconds(1800))) }
                    .boxed()
            })
            .await
            .unwrap();
        assert_eq!(token.bearer(), "tok-2");
    }
}
