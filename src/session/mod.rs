// Session context: the caller-owned credential plus its refresh policy.
//
// The credential store sits behind a tokio Mutex that is held across the
// whole "check expired, refresh, write back" section, so two in-flight
// requests that both see an expired token produce exactly one refresh call.
// Everything else reads the already-current credential afterwards.
//
// Replay policy for rejected tokens: refresh once, replay the operation once,
// and escalate a second AccessTokenExpired to the caller unchanged. An
// up-front refresh of an expired token counts as that one refresh.

pub mod credential;
pub mod storage;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::youtube::error::ApiError;

pub use credential::{Credential, CredentialStore, TokenGrant};

/// Exchanges a refresh token for a new grant. Implemented by the OAuth client;
/// tests substitute a counting stub.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError>;
}

pub struct Session {
    store: Mutex<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
}

impl Session {
    pub fn new(credential: Credential, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store: Mutex::new(CredentialStore::new(credential)),
            refresher,
        }
    }

    /// Snapshot of the current credential. A cleared session has no usable
    /// token, which callers handle like an expired one (re-authorize).
    pub async fn current(&self) -> Result<Credential, ApiError> {
        self.store
            .lock()
            .await
            .get()
            .cloned()
            .ok_or(ApiError::AccessTokenExpired)
    }

    /// Return a usable credential, refreshing first if it has expired.
    /// A no-op when the token is still valid.
    pub async fn refresh_if_needed(&self) -> Result<Credential, ApiError> {
        self.ensure_fresh().await.map(|(credential, _)| credential)
    }

    /// Like `refresh_if_needed`, also reporting whether a refresh happened.
    async fn ensure_fresh(&self) -> Result<(Credential, bool), ApiError> {
        let mut store = self.store.lock().await;
        let current = store.get().cloned().ok_or(ApiError::AccessTokenExpired)?;
        if !current.is_expired(Utc::now()) {
            return Ok((current, false));
        }
        debug!("access token expired, refreshing");
        self.refresh_locked(&mut store).await.map(|c| (c, true))
    }

    /// Refresh after the API rejected `rejected_token`. If another request
    /// already replaced that token, reuse the newer one instead of refreshing
    /// again.
    pub async fn refresh_after_rejection(&self, rejected_token: &str) -> Result<Credential, ApiError> {
        let mut store = self.store.lock().await;
        let current = store.get().cloned().ok_or(ApiError::AccessTokenExpired)?;
        if current.access_token != rejected_token {
            debug!("token already refreshed by a concurrent request");
            return Ok(current);
        }
        self.refresh_locked(&mut store).await
    }

    async fn refresh_locked(&self, store: &mut CredentialStore) -> Result<Credential, ApiError> {
        let refresh_token = store
            .get()
            .and_then(|c| c.refresh_token.clone())
            .ok_or_else(|| {
                warn!("no refresh token available, re-authorization required");
                ApiError::AccessTokenExpired
            })?;

        let grant = self.refresher.refresh(&refresh_token).await?;
        store.update(grant, Utc::now());
        info!("access token refreshed");

        store.get().cloned().ok_or(ApiError::AccessTokenExpired)
    }

    /// Run one API operation with a fresh credential. On AccessTokenExpired
    /// the token is refreshed and the operation replayed exactly once. At
    /// most one refresh happens per call: if the credential was already
    /// refreshed up front, a rejection escalates immediately.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let (credential, refreshed) = self.ensure_fresh().await?;
        let rejected = credential.access_token.clone();

        match op(credential).await {
            // The token was minted for this very call; a second refresh
            // would not help
            Err(ApiError::AccessTokenExpired) if refreshed => {
                warn!("freshly refreshed token rejected, re-authorization required");
                Err(ApiError::AccessTokenExpired)
            }
            Err(ApiError::AccessTokenExpired) => {
                debug!("access token rejected upstream, refreshing and replaying once");
                let fresh = self.refresh_after_rejection(&rejected).await?;
                op(fresh).await
            }
            other => other,
        }
    }

    /// Drop the credential (logout / revoke).
    pub async fn clear(&self) {
        self.store.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRefresher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
            assert_eq!(refresh_token, "refresh");
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(TokenGrant {
                access_token: format!("access-{n}"),
                refresh_token: None,
                expires_in: Some(3600),
                scope: None,
            })
        }
    }

    fn credential(expired: bool) -> Credential {
        let offset = if expired {
            Duration::seconds(-10)
        } else {
            Duration::hours(1)
        };
        Credential {
            access_token: "access-0".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(Utc::now() + offset),
            scopes: Vec::new(),
        }
    }

    fn refresher() -> Arc<CountingRefresher> {
        Arc::new(CountingRefresher {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_refresh_if_needed_is_noop_when_valid() {
        let r = refresher();
        let session = Session::new(credential(false), r.clone());
        let cred = session.refresh_if_needed().await.unwrap();
        assert_eq!(cred.access_token, "access-0");
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_expired_requests_refresh_once() {
        let r = refresher();
        let session = Session::new(credential(true), r.clone());
        let (a, b) = tokio::join!(session.refresh_if_needed(), session.refresh_if_needed());
        assert_eq!(a.unwrap().access_token, "access-1");
        assert_eq!(b.unwrap().access_token, "access-1");
        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token() {
        let r = refresher();
        let session = Session::new(credential(true), r);
        let cred = session.refresh_if_needed().await.unwrap();
        assert_eq!(cred.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn test_rejection_of_stale_token_reuses_newer_one() {
        let r = refresher();
        let session = Session::new(credential(false), r.clone());
        let first = session.refresh_after_rejection("access-0").await.unwrap();
        let second = session.refresh_after_rejection("access-0").await.unwrap();
        assert_eq!(first.access_token, "access-1");
        assert_eq!(second.access_token, "access-1");
        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_replays_once_then_escalates() {
        let r = refresher();
        let session = Session::new(credential(false), r.clone());
        let attempts = AtomicUsize::new(0);

        let result: Result<(), ApiError> = session
            .call(|_cred| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::AccessTokenExpired) }
            })
            .await;

        assert_eq!(result, Err(ApiError::AccessTokenExpired));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_refreshes_at_most_once_when_token_starts_expired() {
        let r = refresher();
        let session = Session::new(credential(true), r.clone());
        let attempts = AtomicUsize::new(0);

        let result: Result<(), ApiError> = session
            .call(|cred| {
                attempts.fetch_add(1, Ordering::SeqCst);
                assert_eq!(cred.access_token, "access-1");
                async { Err(ApiError::AccessTokenExpired) }
            })
            .await;

        assert_eq!(result, Err(ApiError::AccessTokenExpired));
        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_does_not_retry_quota_errors() {
        let r = refresher();
        let session = Session::new(credential(false), r.clone());
        let attempts = AtomicUsize::new(0);

        let result: Result<(), ApiError> = session
            .call(|_cred| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::QuotaExceeded) }
            })
            .await;

        assert_eq!(result, Err(ApiError::QuotaExceeded));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cleared_session_requires_reauthorization() {
        let session = Session::new(credential(false), refresher());
        session.clear().await;
        assert_eq!(session.current().await, Err(ApiError::AccessTokenExpired));
    }
}
