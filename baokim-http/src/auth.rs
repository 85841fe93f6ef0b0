//! Bearer token lifecycle.
//!
//! [`TokenManager`] caches the gateway access token and refreshes it through
//! a signed request to the OAuth endpoint when it is missing, inside the
//! expiry buffer, or explicitly forced. Concurrent callers that need a
//! refresh share a single in-flight authentication: exactly one request is
//! sent, the cache is written once, and every waiter receives the same token
//! or the same [`AuthError`].

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use baokim::code::{classify, is_success};
use baokim::proto::{response_code, response_message};
use baokim::{AuthError, Credentials, SignatureEngine, Token};
use futures_util::FutureExt;
use futures_util::future::Shared;
use http::Method;
use serde::Serialize;

use crate::constants::Endpoint;
use crate::transport::{BoxFuture, Transport};

type SharedRefresh = Shared<BoxFuture<'static, Result<Token, AuthError>>>;

/// Body of the token request.
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    merchant_code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

struct Inner {
    credentials: Credentials,
    signer: Arc<SignatureEngine>,
    transport: Arc<dyn Transport>,
    cache: RwLock<Option<Token>>,
    in_flight: Mutex<Option<SharedRefresh>>,
}

/// Owns the cached bearer token.
///
/// Cloning is cheap and clones share the cache.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("merchant_code", &self.inner.credentials.master_merchant_code)
            .field("cached", &self.cached_token())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Creates a manager with an empty cache.
    #[must_use]
    pub fn new(
        credentials: Credentials,
        signer: Arc<SignatureEngine>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                credentials,
                signer,
                transport,
                cache: RwLock::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Returns a usable access token, authenticating if needed.
    ///
    /// With `force_refresh` the cache is bypassed and a new token is always
    /// requested (joining a refresh already in flight, if any).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if authentication fails; the cache is left
    /// unchanged.
    pub async fn get_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        if !force_refresh {
            if let Some(token) = self.usable_token() {
                return Ok(token.value().to_owned());
            }
        }
        let token = self.refresh(force_refresh).await?;
        Ok(token.value().to_owned())
    }

    /// `true` iff a token is cached and not inside the expiry buffer.
    #[must_use]
    pub fn is_token_valid(&self) -> bool {
        self.usable_token().is_some()
    }

    /// Returns `"Bearer <token>"`, authenticating if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if authentication fails.
    pub async fn authorization_header(&self) -> Result<String, AuthError> {
        if let Some(token) = self.usable_token() {
            return Ok(token.bearer());
        }
        Ok(self.refresh(false).await?.bearer())
    }

    /// Drops the cached token so the next call authenticates again.
    pub fn invalidate(&self) {
        *self
            .inner
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;

        #[cfg(feature = "telemetry")]
        tracing::debug!("Bearer token invalidated");
    }

    /// Returns the cached token, usable or not.
    #[must_use]
    pub fn cached_token(&self) -> Option<Token> {
        self.inner
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn usable_token(&self) -> Option<Token> {
        self.cached_token().filter(Token::is_usable)
    }

    /// Joins the in-flight refresh or starts a new one.
    fn refresh(&self, force_refresh: bool) -> SharedRefresh {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.as_ref() {
            return pending.clone();
        }
        // A refresh may have completed between the cache check and the lock.
        if !force_refresh {
            if let Some(token) = self.usable_token() {
                let ready: BoxFuture<'static, _> = Box::pin(futures_util::future::ready(Ok(token)));
                return ready.shared();
            }
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(force_refresh, "Requesting new bearer token");

        let inner = Arc::clone(&self.inner);
        let refresh: BoxFuture<'static, _> = Box::pin(async move {
            let result = authenticate(&inner).await;
            if let Ok(token) = &result {
                *inner.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
            }
            *inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = None;

            #[cfg(feature = "telemetry")]
            match &result {
                Ok(token) => tracing::info!(expires_at = %token.expires_at(), "Obtained bearer token"),
                Err(error) => tracing::warn!(%error, "Token request failed"),
            }

            result
        });
        let shared = refresh.shared();
        *slot = Some(shared.clone());
        shared
    }
}

async fn authenticate(inner: &Inner) -> Result<Token, AuthError> {
    let credentials = &inner.credentials;
    let request = TokenRequest {
        merchant_code: &credentials.master_merchant_code,
        client_id: &credentials.client_id,
        client_secret: &credentials.client_secret,
    };
    let envelope = inner
        .signer
        .seal(&request)
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    let body = inner
        .transport
        .send(Method::POST, Endpoint::GET_TOKEN.path, envelope, None)
        .await
        .into_body()
        .map_err(AuthError::Transport)?;

    let code = response_code(&body)
        .ok_or_else(|| AuthError::Transport("malformed token response: missing code".into()))?;
    if !is_success(code) {
        return Err(AuthError::Rejected {
            code,
            message: response_message(&body).map_or_else(|| classify(code).message, str::to_owned),
        });
    }
    let data = body.get("data").ok_or(AuthError::MissingToken)?;
    Token::from_auth_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{credentials, engine, mount_token, token_response, transport};
    use chrono::{Duration as ChronoDuration, Utc};
    use futures_util::future::join_all;
    use serde_json::{Value, json};
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(server: &MockServer) -> TokenManager {
        TokenManager::new(credentials(), engine(), transport(server))
    }

    #[tokio::test]
    async fn fetches_once_then_serves_from_cache() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1", 1).await;
        let tokens = manager(&server);

        assert!(!tokens.is_token_valid());
        assert_eq!(tokens.get_token(false).await.unwrap(), "tok-1");
        assert!(tokens.is_token_valid());
        assert_eq!(tokens.get_token(false).await.unwrap(), "tok-1");
        assert_eq!(tokens.authorization_header().await.unwrap(), "Bearer tok-1");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(Endpoint::GET_TOKEN.path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_response("shared"))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let tokens = manager(&server);

        let results = join_all((0..16).map(|_| {
            let tokens = tokens.clone();
            async move { tokens.get_token(false).await }
        }))
        .await;

        assert!(results.iter().all(|r| r.as_deref() == Ok("shared")));
        assert!(tokens.is_token_valid());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(Endpoint::GET_TOKEN.path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 111, "message": "bad client"}))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let tokens = manager(&server);

        let results = join_all((0..4).map(|_| tokens.get_token(false))).await;
        let expected = AuthError::Rejected {
            code: 111,
            message: "bad client".into(),
        };
        assert!(results.iter().all(|r| r.as_ref() == Err(&expected)));
    }

    #[tokio::test]
    async fn force_refresh_bypasses_cache() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 2).await;
        let tokens = manager(&server);

        tokens.get_token(false).await.unwrap();
        tokens.get_token(true).await.unwrap();
    }

    #[tokio::test]
    async fn invalidate_forces_new_authentication() {
        let server = MockServer::start().await;
        mount_token(&server, "tok", 2).await;
        let tokens = manager(&server);

        tokens.get_token(false).await.unwrap();
        tokens.invalidate();
        assert!(!tokens.is_token_valid());
        assert!(tokens.cached_token().is_none());
        tokens.get_token(false).await.unwrap();
    }

    #[tokio::test]
    async fn sends_signed_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(Endpoint::GET_TOKEN.path))
            .and(body_json(json!({
                "merchant_code": "MASTER",
                "client_id": "cid",
                "client_secret": "secret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_response("tok")))
            .expect(1)
            .mount(&server)
            .await;

        manager(&server).get_token(false).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let request = &requests[0];
        assert!(request.headers.get("authorization").is_none());
        let signature = request.headers.get("signature").unwrap().to_str().unwrap();
        assert!(engine().verify(&request.body, signature).unwrap());
    }

    #[tokio::test]
    async fn token_inside_expiry_buffer_is_not_valid() {
        let server = MockServer::start().await;
        let expires_at = (Utc::now() + ChronoDuration::seconds(30)).to_rfc3339();
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 100,
                "data": {"access_token": "short", "expires_at": expires_at}
            })))
            .mount(&server)
            .await;
        let tokens = manager(&server);

        assert_eq!(tokens.get_token(false).await.unwrap(), "short");
        assert!(!tokens.is_token_valid());
    }

    async fn failure(body: Value) -> AuthError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        let tokens = manager(&server);
        let err = tokens.get_token(false).await.unwrap_err();
        assert!(tokens.cached_token().is_none());
        err
    }

    #[tokio::test]
    async fn rejected_code_is_auth_error() {
        assert_eq!(
            failure(json!({"code": 111})).await,
            AuthError::Rejected {
                code: 111,
                message: "Authentication failed".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_token_or_expiry_is_auth_error() {
        assert_eq!(
            failure(json!({"code": 100, "data": {}})).await,
            AuthError::MissingToken
        );
        assert_eq!(failure(json!({"code": 100})).await, AuthError::MissingToken);
        assert!(matches!(
            failure(json!({"code": 100, "data": {"access_token": "t", "expires_at": "soon"}})).await,
            AuthError::InvalidExpiry(_)
        ));
    }

    #[tokio::test]
    async fn missing_code_is_transport_error() {
        assert!(matches!(
            failure(json!({"message": "??"})).await,
            AuthError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_gateway_is_transport_error() {
        let tokens = TokenManager::new(
            credentials(),
            engine(),
            Arc::new(crate::HttpTransport::new(
                "http://127.0.0.1:1",
                Duration::from_millis(50),
            )),
        );
        assert!(matches!(
            tokens.get_token(false).await,
            Err(AuthError::Transport(_))
        ));
        assert!(!tokens.is_token_valid());
    }
}
