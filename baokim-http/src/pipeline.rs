//! The request pipeline shared by every business call.
//!
//! [`RequestPipeline::execute`] stamps the payload with request metadata,
//! serializes and signs it exactly once, attaches the bearer token for
//! authenticated endpoints, sends the signed bytes and classifies the
//! response. Each step runs strictly after the previous one; there are no
//! retries.

use std::sync::Arc;

use baokim::request_id;
use baokim::time::now_gateway_time;
use baokim::{ApiResult, Credentials, GatewayError, SignatureEngine, SignatureError};
use http::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::TokenManager;
use crate::constants::Endpoint;
use crate::transport::Transport;

/// Builds, signs, sends and classifies gateway requests.
#[derive(Clone)]
pub struct RequestPipeline {
    credentials: Arc<Credentials>,
    signer: Arc<SignatureEngine>,
    tokens: TokenManager,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("credentials", &self.credentials)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl RequestPipeline {
    /// Creates a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        credentials: Credentials,
        signer: Arc<SignatureEngine>,
        tokens: TokenManager,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            signer,
            tokens,
            transport,
        }
    }

    /// Returns the token manager used for authenticated endpoints.
    #[must_use]
    pub const fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Returns the merchant credentials used for stamping.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Overwrites `request_id`, `request_time`, `master_merchant_code` and
    /// `sub_merchant_code` in `payload`.
    pub fn stamp(&self, payload: &mut Map<String, Value>) {
        let c = &self.credentials;
        payload.insert(
            "request_id".into(),
            Value::String(request_id::generate(&c.sub_merchant_code)),
        );
        payload.insert("request_time".into(), Value::String(now_gateway_time()));
        payload.insert(
            "master_merchant_code".into(),
            Value::String(c.master_merchant_code.clone()),
        );
        payload.insert(
            "sub_merchant_code".into(),
            Value::String(c.sub_merchant_code.clone()),
        );
    }

    /// Executes one gateway call.
    ///
    /// `fields` must serialize to a JSON object. A failure code from the
    /// gateway is returned as `Ok` with `success == false`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Signature`] if the payload cannot be serialized or signed
    /// - [`GatewayError::Auth`] if no bearer token can be obtained
    /// - [`GatewayError::Transport`] on network failure, timeout, or a response
    ///   without an integer `code`
    pub async fn execute<T>(&self, endpoint: Endpoint, fields: &T) -> Result<ApiResult, GatewayError>
    where
        T: Serialize + ?Sized,
    {
        let Value::Object(mut payload) = serde_json::to_value(fields).map_err(SignatureError::from)?
        else {
            return Err(SignatureError::NotAnObject.into());
        };
        self.stamp(&mut payload);
        let envelope = self.signer.seal(&payload)?;

        let authorization = if endpoint.authenticated {
            Some(self.tokens.authorization_header().await?)
        } else {
            None
        };
        let response = self
            .transport
            .send(Method::POST, endpoint.path, envelope, authorization)
            .await
            .into_body()
            .map_err(GatewayError::Transport)?;
        let result = ApiResult::from_response(response)?;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            endpoint = endpoint.path,
            code = result.code,
            success = result.success,
            message = %result.message,
            "Gateway call completed"
        );

        Ok(result)
    }
}
