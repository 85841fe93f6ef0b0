#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP side of the Baokim B2B gateway client.
//!
//! Provides the transport, the bearer token manager, the signed request
//! pipeline and typed wrappers for the order and virtual account endpoints.
//!
//! # Modules
//!
//! - [`constants`] - Header names and endpoint paths
//! - [`headers`] - Per-request header assembly
//! - [`transport`] - One HTTP exchange with a bounded timeout
//! - [`auth`] - Bearer token cache with single-flight refresh
//! - [`pipeline`] - Stamp, sign, authenticate, send, classify
//! - [`order`] - Order API
//! - [`va`] - Virtual account API
//! - [`client`] - [`BaokimClient`] facade
//!
//! # Example
//!
//! ```no_run
//! use baokim::GatewayConfig;
//! use baokim_http::BaokimClient;
//! use baokim_http::order::CreateOrder;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BaokimClient::connect(GatewayConfig::load()?).await?;
//! let result = client
//!     .orders()
//!     .create_order(CreateOrder::new("ORD-1", 100_000, "Test order"))
//!     .await?;
//! println!("{} {}", result.code, result.message);
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod auth;
pub mod client;
pub mod constants;
pub mod headers;
pub mod order;
pub mod pipeline;
pub mod transport;
pub mod va;

pub use auth::TokenManager;
pub use client::BaokimClient;
pub use constants::Endpoint;
pub use pipeline::RequestPipeline;
pub use transport::{HttpTransport, Transport, TransportOutcome};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, OnceLock};
    use std::time::Duration;

    use baokim::{Credentials, GatewayConfig, KeyStore, SignatureEngine};
    use chrono::{Duration as ChronoDuration, Utc};
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::TokenManager;
    use crate::constants::Endpoint;
    use crate::pipeline::RequestPipeline;
    use crate::transport::{HttpTransport, Transport};

    pub(crate) fn credentials() -> Credentials {
        Credentials {
            merchant_code: "MC".into(),
            client_id: "cid".into(),
            client_secret: "secret".into(),
            master_merchant_code: "MASTER".into(),
            sub_merchant_code: "SUB".into(),
        }
    }

    pub(crate) fn config() -> GatewayConfig {
        GatewayConfig::new(credentials(), "/nonexistent/merchant_private.pem")
    }

    /// One key pair per test binary; generation dominates test time.
    pub(crate) fn engine() -> Arc<SignatureEngine> {
        static ENGINE: OnceLock<Arc<SignatureEngine>> = OnceLock::new();
        Arc::clone(ENGINE.get_or_init(|| {
            let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
            let public = RsaPublicKey::from(&private);
            Arc::new(SignatureEngine::new(&KeyStore::new(private, Some(public))))
        }))
    }

    pub(crate) fn transport(server: &MockServer) -> Arc<dyn Transport> {
        Arc::new(HttpTransport::new(server.uri(), Duration::from_secs(5)))
    }

    pub(crate) fn pipeline(server: &MockServer) -> RequestPipeline {
        let transport = transport(server);
        let tokens = TokenManager::new(credentials(), engine(), Arc::clone(&transport));
        RequestPipeline::new(credentials(), engine(), tokens, transport)
    }

    pub(crate) fn token_response(token: &str) -> Value {
        json!({
            "code": 100,
            "message": "Success",
            "data": {
                "access_token": token,
                "expires_at": (Utc::now() + ChronoDuration::hours(1)).to_rfc3339()
            }
        })
    }

    pub(crate) async fn mount_token(server: &MockServer, token: &str, expect: u64) {
        Mock::given(method("POST"))
            .and(path(Endpoint::GET_TOKEN.path))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_response(token)))
            .expect(expect)
            .mount(server)
            .await;
    }
}
