//! Gateway client facade.

use std::sync::Arc;

use baokim::{GatewayConfig, GatewayError, SignatureEngine};

use crate::auth::TokenManager;
use crate::order::OrderApi;
use crate::pipeline::RequestPipeline;
use crate::transport::{HttpTransport, Transport};
use crate::va::VirtualAccountApi;

/// Entry point bundling configuration, keys, token cache and transport.
///
/// Cloning is cheap; clones share the token cache.
#[derive(Debug, Clone)]
pub struct BaokimClient {
    config: Arc<GatewayConfig>,
    signer: Arc<SignatureEngine>,
    pipeline: RequestPipeline,
}

impl BaokimClient {
    /// Loads the configured keys and builds a client over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Key`] if a configured key file is missing or
    /// invalid.
    pub async fn connect(config: GatewayConfig) -> Result<Self, GatewayError> {
        let signer = SignatureEngine::load(&config).await?;
        let transport = Arc::new(HttpTransport::from_config(&config));

        #[cfg(feature = "telemetry")]
        tracing::info!(
            base_url = %config.base_url,
            timeout_ms = config.timeout_ms,
            sub_merchant_code = %config.credentials.sub_merchant_code,
            "Gateway client ready"
        );

        Ok(Self::with_transport(config, signer, transport))
    }

    /// Builds a client over an arbitrary transport.
    #[must_use]
    pub fn with_transport(
        config: GatewayConfig,
        signer: SignatureEngine,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let signer = Arc::new(signer);
        let tokens = TokenManager::new(
            config.credentials.clone(),
            Arc::clone(&signer),
            Arc::clone(&transport),
        );
        let pipeline = RequestPipeline::new(
            config.credentials.clone(),
            Arc::clone(&signer),
            tokens,
            transport,
        );
        Self {
            config: Arc::new(config),
            signer,
            pipeline,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the signing engine.
    #[must_use]
    pub fn signer(&self) -> &SignatureEngine {
        &self.signer
    }

    /// Returns the request pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// Returns the token manager.
    #[must_use]
    pub const fn tokens(&self) -> &TokenManager {
        self.pipeline.tokens()
    }

    /// Order endpoints.
    #[must_use]
    pub fn orders(&self) -> OrderApi {
        OrderApi::new(self.pipeline.clone(), &self.config)
    }

    /// Virtual account endpoints.
    #[must_use]
    pub fn virtual_accounts(&self) -> VirtualAccountApi {
        VirtualAccountApi::new(self.pipeline.clone())
    }
}
