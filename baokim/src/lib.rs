#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the Baokim B2B payment gateway client.
//!
//! This crate holds everything that does not touch the network: gateway
//! configuration, RSA key material, deterministic request signing, the
//! response-code table, bearer token bookkeeping and the wire-level time and
//! request-id formats. The HTTP side lives in `baokim-http`.
//!
//! # Overview
//!
//! Every gateway call is a JSON `POST` whose exact body bytes are signed with
//! the merchant's RSA key (RSA-SHA256, base64 in the `Signature` header).
//! Authenticated calls additionally carry a short-lived bearer token obtained
//! from the gateway's OAuth endpoint. Responses carry a numeric `code` that is
//! the sole success discriminant.
//!
//! # Modules
//!
//! - [`config`] - Gateway configuration with environment variable expansion
//! - [`error`] - Error taxonomy (key, signature, auth, transport)
//! - [`keys`] - RSA key loading and key-pair generation
//! - [`signature`] - Signing engine and the [`SignedEnvelope`] it produces
//! - [`code`] - Gateway response-code classification
//! - [`token`] - Bearer token value with its expiry rules
//! - [`time`] - Gateway date-time format (fixed UTC+7)
//! - [`request_id`] - Request identifier generation
//! - [`proto`] - Wire types shared by every endpoint
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod code;
pub mod config;
pub mod error;
pub mod keys;
pub mod proto;
pub mod request_id;
pub mod signature;
pub mod time;
pub mod token;

pub use code::{Classification, classify};
pub use config::{ConfigError, Credentials, GatewayConfig};
pub use error::{AuthError, GatewayError, KeyError, SignatureError};
pub use keys::KeyStore;
pub use proto::ApiResult;
pub use signature::{SignatureEngine, SignedEnvelope};
pub use token::Token;
