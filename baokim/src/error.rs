//! Error types for the Baokim gateway client.
//!
//! Infrastructure failures (missing keys, broken transport, unusable
//! authentication) are errors. A well-formed gateway response with a failure
//! code is not: it comes back as an [`ApiResult`](crate::ApiResult) with
//! `success == false`.

use std::fmt;
use std::path::PathBuf;

/// Which half of the RSA key pair a key error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// The merchant private key used to sign requests.
    Signing,
    /// The gateway public key used to verify signatures.
    Verification,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signing => write!(f, "private"),
            Self::Verification => write!(f, "public"),
        }
    }
}

/// Errors raised while loading RSA key material.
///
/// All of these are fatal: they are reported when the client is constructed
/// and never retried.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The configured key file does not exist.
    #[error("{role} key not found: {}", path.display())]
    NotFound {
        /// Which key was being loaded.
        role: KeyRole,
        /// The configured path.
        path: PathBuf,
    },

    /// The key file exists but could not be read.
    #[error("failed to read {role} key {}: {source}", path.display())]
    Read {
        /// Which key was being loaded.
        role: KeyRole,
        /// The configured path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The key file does not contain a usable RSA key in PEM form.
    #[error("invalid {role} key {}: {reason}", path.display())]
    Invalid {
        /// Which key was being loaded.
        role: KeyRole,
        /// The configured path.
        path: PathBuf,
        /// Parser diagnostics.
        reason: String,
    },

    /// A generated key could not be written.
    #[error("failed to write {role} key {}: {source}", path.display())]
    Write {
        /// Which key was being written.
        role: KeyRole,
        /// The target path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Key-pair generation or PEM encoding failed.
    #[error("key generation failed: {0}")]
    Generate(String),
}

/// Errors raised while serializing or signing a payload.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// The payload did not serialize to a JSON object.
    #[error("request payload must be a JSON object")]
    NotAnObject,

    /// JSON serialization failed.
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The RSA primitive rejected the operation.
    #[error("RSA signing failed: {0}")]
    Rsa(String),

    /// Verification was requested but no public key is configured.
    #[error("no verification key configured")]
    NoVerifyingKey,
}

/// Errors raised while obtaining a bearer token.
///
/// Cloneable so that every caller waiting on a shared refresh receives the
/// same failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The authentication request never produced a parseable response.
    #[error("failed to get token: {0}")]
    Transport(String),

    /// The gateway answered with a failure code.
    #[error("token API error (code {code}): {message}")]
    Rejected {
        /// The gateway response code.
        code: i64,
        /// The gateway or classifier message.
        message: String,
    },

    /// The response claimed success but carried no access token.
    #[error("token API response has no access token")]
    MissingToken,

    /// The response carried a missing or unparseable expiry.
    #[error("token API response has an invalid expiry: {0}")]
    InvalidExpiry(String),

    /// The authentication payload could not be signed.
    #[error("failed to sign token request: {0}")]
    Signing(String),
}

/// Top-level error returned by gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Key material is missing or unusable.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The payload could not be serialized or signed.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// No usable bearer token could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Network failure, timeout or unparseable response.
    #[error("API request failed: {0}")]
    Transport(String),
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_not_found_names_role_and_path() {
        let err = KeyError::NotFound {
            role: KeyRole::Signing,
            path: PathBuf::from("/keys/merchant_private.pem"),
        };
        assert_eq!(
            err.to_string(),
            "private key not found: /keys/merchant_private.pem"
        );
    }

    #[test]
    fn gateway_error_is_transparent_for_auth() {
        let err = GatewayError::from(AuthError::Rejected {
            code: 111,
            message: "Authentication failed".into(),
        });
        assert_eq!(
            err.to_string(),
            "token API error (code 111): Authentication failed"
        );
    }

    #[test]
    fn transport_error_carries_cause() {
        let err = GatewayError::Transport("timeout".into());
        assert_eq!(err.to_string(), "API request failed: timeout");
    }
}
