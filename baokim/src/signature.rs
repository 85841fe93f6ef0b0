//! Request signing.
//!
//! The gateway verifies an RSA-SHA256 (PKCS#1 v1.5) signature over the exact
//! request body it receives. JSON re-serialization is free to reorder keys or
//! change whitespace, so a body must be serialized exactly once and the same
//! bytes must be both signed and transmitted. [`SignatureEngine::seal`] does
//! both steps and returns a [`SignedEnvelope`], the only type the transport
//! layer accepts as a request body.

use base64::prelude::*;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::config::GatewayConfig;
use crate::error::{KeyError, SignatureError};
use crate::keys::KeyStore;

/// A serialized request body together with its signature.
///
/// The fields are private: an envelope can only be produced by
/// [`SignatureEngine::seal`], so the signature always matches the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    body: Vec<u8>,
    signature: String,
}

impl SignedEnvelope {
    /// The exact bytes that were signed and must be transmitted.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The base64-encoded signature for the `Signature` header.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

/// Signs and verifies gateway payloads.
#[derive(Clone)]
pub struct SignatureEngine {
    signing_key: SigningKey<Sha256>,
    verifying_key: Option<VerifyingKey<Sha256>>,
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("can_verify", &self.verifying_key.is_some())
            .finish_non_exhaustive()
    }
}

impl SignatureEngine {
    /// Creates an engine from loaded key material.
    #[must_use]
    pub fn new(keys: &KeyStore) -> Self {
        Self {
            signing_key: SigningKey::<Sha256>::new(keys.private_key().clone()),
            verifying_key: keys
                .public_key()
                .map(|key| VerifyingKey::<Sha256>::new(key.clone())),
        }
    }

    /// Loads the configured keys and creates an engine.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if a key file is missing or invalid.
    pub async fn load(config: &GatewayConfig) -> Result<Self, KeyError> {
        Ok(Self::new(&KeyStore::load(config).await?))
    }

    /// Signs raw bytes, returning a base64 signature.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Rsa`] if the RSA primitive fails.
    pub fn sign(&self, data: &[u8]) -> Result<String, SignatureError> {
        let signature = self
            .signing_key
            .try_sign(data)
            .map_err(|e| SignatureError::Rsa(e.to_string()))?;
        Ok(BASE64_STANDARD.encode(signature.to_bytes()))
    }

    /// Verifies a base64 signature over raw bytes with the configured public key.
    ///
    /// Malformed base64 or a signature of the wrong length verifies as `false`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::NoVerifyingKey`] if no public key is configured.
    pub fn verify(&self, data: &[u8], signature: &str) -> Result<bool, SignatureError> {
        let key = self
            .verifying_key
            .as_ref()
            .ok_or(SignatureError::NoVerifyingKey)?;
        let Ok(raw) = BASE64_STANDARD.decode(signature.trim()) else {
            return Ok(false);
        };
        let Ok(signature) = Signature::try_from(raw.as_slice()) else {
            return Ok(false);
        };
        Ok(key.verify(data, &signature).is_ok())
    }

    /// Serializes a payload canonically and signs the resulting bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::NotAnObject`] if the payload is not a JSON
    /// object, or a serialization / RSA error.
    pub fn seal<T: Serialize + ?Sized>(&self, payload: &T) -> Result<SignedEnvelope, SignatureError> {
        let value = serde_json::to_value(payload)?;
        if !value.is_object() {
            return Err(SignatureError::NotAnObject);
        }
        let body = canonical_bytes(&value)?;
        let signature = self.sign(&body)?;
        Ok(SignedEnvelope { body, signature })
    }
}

/// Serializes a JSON value compactly with object keys in lexicographic order
/// at every depth.
///
/// # Errors
///
/// Returns a serialization error (only possible for non-finite numbers).
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, SignatureError> {
    Ok(serde_json::to_vec(&sorted(value))?)
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::{RsaPrivateKey, RsaPublicKey};
    use serde_json::json;

    fn engine(with_public: bool) -> SignatureEngine {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let public = with_public.then(|| RsaPublicKey::from(&private));
        SignatureEngine::new(&KeyStore::new(private, public))
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let engine = engine(true);
        let payload = br#"{"client_id":"cid","merchant_code":"MASTER"}"#;
        let signature = engine.sign(payload).unwrap();
        assert!(engine.verify(payload, &signature).unwrap());
    }

    #[test]
    fn any_mutation_breaks_verification() {
        let engine = engine(true);
        let payload = br#"{"amount":100000,"mrc_order_id":"ORD-1"}"#.to_vec();
        let signature = engine.sign(&payload).unwrap();

        for i in 0..payload.len() {
            let mut mutated = payload.clone();
            mutated[i] ^= 0x01;
            assert!(
                !engine.verify(&mutated, &signature).unwrap(),
                "mutation at byte {i} still verified"
            );
        }
        let mut extended = payload;
        extended.push(b' ');
        assert!(!engine.verify(&extended, &signature).unwrap());
    }

    #[test]
    fn malformed_signature_is_false_not_error() {
        let engine = engine(true);
        assert!(!engine.verify(b"{}", "not base64 !!").unwrap());
        assert!(!engine.verify(b"{}", "AAAA").unwrap());
    }

    #[test]
    fn verify_without_public_key_is_an_error() {
        let engine = engine(false);
        let signature = engine.sign(b"{}").unwrap();
        assert!(matches!(
            engine.verify(b"{}", &signature),
            Err(SignatureError::NoVerifyingKey)
        ));
    }

    #[test]
    fn seal_signs_exactly_the_transmitted_bytes() {
        let engine = engine(true);
        let envelope = engine
            .seal(&json!({"request_id": "SUB_1", "total_amount": 100_000}))
            .unwrap();
        assert!(engine.verify(envelope.body(), envelope.signature()).unwrap());
        assert_eq!(envelope.body(), br#"{"request_id":"SUB_1","total_amount":100000}"#);
    }

    #[test]
    fn seal_is_deterministic_and_sorts_keys() {
        let engine = engine(true);
        let a = engine
            .seal(&json!({"b": 1, "a": {"z": true, "y": [ {"d": 1, "c": 2} ]}}))
            .unwrap();
        let b = engine
            .seal(&json!({"a": {"y": [ {"c": 2, "d": 1} ], "z": true}, "b": 1}))
            .unwrap();

        assert_eq!(
            std::str::from_utf8(a.body()).unwrap(),
            r#"{"a":{"y":[{"c":2,"d":1}],"z":true},"b":1}"#
        );
        assert_eq!(a, b);
    }

    #[test]
    fn seal_rejects_non_object_payloads() {
        let engine = engine(false);
        assert!(matches!(
            engine.seal(&json!([1, 2, 3])),
            Err(SignatureError::NotAnObject)
        ));
        assert!(matches!(
            engine.seal("plain string"),
            Err(SignatureError::NotAnObject)
        ));
    }

    #[test]
    fn unicode_is_signed_as_utf8() {
        let engine = engine(true);
        let envelope = engine
            .seal(&json!({"description": "Thanh toán đơn hàng"}))
            .unwrap();
        let text = std::str::from_utf8(envelope.body()).unwrap();
        assert!(text.contains("Thanh toán đơn hàng"));
        assert!(engine.verify(envelope.body(), envelope.signature()).unwrap());
    }
}
