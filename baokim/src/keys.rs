//! RSA key material.
//!
//! The merchant private key signs every request; the gateway public key is
//! optional and only used to verify signatures. Both are PEM files read once
//! at construction. PKCS#8 and PKCS#1 encodings are accepted.

use std::path::Path;

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::config::GatewayConfig;
use crate::error::{KeyError, KeyRole};

/// Default modulus size for generated key pairs.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Loaded, immutable RSA key material.
#[derive(Clone)]
pub struct KeyStore {
    private_key: RsaPrivateKey,
    public_key: Option<RsaPublicKey>,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("has_public_key", &self.public_key.is_some())
            .finish_non_exhaustive()
    }
}

impl KeyStore {
    /// Wraps already-parsed keys.
    #[must_use]
    pub const fn new(private_key: RsaPrivateKey, public_key: Option<RsaPublicKey>) -> Self {
        Self {
            private_key,
            public_key,
        }
    }

    /// Loads the keys named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::NotFound`] if a configured file is missing and
    /// [`KeyError::Invalid`] if it does not hold an RSA key.
    pub async fn load(config: &GatewayConfig) -> Result<Self, KeyError> {
        let private_key = load_private_key(&config.private_key_path).await?;
        let public_key = match &config.public_key_path {
            Some(path) => Some(load_public_key(path).await?),
            None => None,
        };

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            private_key = %config.private_key_path.display(),
            has_public_key = public_key.is_some(),
            "Loaded RSA key material"
        );

        Ok(Self::new(private_key, public_key))
    }

    /// Returns the signing key.
    #[must_use]
    pub const fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Returns the verification key, if configured.
    #[must_use]
    pub const fn public_key(&self) -> Option<&RsaPublicKey> {
        self.public_key.as_ref()
    }
}

async fn read_pem(role: KeyRole, path: &Path) -> Result<String, KeyError> {
    match tokio::fs::read_to_string(path).await {
        Ok(pem) => Ok(pem),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Err(KeyError::NotFound {
            role,
            path: path.to_path_buf(),
        }),
        Err(source) => Err(KeyError::Read {
            role,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reads a PKCS#8 or PKCS#1 PEM private key.
///
/// # Errors
///
/// Returns [`KeyError`] if the file is missing, unreadable or not an RSA key.
pub async fn load_private_key(path: &Path) -> Result<RsaPrivateKey, KeyError> {
    let pem = read_pem(KeyRole::Signing, path).await?;
    parse_private_key(&pem).map_err(|reason| KeyError::Invalid {
        role: KeyRole::Signing,
        path: path.to_path_buf(),
        reason,
    })
}

/// Reads an SPKI or PKCS#1 PEM public key.
///
/// # Errors
///
/// Returns [`KeyError`] if the file is missing, unreadable or not an RSA key.
pub async fn load_public_key(path: &Path) -> Result<RsaPublicKey, KeyError> {
    let pem = read_pem(KeyRole::Verification, path).await?;
    parse_public_key(&pem).map_err(|reason| KeyError::Invalid {
        role: KeyRole::Verification,
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, String> {
    RsaPrivateKey::from_pkcs8_pem(pem).or_else(|pkcs8_err| {
        RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|pkcs1_err| format!("not PKCS#8 ({pkcs8_err}) or PKCS#1 ({pkcs1_err})"))
    })
}

fn parse_public_key(pem: &str) -> Result<RsaPublicKey, String> {
    RsaPublicKey::from_public_key_pem(pem).or_else(|spki_err| {
        RsaPublicKey::from_pkcs1_pem(pem)
            .map_err(|pkcs1_err| format!("not SPKI ({spki_err}) or PKCS#1 ({pkcs1_err})"))
    })
}

/// A freshly generated key pair in PEM form.
#[derive(Clone)]
pub struct GeneratedKeyPair {
    /// PKCS#8 private key PEM.
    pub private_pem: String,
    /// SPKI public key PEM.
    pub public_pem: String,
}

impl std::fmt::Debug for GeneratedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedKeyPair")
            .field("public_pem", &self.public_pem)
            .finish_non_exhaustive()
    }
}

/// Generates a new RSA key pair for registering with the gateway.
///
/// # Errors
///
/// Returns [`KeyError::Generate`] if generation or PEM encoding fails.
pub fn generate_key_pair(bits: usize) -> Result<GeneratedKeyPair, KeyError> {
    let mut rng = rand::thread_rng();
    let private_key =
        RsaPrivateKey::new(&mut rng, bits).map_err(|e| KeyError::Generate(e.to_string()))?;
    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeyError::Generate(e.to_string()))?
        .to_string();
    let public_pem = RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyError::Generate(e.to_string()))?;
    Ok(GeneratedKeyPair {
        private_pem,
        public_pem,
    })
}

/// Writes a generated key pair to two PEM files.
///
/// # Errors
///
/// Returns [`KeyError::Write`] carrying the failing path on I/O errors.
pub async fn write_key_pair(
    pair: &GeneratedKeyPair,
    private_path: &Path,
    public_path: &Path,
) -> Result<(), KeyError> {
    write_pem(KeyRole::Signing, private_path, &pair.private_pem).await?;
    write_pem(KeyRole::Verification, public_path, &pair.public_pem).await
}

async fn write_pem(role: KeyRole, path: &Path, pem: &str) -> Result<(), KeyError> {
    tokio::fs::write(path, pem)
        .await
        .map_err(|source| KeyError::Write {
            role,
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
    use tempfile::TempDir;

    fn credentials() -> Credentials {
        Credentials {
            merchant_code: "MC".into(),
            client_id: "cid".into(),
            client_secret: "secret".into(),
            master_merchant_code: "MASTER".into(),
            sub_merchant_code: "SUB".into(),
        }
    }

    #[tokio::test]
    async fn loads_generated_pkcs8_and_spki_keys() {
        let dir = TempDir::new().unwrap();
        let private_path = dir.path().join("merchant_private.pem");
        let public_path = dir.path().join("baokim_public.pem");
        let pair = generate_key_pair(1024).unwrap();
        write_key_pair(&pair, &private_path, &public_path)
            .await
            .unwrap();

        let config =
            GatewayConfig::new(credentials(), &private_path).with_public_key_path(&public_path);
        let store = KeyStore::load(&config).await.unwrap();

        assert!(store.public_key().is_some());
        assert_eq!(
            &RsaPublicKey::from(store.private_key()),
            store.public_key().unwrap()
        );
    }

    #[tokio::test]
    async fn loads_pkcs1_encoded_keys() {
        let dir = TempDir::new().unwrap();
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let private_path = dir.path().join("pkcs1_private.pem");
        let public_path = dir.path().join("pkcs1_public.pem");
        std::fs::write(&private_path, key.to_pkcs1_pem(LineEnding::LF).unwrap().as_bytes())
            .unwrap();
        std::fs::write(
            &public_path,
            RsaPublicKey::from(&key)
                .to_pkcs1_pem(LineEnding::LF)
                .unwrap(),
        )
        .unwrap();

        assert_eq!(load_private_key(&private_path).await.unwrap(), key);
        assert_eq!(
            load_public_key(&public_path).await.unwrap(),
            RsaPublicKey::from(&key)
        );
    }

    #[tokio::test]
    async fn missing_private_key_is_not_found() {
        let config = GatewayConfig::new(credentials(), "/nonexistent/merchant_private.pem");
        let err = KeyStore::load(&config).await.unwrap_err();
        assert!(matches!(
            err,
            KeyError::NotFound {
                role: KeyRole::Signing,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_public_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let private_path = dir.path().join("merchant_private.pem");
        std::fs::write(&private_path, generate_key_pair(1024).unwrap().private_pem).unwrap();

        let config = GatewayConfig::new(credentials(), &private_path)
            .with_public_key_path(dir.path().join("absent.pem"));
        let err = KeyStore::load(&config).await.unwrap_err();
        assert!(matches!(
            err,
            KeyError::NotFound {
                role: KeyRole::Verification,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn garbage_pem_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.pem");
        std::fs::write(&path, "not a key").unwrap();
        let err = load_private_key(&path).await.unwrap_err();
        assert!(matches!(err, KeyError::Invalid { .. }));
    }
}
