//! Gateway client configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax, so
//! secrets can stay out of the file.
//!
//! # Example Configuration
//!
//! ```toml
//! base_url = "https://devtest.baokim.vn"
//! timeout_ms = 30000
//!
//! merchant_code = "MERCHANT"
//! client_id = "client-id"
//! client_secret = "$BAOKIM_CLIENT_SECRET"
//! master_merchant_code = "MASTER"
//! sub_merchant_code = "SUB"
//!
//! private_key_path = "keys/merchant_private.pem"
//! public_key_path = "keys/baokim_public.pem"
//!
//! url_success = "https://shop.example/payment/success"
//! url_fail = "https://shop.example/payment/fail"
//! webhook_url = "https://shop.example/webhook/baokim"
//! ```
//!
//! # Environment Variables
//!
//! - `BAOKIM_CONFIG` - Path to configuration file (default: `baokim.toml`)
//! - `BAOKIM_BASE_URL` - Override the gateway base URL
//! - `BAOKIM_TIMEOUT_MS` - Override the request timeout

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default gateway base URL (sandbox).
pub const DEFAULT_BASE_URL: &str = "https://devtest.baokim.vn";

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "baokim.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`GatewayConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required value is empty (usually an unresolved `$VAR`).
    #[error("config value `{0}` must not be empty")]
    Empty(&'static str),

    /// The base URL is not an absolute URL.
    #[error("invalid base_url `{url}`: {source}")]
    BaseUrl {
        /// The configured value.
        url: String,
        /// The parse failure.
        #[source]
        source: url::ParseError,
    },
}

/// Merchant identity used for authentication and payload stamping.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Merchant code issued by the gateway.
    pub merchant_code: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Master merchant code, stamped on every payload.
    pub master_merchant_code: String,
    /// Sub merchant code, stamped on every payload and used in request ids.
    pub sub_merchant_code: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("merchant_code", &self.merchant_code)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("master_merchant_code", &self.master_merchant_code)
            .field("sub_merchant_code", &self.sub_merchant_code)
            .finish()
    }
}

/// Top-level gateway client configuration.
///
/// Passed explicitly to every component; there is no process-wide instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL (default: [`DEFAULT_BASE_URL`]).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds (default: [`DEFAULT_TIMEOUT_MS`]).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Merchant credentials.
    #[serde(flatten)]
    pub credentials: Credentials,

    /// Path to the merchant private key (PEM).
    pub private_key_path: PathBuf,

    /// Path to the gateway public key (PEM), used for signature verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_path: Option<PathBuf>,

    /// Default redirect after a successful payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_success: Option<String>,

    /// Default redirect after a failed payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_fail: Option<String>,

    /// Merchant webhook registered with the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl GatewayConfig {
    /// Creates a configuration with default base URL and timeout.
    #[must_use]
    pub fn new(credentials: Credentials, private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            credentials,
            private_key_path: private_key_path.into(),
            public_key_path: None,
            url_success: None,
            url_fail: None,
            webhook_url: None,
        }
    }

    /// Sets the gateway base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the verification key path.
    #[must_use]
    pub fn with_public_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.public_key_path = Some(path.into());
        self
    }

    /// Sets the default redirect URLs.
    #[must_use]
    pub fn with_redirects(mut self, success: impl Into<String>, fail: impl Into<String>) -> Self {
        self.url_success = Some(success.into());
        self.url_fail = Some(fail.into());
        self
    }

    /// Returns the request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Loads configuration from the path given by the `BAOKIM_CONFIG`
    /// environment variable, falling back to `baokim.toml` in the current
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("BAOKIM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// All `$VAR` / `${VAR}` references are expanded from the process
    /// environment before parsing. `BAOKIM_BASE_URL` and `BAOKIM_TIMEOUT_MS`
    /// override the file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;

        if let Ok(base_url) = std::env::var("BAOKIM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(timeout) = std::env::var("BAOKIM_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                config.timeout_ms = ms;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text after environment expansion.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML or missing required keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// Checks that required values are present and the base URL parses.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.credentials;
        let required = [
            ("merchant_code", c.merchant_code.as_str()),
            ("client_id", c.client_id.as_str()),
            ("client_secret", c.client_secret.as_str()),
            ("master_merchant_code", c.master_merchant_code.as_str()),
            ("sub_merchant_code", c.sub_merchant_code.as_str()),
        ];
        for (name, value) in required {
            if value.trim().is_empty() || is_unresolved_placeholder(value) {
                return Err(ConfigError::Empty(name));
            }
        }
        if self.private_key_path.as_os_str().is_empty() {
            return Err(ConfigError::Empty("private_key_path"));
        }
        url::Url::parse(&self.base_url).map_err(|source| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        Ok(())
    }
}

/// `true` if `value` is exactly a `$NAME` or `${NAME}` reference, the form
/// [`expand_env_vars`] leaves behind for unset variables.
fn is_unresolved_placeholder(value: &str) -> bool {
    let Some(rest) = value.trim().strip_prefix('$') else {
        return false;
    };
    let name = rest
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(rest);
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    closed = true;
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        match std::env::var(&var_name) {
            Ok(val) if !var_name.is_empty() => result.push_str(&val),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
