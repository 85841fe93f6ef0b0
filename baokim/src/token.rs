//! Bearer tokens and their expiry rules.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::Value;

use crate::error::AuthError;
use crate::time::parse_gateway_time;

/// Safety margin before expiry after which a token is no longer used.
pub const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Prefix of the `Authorization` header value.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Epoch values at or above this are treated as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// An access token together with the absolute instant it expires.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &redact(&self.value))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Token {
    /// Creates a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingToken`] if `value` is empty.
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Result<Self, AuthError> {
        let value = value.into();
        if value.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(Self { value, expires_at })
    }

    /// Builds a token from the `data` object of an authentication response.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingToken`] if `access_token` is absent or empty
    /// and [`AuthError::InvalidExpiry`] if `expires_at` cannot be parsed.
    pub fn from_auth_data(data: &Value) -> Result<Self, AuthError> {
        let value = data
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let expires_at = data
            .get("expires_at")
            .ok_or_else(|| AuthError::InvalidExpiry("missing".into()))
            .and_then(parse_expiry)?;
        Self::new(value, expires_at)
    }

    /// The raw token string.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The instant the gateway stops accepting the token.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `true` iff `now` is strictly before `expires_at - TOKEN_EXPIRY_BUFFER`.
    #[must_use]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        let buffer = TimeDelta::from_std(TOKEN_EXPIRY_BUFFER).unwrap_or_else(|_| TimeDelta::zero());
        self.expires_at
            .checked_sub_signed(buffer)
            .is_some_and(|deadline| now < deadline)
    }

    /// Usability against the current clock.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    /// The `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("{BEARER_PREFIX}{}", self.value)
    }
}

/// Parses an `expires_at` value from the gateway.
///
/// Accepts an RFC 3339 string, a `YYYY-MM-DD HH:MM:SS` string in gateway
/// local time, or an epoch number (seconds, or milliseconds from 10^12 up).
///
/// # Errors
///
/// Returns [`AuthError::InvalidExpiry`] for anything else.
pub fn parse_expiry(value: &Value) -> Result<DateTime<Utc>, AuthError> {
    let invalid = || AuthError::InvalidExpiry(value.to_string());
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| parse_gateway_time(s))
            .ok_or_else(invalid),
        Value::Number(n) => {
            let epoch = n.as_i64().ok_or_else(invalid)?;
            let parsed = if epoch >= EPOCH_MILLIS_THRESHOLD {
                Utc.timestamp_millis_opt(epoch).single()
            } else {
                Utc.timestamp_opt(epoch, 0).single()
            };
            parsed.ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// Shortens a credential for logging.
#[must_use]
pub fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(8).collect();
    if prefix.len() < value.len() {
        format!("{prefix}...")
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn empty_value_is_rejected() {
        assert_eq!(Token::new("", at(0)), Err(AuthError::MissingToken));
    }

    #[test]
    fn usable_strictly_before_buffer() {
        let token = Token::new("tok", at(10_000)).unwrap();
        assert!(token.is_usable_at(at(10_000 - 61)));
        assert!(!token.is_usable_at(at(10_000 - 60)));
        assert!(!token.is_usable_at(at(10_000 - 30)));
        assert!(!token.is_usable_at(at(10_001)));
    }

    #[test]
    fn bearer_header() {
        let token = Token::new("abc", at(0)).unwrap();
        assert_eq!(token.bearer(), "Bearer abc");
        assert_eq!(token.bearer().strip_prefix(BEARER_PREFIX), Some("abc"));
    }

    #[test]
    fn parses_rfc3339_expiry() {
        let parsed = parse_expiry(&json!("2025-01-01T00:00:00+07:00")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 12, 31, 17, 0, 0).unwrap());
    }

    #[test]
    fn parses_gateway_format_expiry_in_utc_plus_seven() {
        let parsed = parse_expiry(&json!("2025-01-01 07:00:00")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_epoch_seconds_and_millis() {
        assert_eq!(parse_expiry(&json!(1_700_000_000)).unwrap(), at(1_700_000_000));
        assert_eq!(
            parse_expiry(&json!(1_700_000_000_000_i64)).unwrap(),
            at(1_700_000_000)
        );
    }

    #[test]
    fn rejects_unparseable_expiry() {
        for value in [json!("tomorrow"), json!(null), json!(true), json!({})] {
            assert!(matches!(
                parse_expiry(&value),
                Err(AuthError::InvalidExpiry(_))
            ));
        }
    }

    #[test]
    fn from_auth_data_requires_both_fields() {
        let ok = Token::from_auth_data(&json!({
            "access_token": "tok-1",
            "expires_at": "2099-01-01 00:00:00"
        }))
        .unwrap();
        assert_eq!(ok.value(), "tok-1");
        assert!(ok.is_usable());

        assert_eq!(
            Token::from_auth_data(&json!({"expires_at": "2099-01-01 00:00:00"})),
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            Token::from_auth_data(&json!({"access_token": "", "expires_at": 1})),
            Err(AuthError::MissingToken)
        );
        assert!(matches!(
            Token::from_auth_data(&json!({"access_token": "tok"})),
            Err(AuthError::InvalidExpiry(_))
        ));
    }

    #[test]
    fn debug_redacts_value() {
        let token = Token::new("0123456789abcdef", at(0)).unwrap();
        let debug = format!("{token:?}");
        assert!(debug.contains("01234567..."));
        assert!(!debug.contains("abcdef"));
    }
}
