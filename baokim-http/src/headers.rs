//! Request header assembly.

use http::header::{AUTHORIZATION, InvalidHeaderValue};
use http::{HeaderMap, HeaderValue};

use crate::constants::SIGNATURE_HEADER;

/// Builds the per-request headers: `Signature`, plus `Authorization` when a
/// bearer value is given. `Content-Type` and `Accept` are added by the
/// transport.
///
/// # Errors
///
/// Returns [`InvalidHeaderValue`] if a value contains bytes not allowed in an
/// HTTP header.
pub fn signed_headers(
    signature: &str,
    authorization: Option<&str>,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::with_capacity(2);
    headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(signature)?);
    if let Some(authorization) = authorization {
        let mut value = HeaderValue::from_str(authorization)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}
