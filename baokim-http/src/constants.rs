//! HTTP header names and gateway endpoint paths.

/// Header carrying the base64 RSA-SHA256 signature of the body.
pub const SIGNATURE_HEADER: &str = "Signature";

/// Media type of every request and response body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// OAuth token endpoint.
pub const GET_TOKEN_PATH: &str = "/b2b/auth-service/api/oauth/get-token";

/// Create a payment order.
pub const CREATE_ORDER_PATH: &str = "/b2b/core/api/ext/mm/order/send";

/// Look up an order by merchant order id.
pub const QUERY_ORDER_PATH: &str = "/b2b/core/api/ext/mm/order/get-order";

/// Refund an order.
pub const REFUND_ORDER_PATH: &str = "/b2b/core/api/ext/mm/refund/send";

/// Cancel an auto-debit agreement.
pub const CANCEL_AUTO_DEBIT_PATH: &str = "/b2b/core/api/ext/mm/autodebit/cancel";

/// Create a virtual account.
pub const CREATE_VA_PATH: &str = "/b2b/core/api/ext/mm/bank-transfer/create";

/// Update a virtual account.
pub const UPDATE_VA_PATH: &str = "/b2b/core/api/ext/mm/bank-transfer/update";

/// Query virtual account transactions.
pub const QUERY_VA_TRANSACTION_PATH: &str = "/b2b/core/api/ext/mm/bank-transfer/detail";

/// A gateway endpoint and whether it requires a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Path relative to the base URL, or an absolute URL.
    pub path: &'static str,
    /// Whether `Authorization: Bearer` must be attached.
    pub authenticated: bool,
}

impl Endpoint {
    /// An endpoint that requires a bearer token.
    #[must_use]
    pub const fn authenticated(path: &'static str) -> Self {
        Self {
            path,
            authenticated: true,
        }
    }

    /// An endpoint called without a bearer token.
    #[must_use]
    pub const fn anonymous(path: &'static str) -> Self {
        Self {
            path,
            authenticated: false,
        }
    }

    /// The token endpoint.
    pub const GET_TOKEN: Self = Self::anonymous(GET_TOKEN_PATH);
    /// See [`CREATE_ORDER_PATH`].
    pub const CREATE_ORDER: Self = Self::authenticated(CREATE_ORDER_PATH);
    /// See [`QUERY_ORDER_PATH`].
    pub const QUERY_ORDER: Self = Self::authenticated(QUERY_ORDER_PATH);
    /// See [`REFUND_ORDER_PATH`].
    pub const REFUND_ORDER: Self = Self::authenticated(REFUND_ORDER_PATH);
    /// See [`CANCEL_AUTO_DEBIT_PATH`].
    pub const CANCEL_AUTO_DEBIT: Self = Self::authenticated(CANCEL_AUTO_DEBIT_PATH);
    /// See [`CREATE_VA_PATH`].
    pub const CREATE_VA: Self = Self::authenticated(CREATE_VA_PATH);
    /// See [`UPDATE_VA_PATH`].
    pub const UPDATE_VA: Self = Self::authenticated(UPDATE_VA_PATH);
    /// See [`QUERY_VA_TRANSACTION_PATH`].
    pub const QUERY_VA_TRANSACTION: Self = Self::authenticated(QUERY_VA_TRANSACTION_PATH);
}
