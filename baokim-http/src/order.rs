//! Order API (Basic Pro): create, query, refund and auto-debit cancellation.

use baokim::{ApiResult, GatewayConfig, GatewayError};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::constants::Endpoint;
use crate::pipeline::RequestPipeline;

/// Description sent with a refund when the caller gives none.
pub const DEFAULT_REFUND_DESCRIPTION: &str = "Refund";

/// How the payer settles an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    /// Bank transfer to a virtual account.
    VirtualAccount,
    /// VNPay QR code.
    VnpayQr,
    /// Auto-debit from a saved card or account.
    AutoDebit,
}

impl PaymentMethod {
    /// The gateway's numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::VirtualAccount => 1,
            Self::VnpayQr => 6,
            Self::AutoDebit => 22,
        }
    }
}

impl TryFrom<u8> for PaymentMethod {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::VirtualAccount),
            6 => Ok(Self::VnpayQr),
            22 => Ok(Self::AutoDebit),
            other => Err(other),
        }
    }
}

impl Serialize for PaymentMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Payer details attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerInfo {
    /// Full name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone: String,
    /// Postal address (default empty).
    pub address: String,
    /// Gender code (default `1`).
    pub gender: u8,
}

impl CustomerInfo {
    /// Creates customer info with an empty address and gender `1`.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            address: String::new(),
            gender: 1,
        }
    }

    /// Sets the address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Sets the gender code.
    #[must_use]
    pub const fn with_gender(mut self, gender: u8) -> Self {
        self.gender = gender;
        self
    }
}

/// Fields of a create-order request.
///
/// Optional fields are omitted from the payload when `None`. Missing
/// redirect URLs are filled from [`GatewayConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateOrder {
    /// Merchant-side order id, unique per merchant.
    pub mrc_order_id: String,
    /// Amount in VND.
    pub total_amount: u64,
    /// Order description shown to the payer.
    pub description: String,
    /// Redirect after success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_success: Option<String>,
    /// Redirect after failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_fail: Option<String>,
    /// Preselected payment method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    /// Line items, passed through as given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
    /// Payer details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerInfo>,
    /// Auto-debit service code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_code: Option<String>,
    /// Whether the gateway should save the payment token for auto-debit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_token: Option<u8>,
    /// Store code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_code: Option<String>,
    /// Branch code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_code: Option<String>,
    /// Staff code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_code: Option<String>,
}

impl CreateOrder {
    /// Creates an order with the required fields.
    #[must_use]
    pub fn new(
        mrc_order_id: impl Into<String>,
        total_amount: u64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            mrc_order_id: mrc_order_id.into(),
            total_amount,
            description: description.into(),
            ..Self::default()
        }
    }

    /// Sets the payment method.
    #[must_use]
    pub const fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    /// Sets payer details.
    #[must_use]
    pub fn with_customer_info(mut self, customer: CustomerInfo) -> Self {
        self.customer_info = Some(customer);
        self
    }

    /// Sets line items.
    #[must_use]
    pub fn with_items(mut self, items: Vec<Value>) -> Self {
        self.items = Some(items);
        self
    }

    /// Overrides the configured redirect URLs.
    #[must_use]
    pub fn with_redirects(mut self, success: impl Into<String>, fail: impl Into<String>) -> Self {
        self.url_success = Some(success.into());
        self.url_fail = Some(fail.into());
        self
    }

    /// Requests auto-debit registration.
    #[must_use]
    pub fn with_auto_debit(mut self, service_code: impl Into<String>, save_token: bool) -> Self {
        self.payment_method = Some(PaymentMethod::AutoDebit);
        self.service_code = Some(service_code.into());
        self.save_token = Some(u8::from(save_token));
        self
    }
}

#[derive(Serialize)]
struct QueryOrder<'a> {
    mrc_order_id: &'a str,
}

#[derive(Serialize)]
struct RefundOrder<'a> {
    mrc_order_id: &'a str,
    amount: u64,
    description: &'a str,
}

#[derive(Serialize)]
struct CancelAutoDebit<'a> {
    token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url_success: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url_fail: Option<&'a str>,
}

/// Order endpoints.
#[derive(Debug, Clone)]
pub struct OrderApi {
    pipeline: RequestPipeline,
    url_success: Option<String>,
    url_fail: Option<String>,
}

impl OrderApi {
    /// Creates the API with default redirect URLs taken from `config`.
    #[must_use]
    pub fn new(pipeline: RequestPipeline, config: &GatewayConfig) -> Self {
        Self {
            pipeline,
            url_success: config.url_success.clone(),
            url_fail: config.url_fail.clone(),
        }
    }

    /// Creates a payment order.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn create_order(&self, mut order: CreateOrder) -> Result<ApiResult, GatewayError> {
        if order.url_success.is_none() {
            order.url_success.clone_from(&self.url_success);
        }
        if order.url_fail.is_none() {
            order.url_fail.clone_from(&self.url_fail);
        }
        self.pipeline.execute(Endpoint::CREATE_ORDER, &order).await
    }

    /// Looks up an order by merchant order id.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn query_order(&self, mrc_order_id: &str) -> Result<ApiResult, GatewayError> {
        self.pipeline
            .execute(Endpoint::QUERY_ORDER, &QueryOrder { mrc_order_id })
            .await
    }

    /// Refunds `amount` of an order.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn refund_order(
        &self,
        mrc_order_id: &str,
        amount: u64,
        description: Option<&str>,
    ) -> Result<ApiResult, GatewayError> {
        let request = RefundOrder {
            mrc_order_id,
            amount,
            description: description.unwrap_or(DEFAULT_REFUND_DESCRIPTION),
        };
        self.pipeline.execute(Endpoint::REFUND_ORDER, &request).await
    }

    /// Cancels an auto-debit agreement identified by the token delivered
    /// in the registration webhook.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn cancel_auto_debit(
        &self,
        token: &str,
        url_success: Option<&str>,
        url_fail: Option<&str>,
    ) -> Result<ApiResult, GatewayError> {
        let request = CancelAutoDebit {
            token,
            url_success: url_success.or(self.url_success.as_deref()),
            url_fail: url_fail.or(self.url_fail.as_deref()),
        };
        self.pipeline
            .execute(Endpoint::CANCEL_AUTO_DEBIT, &request)
            .await
    }
}
