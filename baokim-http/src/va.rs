//! Virtual account API (host to host).
//!
//! A dynamic VA collects exactly one payment of a fixed amount; a static VA
//! stays open and accepts repeated transfers.

use baokim::{ApiResult, GatewayError};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::constants::Endpoint;
use crate::pipeline::RequestPipeline;

/// Virtual account kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VaType {
    /// Single use, fixed amount.
    #[default]
    Dynamic,
    /// Reusable.
    Static,
}

impl VaType {
    /// The gateway's numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Dynamic => 1,
            Self::Static => 2,
        }
    }
}

impl Serialize for VaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Fields of a create-VA request.
///
/// `extra` is merged into the payload; the named fields take precedence
/// over keys of the same name in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateVirtualAccount {
    /// Additional gateway fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Account holder name shown to the payer.
    pub acc_name: String,
    /// Dynamic or static.
    pub acc_type: VaType,
    /// Merchant-side order id.
    pub mrc_order_id: String,
    /// Minimum accepted transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collect_amount_min: Option<u64>,
    /// Maximum accepted transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collect_amount_max: Option<u64>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateVirtualAccount {
    /// A dynamic VA for exactly `amount`.
    #[must_use]
    pub fn dynamic(
        acc_name: impl Into<String>,
        mrc_order_id: impl Into<String>,
        amount: u64,
    ) -> Self {
        Self {
            acc_name: acc_name.into(),
            acc_type: VaType::Dynamic,
            mrc_order_id: mrc_order_id.into(),
            collect_amount_min: Some(amount),
            collect_amount_max: Some(amount),
            ..Self::default()
        }
    }

    /// A static VA with no amount bounds.
    #[must_use]
    pub fn static_account(acc_name: impl Into<String>, mrc_order_id: impl Into<String>) -> Self {
        Self {
            acc_name: acc_name.into(),
            acc_type: VaType::Static,
            mrc_order_id: mrc_order_id.into(),
            ..Self::default()
        }
    }

    /// Sets the description; empty strings are dropped.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = (!description.is_empty()).then(|| description.to_owned());
        self
    }

    /// Adds an extra gateway field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Filters for a VA transaction lookup. Absent filters are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaTransactionQuery {
    /// Virtual account number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acc_no: Option<String>,
    /// Merchant-side order id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrc_order_id: Option<String>,
    /// Start of the range, `YYYY-MM-DD HH:MM:SS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    /// End of the range, `YYYY-MM-DD HH:MM:SS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<String>,
}

/// Virtual account endpoints.
#[derive(Debug, Clone)]
pub struct VirtualAccountApi {
    pipeline: RequestPipeline,
}

impl VirtualAccountApi {
    /// Creates the API.
    #[must_use]
    pub const fn new(pipeline: RequestPipeline) -> Self {
        Self { pipeline }
    }

    /// Creates a virtual account.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn create_va(&self, request: &CreateVirtualAccount) -> Result<ApiResult, GatewayError> {
        self.pipeline.execute(Endpoint::CREATE_VA, request).await
    }

    /// Creates a single-use VA collecting exactly `amount`.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn create_dynamic_va(
        &self,
        acc_name: &str,
        mrc_order_id: &str,
        amount: u64,
        description: &str,
    ) -> Result<ApiResult, GatewayError> {
        let request =
            CreateVirtualAccount::dynamic(acc_name, mrc_order_id, amount).with_description(description);
        self.create_va(&request).await
    }

    /// Creates a reusable VA.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn create_static_va(
        &self,
        acc_name: &str,
        mrc_order_id: &str,
        description: &str,
    ) -> Result<ApiResult, GatewayError> {
        let request =
            CreateVirtualAccount::static_account(acc_name, mrc_order_id).with_description(description);
        self.create_va(&request).await
    }

    /// Updates a VA. `fields` are sent alongside `acc_no`.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn update_va(
        &self,
        acc_no: &str,
        mut fields: Map<String, Value>,
    ) -> Result<ApiResult, GatewayError> {
        fields.insert("acc_no".into(), Value::String(acc_no.to_owned()));
        self.pipeline.execute(Endpoint::UPDATE_VA, &fields).await
    }

    /// Looks up VA transactions.
    ///
    /// # Errors
    ///
    /// See [`RequestPipeline::execute`].
    pub async fn query_transaction(
        &self,
        query: &VaTransactionQuery,
    ) -> Result<ApiResult, GatewayError> {
        self.pipeline
            .execute(Endpoint::QUERY_VA_TRANSACTION, query)
            .await
    }
}
