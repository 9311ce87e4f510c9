use crate::domain::payment::PaymentCommand;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod mock;
pub mod square;

/// Payment object as reported by the gateway. Anything beyond the four
/// fields the service forwards is kept in `other` and never leaves the
/// process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status_code: u16,
    pub payment: GatewayPayment,
}

/// One entry of a gateway `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub category: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    /// The gateway understood the request and refused it.
    #[error("gateway rejected request with status {status_code}")]
    Api {
        status_code: u16,
        errors: Vec<ApiErrorDetail>,
    },
    /// Network, timeout or unexpected failure.
    #[error("gateway call failed: {0:#}")]
    Transport(anyhow::Error),
}

impl GatewayError {
    pub fn is_api_error(&self) -> bool {
        matches!(self, GatewayError::Api { .. })
    }
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_payment(
        &self,
        command: &PaymentCommand,
    ) -> Result<GatewayResponse, GatewayError>;
}
