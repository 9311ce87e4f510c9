use crate::error::PaymentError;
use crate::gateways::GatewayPayment;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "USD";

/// Body of `POST /payment` as sent by the web payments form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Major currency units, e.g. `12.34` dollars.
    pub amount: Decimal,
    #[serde(default)]
    pub location_id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub verification_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

/// What actually goes to the gateway. Serializes to the Square
/// `CreatePayment` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCommand {
    pub idempotency_key: String,
    pub location_id: String,
    pub source_id: String,
    pub amount_money: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub id: String,
    pub status: String,
    pub receipt_url: Option<String>,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub success: bool,
    pub payment: PaymentSummary,
}

impl PaymentOutcome {
    pub fn from_gateway(payment: GatewayPayment) -> Self {
        Self {
            success: true,
            payment: PaymentSummary {
                id: payment.id,
                status: payment.status,
                receipt_url: payment.receipt_url,
                order_id: payment.order_id,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

/// `round(amount * 100)`, half away from zero. `None` when the result does
/// not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

pub fn resolve_idempotency_key(requested: Option<&str>) -> String {
    match requested {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

pub fn build_command(req: PaymentRequest, currency: &str) -> Result<PaymentCommand, PaymentError> {
    let amount = to_minor_units(req.amount).ok_or_else(|| {
        PaymentError::Decode(format!("amount {} is out of range", req.amount))
    })?;

    Ok(PaymentCommand {
        idempotency_key: resolve_idempotency_key(req.idempotency_key.as_deref()),
        location_id: req.location_id,
        source_id: req.source_id,
        amount_money: Money {
            amount,
            currency: currency.to_string(),
        },
        verification_token: req.verification_token.filter(|t| !t.is_empty()),
    })
}
