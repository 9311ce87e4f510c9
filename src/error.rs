use crate::domain::payment::{ErrorEnvelope, ErrorPayload};
use crate::gateways::{ApiErrorDetail, GatewayError};
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid payment payload: {0}")]
    Decode(String),
    #[error("payment payload failed validation: {0}")]
    Validation(String),
    #[error("gateway rejected payment with status {status_code}")]
    GatewayRejected {
        status_code: u16,
        errors: Vec<ApiErrorDetail>,
    },
    #[error("gateway unavailable after {attempts} attempt(s): {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: GatewayError,
    },
    #[error("payment did not finish within {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
}

impl PaymentError {
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::Decode(_) => "INVALID_PAYLOAD",
            PaymentError::Validation(_) => "VALIDATION_FAILED",
            PaymentError::GatewayRejected { .. } => "PAYMENT_REJECTED",
            PaymentError::Exhausted { .. } => "GATEWAY_UNAVAILABLE",
            PaymentError::TimedOut { .. } => "REQUEST_TIMEOUT",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::Decode(_) | PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
            PaymentError::GatewayRejected { status_code, .. } => StatusCode::from_u16(*status_code)
                .ok()
                .filter(StatusCode::is_client_error)
                .unwrap_or(StatusCode::BAD_REQUEST),
            PaymentError::Exhausted { .. } => StatusCode::BAD_GATEWAY,
            PaymentError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            PaymentError::GatewayRejected { errors, .. } => serde_json::to_value(errors).ok(),
            _ => None,
        };
        ErrorEnvelope {
            success: false,
            error: ErrorPayload {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        }
    }
}
