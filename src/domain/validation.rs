use crate::domain::payment::PaymentRequest;
use crate::error::PaymentError;
use rust_decimal::Decimal;

/// Optional pre-flight checks, enabled with `PAYMENT_VALIDATE_PAYLOAD`.
pub fn validate_payload(req: &PaymentRequest) -> Result<(), PaymentError> {
    if req.source_id.trim().is_empty() {
        return Err(PaymentError::Validation("sourceId is required".to_string()));
    }
    if req.location_id.trim().is_empty() {
        return Err(PaymentError::Validation("locationId is required".to_string()));
    }
    if req.amount <= Decimal::ZERO {
        return Err(PaymentError::Validation("amount must be > 0".to_string()));
    }
    Ok(())
}
