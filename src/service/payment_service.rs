use crate::domain::payment::{build_command, PaymentOutcome, PaymentRequest, DEFAULT_CURRENCY};
use crate::domain::validation::validate_payload;
use crate::error::PaymentError;
use crate::gateways::{GatewayError, PaymentGateway};
use crate::service::retry_orchestrator::{with_retry, AttemptOutcome, RetryError, RetryPolicy};
use axum::http::StatusCode;
use std::sync::Arc;

#[derive(Clone)]
pub struct PaymentService {
    pub gateway: Arc<dyn PaymentGateway>,
    pub retry_policy: RetryPolicy,
    pub currency: String,
    pub validate_payload: bool,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, retry_policy: RetryPolicy) -> Self {
        Self {
            gateway,
            retry_policy,
            currency: DEFAULT_CURRENCY.to_string(),
            validate_payload: false,
        }
    }

    pub async fn submit_payment(
        &self,
        raw_body: &[u8],
    ) -> Result<(StatusCode, PaymentOutcome), PaymentError> {
        let req: PaymentRequest =
            serde_json::from_slice(raw_body).map_err(|e| PaymentError::Decode(e.to_string()))?;
        tracing::debug!(payload = ?req, "payment request received");
        self.process(req).await
    }

    pub async fn process(
        &self,
        req: PaymentRequest,
    ) -> Result<(StatusCode, PaymentOutcome), PaymentError> {
        if self.validate_payload {
            validate_payload(&req)?;
        }

        // Built once so every attempt carries the same idempotency key.
        let command = build_command(req, &self.currency)?;

        let gateway = self.gateway.as_ref();
        let command_ref = &command;
        let result = with_retry(&self.retry_policy, move |attempt| async move {
            tracing::debug!(
                attempt,
                gateway = gateway.name(),
                idempotency_key = %command_ref.idempotency_key,
                "creating payment"
            );
            match gateway.create_payment(command_ref).await {
                Ok(resp) => AttemptOutcome::Success(resp),
                Err(GatewayError::Api {
                    status_code,
                    errors,
                }) => {
                    tracing::error!(status_code, errors = ?errors, "payment rejected by gateway");
                    AttemptOutcome::Bail(GatewayError::Api {
                        status_code,
                        errors,
                    })
                }
                Err(e) => {
                    tracing::error!("error creating payment on attempt {}: {}", attempt, e);
                    AttemptOutcome::Retry(e)
                }
            }
        })
        .await;

        match result {
            Ok(resp) => {
                tracing::info!(
                    status_code = resp.status_code,
                    payment_id = %resp.payment.id,
                    status = %resp.payment.status,
                    "payment succeeded"
                );
                let status = StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::OK);
                Ok((status, PaymentOutcome::from_gateway(resp.payment)))
            }
            Err(err) => Err(retry_failure(err)),
        }
    }
}

fn retry_failure(err: RetryError<GatewayError>) -> PaymentError {
    match err {
        RetryError::NoRetry {
            error: GatewayError::Api {
                status_code,
                errors,
            },
            ..
        } => PaymentError::GatewayRejected {
            status_code,
            errors,
        },
        RetryError::NoRetry { attempt, error } => PaymentError::Exhausted {
            attempts: attempt,
            last_error: error,
        },
        RetryError::Exhausted { attempts, error } => PaymentError::Exhausted {
            attempts,
            last_error: error,
        },
        RetryError::BudgetSpent {
            attempts,
            last_error,
        } => PaymentError::Exhausted {
            attempts,
            last_error: last_error.unwrap_or_else(|| {
                GatewayError::Transport(anyhow::anyhow!("latency budget spent during attempt {attempts}"))
            }),
        },
    }
}
