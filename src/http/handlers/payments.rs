use crate::error::PaymentError;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

/// The retry loop's own latency budget should answer first; the request
/// timeout only catches what slips past it.
pub async fn create_payment(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let result = tokio::time::timeout(
        state.request_timeout,
        state.payment_service.submit_payment(&body),
    )
    .await
    .unwrap_or_else(|_| {
        tracing::error!(
            timeout_ms = state.request_timeout.as_millis() as u64,
            "payment request timed out"
        );
        Err(PaymentError::TimedOut {
            timeout_ms: state.request_timeout.as_millis() as u64,
        })
    });

    match result {
        Ok((status, outcome)) => (status, Json(outcome)).into_response(),
        Err(e) => (e.status_code(), Json(e.envelope())).into_response(),
    }
}
