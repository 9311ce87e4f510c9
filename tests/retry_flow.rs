use payment_relay::domain::payment::PaymentRequest;
use payment_relay::error::PaymentError;
use payment_relay::gateways::mock::{completed_payment, MockGateway, MockStep};
use payment_relay::gateways::ApiErrorDetail;
use payment_relay::service::payment_service::PaymentService;
use payment_relay::service::retry_orchestrator::{with_retry, AttemptOutcome, RetryError, RetryPolicy};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay_ms: 0,
        max_delay_ms: 0,
        factor: 2,
        jitter: false,
        latency_budget_ms: 60_000,
    }
}

fn service(gateway: Arc<MockGateway>, max_attempts: u32) -> PaymentService {
    PaymentService::new(gateway, fast_policy(max_attempts))
}

fn request(key: Option<&str>) -> PaymentRequest {
    PaymentRequest {
        idempotency_key: key.map(str::to_string),
        amount: dec!(12.34),
        location_id: "LOC1".to_string(),
        source_id: "cnon:card-nonce-ok".to_string(),
        verification_token: None,
    }
}

fn declined() -> Vec<ApiErrorDetail> {
    vec![ApiErrorDetail {
        category: "PAYMENT_METHOD_ERROR".to_string(),
        code: "CARD_DECLINED".to_string(),
        detail: Some("Card declined.".to_string()),
        field: None,
    }]
}

#[tokio::test]
async fn transient_failures_then_success() {
    let gateway = Arc::new(MockGateway::recording(vec![
        MockStep::Fail("connection reset".to_string()),
        MockStep::Fail("timeout".to_string()),
        MockStep::Succeed(completed_payment("pay_third")),
    ]));

    let (status, outcome) = service(gateway.clone(), 3)
        .process(request(None))
        .await
        .unwrap();

    assert_eq!(status.as_u16(), 200);
    assert!(outcome.success);
    assert_eq!(outcome.payment.id, "pay_third");

    let calls = gateway.calls();
    assert_eq!(calls.len(), 3);
    assert!(!calls[0].idempotency_key.is_empty());
    assert!(calls.iter().all(|c| c == &calls[0]));
}

#[tokio::test]
async fn api_error_is_not_retried() {
    let gateway = Arc::new(MockGateway::recording(vec![
        MockStep::Reject(declined()),
        MockStep::Succeed(completed_payment("never")),
    ]));

    let err = service(gateway.clone(), 5)
        .process(request(Some("key-1")))
        .await
        .unwrap_err();

    assert_eq!(gateway.call_count(), 1);
    match err {
        PaymentError::GatewayRejected { status_code, errors } => {
            assert_eq!(status_code, 400);
            assert_eq!(errors, declined());
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn always_transient_exhausts_budget() {
    let gateway = Arc::new(MockGateway::recording(vec![MockStep::Fail("503".to_string())]));

    let err = service(gateway.clone(), 4)
        .process(request(None))
        .await
        .unwrap_err();

    assert_eq!(gateway.call_count(), 4);
    assert!(matches!(err, PaymentError::Exhausted { attempts: 4, .. }));
}

#[tokio::test]
async fn supplied_key_is_reused_on_every_attempt() {
    let gateway = Arc::new(MockGateway::recording(vec![
        MockStep::Fail("reset".to_string()),
        MockStep::Succeed(completed_payment("pay_1")),
    ]));

    service(gateway.clone(), 3)
        .process(request(Some("order-42")))
        .await
        .unwrap();

    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.idempotency_key == "order-42"));
}

#[tokio::test]
async fn separate_requests_get_distinct_keys() {
    let gateway = Arc::new(MockGateway::recording(Vec::new()));
    let svc = service(gateway.clone(), 1);

    svc.process(request(None)).await.unwrap();
    svc.process(request(None)).await.unwrap();

    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].idempotency_key, calls[1].idempotency_key);
}

#[tokio::test]
async fn validation_blocks_gateway_call_when_enabled() {
    let gateway = Arc::new(MockGateway::recording(Vec::new()));
    let mut svc = service(gateway.clone(), 3);
    svc.validate_payload = true;

    let mut req = request(None);
    req.source_id = String::new();
    let err = svc.process(req).await.unwrap_err();

    assert!(matches!(err, PaymentError::Validation(_)));
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn with_retry_counts_attempts() {
    let mut seen = Vec::new();
    let result: Result<(), RetryError<String>> = with_retry(&fast_policy(3), |attempt| {
        seen.push(attempt);
        async move { AttemptOutcome::Retry(format!("boom {attempt}")) }
    })
    .await;

    assert_eq!(seen, vec![1, 2, 3]);
    match result {
        Err(RetryError::Exhausted { attempts, error }) => {
            assert_eq!(attempts, 3);
            assert_eq!(error, "boom 3");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn with_retry_bail_stops_immediately() {
    let mut calls = 0;
    let result: Result<(), RetryError<&str>> = with_retry(&fast_policy(5), |_| {
        calls += 1;
        async { AttemptOutcome::Bail("bad request") }
    })
    .await;

    assert_eq!(calls, 1);
    assert!(matches!(result, Err(RetryError::NoRetry { attempt: 1, error: "bad request" })));
}
