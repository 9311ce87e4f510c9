use payment_relay::config::AppConfig;
use payment_relay::gateways::mock::MockGateway;
use payment_relay::gateways::square::SquareGateway;
use payment_relay::gateways::PaymentGateway;
use payment_relay::http::router::build_router;
use payment_relay::service::payment_service::PaymentService;
use payment_relay::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let gateway: Arc<dyn PaymentGateway> = if cfg.gateway_adapter == "mock" {
        tracing::warn!("PAYMENT_GATEWAY=mock, payments will not reach Square");
        Arc::new(MockGateway::always_succeed())
    } else {
        if cfg.square_access_token.is_empty() {
            tracing::warn!("SQUARE_ACCESS_TOKEN is empty, Square will reject every payment");
        }
        Arc::new(SquareGateway {
            base_url: cfg.square_base_url.clone(),
            access_token: cfg.square_access_token.clone(),
            api_version: cfg.square_version.clone(),
            timeout_ms: cfg.square_timeout_ms,
            client: reqwest::Client::new(),
        })
    };

    let payment_service = PaymentService {
        gateway,
        retry_policy: cfg.retry_policy.clone(),
        currency: cfg.currency.clone(),
        validate_payload: cfg.validate_payload,
    };

    let state = AppState {
        payment_service,
        request_timeout: Duration::from_millis(cfg.request_timeout_ms),
    };
    let app = build_router(state, &cfg.static_dir);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
