use crate::domain::payment::DEFAULT_CURRENCY;
use crate::gateways::square::{SquareGateway, DEFAULT_API_VERSION};
use crate::service::retry_orchestrator::RetryPolicy;
use std::str::FromStr;

/// Room left between the retry budget and the request timeout so the retry
/// loop reports its own failure first.
pub const REQUEST_TIMEOUT_HEADROOM_MS: u64 = 1_000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub static_dir: String,
    pub gateway_adapter: String,
    pub square_access_token: String,
    pub square_base_url: String,
    pub square_version: String,
    pub square_timeout_ms: u64,
    pub currency: String,
    pub validate_payload: bool,
    pub retry_policy: RetryPolicy,
    pub request_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let defaults = RetryPolicy::default();

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| {
            format!("0.0.0.0:{}", var("PORT", "7000"))
        });
        let request_timeout_ms = parsed("REQUEST_TIMEOUT_MS").unwrap_or(15_000);
        let latency_budget_ms = parsed("PAYMENT_RETRY_LATENCY_BUDGET_MS")
            .unwrap_or(defaults.latency_budget_ms)
            .min(request_timeout_ms.saturating_sub(REQUEST_TIMEOUT_HEADROOM_MS));
        let square_base_url = lookup("SQUARE_BASE_URL").unwrap_or_else(|| {
            SquareGateway::base_url_for(&var("SQUARE_ENVIRONMENT", "sandbox")).to_string()
        });

        Self {
            bind_addr,
            static_dir: var("STATIC_DIR", "public"),
            gateway_adapter: var("PAYMENT_GATEWAY", "square").to_lowercase(),
            square_access_token: var("SQUARE_ACCESS_TOKEN", ""),
            square_base_url,
            square_version: var("SQUARE_VERSION", DEFAULT_API_VERSION),
            square_timeout_ms: parsed("SQUARE_TIMEOUT_MS").unwrap_or(3_000),
            currency: var("PAYMENT_CURRENCY", DEFAULT_CURRENCY).to_uppercase(),
            validate_payload: lookup("PAYMENT_VALIDATE_PAYLOAD")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(false),
            retry_policy: RetryPolicy {
                max_attempts: lookup("PAYMENT_RETRY_MAX_ATTEMPTS")
                    .and_then(|v| u32::from_str(v.trim()).ok())
                    .unwrap_or(defaults.max_attempts),
                base_delay_ms: parsed("PAYMENT_RETRY_BASE_DELAY_MS").unwrap_or(defaults.base_delay_ms),
                max_delay_ms: parsed("PAYMENT_RETRY_MAX_DELAY_MS").unwrap_or(defaults.max_delay_ms),
                latency_budget_ms,
                ..defaults
            },
            request_timeout_ms,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
