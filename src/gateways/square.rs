use crate::domain::payment::PaymentCommand;
use crate::gateways::{ApiErrorDetail, GatewayError, GatewayPayment, GatewayResponse, PaymentGateway};
use anyhow::{anyhow, Context};
use reqwest::StatusCode;
use serde::Deserialize;

pub const SANDBOX_BASE_URL: &str = "https://connect.squareupsandbox.com";
pub const PRODUCTION_BASE_URL: &str = "https://connect.squareup.com";
pub const DEFAULT_API_VERSION: &str = "2024-07-17";

pub struct SquareGateway {
    pub base_url: String,
    pub access_token: String,
    pub api_version: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SquareEnvelope {
    #[serde(default)]
    payment: Option<GatewayPayment>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

impl SquareGateway {
    pub fn base_url_for(environment: &str) -> &'static str {
        if environment.eq_ignore_ascii_case("production") {
            PRODUCTION_BASE_URL
        } else {
            SANDBOX_BASE_URL
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for SquareGateway {
    fn name(&self) -> &'static str {
        "square"
    }

    async fn create_payment(
        &self,
        command: &PaymentCommand,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = format!("{}/v2/payments", self.base_url.trim_end_matches('/'));

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header("Square-Version", &self.api_version)
            .json(command)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Transport(anyhow!("gateway timeout after {}ms", self.timeout_ms))
                } else {
                    GatewayError::Transport(anyhow::Error::new(e).context("sending create payment"))
                }
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("reading create payment response")
            .map_err(GatewayError::Transport)?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let envelope: SquareEnvelope = serde_json::from_str(&body)
            .context("decoding create payment response")
            .map_err(GatewayError::Transport)?;
        let payment = envelope
            .payment
            .ok_or_else(|| GatewayError::Transport(anyhow!("response carried no payment")))?;

        Ok(GatewayResponse {
            status_code: status.as_u16(),
            payment,
        })
    }
}

/// Maps a non-2xx response onto the retry taxonomy. Client errors are
/// structured rejections, except 408 and 429 which Square asks callers to
/// retry with the same idempotency key.
pub fn classify_failure(status: StatusCode, body: &str) -> GatewayError {
    let retryable = status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS;

    if !status.is_client_error() || retryable {
        let excerpt: String = body.chars().take(200).collect();
        return GatewayError::Transport(anyhow!("HTTP_{}: {}", status.as_u16(), excerpt));
    }

    let errors = serde_json::from_str::<SquareEnvelope>(body)
        .map(|env| env.errors)
        .unwrap_or_default();
    let errors = if errors.is_empty() {
        vec![ApiErrorDetail {
            category: "API_ERROR".to_string(),
            code: format!("HTTP_{}", status.as_u16()),
            detail: Some(body.chars().take(200).collect()),
            field: None,
        }]
    } else {
        errors
    };

    GatewayError::Api {
        status_code: status.as_u16(),
        errors,
    }
}
