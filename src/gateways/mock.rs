use crate::domain::payment::PaymentCommand;
use crate::gateways::{ApiErrorDetail, GatewayError, GatewayPayment, GatewayResponse, PaymentGateway};
use anyhow::anyhow;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
pub enum MockStep {
    Succeed(GatewayPayment),
    Reject(Vec<ApiErrorDetail>),
    Fail(String),
}

/// In-process gateway that replays a script of outcomes. Once the script is
/// down to its last step that step repeats forever. Only a gateway built with
/// [`MockGateway::recording`] keeps the commands it sees.
pub struct MockGateway {
    steps: Mutex<VecDeque<MockStep>>,
    calls: Option<Mutex<Vec<PaymentCommand>>>,
}

impl MockGateway {
    pub fn scripted(steps: Vec<MockStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: None,
        }
    }

    /// Like `scripted`, but every command is kept for inspection.
    pub fn recording(steps: Vec<MockStep>) -> Self {
        Self {
            calls: Some(Mutex::new(Vec::new())),
            ..Self::scripted(steps)
        }
    }

    pub fn always_succeed() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn calls(&self) -> Vec<PaymentCommand> {
        self.calls
            .as_ref()
            .map(|calls| calls.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .as_ref()
            .map_or(0, |calls| calls.lock().unwrap_or_else(PoisonError::into_inner).len())
    }

    fn next_step(&self) -> Option<MockStep> {
        let mut steps = self.steps.lock().unwrap_or_else(PoisonError::into_inner);
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }
}

pub fn completed_payment(id: &str) -> GatewayPayment {
    GatewayPayment {
        id: id.to_string(),
        status: "COMPLETED".to_string(),
        receipt_url: Some(format!("https://squareupsandbox.com/receipt/preview/{id}")),
        order_id: Some(format!("order_{id}")),
        other: serde_json::Map::new(),
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_payment(
        &self,
        command: &PaymentCommand,
    ) -> Result<GatewayResponse, GatewayError> {
        if let Some(calls) = &self.calls {
            calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(command.clone());
        }

        match self.next_step() {
            Some(MockStep::Succeed(payment)) => Ok(GatewayResponse {
                status_code: 200,
                payment,
            }),
            Some(MockStep::Reject(errors)) => Err(GatewayError::Api {
                status_code: 400,
                errors,
            }),
            Some(MockStep::Fail(message)) => Err(GatewayError::Transport(anyhow!(message))),
            None => Ok(GatewayResponse {
                status_code: 200,
                payment: completed_payment(&format!("mock_pay_{}", uuid::Uuid::new_v4())),
            }),
        }
    }
}
