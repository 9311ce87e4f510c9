pub mod config;
pub mod domain {
    pub mod payment;
    pub mod validation;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod payments;
    }
    pub mod router;
}
pub mod service {
    pub mod payment_service;
    pub mod retry_orchestrator;
}

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
    pub request_timeout: std::time::Duration,
}
