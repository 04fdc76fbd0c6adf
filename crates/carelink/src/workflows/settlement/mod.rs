//! Payment settlement: checkout sessions and the processor callbacks that confirm them.

pub mod domain;
pub mod gateway;
pub mod repository;
pub mod service;

pub use domain::{
    CallbackResolution, CheckoutReference, PaymentOutcome, PaymentSession, SessionStatus,
};
pub use gateway::HostedCheckoutGateway;
pub use repository::{PaymentGateway, PaymentSessionRepository, ProcessorSession};
pub use service::SettlementCoordinator;
