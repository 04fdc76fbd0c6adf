//! Provider vetting: the application state machine and the eligibility flag it controls.

pub mod domain;
pub mod repository;
pub mod service;
pub mod status;

pub use domain::{
    ApplicationStatusView, ApplicationSubmission, DocumentKind, DocumentReference,
    ProviderApplication, ProviderProfile,
};
pub use repository::ProviderRegistry;
pub use service::ProviderApplicationGate;
pub use status::{ApplicationAction, ApplicationStatus};
