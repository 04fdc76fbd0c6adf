//! Booking lifecycle: creation, provider response, client cancellation, and delivery.

pub mod domain;
pub mod repository;
pub mod service;
pub mod status;

pub use domain::{BookingRequest, RequestStatusView, Review, ServiceRequest};
pub use repository::RequestRepository;
pub use service::RequestLifecycle;
pub use status::{Performer, RequestAction, RequestStatus};
