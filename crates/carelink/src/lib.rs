//! Care-services marketplace core: booking lifecycle, provider vetting,
//! settlement, and reviews.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
