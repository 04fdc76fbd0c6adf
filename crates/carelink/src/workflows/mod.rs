//! Care-services marketplace core: booking lifecycle, provider vetting, settlement, reviews.

pub mod dashboard;
pub mod domain;
pub mod error;
pub mod events;
pub mod memory;
pub mod pricing;
pub mod providers;
pub mod requests;
pub mod reviews;
pub mod router;
pub mod settlement;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::MarketplaceConfig;

pub use dashboard::{EarningsSummary, MarketplaceDashboard, MarketplaceStats, StatusCount};
pub use domain::{
    Actor, ApplicationId, CategoryId, ExternalSessionId, Money, RequestId, Role, ShiftType,
    UserId,
};
pub use error::{ErrorKind, GatewayError, MarketplaceError, RepositoryError};
pub use events::{EventError, EventPublisher, LoggingEventPublisher, MarketplaceEvent};
pub use pricing::{PriceQuote, PricingCatalog, PricingResolver, PricingRule};
pub use providers::ProviderApplicationGate;
pub use requests::RequestLifecycle;
pub use reviews::{ReviewGate, ReviewLookup};
pub use router::marketplace_router;
pub use settlement::SettlementCoordinator;

/// Ports the marketplace needs from the outside world.
#[derive(Clone)]
pub struct Collaborators {
    pub requests: Arc<dyn requests::RequestRepository>,
    pub providers: Arc<dyn providers::ProviderRegistry>,
    pub sessions: Arc<dyn settlement::PaymentSessionRepository>,
    pub pricing: Arc<dyn PricingCatalog>,
    pub gateway: Arc<dyn settlement::PaymentGateway>,
    pub events: Arc<dyn EventPublisher>,
}

/// The five coordinating components wired over one set of collaborators.
pub struct Marketplace {
    pub requests: RequestLifecycle,
    pub providers: ProviderApplicationGate,
    pub settlement: SettlementCoordinator,
    pub reviews: ReviewGate,
    pub dashboard: MarketplaceDashboard,
}

impl Marketplace {
    pub fn new(collaborators: Collaborators, config: &MarketplaceConfig) -> Self {
        let Collaborators {
            requests,
            providers,
            sessions,
            pricing,
            gateway,
            events,
        } = collaborators;

        Self {
            requests: RequestLifecycle::new(
                requests.clone(),
                providers.clone(),
                sessions.clone(),
                gateway.clone(),
                PricingResolver::new(pricing),
                events.clone(),
            ),
            providers: ProviderApplicationGate::new(providers.clone(), events.clone()),
            settlement: SettlementCoordinator::new(
                requests.clone(),
                sessions.clone(),
                gateway,
                events.clone(),
                config.currency.clone(),
            ),
            reviews: ReviewGate::new(requests.clone(), events, config.review_window_days),
            dashboard: MarketplaceDashboard::new(requests, providers, sessions),
        }
    }

    /// In-memory wiring with the hosted-checkout gateway; the backend handle stays inspectable.
    pub fn in_memory(config: &MarketplaceConfig) -> (Self, memory::InMemoryBackend) {
        let backend = memory::InMemoryBackend::default();
        let gateway = Arc::new(settlement::HostedCheckoutGateway::new(
            config.checkout_base_url.clone(),
        ));
        let marketplace = Self::new(backend.collaborators(gateway), config);
        (marketplace, backend)
    }
}
