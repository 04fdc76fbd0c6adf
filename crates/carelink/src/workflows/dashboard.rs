//! Read-only rollups for the provider and admin dashboards.

use std::sync::Arc;

use serde::Serialize;

use super::domain::{Actor, Money, Role, UserId};
use super::error::MarketplaceError;
use super::providers::{ApplicationStatus, ProviderRegistry};
use super::requests::service::unauthorized;
use super::requests::{RequestRepository, RequestStatus};
use super::settlement::PaymentSessionRepository;

/// Provider earnings over completed bookings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsSummary {
    pub provider_id: UserId,
    pub completed_jobs: usize,
    pub total_earnings: Money,
    pub reviewed_jobs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: RequestStatus,
    pub status_code: u8,
    pub status_label: &'static str,
    pub count: usize,
}

/// Marketplace-wide totals for admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketplaceStats {
    pub total_requests: usize,
    /// One entry per status in lifecycle order, zero counts included.
    pub requests_by_status: Vec<StatusCount>,
    /// Applications waiting on an admin decision.
    pub pending_applications: usize,
    /// Sum of succeeded payment sessions.
    pub total_revenue: Money,
}

pub struct MarketplaceDashboard {
    requests: Arc<dyn RequestRepository>,
    registry: Arc<dyn ProviderRegistry>,
    sessions: Arc<dyn PaymentSessionRepository>,
}

impl MarketplaceDashboard {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        registry: Arc<dyn ProviderRegistry>,
        sessions: Arc<dyn PaymentSessionRepository>,
    ) -> Self {
        Self {
            requests,
            registry,
            sessions,
        }
    }

    pub fn earnings(
        &self,
        provider: &UserId,
        actor: &Actor,
    ) -> Result<EarningsSummary, MarketplaceError> {
        if !(actor.acts_as(Role::Provider, provider) || actor.is_admin()) {
            return Err(unauthorized(actor, "view earnings of", provider));
        }

        let completed: Vec<_> = self
            .requests
            .for_provider(provider)?
            .into_iter()
            .filter(|request| request.status == RequestStatus::Completed)
            .collect();
        let ratings: Vec<u8> = completed
            .iter()
            .filter_map(|request| request.review.as_ref().map(|review| review.rating))
            .collect();
        let average_rating = (!ratings.is_empty()).then(|| {
            let sum: u32 = ratings.iter().map(|rating| u32::from(*rating)).sum();
            f64::from(sum) / ratings.len() as f64
        });

        Ok(EarningsSummary {
            provider_id: provider.clone(),
            completed_jobs: completed.len(),
            total_earnings: completed.iter().map(|request| request.total_price).sum(),
            reviewed_jobs: ratings.len(),
            average_rating,
        })
    }

    pub fn stats(&self, admin: &Actor) -> Result<MarketplaceStats, MarketplaceError> {
        if !admin.is_admin() {
            return Err(unauthorized(admin, "view", "marketplace statistics"));
        }

        let requests = self.requests.all()?;
        let requests_by_status = RequestStatus::ordered()
            .into_iter()
            .map(|status| StatusCount {
                status,
                status_code: status.code(),
                status_label: status.label(),
                count: requests
                    .iter()
                    .filter(|request| request.status == status)
                    .count(),
            })
            .collect();

        let pending_applications = self
            .registry
            .applications_with_status(&[ApplicationStatus::Pending, ApplicationStatus::UnderReview])?
            .len();
        let total_revenue = self
            .sessions
            .succeeded()?
            .iter()
            .map(|session| session.amount)
            .sum();

        Ok(MarketplaceStats {
            total_requests: requests.len(),
            requests_by_status,
            pending_applications,
            total_revenue,
        })
    }
}
