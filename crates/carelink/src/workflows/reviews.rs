//! One rating per completed booking.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Actor, RequestId, Role};
use super::error::{MarketplaceError, RepositoryError};
use super::events::{publish_committed, EventPublisher, MarketplaceEvent};
use super::requests::service::unauthorized;
use super::requests::{RequestRepository, RequestStatus, Review, ServiceRequest};

const MAX_COMMENT_CHARS: usize = 2_000;

/// Answer to a review lookup. "Not yet reviewed" is a normal state, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "review", rename_all = "snake_case")]
pub enum ReviewLookup {
    Reviewed(Review),
    NotYetReviewed,
}

/// Accepts exactly one immutable review per `Completed` request.
pub struct ReviewGate {
    requests: Arc<dyn RequestRepository>,
    events: Arc<dyn EventPublisher>,
    window: Option<Duration>,
}

impl ReviewGate {
    /// `window_days == 0` accepts reviews at any time after completion.
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        events: Arc<dyn EventPublisher>,
        window_days: u32,
    ) -> Self {
        let window = (window_days > 0).then(|| Duration::days(i64::from(window_days)));
        Self {
            requests,
            events,
            window,
        }
    }

    pub fn submit_review(
        &self,
        id: &RequestId,
        actor: &Actor,
        rating: u8,
        comment: Option<String>,
    ) -> Result<ServiceRequest, MarketplaceError> {
        if !(1..=5).contains(&rating) {
            return Err(MarketplaceError::validation(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }
        let comment = comment
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if comment
            .as_ref()
            .is_some_and(|text| text.chars().count() > MAX_COMMENT_CHARS)
        {
            return Err(MarketplaceError::validation(format!(
                "review comment is limited to {MAX_COMMENT_CHARS} characters"
            )));
        }

        let current = self.load(id)?;
        if !actor.acts_as(Role::Client, &current.client_id) {
            return Err(unauthorized(actor, "review", &current.id));
        }
        self.ensure_reviewable(&current)?;

        let now = Utc::now();
        let mut updated = current.clone();
        updated.review = Some(Review {
            rating,
            comment,
            submitted_at: now,
        });

        let stored = match self.requests.update(updated) {
            Ok(stored) => stored,
            Err(RepositoryError::Stale) => {
                let latest = self.load(id)?;
                warn!(request_id = %id, "lost review submission race");
                self.ensure_reviewable(&latest)?;
                return Err(already_reviewed(&latest));
            }
            Err(other) => return Err(other.into()),
        };

        info!(request_id = %stored.id, provider_id = %stored.provider_id, rating, "review submitted");
        publish_committed(
            self.events.as_ref(),
            MarketplaceEvent::new("review_submitted", &stored.id)
                .with("provider_id", &stored.provider_id)
                .with("rating", rating),
        );
        Ok(stored)
    }

    pub fn fetch_review(&self, id: &RequestId) -> Result<ReviewLookup, MarketplaceError> {
        let request = self.load(id)?;
        Ok(match request.review {
            Some(review) => ReviewLookup::Reviewed(review),
            None => ReviewLookup::NotYetReviewed,
        })
    }

    fn ensure_reviewable(&self, request: &ServiceRequest) -> Result<(), MarketplaceError> {
        if request.status != RequestStatus::Completed {
            return Err(MarketplaceError::Conflict {
                subject: format!("request {}", request.id),
                action: "review",
                current: request.status.label().to_string(),
            });
        }
        if request.review.is_some() {
            return Err(already_reviewed(request));
        }
        if let (Some(window), Some(completed_at)) = (self.window, request.completed_at) {
            if Utc::now() > completed_at + window {
                return Err(MarketplaceError::Conflict {
                    subject: format!("request {}", request.id),
                    action: "review",
                    current: "past the review window".to_string(),
                });
            }
        }
        Ok(())
    }

    fn load(&self, id: &RequestId) -> Result<ServiceRequest, MarketplaceError> {
        self.requests
            .fetch(id)?
            .ok_or_else(|| MarketplaceError::not_found("request", id))
    }
}

fn already_reviewed(request: &ServiceRequest) -> MarketplaceError {
    MarketplaceError::Conflict {
        subject: format!("request {}", request.id),
        action: "review",
        current: "already reviewed".to_string(),
    }
}
