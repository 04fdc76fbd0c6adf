use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::RequestStatus;
use crate::workflows::domain::{BookingWindow, CategoryId, Money, RequestId, ShiftType, UserId};

/// Client-supplied booking details. The client is the acting party, not a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub provider_id: UserId,
    pub category_id: CategoryId,
    pub shift_type: ShiftType,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    pub address: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Client rating of a completed booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// One booking. Never deleted; terminal statuses form the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: RequestId,
    pub client_id: UserId,
    pub provider_id: UserId,
    pub category_id: CategoryId,
    pub shift_type: ShiftType,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    /// Snapshot taken at creation; catalog edits never reach it.
    pub total_price: Money,
    pub address: String,
    pub description: Option<String>,
    pub rejection_reason: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub review: Option<Review>,
    /// Optimistic concurrency token, bumped by the repository on every update.
    pub version: u64,
}

impl ServiceRequest {
    pub fn window(&self) -> Option<BookingWindow> {
        BookingWindow::new(self.preferred_date, self.preferred_time, self.shift_type)
    }

    /// Record invariants that must hold after every transition.
    pub fn is_consistent(&self) -> bool {
        let reason_matches =
            self.rejection_reason.is_some() == (self.status == RequestStatus::Rejected);
        let review_matches = self.review.is_none() || self.status == RequestStatus::Completed;
        let completion_matches =
            self.completed_at.is_some() == (self.status == RequestStatus::Completed);
        reason_matches && review_matches && completion_matches
    }

    pub fn status_view(&self) -> RequestStatusView {
        RequestStatusView {
            request_id: self.id.clone(),
            status: self.status,
            status_code: self.status.code(),
            status_label: self.status.label(),
            total_price: self.total_price,
            rejection_reason: self.rejection_reason.clone(),
            rating: self.review.as_ref().map(|review| review.rating),
        }
    }
}

/// Compact status payload for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct RequestStatusView {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub status_code: u8,
    pub status_label: &'static str,
    pub total_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}
