use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::ApplicationStatus;
use crate::workflows::domain::{ApplicationId, CategoryId, Money, UserId};

/// Reference to a document held by the external document store. Never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub kind: DocumentKind,
    pub storage_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    NationalId,
    Certificate,
    Cv,
}

/// Professional details a provider submits for vetting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub display_name: String,
    pub city: String,
    pub bio: String,
    pub experience_years: u8,
    pub category_ids: Vec<CategoryId>,
    pub hourly_rate: Money,
    #[serde(default)]
    pub documents: Vec<DocumentReference>,
}

/// One provider's eligibility submission and its review trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderApplication {
    pub id: ApplicationId,
    pub provider_id: UserId,
    pub submission: ApplicationSubmission,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewer: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Rejection or clarification reason from the last admin decision.
    pub reason: Option<String>,
    pub version: u64,
}

impl ProviderApplication {
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            provider_id: self.provider_id.clone(),
            status: self.status,
            status_code: self.status.code(),
            status_label: self.status.label(),
            reason: self.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub provider_id: UserId,
    pub status: ApplicationStatus,
    pub status_code: u8,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Public-facing provider listing. `eligible` is the flag booking creation reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider_id: UserId,
    pub display_name: String,
    pub city: String,
    pub category_ids: Vec<CategoryId>,
    pub hourly_rate: Money,
    pub eligible: bool,
}

impl ProviderProfile {
    pub fn from_submission(provider_id: UserId, submission: &ApplicationSubmission) -> Self {
        Self {
            provider_id,
            display_name: submission.display_name.clone(),
            city: submission.city.clone(),
            category_ids: submission.category_ids.clone(),
            hourly_rate: submission.hourly_rate,
            eligible: false,
        }
    }
}
