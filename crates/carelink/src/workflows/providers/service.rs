use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{ApplicationSubmission, ProviderApplication, ProviderProfile};
use super::repository::ProviderRegistry;
use super::status::{ApplicationAction, ApplicationStatus};
use crate::workflows::domain::{Actor, ApplicationId, CategoryId, Role, UserId};
use crate::workflows::error::{MarketplaceError, RepositoryError};
use crate::workflows::events::{publish_committed, EventPublisher, MarketplaceEvent};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Effect an admin decision has on the provider's public listing.
enum Eligibility {
    Unchanged,
    Grant,
    Revoke,
}

/// Owns the provider-application state machine and the eligibility flag it controls.
pub struct ProviderApplicationGate {
    registry: Arc<dyn ProviderRegistry>,
    events: Arc<dyn EventPublisher>,
}

impl ProviderApplicationGate {
    pub fn new(registry: Arc<dyn ProviderRegistry>, events: Arc<dyn EventPublisher>) -> Self {
        Self { registry, events }
    }

    /// Register a fresh application. Allowed when the provider has none, or only rejected ones.
    pub fn submit(
        &self,
        actor: &Actor,
        submission: ApplicationSubmission,
    ) -> Result<ProviderApplication, MarketplaceError> {
        validate_submission(&submission)?;
        if actor.role != Role::Provider {
            return Err(unauthorized(actor, "submit", "a provider application"));
        }

        let application = ProviderApplication {
            id: next_application_id(),
            provider_id: actor.id.clone(),
            status: ApplicationStatus::Pending,
            submitted_at: Utc::now(),
            reviewer: None,
            reviewed_at: None,
            reason: None,
            version: 0,
            submission,
        };
        let profile = ProviderProfile::from_submission(actor.id.clone(), &application.submission);

        match self.registry.insert_application(application, profile) {
            Ok(stored) => {
                info!(application_id = %stored.id, provider_id = %stored.provider_id, "provider application submitted");
                publish_committed(
                    self.events.as_ref(),
                    MarketplaceEvent::new("application_submitted", &stored.id)
                        .with("provider_id", &stored.provider_id),
                );
                Ok(stored)
            }
            Err(RepositoryError::Conflict) => {
                let current = self
                    .registry
                    .latest_application(&actor.id)?
                    .map(|existing| existing.status.label())
                    .unwrap_or("open");
                Err(MarketplaceError::Conflict {
                    subject: format!("application for provider {}", actor.id),
                    action: "submit",
                    current: current.to_string(),
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    pub fn begin_review(
        &self,
        id: &ApplicationId,
        admin: &Actor,
    ) -> Result<ProviderApplication, MarketplaceError> {
        self.decide(id, admin, ApplicationAction::BeginReview, None, Eligibility::Unchanged)
    }

    pub fn approve(
        &self,
        id: &ApplicationId,
        admin: &Actor,
    ) -> Result<ProviderApplication, MarketplaceError> {
        self.decide(id, admin, ApplicationAction::Approve, None, Eligibility::Grant)
    }

    pub fn reject(
        &self,
        id: &ApplicationId,
        admin: &Actor,
        reason: &str,
    ) -> Result<ProviderApplication, MarketplaceError> {
        let reason = required_reason(reason, "rejecting an application")?;
        self.decide(id, admin, ApplicationAction::Reject, Some(reason), Eligibility::Revoke)
    }

    pub fn request_more_info(
        &self,
        id: &ApplicationId,
        admin: &Actor,
        reason: &str,
    ) -> Result<ProviderApplication, MarketplaceError> {
        let reason = required_reason(reason, "requesting more information")?;
        self.decide(
            id,
            admin,
            ApplicationAction::RequestMoreInfo,
            Some(reason),
            Eligibility::Unchanged,
        )
    }

    /// Provider answers a clarification request; the application re-enters review with the
    /// previous reason cleared.
    pub fn resubmit(
        &self,
        id: &ApplicationId,
        actor: &Actor,
        submission: ApplicationSubmission,
    ) -> Result<ProviderApplication, MarketplaceError> {
        validate_submission(&submission)?;
        let current = self.load(id)?;
        if !actor.acts_as(Role::Provider, &current.provider_id) {
            return Err(unauthorized(actor, "resubmit", &current.id));
        }
        let status = next_status(&current, ApplicationAction::Resubmit)?;

        let mut updated = current.clone();
        updated.status = status;
        updated.reason = None;
        updated.submission = submission;
        let eligible = self
            .registry
            .profile(&current.provider_id)?
            .map(|profile| profile.eligible)
            .unwrap_or(false);
        let profile = ProviderProfile {
            eligible,
            ..ProviderProfile::from_submission(current.provider_id.clone(), &updated.submission)
        };

        let stored = self.commit(updated, Some(profile), ApplicationAction::Resubmit)?;
        info!(application_id = %stored.id, "provider application resubmitted");
        publish_committed(
            self.events.as_ref(),
            MarketplaceEvent::new("application_resubmitted", &stored.id)
                .with("provider_id", &stored.provider_id),
        );
        Ok(stored)
    }

    /// Providers may read their own applications; admins may read any.
    pub fn get(
        &self,
        id: &ApplicationId,
        actor: &Actor,
    ) -> Result<ProviderApplication, MarketplaceError> {
        let application = self.load(id)?;
        if actor.is_admin() || actor.acts_as(Role::Provider, &application.provider_id) {
            Ok(application)
        } else {
            Err(unauthorized(actor, "view", &application.id))
        }
    }

    /// Applications awaiting an admin decision, oldest first.
    pub fn review_queue(&self, admin: &Actor) -> Result<Vec<ProviderApplication>, MarketplaceError> {
        if !admin.is_admin() {
            return Err(unauthorized(admin, "list", "the review queue"));
        }
        let mut queue = self.registry.applications_with_status(&[
            ApplicationStatus::Pending,
            ApplicationStatus::UnderReview,
        ])?;
        queue.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(queue)
    }

    /// Eligibility flag consulted at booking creation. Read, never locked.
    pub fn is_eligible(&self, provider: &UserId) -> Result<bool, MarketplaceError> {
        Ok(self
            .registry
            .profile(provider)?
            .map(|profile| profile.eligible)
            .unwrap_or(false))
    }

    pub fn search_providers(
        &self,
        category: Option<&CategoryId>,
        city: Option<&str>,
    ) -> Result<Vec<ProviderProfile>, MarketplaceError> {
        let city = city.map(str::trim).filter(|city| !city.is_empty());
        Ok(self.registry.search(category, city)?)
    }

    fn decide(
        &self,
        id: &ApplicationId,
        admin: &Actor,
        action: ApplicationAction,
        reason: Option<String>,
        eligibility: Eligibility,
    ) -> Result<ProviderApplication, MarketplaceError> {
        let current = self.load(id)?;
        if !admin.is_admin() {
            return Err(unauthorized(admin, action.verb(), &current.id));
        }
        let status = next_status(&current, action)?;

        let mut updated = current.clone();
        updated.status = status;
        updated.reason = reason;
        updated.reviewer = Some(admin.id.clone());
        updated.reviewed_at = Some(Utc::now());

        let profile = match eligibility {
            Eligibility::Unchanged => None,
            Eligibility::Grant => Some(ProviderProfile {
                eligible: true,
                ..ProviderProfile::from_submission(
                    current.provider_id.clone(),
                    &current.submission,
                )
            }),
            Eligibility::Revoke => {
                let existing = self.registry.profile(&current.provider_id)?;
                Some(match existing {
                    Some(profile) => ProviderProfile {
                        eligible: false,
                        ..profile
                    },
                    None => ProviderProfile::from_submission(
                        current.provider_id.clone(),
                        &current.submission,
                    ),
                })
            }
        };

        let stored = self.commit(updated, profile, action)?;
        info!(
            application_id = %stored.id,
            provider_id = %stored.provider_id,
            reviewer = %admin.id,
            status = stored.status.label(),
            "provider application decided"
        );

        let template = match stored.status {
            ApplicationStatus::Approved => "application_approved",
            ApplicationStatus::Rejected => "application_rejected",
            ApplicationStatus::RequiresMoreInfo => "application_requires_more_info",
            _ => "application_under_review",
        };
        let mut event = MarketplaceEvent::new(template, &stored.id)
            .with("provider_id", &stored.provider_id);
        if let Some(reason) = &stored.reason {
            event = event.with("reason", reason);
        }
        publish_committed(self.events.as_ref(), event);

        Ok(stored)
    }

    fn commit(
        &self,
        updated: ProviderApplication,
        profile: Option<ProviderProfile>,
        action: ApplicationAction,
    ) -> Result<ProviderApplication, MarketplaceError> {
        let id = updated.id.clone();
        match self.registry.commit_application(updated, profile) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::Stale) => {
                let latest = self.load(&id)?;
                warn!(application_id = %id, status = latest.status.label(), "lost application update race");
                Err(conflict(&latest, action))
            }
            Err(RepositoryError::NotFound) => Err(MarketplaceError::not_found("application", &id)),
            Err(other) => Err(other.into()),
        }
    }

    fn load(&self, id: &ApplicationId) -> Result<ProviderApplication, MarketplaceError> {
        self.registry
            .fetch_application(id)?
            .ok_or_else(|| MarketplaceError::not_found("application", id))
    }
}

fn next_status(
    current: &ProviderApplication,
    action: ApplicationAction,
) -> Result<ApplicationStatus, MarketplaceError> {
    current
        .status
        .apply(action)
        .ok_or_else(|| conflict(current, action))
}

fn conflict(current: &ProviderApplication, action: ApplicationAction) -> MarketplaceError {
    MarketplaceError::Conflict {
        subject: format!("application {}", current.id),
        action: action.verb(),
        current: current.status.label().to_string(),
    }
}

fn unauthorized(actor: &Actor, action: &'static str, subject: impl ToString) -> MarketplaceError {
    MarketplaceError::Authorization {
        actor: actor.id.clone(),
        role: actor.role,
        action,
        subject: subject.to_string(),
    }
}

fn required_reason(reason: &str, context: &str) -> Result<String, MarketplaceError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(MarketplaceError::validation(format!(
            "a reason is required when {context}"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_submission(submission: &ApplicationSubmission) -> Result<(), MarketplaceError> {
    if submission.display_name.trim().is_empty() {
        return Err(MarketplaceError::validation("display name is required"));
    }
    if submission.city.trim().is_empty() {
        return Err(MarketplaceError::validation("city is required"));
    }
    if submission.category_ids.is_empty() {
        return Err(MarketplaceError::validation(
            "at least one service category must be selected",
        ));
    }
    if submission.hourly_rate.is_zero() {
        return Err(MarketplaceError::validation("hourly rate must be positive"));
    }
    Ok(())
}
