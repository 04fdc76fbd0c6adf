use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{BookingRequest, ServiceRequest};
use super::repository::RequestRepository;
use super::status::{Performer, RequestAction, RequestStatus};
use crate::workflows::domain::{Actor, BookingWindow, RequestId, Role, UserId};
use crate::workflows::error::{MarketplaceError, RepositoryError};
use crate::workflows::events::{publish_committed, EventPublisher, MarketplaceEvent};
use crate::workflows::pricing::PricingResolver;
use crate::workflows::providers::ProviderRegistry;
use crate::workflows::settlement::service::retire_open_checkout;
use crate::workflows::settlement::{PaymentGateway, PaymentSessionRepository};

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("req-{id:06}"))
}

/// Owns the booking state machine. Every mutation re-checks who is acting and returns the
/// stored record.
pub struct RequestLifecycle {
    requests: Arc<dyn RequestRepository>,
    providers: Arc<dyn ProviderRegistry>,
    sessions: Arc<dyn PaymentSessionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    pricing: PricingResolver,
    events: Arc<dyn EventPublisher>,
}

impl RequestLifecycle {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        providers: Arc<dyn ProviderRegistry>,
        sessions: Arc<dyn PaymentSessionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        pricing: PricingResolver,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            requests,
            providers,
            sessions,
            gateway,
            pricing,
            events,
        }
    }

    /// Book a provider. The price is resolved once here and never recomputed.
    pub fn create(
        &self,
        actor: &Actor,
        booking: BookingRequest,
    ) -> Result<ServiceRequest, MarketplaceError> {
        let address = booking.address.trim();
        if address.is_empty() {
            return Err(MarketplaceError::validation("service address is required"));
        }
        let window = BookingWindow::new(
            booking.preferred_date,
            booking.preferred_time,
            booking.shift_type,
        )
        .ok_or_else(|| MarketplaceError::validation("preferred date out of range"))?;
        if actor.role != Role::Client {
            return Err(unauthorized(actor, "create", "a booking"));
        }
        if actor.id == booking.provider_id {
            return Err(MarketplaceError::validation(
                "providers cannot book themselves",
            ));
        }

        let profile = self
            .providers
            .profile(&booking.provider_id)?
            .filter(|profile| profile.eligible)
            .ok_or_else(|| {
                MarketplaceError::validation(format!(
                    "provider {} is not accepting bookings",
                    booking.provider_id
                ))
            })?;

        let quote = self.pricing.quote(
            &profile.category_ids,
            &booking.category_id,
            booking.shift_type,
        )?;

        let now = Utc::now();
        let mut request = ServiceRequest {
            id: next_request_id(),
            client_id: actor.id.clone(),
            provider_id: booking.provider_id,
            category_id: quote.category_id,
            shift_type: quote.shift_type,
            preferred_date: booking.preferred_date,
            preferred_time: booking.preferred_time,
            total_price: quote.total,
            address: address.to_string(),
            description: booking
                .description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            rejection_reason: None,
            status: RequestStatus::Pending,
            created_at: now,
            accepted_at: None,
            completed_at: None,
            review: None,
            version: 0,
        };

        if let Some(clash) = self
            .requests
            .for_client(&request.client_id)?
            .into_iter()
            .find(|existing| {
                existing.provider_id == request.provider_id
                    && existing.status.blocks_calendar()
                    && existing
                        .window()
                        .is_some_and(|booked| booked.shares_day_with(&window))
            })
        {
            return Err(MarketplaceError::validation(format!(
                "an open booking ({}) with this provider already covers that date",
                clash.id
            )));
        }

        request = match self.requests.insert(request) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                return Err(RepositoryError::Unavailable("request id collision".to_string()).into())
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            request_id = %request.id,
            client_id = %request.client_id,
            provider_id = %request.provider_id,
            price = %request.total_price,
            "service request created"
        );
        publish_committed(
            self.events.as_ref(),
            MarketplaceEvent::new("request_created", &request.id)
                .with("provider_id", &request.provider_id)
                .with("client_id", &request.client_id),
        );
        Ok(request)
    }

    pub fn accept(&self, id: &RequestId, actor: &Actor) -> Result<ServiceRequest, MarketplaceError> {
        self.transition(id, actor, RequestAction::Accept, no_guard, |request, now| {
            request.accepted_at = Some(now);
        })
    }

    pub fn reject(
        &self,
        id: &RequestId,
        actor: &Actor,
        reason: &str,
    ) -> Result<ServiceRequest, MarketplaceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(MarketplaceError::validation(
                "a reason is required when rejecting a request",
            ));
        }
        self.transition(id, actor, RequestAction::Reject, no_guard, |request, _| {
            request.rejection_reason = Some(reason.to_string());
        })
    }

    /// Client withdrawal. Closed once any payment has succeeded, even if the callback that
    /// moves the request to `Paid` is still in flight. An open checkout is retired with it.
    pub fn cancel(&self, id: &RequestId, actor: &Actor) -> Result<ServiceRequest, MarketplaceError> {
        let sessions = Arc::clone(&self.sessions);
        let cancelled = self.transition(
            id,
            actor,
            RequestAction::Cancel,
            move |request| {
                if request.status == RequestStatus::Accepted && sessions.has_success(&request.id)? {
                    return Err(MarketplaceError::Conflict {
                        subject: format!("request {}", request.id),
                        action: RequestAction::Cancel.verb(),
                        current: "paid; refunds go through support".to_string(),
                    });
                }
                Ok(())
            },
            |_, _| {},
        )?;
        retire_open_checkout(self.sessions.as_ref(), self.gateway.as_ref(), &cancelled.id);
        Ok(cancelled)
    }

    pub fn start(&self, id: &RequestId, actor: &Actor) -> Result<ServiceRequest, MarketplaceError> {
        self.transition(id, actor, RequestAction::Start, no_guard, |_, _| {})
    }

    pub fn complete(
        &self,
        id: &RequestId,
        actor: &Actor,
    ) -> Result<ServiceRequest, MarketplaceError> {
        self.transition(id, actor, RequestAction::Complete, no_guard, |request, now| {
            request.completed_at = Some(now);
        })
    }

    /// Parties to the booking and admins may read it.
    pub fn get(&self, id: &RequestId, actor: &Actor) -> Result<ServiceRequest, MarketplaceError> {
        let request = self.load(id)?;
        if is_party(actor, &request) || actor.is_admin() {
            Ok(request)
        } else {
            Err(unauthorized(actor, "view", &request.id))
        }
    }

    pub fn requests_for_client(
        &self,
        client: &UserId,
        actor: &Actor,
    ) -> Result<Vec<ServiceRequest>, MarketplaceError> {
        if !(actor.acts_as(Role::Client, client) || actor.is_admin()) {
            return Err(unauthorized(actor, "list", format!("requests of {client}")));
        }
        Ok(self.requests.for_client(client)?)
    }

    pub fn requests_for_provider(
        &self,
        provider: &UserId,
        actor: &Actor,
    ) -> Result<Vec<ServiceRequest>, MarketplaceError> {
        if !(actor.acts_as(Role::Provider, provider) || actor.is_admin()) {
            return Err(unauthorized(actor, "list", format!("requests of {provider}")));
        }
        Ok(self.requests.for_provider(provider)?)
    }

    fn transition<G, F>(
        &self,
        id: &RequestId,
        actor: &Actor,
        action: RequestAction,
        guard: G,
        apply: F,
    ) -> Result<ServiceRequest, MarketplaceError>
    where
        G: FnOnce(&ServiceRequest) -> Result<(), MarketplaceError>,
        F: FnOnce(&mut ServiceRequest, DateTime<Utc>),
    {
        let current = self.load(id)?;
        if !may_perform(actor, &current, action) {
            return Err(unauthorized(actor, action.verb(), &current.id));
        }
        let next = current
            .status
            .apply(action)
            .ok_or_else(|| conflict(&current, action))?;
        guard(&current)?;

        let mut updated = current.clone();
        updated.status = next;
        apply(&mut updated, Utc::now());
        debug_assert!(updated.is_consistent(), "transition broke record invariants");

        let stored = match self.requests.update(updated) {
            Ok(stored) => stored,
            Err(RepositoryError::Stale) => {
                let latest = self.load(id)?;
                warn!(
                    request_id = %id,
                    action = action.verb(),
                    status = latest.status.label(),
                    "lost request update race"
                );
                return Err(conflict(&latest, action));
            }
            Err(RepositoryError::NotFound) => {
                return Err(MarketplaceError::not_found("request", id))
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            request_id = %stored.id,
            actor = %actor.id,
            from = current.status.label(),
            to = stored.status.label(),
            "service request transitioned"
        );

        let mut event = MarketplaceEvent::new(event_template(action), &stored.id)
            .with("client_id", &stored.client_id)
            .with("provider_id", &stored.provider_id);
        if let Some(reason) = &stored.rejection_reason {
            event = event.with("reason", reason);
        }
        publish_committed(self.events.as_ref(), event);

        Ok(stored)
    }

    fn load(&self, id: &RequestId) -> Result<ServiceRequest, MarketplaceError> {
        self.requests
            .fetch(id)?
            .ok_or_else(|| MarketplaceError::not_found("request", id))
    }
}

fn no_guard(_: &ServiceRequest) -> Result<(), MarketplaceError> {
    Ok(())
}

fn may_perform(actor: &Actor, request: &ServiceRequest, action: RequestAction) -> bool {
    match action.performer() {
        Performer::Party(Role::Provider) => actor.acts_as(Role::Provider, &request.provider_id),
        Performer::Party(Role::Client) => actor.acts_as(Role::Client, &request.client_id),
        Performer::Party(Role::Admin) => actor.is_admin(),
        Performer::Processor => false,
    }
}

fn is_party(actor: &Actor, request: &ServiceRequest) -> bool {
    actor.acts_as(Role::Client, &request.client_id)
        || actor.acts_as(Role::Provider, &request.provider_id)
}

fn event_template(action: RequestAction) -> &'static str {
    match action {
        RequestAction::Accept => "request_accepted",
        RequestAction::Reject => "request_rejected",
        RequestAction::Cancel => "request_cancelled",
        RequestAction::ConfirmPayment => "request_paid",
        RequestAction::Start => "request_started",
        RequestAction::Complete => "request_completed",
    }
}

pub(crate) fn conflict(current: &ServiceRequest, action: RequestAction) -> MarketplaceError {
    MarketplaceError::Conflict {
        subject: format!("request {}", current.id),
        action: action.verb(),
        current: current.status.label().to_string(),
    }
}

pub(crate) fn unauthorized(
    actor: &Actor,
    action: &'static str,
    subject: impl ToString,
) -> MarketplaceError {
    MarketplaceError::Authorization {
        actor: actor.id.clone(),
        role: actor.role,
        action,
        subject: subject.to_string(),
    }
}
