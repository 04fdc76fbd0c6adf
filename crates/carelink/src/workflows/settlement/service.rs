use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{
    CallbackResolution, CheckoutReference, PaymentOutcome, PaymentSession, SessionStatus,
};
use super::repository::{PaymentGateway, PaymentSessionRepository};
use crate::workflows::domain::{Actor, ExternalSessionId, RequestId, Role};
use crate::workflows::error::{MarketplaceError, RepositoryError};
use crate::workflows::events::{publish_committed, EventPublisher, MarketplaceEvent};
use crate::workflows::requests::service::unauthorized;
use crate::workflows::requests::{RequestAction, RequestRepository, RequestStatus, ServiceRequest};

/// Bounded retries for compare-and-set loops; each retry observes a strictly newer state.
const MAX_CAS_ATTEMPTS: usize = 4;

/// Result of pushing a confirmed payment onto its booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    Paid,
    AlreadySettled,
    Closed(RequestStatus),
}

/// Reconciles booking status with payment outcomes reported by the processor.
///
/// Client redirects never count as payment; only [`SettlementCoordinator::handle_callback`]
/// moves a booking to `Paid`.
pub struct SettlementCoordinator {
    requests: Arc<dyn RequestRepository>,
    sessions: Arc<dyn PaymentSessionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    events: Arc<dyn EventPublisher>,
    currency: String,
}

impl SettlementCoordinator {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        sessions: Arc<dyn PaymentSessionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        events: Arc<dyn EventPublisher>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            requests,
            sessions,
            gateway,
            events,
            currency: currency.into(),
        }
    }

    /// Hand the client a checkout reference for an accepted booking.
    ///
    /// Reuses the request's open session when one exists, so concurrent or repeated calls
    /// converge on a single `Created` session.
    pub fn open_checkout(
        &self,
        id: &RequestId,
        actor: &Actor,
    ) -> Result<CheckoutReference, MarketplaceError> {
        let request = self.load(id)?;
        if !actor.acts_as(Role::Client, &request.client_id) {
            return Err(unauthorized(actor, "pay for", &request.id));
        }
        if request.status != RequestStatus::Accepted {
            return Err(checkout_conflict(&request));
        }

        if let Some(active) = self.sessions.active_for_request(&request.id)? {
            info!(request_id = %request.id, session = %active.external_id, "reusing open checkout session");
            return Ok(CheckoutReference::from(&active));
        }

        let opened = self
            .gateway
            .create_checkout(&request, request.total_price, &self.currency)?;
        let session = PaymentSession {
            external_id: opened.external_id,
            request_id: request.id.clone(),
            amount: request.total_price,
            currency: self.currency.clone(),
            status: SessionStatus::Created,
            checkout_url: opened.checkout_url,
            created_at: Utc::now(),
            finalized_at: None,
        };

        match self.sessions.insert(session.clone()) {
            Ok(stored) => {
                // A cancel that committed before the insert never saw this session.
                let latest = self.load(id)?;
                if latest.status != RequestStatus::Accepted {
                    retire_open_checkout(self.sessions.as_ref(), self.gateway.as_ref(), &latest.id);
                    return Err(checkout_conflict(&latest));
                }
                info!(
                    request_id = %stored.request_id,
                    session = %stored.external_id,
                    amount = %stored.amount,
                    "checkout session opened"
                );
                Ok(CheckoutReference::from(&stored))
            }
            Err(RepositoryError::Conflict) => {
                // A concurrent call won the single active slot; ours is never handed out.
                if let Err(error) = self.gateway.expire_checkout(&session.external_id) {
                    warn!(session = %session.external_id, %error, "failed to expire orphaned checkout session");
                }
                match self.sessions.active_for_request(&request.id)? {
                    Some(active) => Ok(CheckoutReference::from(&active)),
                    None => Err(checkout_conflict(&self.load(id)?)),
                }
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Apply a processor notification. Safe under at-least-once, out-of-order delivery.
    ///
    /// Unknown sessions yield `NotFound` so the processor retries; a notification can race
    /// ahead of the insert that records its session.
    pub fn handle_callback(
        &self,
        external_id: &ExternalSessionId,
        outcome: PaymentOutcome,
    ) -> Result<CallbackResolution, MarketplaceError> {
        let session = self
            .sessions
            .fetch(external_id)?
            .ok_or_else(|| MarketplaceError::not_found("payment session", external_id))?;

        let resolution = if outcome.is_success() {
            self.record_success(session)?
        } else {
            self.record_abandonment(session)?
        };

        info!(session = %external_id, ?outcome, ?resolution, "payment callback handled");
        Ok(resolution)
    }

    /// Sessions for a booking, oldest first. Visible to the paying client and admins.
    pub fn payment_history(
        &self,
        id: &RequestId,
        actor: &Actor,
    ) -> Result<Vec<PaymentSession>, MarketplaceError> {
        let request = self.load(id)?;
        if !(actor.acts_as(Role::Client, &request.client_id) || actor.is_admin()) {
            return Err(unauthorized(actor, "view payments of", &request.id));
        }
        let mut sessions = self.sessions.for_request(id)?;
        sessions.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        Ok(sessions)
    }

    fn record_success(
        &self,
        mut session: PaymentSession,
    ) -> Result<CallbackResolution, MarketplaceError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            match session.status {
                SessionStatus::Succeeded => {
                    // Replay. Finish the booking transition if an earlier delivery stopped short.
                    return Ok(match self.settle_request(&session)? {
                        Settlement::Paid => CallbackResolution::Applied,
                        Settlement::AlreadySettled => CallbackResolution::Duplicate,
                        Settlement::Closed(status) => {
                            warn!(request_id = %session.request_id, status = status.label(), "replayed payment for closed request");
                            CallbackResolution::RequiresOperator
                        }
                    });
                }
                SessionStatus::Created | SessionStatus::Cancelled => {
                    match self.sessions.finalize(
                        &session.external_id,
                        session.status,
                        SessionStatus::Succeeded,
                        Utc::now(),
                    ) {
                        Ok(finalized) => return self.settle_first_success(&finalized),
                        Err(RepositoryError::Stale) => {
                            session = self.reload_session(&session.external_id)?;
                        }
                        Err(RepositoryError::Conflict) => {
                            error!(
                                request_id = %session.request_id,
                                session = %session.external_id,
                                "second successful payment for one request"
                            );
                            publish_committed(
                                self.events.as_ref(),
                                MarketplaceEvent::new("operator_duplicate_charge", &session.request_id)
                                    .with("session", &session.external_id)
                                    .with("amount", session.amount),
                            );
                            return Ok(CallbackResolution::RequiresOperator);
                        }
                        Err(other) => return Err(other.into()),
                    }
                }
            }
        }
        Err(RepositoryError::Unavailable("payment session kept changing".to_string()).into())
    }

    fn settle_first_success(
        &self,
        session: &PaymentSession,
    ) -> Result<CallbackResolution, MarketplaceError> {
        match self.settle_request(session)? {
            Settlement::Paid | Settlement::AlreadySettled => Ok(CallbackResolution::Applied),
            Settlement::Closed(status) => {
                error!(
                    request_id = %session.request_id,
                    session = %session.external_id,
                    status = status.label(),
                    "payment captured for a request that can no longer be paid"
                );
                publish_committed(
                    self.events.as_ref(),
                    MarketplaceEvent::new("operator_payment_for_closed_request", &session.request_id)
                        .with("session", &session.external_id)
                        .with("status", status.label())
                        .with("amount", session.amount),
                );
                Ok(CallbackResolution::RequiresOperator)
            }
        }
    }

    fn record_abandonment(
        &self,
        mut session: PaymentSession,
    ) -> Result<CallbackResolution, MarketplaceError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            match session.status {
                SessionStatus::Cancelled => return Ok(CallbackResolution::Duplicate),
                SessionStatus::Succeeded => {
                    warn!(session = %session.external_id, "ignoring cancellation of a settled session");
                    return Ok(CallbackResolution::Ignored);
                }
                SessionStatus::Created => match self.sessions.finalize(
                    &session.external_id,
                    SessionStatus::Created,
                    SessionStatus::Cancelled,
                    Utc::now(),
                ) {
                    Ok(_) => return Ok(CallbackResolution::Applied),
                    Err(RepositoryError::Stale) => {
                        session = self.reload_session(&session.external_id)?;
                    }
                    Err(other) => return Err(other.into()),
                },
            }
        }
        Err(RepositoryError::Unavailable("payment session kept changing".to_string()).into())
    }

    /// Move the owning request `Accepted -> Paid` exactly once.
    fn settle_request(&self, session: &PaymentSession) -> Result<Settlement, MarketplaceError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let request = self.load(&session.request_id)?;
            let Some(next) = request.status.apply(RequestAction::ConfirmPayment) else {
                return Ok(match request.status {
                    RequestStatus::Paid | RequestStatus::InProgress | RequestStatus::Completed => {
                        Settlement::AlreadySettled
                    }
                    other => Settlement::Closed(other),
                });
            };

            let mut updated: ServiceRequest = request;
            updated.status = next;
            match self.requests.update(updated) {
                Ok(stored) => {
                    info!(request_id = %stored.id, session = %session.external_id, "service request paid");
                    publish_committed(
                        self.events.as_ref(),
                        MarketplaceEvent::new("request_paid", &stored.id)
                            .with("client_id", &stored.client_id)
                            .with("provider_id", &stored.provider_id)
                            .with("amount", stored.total_price),
                    );
                    return Ok(Settlement::Paid);
                }
                Err(RepositoryError::Stale) => continue,
                Err(other) => return Err(other.into()),
            }
        }
        Err(RepositoryError::Unavailable("service request kept changing".to_string()).into())
    }

    fn reload_session(&self, id: &ExternalSessionId) -> Result<PaymentSession, MarketplaceError> {
        self.sessions
            .fetch(id)?
            .ok_or_else(|| MarketplaceError::not_found("payment session", id))
    }

    fn load(&self, id: &RequestId) -> Result<ServiceRequest, MarketplaceError> {
        self.requests
            .fetch(id)?
            .ok_or_else(|| MarketplaceError::not_found("request", id))
    }
}

fn checkout_conflict(request: &ServiceRequest) -> MarketplaceError {
    MarketplaceError::Conflict {
        subject: format!("request {}", request.id),
        action: "open checkout for",
        current: request.status.label().to_string(),
    }
}

/// Cancel the request's `Created` session and expire it at the processor so the
/// checkout link can no longer be paid. Failures are logged; a session captured in the
/// meantime is left to the callback path.
pub(crate) fn retire_open_checkout(
    sessions: &dyn PaymentSessionRepository,
    gateway: &dyn PaymentGateway,
    request: &RequestId,
) {
    let active = match sessions.active_for_request(request) {
        Ok(Some(active)) => active,
        Ok(None) => return,
        Err(error) => {
            warn!(request_id = %request, %error, "could not look up open checkout session");
            return;
        }
    };
    match sessions.finalize(
        &active.external_id,
        SessionStatus::Created,
        SessionStatus::Cancelled,
        Utc::now(),
    ) {
        Ok(_) => info!(request_id = %request, session = %active.external_id, "open checkout session retired"),
        Err(RepositoryError::Stale) => return,
        Err(error) => {
            warn!(request_id = %request, session = %active.external_id, %error, "failed to retire checkout session");
        }
    }
    if let Err(error) = gateway.expire_checkout(&active.external_id) {
        warn!(session = %active.external_id, %error, "failed to expire checkout session");
    }
}
