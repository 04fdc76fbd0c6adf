use chrono::{DateTime, Utc};

use super::domain::{PaymentSession, SessionStatus};
use crate::workflows::domain::{ExternalSessionId, Money, RequestId};
use crate::workflows::error::{GatewayError, RepositoryError};
use crate::workflows::requests::ServiceRequest;

/// Storage for payment sessions.
pub trait PaymentSessionRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the request already has a `Created` session.
    fn insert(&self, session: PaymentSession) -> Result<PaymentSession, RepositoryError>;

    fn fetch(&self, id: &ExternalSessionId) -> Result<Option<PaymentSession>, RepositoryError>;

    fn active_for_request(
        &self,
        request: &RequestId,
    ) -> Result<Option<PaymentSession>, RepositoryError>;

    fn for_request(&self, request: &RequestId) -> Result<Vec<PaymentSession>, RepositoryError>;

    /// Compare-and-set from `expected` to `next`.
    ///
    /// Returns [`RepositoryError::Stale`] when the stored status is no longer `expected`, and
    /// [`RepositoryError::Conflict`] when `next` is `Succeeded` but another session of the
    /// same request already succeeded.
    fn finalize(
        &self,
        id: &ExternalSessionId,
        expected: SessionStatus,
        next: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<PaymentSession, RepositoryError>;

    fn succeeded(&self) -> Result<Vec<PaymentSession>, RepositoryError>;

    fn has_success(&self, request: &RequestId) -> Result<bool, RepositoryError> {
        Ok(self
            .for_request(request)?
            .iter()
            .any(|session| session.status == SessionStatus::Succeeded))
    }
}

/// Session handle returned by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorSession {
    pub external_id: ExternalSessionId,
    pub checkout_url: String,
}

/// Outbound port to the payment processor's hosted checkout.
pub trait PaymentGateway: Send + Sync {
    fn create_checkout(
        &self,
        request: &ServiceRequest,
        amount: Money,
        currency: &str,
    ) -> Result<ProcessorSession, GatewayError>;

    /// Invalidate a session nobody will use. Best effort.
    fn expire_checkout(&self, id: &ExternalSessionId) -> Result<(), GatewayError>;
}
