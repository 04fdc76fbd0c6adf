use super::domain::ServiceRequest;
use crate::workflows::domain::{RequestId, UserId};
use crate::workflows::error::RepositoryError;

/// Storage abstraction for bookings.
///
/// `update` is a compare-and-swap on [`ServiceRequest::version`]: implementations must
/// reject a write whose version no longer matches the stored row with
/// [`RepositoryError::Stale`], and bump the version on success. This is what serializes
/// racing actors (accept vs. cancel, callback vs. cancel) on one request.
pub trait RequestRepository: Send + Sync {
    fn insert(&self, request: ServiceRequest) -> Result<ServiceRequest, RepositoryError>;
    fn fetch(&self, id: &RequestId) -> Result<Option<ServiceRequest>, RepositoryError>;
    fn update(&self, request: ServiceRequest) -> Result<ServiceRequest, RepositoryError>;
    /// Newest first.
    fn for_client(&self, client: &UserId) -> Result<Vec<ServiceRequest>, RepositoryError>;
    /// Newest first.
    fn for_provider(&self, provider: &UserId) -> Result<Vec<ServiceRequest>, RepositoryError>;
    fn all(&self) -> Result<Vec<ServiceRequest>, RepositoryError>;
}
