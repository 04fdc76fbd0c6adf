use super::domain::{ProviderApplication, ProviderProfile};
use super::status::ApplicationStatus;
use crate::workflows::domain::{ApplicationId, CategoryId, UserId};
use crate::workflows::error::RepositoryError;

/// Storage for applications and the provider listings they gate.
///
/// An application and the profile change it causes commit as one unit so an approval
/// can never be stored without the eligibility flip (or the reverse).
pub trait ProviderRegistry: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] while the provider has an open application.
    fn insert_application(
        &self,
        application: ProviderApplication,
        profile: ProviderProfile,
    ) -> Result<ProviderApplication, RepositoryError>;

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ProviderApplication>, RepositoryError>;

    fn latest_application(
        &self,
        provider: &UserId,
    ) -> Result<Option<ProviderApplication>, RepositoryError>;

    fn applications_with_status(
        &self,
        statuses: &[ApplicationStatus],
    ) -> Result<Vec<ProviderApplication>, RepositoryError>;

    /// Version-checked update; `profile`, when present, replaces the stored listing atomically.
    fn commit_application(
        &self,
        application: ProviderApplication,
        profile: Option<ProviderProfile>,
    ) -> Result<ProviderApplication, RepositoryError>;

    fn profile(&self, provider: &UserId) -> Result<Option<ProviderProfile>, RepositoryError>;

    /// Eligible providers only.
    fn search(
        &self,
        category: Option<&CategoryId>,
        city: Option<&str>,
    ) -> Result<Vec<ProviderProfile>, RepositoryError>;
}
