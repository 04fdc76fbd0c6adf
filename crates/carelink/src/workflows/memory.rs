//! Mutex-backed stores for the demo server and tests.
//!
//! Each store enforces the same conflict and version rules a database-backed adapter must:
//! a single `Created` session per request, compare-and-set updates, and atomic
//! application/profile commits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{ApplicationId, CategoryId, ExternalSessionId, RequestId, ShiftType, UserId};
use super::error::RepositoryError;
use super::events::{EventError, EventPublisher, MarketplaceEvent};
use super::pricing::{PricingCatalog, PricingRule};
use super::providers::{ApplicationStatus, ProviderApplication, ProviderProfile, ProviderRegistry};
use super::requests::{RequestRepository, ServiceRequest};
use super::settlement::{PaymentGateway, PaymentSession, PaymentSessionRepository, SessionStatus};
use super::Collaborators;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
}

fn newest_first(rows: &mut [ServiceRequest]) {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

#[derive(Default)]
pub struct InMemoryRequestRepository {
    rows: Mutex<HashMap<RequestId, ServiceRequest>>,
}

impl RequestRepository for InMemoryRequestRepository {
    fn insert(&self, request: ServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        let mut rows = lock(&self.rows)?;
        if rows.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        rows.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<ServiceRequest>, RepositoryError> {
        Ok(lock(&self.rows)?.get(id).cloned())
    }

    fn update(&self, mut request: ServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        let mut rows = lock(&self.rows)?;
        let stored = rows.get_mut(&request.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != request.version {
            return Err(RepositoryError::Stale);
        }
        request.version += 1;
        *stored = request.clone();
        Ok(request)
    }

    fn for_client(&self, client: &UserId) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let mut rows: Vec<_> = lock(&self.rows)?
            .values()
            .filter(|request| &request.client_id == client)
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }

    fn for_provider(&self, provider: &UserId) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let mut rows: Vec<_> = lock(&self.rows)?
            .values()
            .filter(|request| &request.provider_id == provider)
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }

    fn all(&self) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let mut rows: Vec<_> = lock(&self.rows)?.values().cloned().collect();
        newest_first(&mut rows);
        Ok(rows)
    }
}

#[derive(Default)]
struct RegistryState {
    applications: HashMap<ApplicationId, ProviderApplication>,
    profiles: HashMap<UserId, ProviderProfile>,
}

/// Applications and profiles share one lock so commits touching both are atomic.
#[derive(Default)]
pub struct InMemoryProviderRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryProviderRegistry {
    /// Seed an eligible listing without going through vetting. Demo and test fixtures only.
    pub fn seed_profile(&self, profile: ProviderProfile) -> Result<(), RepositoryError> {
        lock(&self.state)?
            .profiles
            .insert(profile.provider_id.clone(), profile);
        Ok(())
    }
}

impl ProviderRegistry for InMemoryProviderRegistry {
    fn insert_application(
        &self,
        application: ProviderApplication,
        profile: ProviderProfile,
    ) -> Result<ProviderApplication, RepositoryError> {
        let mut state = lock(&self.state)?;
        let has_open = state.applications.values().any(|existing| {
            existing.provider_id == application.provider_id && existing.status.is_open()
        });
        if has_open || state.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .profiles
            .insert(application.provider_id.clone(), profile);
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ProviderApplication>, RepositoryError> {
        Ok(lock(&self.state)?.applications.get(id).cloned())
    }

    fn latest_application(
        &self,
        provider: &UserId,
    ) -> Result<Option<ProviderApplication>, RepositoryError> {
        Ok(lock(&self.state)?
            .applications
            .values()
            .filter(|application| &application.provider_id == provider)
            .max_by(|a, b| {
                a.submitted_at
                    .cmp(&b.submitted_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned())
    }

    fn applications_with_status(
        &self,
        statuses: &[ApplicationStatus],
    ) -> Result<Vec<ProviderApplication>, RepositoryError> {
        Ok(lock(&self.state)?
            .applications
            .values()
            .filter(|application| statuses.contains(&application.status))
            .cloned()
            .collect())
    }

    fn commit_application(
        &self,
        mut application: ProviderApplication,
        profile: Option<ProviderProfile>,
    ) -> Result<ProviderApplication, RepositoryError> {
        let mut state = lock(&self.state)?;
        let stored = state
            .applications
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != application.version {
            return Err(RepositoryError::Stale);
        }
        application.version += 1;
        *stored = application.clone();
        if let Some(profile) = profile {
            state.profiles.insert(profile.provider_id.clone(), profile);
        }
        Ok(application)
    }

    fn profile(&self, provider: &UserId) -> Result<Option<ProviderProfile>, RepositoryError> {
        Ok(lock(&self.state)?.profiles.get(provider).cloned())
    }

    fn search(
        &self,
        category: Option<&CategoryId>,
        city: Option<&str>,
    ) -> Result<Vec<ProviderProfile>, RepositoryError> {
        let mut matches: Vec<_> = lock(&self.state)?
            .profiles
            .values()
            .filter(|profile| profile.eligible)
            .filter(|profile| category.map_or(true, |wanted| profile.category_ids.contains(wanted)))
            .filter(|profile| city.map_or(true, |wanted| profile.city.eq_ignore_ascii_case(wanted)))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(matches)
    }
}

#[derive(Default)]
pub struct InMemoryPaymentSessions {
    rows: Mutex<HashMap<ExternalSessionId, PaymentSession>>,
}

impl PaymentSessionRepository for InMemoryPaymentSessions {
    fn insert(&self, session: PaymentSession) -> Result<PaymentSession, RepositoryError> {
        let mut rows = lock(&self.rows)?;
        let active_exists = rows.values().any(|existing| {
            existing.request_id == session.request_id && existing.status == SessionStatus::Created
        });
        if active_exists || rows.contains_key(&session.external_id) {
            return Err(RepositoryError::Conflict);
        }
        rows.insert(session.external_id.clone(), session.clone());
        Ok(session)
    }

    fn fetch(&self, id: &ExternalSessionId) -> Result<Option<PaymentSession>, RepositoryError> {
        Ok(lock(&self.rows)?.get(id).cloned())
    }

    fn active_for_request(
        &self,
        request: &RequestId,
    ) -> Result<Option<PaymentSession>, RepositoryError> {
        Ok(lock(&self.rows)?
            .values()
            .find(|session| {
                &session.request_id == request && session.status == SessionStatus::Created
            })
            .cloned())
    }

    fn for_request(&self, request: &RequestId) -> Result<Vec<PaymentSession>, RepositoryError> {
        Ok(lock(&self.rows)?
            .values()
            .filter(|session| &session.request_id == request)
            .cloned()
            .collect())
    }

    fn finalize(
        &self,
        id: &ExternalSessionId,
        expected: SessionStatus,
        next: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<PaymentSession, RepositoryError> {
        let mut rows = lock(&self.rows)?;
        let (request_id, current) = match rows.get(id) {
            Some(session) => (session.request_id.clone(), session.status),
            None => return Err(RepositoryError::NotFound),
        };
        if current != expected {
            return Err(RepositoryError::Stale);
        }
        if next == SessionStatus::Succeeded
            && rows.values().any(|other| {
                other.request_id == request_id
                    && &other.external_id != id
                    && other.status == SessionStatus::Succeeded
            })
        {
            return Err(RepositoryError::Conflict);
        }

        let session = rows.get_mut(id).ok_or(RepositoryError::NotFound)?;
        session.status = next;
        session.finalized_at = Some(at);
        Ok(session.clone())
    }

    fn succeeded(&self) -> Result<Vec<PaymentSession>, RepositoryError> {
        Ok(lock(&self.rows)?
            .values()
            .filter(|session| session.status == SessionStatus::Succeeded)
            .cloned()
            .collect())
    }
}

/// Admin-managed price list keyed by category and shift.
#[derive(Default)]
pub struct StaticPricingCatalog {
    rules: Mutex<HashMap<(CategoryId, ShiftType), PricingRule>>,
}

impl StaticPricingCatalog {
    pub fn with_rules(rules: impl IntoIterator<Item = PricingRule>) -> Self {
        let catalog = Self::default();
        if let Ok(mut guard) = catalog.rules.lock() {
            for rule in rules {
                guard.insert((rule.category_id.clone(), rule.shift_type), rule);
            }
        }
        catalog
    }

    /// Insert or replace a rule. Existing bookings keep the price they were created with.
    pub fn upsert(&self, rule: PricingRule) -> Result<(), RepositoryError> {
        lock(&self.rules)?.insert((rule.category_id.clone(), rule.shift_type), rule);
        Ok(())
    }
}

impl PricingCatalog for StaticPricingCatalog {
    fn rule(
        &self,
        category: &CategoryId,
        shift: ShiftType,
    ) -> Result<Option<PricingRule>, RepositoryError> {
        Ok(lock(&self.rules)?.get(&(category.clone(), shift)).cloned())
    }
}

/// Keeps every published event so callers can inspect notifications and operator alerts.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<MarketplaceEvent>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<MarketplaceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn operator_alerts(&self) -> Vec<MarketplaceEvent> {
        self.events()
            .into_iter()
            .filter(MarketplaceEvent::is_operator_alert)
            .collect()
    }

    pub fn with_template(&self, template: &str) -> Vec<MarketplaceEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.template == template)
            .collect()
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(&self, event: MarketplaceEvent) -> Result<(), EventError> {
        tracing::debug!(template = %event.template, subject = %event.subject, "event recorded");
        self.events
            .lock()
            .map_err(|_| EventError::Transport("event log lock poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

/// Every in-memory store, shared through `Arc` so callers keep handles for inspection.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    pub requests: Arc<InMemoryRequestRepository>,
    pub providers: Arc<InMemoryProviderRegistry>,
    pub sessions: Arc<InMemoryPaymentSessions>,
    pub pricing: Arc<StaticPricingCatalog>,
    pub events: Arc<RecordingEventPublisher>,
}

impl InMemoryBackend {
    pub fn collaborators(&self, gateway: Arc<dyn PaymentGateway>) -> Collaborators {
        Collaborators {
            requests: self.requests.clone(),
            providers: self.providers.clone(),
            sessions: self.sessions.clone(),
            pricing: self.pricing.clone(),
            gateway,
            events: self.events.clone(),
        }
    }
}
