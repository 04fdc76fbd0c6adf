use std::sync::{Arc, Mutex};

use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::workflows::domain::{
    Actor, CategoryId, ExternalSessionId, Money, RequestId, ShiftType, UserId,
};
use crate::workflows::error::{ErrorKind, GatewayError, MarketplaceError, RepositoryError};
use crate::workflows::memory::InMemoryBackend;
use crate::workflows::pricing::PricingRule;
use crate::workflows::providers::{ApplicationSubmission, DocumentKind, DocumentReference, ProviderProfile};
use crate::workflows::requests::{BookingRequest, RequestRepository, RequestStatus, ServiceRequest};
use crate::workflows::settlement::{
    CheckoutReference, HostedCheckoutGateway, PaymentGateway, PaymentOutcome, ProcessorSession,
};
use crate::workflows::{marketplace_router, Marketplace};

pub(super) const ELDERLY_CARE: &str = "elderly-care";
pub(super) const CHILD_CARE: &str = "child-care";
pub(super) const PROVIDER: &str = "prov-amal";
pub(super) const CLIENT: &str = "client-omar";

pub(super) struct Harness {
    pub(super) marketplace: Arc<Marketplace>,
    pub(super) backend: InMemoryBackend,
    pub(super) gateway: Arc<RecordingGateway>,
}

pub(super) fn config() -> MarketplaceConfig {
    MarketplaceConfig::default()
}

pub(super) fn harness() -> Harness {
    harness_with(config())
}

pub(super) fn harness_with(config: MarketplaceConfig) -> Harness {
    let backend = InMemoryBackend::default();
    let gateway = Arc::new(RecordingGateway::new(&config.checkout_base_url));
    let marketplace = Marketplace::new(backend.collaborators(gateway.clone()), &config);
    for (shift, units) in [
        (ShiftType::ShortShift, 60),
        (ShiftType::LongShift, 200),
        (ShiftType::FullDayShift, 350),
    ] {
        backend
            .pricing
            .upsert(rule(ELDERLY_CARE, shift, units))
            .expect("seed pricing");
    }
    backend
        .providers
        .seed_profile(eligible_profile(PROVIDER, "Amman"))
        .expect("seed provider");
    Harness {
        marketplace: Arc::new(marketplace),
        backend,
        gateway,
    }
}

/// Hosted checkout that remembers which sessions were expired.
pub(super) struct RecordingGateway {
    inner: HostedCheckoutGateway,
    expired: Mutex<Vec<ExternalSessionId>>,
}

impl RecordingGateway {
    fn new(base_url: &str) -> Self {
        Self {
            inner: HostedCheckoutGateway::new(base_url),
            expired: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn expired(&self) -> Vec<ExternalSessionId> {
        self.expired.lock().expect("expired lock").clone()
    }
}

impl PaymentGateway for RecordingGateway {
    fn create_checkout(
        &self,
        request: &ServiceRequest,
        amount: Money,
        currency: &str,
    ) -> Result<ProcessorSession, GatewayError> {
        self.inner.create_checkout(request, amount, currency)
    }

    fn expire_checkout(&self, id: &ExternalSessionId) -> Result<(), GatewayError> {
        self.expired.lock().expect("expired lock").push(id.clone());
        self.inner.expire_checkout(id)
    }
}

pub(super) fn rule(category: &str, shift: ShiftType, units: u64) -> PricingRule {
    PricingRule {
        category_id: CategoryId(category.to_string()),
        shift_type: shift,
        price: Money::from_units(units),
        active: true,
    }
}

pub(super) fn eligible_profile(provider: &str, city: &str) -> ProviderProfile {
    ProviderProfile {
        provider_id: UserId(provider.to_string()),
        display_name: format!("Provider {provider}"),
        city: city.to_string(),
        category_ids: vec![CategoryId(ELDERLY_CARE.to_string())],
        hourly_rate: Money::from_units(20),
        eligible: true,
    }
}

pub(super) fn client() -> Actor {
    Actor::client(CLIENT)
}

pub(super) fn provider() -> Actor {
    Actor::provider(PROVIDER)
}

pub(super) fn admin() -> Actor {
    Actor::admin("admin-rania")
}

pub(super) fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, day).expect("valid date")
}

pub(super) fn time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time")
}

pub(super) fn booking(day: u32, hour: u32, shift: ShiftType) -> BookingRequest {
    BookingRequest {
        provider_id: UserId(PROVIDER.to_string()),
        category_id: CategoryId(ELDERLY_CARE.to_string()),
        shift_type: shift,
        preferred_date: date(day),
        preferred_time: time(hour),
        address: "12 Rainbow St, Amman".to_string(),
        description: Some("Afternoon companionship".to_string()),
    }
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        display_name: "Layla Haddad".to_string(),
        city: "Irbid".to_string(),
        bio: "Registered nurse with home-care experience".to_string(),
        experience_years: 6,
        category_ids: vec![CategoryId(ELDERLY_CARE.to_string())],
        hourly_rate: Money::from_units(25),
        documents: vec![DocumentReference {
            kind: DocumentKind::NationalId,
            storage_key: "docs/layla/national-id.pdf".to_string(),
        }],
    }
}

pub(super) fn pending(harness: &Harness) -> ServiceRequest {
    pending_on(harness, 3)
}

/// Each fixture takes its own date so it never trips the same-day booking check.
pub(super) fn pending_on(harness: &Harness, day: u32) -> ServiceRequest {
    harness
        .marketplace
        .requests
        .create(&client(), booking(day, 9, ShiftType::ShortShift))
        .expect("create request")
}

pub(super) fn accepted_on(harness: &Harness, day: u32) -> ServiceRequest {
    let request = pending_on(harness, day);
    harness
        .marketplace
        .requests
        .accept(&request.id, &provider())
        .expect("accept request")
}

pub(super) fn checkout(harness: &Harness, id: &RequestId) -> CheckoutReference {
    harness
        .marketplace
        .settlement
        .open_checkout(id, &client())
        .expect("open checkout")
}

pub(super) fn paid_on(harness: &Harness, day: u32) -> ServiceRequest {
    let request = accepted_on(harness, day);
    let reference = checkout(harness, &request.id);
    harness
        .marketplace
        .settlement
        .handle_callback(&reference.external_session_id, PaymentOutcome::Succeeded)
        .expect("settle payment");
    reload(harness, &request.id)
}

pub(super) fn completed_on(harness: &Harness, day: u32) -> ServiceRequest {
    let request = paid_on(harness, day);
    let requests = &harness.marketplace.requests;
    requests.start(&request.id, &provider()).expect("start");
    requests.complete(&request.id, &provider()).expect("complete")
}

pub(super) fn reload(harness: &Harness, id: &RequestId) -> ServiceRequest {
    harness
        .backend
        .requests
        .fetch(id)
        .expect("fetch request")
        .expect("request exists")
}

pub(super) fn status_of(harness: &Harness, id: &RequestId) -> RequestStatus {
    reload(harness, id).status
}

pub(super) fn assert_kind<T: std::fmt::Debug>(result: Result<T, MarketplaceError>, kind: ErrorKind) {
    match result {
        Err(error) => assert_eq!(error.kind(), kind, "unexpected error: {error}"),
        Ok(value) => panic!("expected {kind:?}, got {value:?}"),
    }
}

/// Store that is always down.
pub(super) struct OfflineRequests;

impl RequestRepository for OfflineRequests {
    fn insert(&self, _request: ServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        Err(offline())
    }

    fn fetch(&self, _id: &RequestId) -> Result<Option<ServiceRequest>, RepositoryError> {
        Err(offline())
    }

    fn update(&self, _request: ServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        Err(offline())
    }

    fn for_client(&self, _client: &UserId) -> Result<Vec<ServiceRequest>, RepositoryError> {
        Err(offline())
    }

    fn for_provider(&self, _provider: &UserId) -> Result<Vec<ServiceRequest>, RepositoryError> {
        Err(offline())
    }

    fn all(&self) -> Result<Vec<ServiceRequest>, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

pub(super) fn router(harness: &Harness) -> axum::Router {
    marketplace_router(harness.marketplace.clone())
}

pub(super) fn json_request(
    method: &str,
    uri: &str,
    actor: Option<&Actor>,
    body: Option<Value>,
) -> Request<axum::body::Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header("x-actor-id", actor.id.0.as_str())
            .header("x-actor-role", actor.role.label());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            axum::body::Body::from(value.to_string())
        }
        None => axum::body::Body::empty(),
    };
    builder.body(body).expect("request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
