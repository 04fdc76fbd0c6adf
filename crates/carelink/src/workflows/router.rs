use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{Actor, ApplicationId, CategoryId, ExternalSessionId, RequestId, Role, UserId};
use super::error::MarketplaceError;
use super::providers::ApplicationSubmission;
use super::requests::BookingRequest;
use super::settlement::PaymentOutcome;
use super::Marketplace;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

type Shared = State<Arc<Marketplace>>;

/// Router builder exposing the marketplace operations over HTTP.
///
/// The upstream auth layer asserts the caller through `x-actor-id` and `x-actor-role`.
pub fn marketplace_router(marketplace: Arc<Marketplace>) -> Router {
    Router::new()
        .route("/api/v1/requests", post(create_request))
        .route("/api/v1/requests/:request_id", get(get_request))
        .route("/api/v1/requests/:request_id/accept", post(accept_request))
        .route("/api/v1/requests/:request_id/reject", post(reject_request))
        .route("/api/v1/requests/:request_id/cancel", post(cancel_request))
        .route("/api/v1/requests/:request_id/start", post(start_request))
        .route("/api/v1/requests/:request_id/complete", post(complete_request))
        .route("/api/v1/requests/:request_id/checkout", post(open_checkout))
        .route("/api/v1/requests/:request_id/payments", get(payment_history))
        .route(
            "/api/v1/requests/:request_id/review",
            post(submit_review).get(fetch_review),
        )
        .route("/api/v1/clients/:user_id/requests", get(client_requests))
        .route("/api/v1/providers/search", get(search_providers))
        .route("/api/v1/providers/:user_id/requests", get(provider_requests))
        .route("/api/v1/providers/:user_id/earnings", get(provider_earnings))
        .route(
            "/api/v1/applications",
            post(submit_application).get(review_queue),
        )
        .route("/api/v1/applications/:application_id", get(get_application))
        .route(
            "/api/v1/applications/:application_id/review",
            post(begin_review),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_application),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_application),
        )
        .route(
            "/api/v1/applications/:application_id/more-info",
            post(request_more_info),
        )
        .route(
            "/api/v1/applications/:application_id/resubmit",
            post(resubmit_application),
        )
        .route("/api/v1/payments/callback", post(payment_callback))
        .route("/api/v1/admin/stats", get(marketplace_stats))
        .with_state(marketplace)
}

#[derive(Debug, Deserialize)]
pub struct ReasonPayload {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Processor notification body.
#[derive(Debug, Deserialize)]
pub struct CallbackPayload {
    pub external_session_id: ExternalSessionId,
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub category: Option<String>,
    pub city: Option<String>,
}

fn actor_from(headers: &HeaderMap) -> Result<Actor, Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };
    let (Some(id), Some(role)) = (header(ACTOR_ID_HEADER), header(ACTOR_ROLE_HEADER)) else {
        return Err(unauthenticated("missing actor identity headers".to_string()));
    };
    let role: Role = role
        .parse()
        .map_err(|error: super::domain::UnknownRole| unauthenticated(error.to_string()))?;
    Ok(Actor::new(id, role))
}

fn unauthenticated(message: String) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, MarketplaceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

macro_rules! with_actor {
    ($headers:expr) => {
        match actor_from(&$headers) {
            Ok(actor) => actor,
            Err(response) => return response,
        }
    };
}

async fn create_request(
    State(marketplace): Shared,
    headers: HeaderMap,
    Json(booking): Json<BookingRequest>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::CREATED,
        marketplace.requests.create(&actor, booking),
    )
}

async fn get_request(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace.requests.get(&RequestId(request_id), &actor),
    )
}

async fn accept_request(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace.requests.accept(&RequestId(request_id), &actor),
    )
}

async fn reject_request(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    Json(payload): Json<ReasonPayload>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .requests
            .reject(&RequestId(request_id), &actor, &payload.reason),
    )
}

async fn cancel_request(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace.requests.cancel(&RequestId(request_id), &actor),
    )
}

async fn start_request(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace.requests.start(&RequestId(request_id), &actor),
    )
}

async fn complete_request(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace.requests.complete(&RequestId(request_id), &actor),
    )
}

async fn client_requests(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .requests
            .requests_for_client(&UserId(user_id), &actor),
    )
}

async fn provider_requests(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .requests
            .requests_for_provider(&UserId(user_id), &actor),
    )
}

async fn provider_earnings(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace.dashboard.earnings(&UserId(user_id), &actor),
    )
}

async fn search_providers(State(marketplace): Shared, Query(query): Query<SearchQuery>) -> Response {
    let category = query.category.map(CategoryId);
    respond(
        StatusCode::OK,
        marketplace
            .providers
            .search_providers(category.as_ref(), query.city.as_deref()),
    )
}

async fn submit_application(
    State(marketplace): Shared,
    headers: HeaderMap,
    Json(submission): Json<ApplicationSubmission>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::CREATED,
        marketplace
            .providers
            .submit(&actor, submission)
            .map(|application| application.status_view()),
    )
}

async fn review_queue(State(marketplace): Shared, headers: HeaderMap) -> Response {
    let actor = with_actor!(headers);
    respond(StatusCode::OK, marketplace.providers.review_queue(&actor))
}

async fn get_application(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .providers
            .get(&ApplicationId(application_id), &actor),
    )
}

async fn begin_review(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .providers
            .begin_review(&ApplicationId(application_id), &actor)
            .map(|application| application.status_view()),
    )
}

async fn approve_application(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .providers
            .approve(&ApplicationId(application_id), &actor)
            .map(|application| application.status_view()),
    )
}

async fn reject_application(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(payload): Json<ReasonPayload>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .providers
            .reject(&ApplicationId(application_id), &actor, &payload.reason)
            .map(|application| application.status_view()),
    )
}

async fn request_more_info(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(payload): Json<ReasonPayload>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .providers
            .request_more_info(&ApplicationId(application_id), &actor, &payload.reason)
            .map(|application| application.status_view()),
    )
}

async fn resubmit_application(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(submission): Json<ApplicationSubmission>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .providers
            .resubmit(&ApplicationId(application_id), &actor, submission)
            .map(|application| application.status_view()),
    )
}

async fn open_checkout(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::CREATED,
        marketplace
            .settlement
            .open_checkout(&RequestId(request_id), &actor),
    )
}

async fn payment_history(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::OK,
        marketplace
            .settlement
            .payment_history(&RequestId(request_id), &actor),
    )
}

/// Processor webhook. Answers 200 whenever the delivery was handled. An unknown session
/// answers 404 and an unavailable store 503 so the processor redelivers.
async fn payment_callback(
    State(marketplace): Shared,
    Json(payload): Json<CallbackPayload>,
) -> Response {
    match marketplace
        .settlement
        .handle_callback(&payload.external_session_id, payload.outcome)
    {
        Ok(resolution) => {
            let body = json!({
                "external_session_id": payload.external_session_id,
                "resolution": resolution,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

async fn submit_review(
    State(marketplace): Shared,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    Json(payload): Json<ReviewPayload>,
) -> Response {
    let actor = with_actor!(headers);
    respond(
        StatusCode::CREATED,
        marketplace
            .reviews
            .submit_review(&RequestId(request_id), &actor, payload.rating, payload.comment)
            .map(|request| request.review),
    )
}

async fn fetch_review(State(marketplace): Shared, Path(request_id): Path<String>) -> Response {
    respond(
        StatusCode::OK,
        marketplace.reviews.fetch_review(&RequestId(request_id)),
    )
}

async fn marketplace_stats(State(marketplace): Shared, headers: HeaderMap) -> Response {
    let actor = with_actor!(headers);
    respond(StatusCode::OK, marketplace.dashboard.stats(&actor))
}
