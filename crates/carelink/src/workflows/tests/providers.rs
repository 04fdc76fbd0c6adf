use super::common::*;
use crate::workflows::domain::{Actor, CategoryId, ShiftType, UserId};
use crate::workflows::error::ErrorKind;
use crate::workflows::providers::ApplicationStatus;
use crate::workflows::requests::RequestStatus;

const APPLICANT: &str = "prov-layla";

fn applicant() -> Actor {
    Actor::provider(APPLICANT)
}

fn booking_for_applicant() -> crate::workflows::requests::BookingRequest {
    let mut booking = booking(3, 9, ShiftType::ShortShift);
    booking.provider_id = UserId(APPLICANT.to_string());
    booking
}

#[test]
fn submission_starts_pending_and_hidden() {
    let harness = harness();
    let gate = &harness.marketplace.providers;
    let application = gate.submit(&applicant(), submission()).expect("submit");

    assert_eq!(application.status, ApplicationStatus::Pending);
    assert_eq!(application.provider_id, UserId(APPLICANT.to_string()));
    assert!(!gate.is_eligible(&application.provider_id).expect("eligibility"));
    assert!(gate
        .search_providers(None, Some("Irbid"))
        .expect("search")
        .is_empty());
    assert_kind(
        harness
            .marketplace
            .requests
            .create(&client(), booking_for_applicant()),
        ErrorKind::Validation,
    );
}

#[test]
fn approval_makes_provider_bookable() {
    let harness = harness();
    let gate = &harness.marketplace.providers;
    let application = gate.submit(&applicant(), submission()).expect("submit");

    let approved = gate.approve(&application.id, &admin()).expect("approve");
    assert_eq!(approved.status, ApplicationStatus::Approved);
    assert_eq!(approved.reviewer, Some(admin().id));
    assert!(approved.reviewed_at.is_some());
    assert!(gate.is_eligible(&approved.provider_id).expect("eligibility"));

    let request = harness
        .marketplace
        .requests
        .create(&client(), booking_for_applicant())
        .expect("book approved provider");
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(
        harness.backend.events.with_template("application_approved").len(),
        1
    );
}

#[test]
fn one_open_application_per_provider() {
    let harness = harness();
    let gate = &harness.marketplace.providers;
    let first = gate.submit(&applicant(), submission()).expect("submit");

    let error = gate
        .submit(&applicant(), submission())
        .expect_err("second submission");
    assert_eq!(error.kind(), ErrorKind::Conflict);

    gate.reject(&first.id, &admin(), "Certificate expired")
        .expect("reject");
    let second = gate
        .submit(&applicant(), submission())
        .expect("resubmission after rejection");
    assert_ne!(second.id, first.id);
}

#[test]
fn decisions_require_reasons_where_documented() {
    let harness = harness();
    let gate = &harness.marketplace.providers;
    let application = gate.submit(&applicant(), submission()).expect("submit");

    assert_kind(gate.reject(&application.id, &admin(), ""), ErrorKind::Validation);
    assert_kind(
        gate.request_more_info(&application.id, &admin(), "\n"),
        ErrorKind::Validation,
    );
    let unchanged = gate.get(&application.id, &admin()).expect("get");
    assert_eq!(unchanged.status, ApplicationStatus::Pending);
    assert!(unchanged.reason.is_none());
}

#[test]
fn only_admins_decide() {
    let harness = harness();
    let gate = &harness.marketplace.providers;
    let application = gate.submit(&applicant(), submission()).expect("submit");

    assert_kind(gate.approve(&application.id, &applicant()), ErrorKind::Authorization);
    assert_kind(gate.begin_review(&application.id, &client()), ErrorKind::Authorization);
    assert_kind(
        gate.submit(&client(), submission()),
        ErrorKind::Authorization,
    );
    assert_kind(
        gate.get(&application.id, &Actor::provider("prov-other")),
        ErrorKind::Authorization,
    );
}

#[test]
fn terminal_applications_refuse_further_decisions() {
    let harness = harness();
    let gate = &harness.marketplace.providers;
    let application = gate.submit(&applicant(), submission()).expect("submit");
    gate.approve(&application.id, &admin()).expect("approve");

    assert_kind(
        gate.reject(&application.id, &admin(), "Changed our mind"),
        ErrorKind::Conflict,
    );
    assert_kind(gate.approve(&application.id, &admin()), ErrorKind::Conflict);
    assert!(gate.is_eligible(&UserId(APPLICANT.to_string())).expect("eligibility"));
}

#[test]
fn clarification_round_trip_clears_reason() {
    let harness = harness();
    let gate = &harness.marketplace.providers;
    let application = gate.submit(&applicant(), submission()).expect("submit");
    let reviewing = gate.begin_review(&application.id, &admin()).expect("review");
    assert_eq!(reviewing.status, ApplicationStatus::UnderReview);

    let asked = gate
        .request_more_info(&application.id, &admin(), "Upload your nursing certificate")
        .expect("more info");
    assert_eq!(asked.status, ApplicationStatus::RequiresMoreInfo);
    assert_eq!(asked.reason.as_deref(), Some("Upload your nursing certificate"));

    assert_kind(
        gate.resubmit(&application.id, &Actor::provider("prov-other"), submission()),
        ErrorKind::Authorization,
    );

    let mut updated = submission();
    updated.city = "Zarqa".to_string();
    let resubmitted = gate
        .resubmit(&application.id, &applicant(), updated)
        .expect("resubmit");
    assert_eq!(resubmitted.status, ApplicationStatus::UnderReview);
    assert!(resubmitted.reason.is_none());
    assert_eq!(resubmitted.submission.city, "Zarqa");
    assert!(!gate.is_eligible(&resubmitted.provider_id).expect("eligibility"));

    assert_kind(
        gate.resubmit(&application.id, &applicant(), submission()),
        ErrorKind::Conflict,
    );
}

#[test]
fn review_queue_is_oldest_first_and_admin_only() {
    let harness = harness();
    let gate = &harness.marketplace.providers;
    let first = gate.submit(&applicant(), submission()).expect("first");
    let second = gate
        .submit(&Actor::provider("prov-noor"), submission())
        .expect("second");
    let third = gate
        .submit(&Actor::provider("prov-sami"), submission())
        .expect("third");
    gate.approve(&third.id, &admin()).expect("approve third");

    let queue = gate.review_queue(&admin()).expect("queue");
    let ids: Vec<_> = queue.iter().map(|application| application.id.clone()).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_kind(gate.review_queue(&applicant()), ErrorKind::Authorization);
}

#[test]
fn search_filters_by_category_and_city_case_insensitively() {
    let harness = harness();
    let gate = &harness.marketplace.providers;

    let found = gate
        .search_providers(Some(&CategoryId(ELDERLY_CARE.to_string())), Some(" amman "))
        .expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].provider_id, UserId(PROVIDER.to_string()));

    assert!(gate
        .search_providers(Some(&CategoryId(CHILD_CARE.to_string())), None)
        .expect("search")
        .is_empty());
    assert_eq!(gate.search_providers(None, None).expect("search").len(), 1);
}
