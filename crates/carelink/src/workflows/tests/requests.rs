use std::thread;

use super::common::*;
use crate::workflows::domain::{Actor, CategoryId, Money, RequestId, ShiftType, UserId};
use crate::workflows::error::ErrorKind;
use crate::workflows::requests::RequestStatus;
use crate::workflows::settlement::{PaymentSessionRepository, SessionStatus};

#[test]
fn create_snapshots_price_and_starts_pending() {
    let harness = harness();
    let request = harness
        .marketplace
        .requests
        .create(&client(), booking(3, 9, ShiftType::LongShift))
        .expect("create");

    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.total_price, Money::from_units(200));
    assert_eq!(request.client_id, UserId(CLIENT.to_string()));
    assert!(request.rejection_reason.is_none());
    assert_eq!(harness.backend.events.with_template("request_created").len(), 1);

    harness
        .backend
        .pricing
        .upsert(rule(ELDERLY_CARE, ShiftType::LongShift, 260))
        .expect("reprice");
    assert_eq!(reload(&harness, &request.id).total_price, Money::from_units(200));
}

#[test]
fn create_rejects_missing_address_before_anything_else() {
    let harness = harness();
    let mut booking = booking(3, 9, ShiftType::ShortShift);
    booking.address = "   ".to_string();
    // Wrong role too, but validation wins.
    assert_kind(
        harness.marketplace.requests.create(&provider(), booking),
        ErrorKind::Validation,
    );
}

#[test]
fn only_clients_create_requests() {
    let harness = harness();
    assert_kind(
        harness
            .marketplace
            .requests
            .create(&admin(), booking(3, 9, ShiftType::ShortShift)),
        ErrorKind::Authorization,
    );
}

#[test]
fn ineligible_or_unknown_providers_cannot_be_booked() {
    let harness = harness();
    let mut profile = eligible_profile("prov-pending", "Amman");
    profile.eligible = false;
    harness.backend.providers.seed_profile(profile).expect("seed");

    let mut booking_pending = booking(3, 9, ShiftType::ShortShift);
    booking_pending.provider_id = UserId("prov-pending".to_string());
    assert_kind(
        harness.marketplace.requests.create(&client(), booking_pending),
        ErrorKind::Validation,
    );

    let mut booking_unknown = booking(3, 9, ShiftType::ShortShift);
    booking_unknown.provider_id = UserId("prov-ghost".to_string());
    assert_kind(
        harness.marketplace.requests.create(&client(), booking_unknown),
        ErrorKind::Validation,
    );
    assert!(harness.backend.events.with_template("request_created").is_empty());
}

#[test]
fn unpriced_or_unoffered_categories_fail_validation() {
    let harness = harness();
    harness
        .backend
        .pricing
        .upsert(rule(CHILD_CARE, ShiftType::ShortShift, 45))
        .expect("price child care");

    let mut unoffered = booking(3, 9, ShiftType::ShortShift);
    unoffered.category_id = CategoryId(CHILD_CARE.to_string());
    assert_kind(
        harness.marketplace.requests.create(&client(), unoffered),
        ErrorKind::Validation,
    );

    let mut inactive = rule(ELDERLY_CARE, ShiftType::FullDayShift, 350);
    inactive.active = false;
    harness.backend.pricing.upsert(inactive).expect("deactivate");
    assert_kind(
        harness
            .marketplace
            .requests
            .create(&client(), booking(4, 9, ShiftType::FullDayShift)),
        ErrorKind::Validation,
    );
}

#[test]
fn providers_cannot_book_themselves() {
    let harness = harness();
    let mut booking = booking(3, 9, ShiftType::ShortShift);
    booking.provider_id = UserId(CLIENT.to_string());
    harness
        .backend
        .providers
        .seed_profile(eligible_profile(CLIENT, "Amman"))
        .expect("seed");
    assert_kind(
        harness.marketplace.requests.create(&client(), booking),
        ErrorKind::Validation,
    );
}

#[test]
fn open_bookings_block_the_same_date() {
    let harness = harness();
    let requests = &harness.marketplace.requests;
    let first = requests
        .create(&client(), booking(3, 8, ShiftType::ShortShift))
        .expect("first");

    // Different hours, same calendar date.
    assert_kind(
        requests.create(&client(), booking(3, 15, ShiftType::ShortShift)),
        ErrorKind::Validation,
    );
    requests
        .create(&client(), booking(4, 8, ShiftType::ShortShift))
        .expect("next day is free");

    requests.cancel(&first.id, &client()).expect("cancel first");
    requests
        .create(&client(), booking(3, 15, ShiftType::ShortShift))
        .expect("date freed by cancellation");
}

#[test]
fn overnight_bookings_block_both_dates() {
    let harness = harness();
    let requests = &harness.marketplace.requests;
    requests
        .create(&client(), booking(3, 20, ShiftType::LongShift))
        .expect("overnight");

    assert_kind(
        requests.create(&client(), booking(4, 14, ShiftType::ShortShift)),
        ErrorKind::Validation,
    );
    requests
        .create(&client(), booking(5, 9, ShiftType::ShortShift))
        .expect("day after is free");
}

#[test]
fn dates_past_the_calendar_end_fail_validation() {
    let harness = harness();
    let mut late = booking(3, 9, ShiftType::FullDayShift);
    late.preferred_date = chrono::NaiveDate::MAX;
    late.preferred_time = time(23);

    assert_kind(
        harness.marketplace.requests.create(&client(), late),
        ErrorKind::Validation,
    );
    assert!(harness.backend.events.with_template("request_created").is_empty());
}

#[test]
fn reject_requires_a_reason_and_records_it() {
    let harness = harness();
    let request = pending(&harness);
    let requests = &harness.marketplace.requests;

    assert_kind(
        requests.reject(&request.id, &provider(), "  "),
        ErrorKind::Validation,
    );
    assert_eq!(status_of(&harness, &request.id), RequestStatus::Pending);

    let rejected = requests
        .reject(&request.id, &provider(), " Fully booked that week ")
        .expect("reject");
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Fully booked that week"));
    assert!(rejected.is_consistent());

    let events = harness.backend.events.with_template("request_rejected");
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].details.get("reason").map(String::as_str),
        Some("Fully booked that week")
    );
}

#[test]
fn cancel_then_accept_conflicts_and_names_current_state() {
    let harness = harness();
    let request = pending(&harness);
    let requests = &harness.marketplace.requests;

    let cancelled = requests.cancel(&request.id, &client()).expect("cancel");
    assert_eq!(cancelled.status, RequestStatus::CancelledByClient);

    let error = requests
        .accept(&request.id, &provider())
        .expect_err("accept after cancel");
    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert!(error.to_string().contains("Cancelled by client"));
}

#[test]
fn only_the_named_provider_drives_provider_actions() {
    let harness = harness();
    let request = pending(&harness);
    let stranger = Actor::provider("prov-other");

    assert_kind(
        harness.marketplace.requests.accept(&request.id, &stranger),
        ErrorKind::Authorization,
    );
    assert_kind(
        harness.marketplace.requests.accept(&request.id, &client()),
        ErrorKind::Authorization,
    );
    assert_kind(
        harness.marketplace.requests.cancel(&request.id, &provider()),
        ErrorKind::Authorization,
    );
    assert_eq!(status_of(&harness, &request.id), RequestStatus::Pending);
}

#[test]
fn unknown_request_is_not_found_before_authorization() {
    let harness = harness();
    assert_kind(
        harness
            .marketplace
            .requests
            .accept(&RequestId("req-missing".to_string()), &Actor::client("nobody")),
        ErrorKind::NotFound,
    );
}

#[test]
fn work_cannot_start_before_payment() {
    let harness = harness();
    let request = accepted_on(&harness, 3);
    assert_kind(
        harness.marketplace.requests.start(&request.id, &provider()),
        ErrorKind::Conflict,
    );
    assert_kind(
        harness.marketplace.requests.complete(&request.id, &provider()),
        ErrorKind::Conflict,
    );
}

#[test]
fn paid_request_runs_to_completion() {
    let harness = harness();
    let request = paid_on(&harness, 3);
    assert_eq!(request.status, RequestStatus::Paid);
    assert!(request.accepted_at.is_some());

    let requests = &harness.marketplace.requests;
    let started = requests.start(&request.id, &provider()).expect("start");
    assert_eq!(started.status, RequestStatus::InProgress);
    let completed = requests.complete(&request.id, &provider()).expect("complete");
    assert_eq!(completed.status, RequestStatus::Completed);
    assert!(completed.completed_at.is_some());

    assert_kind(requests.cancel(&request.id, &client()), ErrorKind::Conflict);
}

#[test]
fn listings_are_newest_first_and_private() {
    let harness = harness();
    let first = pending_on(&harness, 3);
    let second = pending_on(&harness, 5);
    let requests = &harness.marketplace.requests;

    let mine = requests
        .requests_for_client(&UserId(CLIENT.to_string()), &client())
        .expect("client listing");
    let ids: Vec<_> = mine.iter().map(|request| request.id.clone()).collect();
    assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

    let assigned = requests
        .requests_for_provider(&UserId(PROVIDER.to_string()), &provider())
        .expect("provider listing");
    assert_eq!(assigned.len(), 2);

    assert_kind(
        requests.requests_for_client(&UserId(CLIENT.to_string()), &Actor::client("someone-else")),
        ErrorKind::Authorization,
    );
    requests
        .requests_for_provider(&UserId(PROVIDER.to_string()), &admin())
        .expect("admins see everything");

    assert_kind(
        requests.get(&first.id, &Actor::client("someone-else")),
        ErrorKind::Authorization,
    );
    assert_eq!(requests.get(&first.id, &provider()).expect("party read").id, first.id);
}

#[test]
fn racing_accept_and_cancel_leaves_one_winner() {
    for day in 3..13 {
        let harness = harness();
        let request = pending_on(&harness, day);
        let requests = &harness.marketplace.requests;

        let (accepted, cancelled) = thread::scope(|scope| {
            let accept = scope.spawn(|| requests.accept(&request.id, &provider()));
            let cancel = scope.spawn(|| requests.cancel(&request.id, &client()));
            (
                accept.join().expect("accept thread"),
                cancel.join().expect("cancel thread"),
            )
        });

        let final_status = status_of(&harness, &request.id);
        match (&accepted, &cancelled) {
            (Ok(_), Err(error)) => {
                // Cancel read Pending and lost the version check.
                assert_eq!(error.kind(), ErrorKind::Conflict);
                assert_eq!(final_status, RequestStatus::Accepted);
            }
            (Err(error), Ok(_)) => {
                assert_eq!(error.kind(), ErrorKind::Conflict);
                assert_eq!(final_status, RequestStatus::CancelledByClient);
            }
            (Ok(_), Ok(_)) => assert_eq!(final_status, RequestStatus::CancelledByClient),
            (Err(a), Err(c)) => panic!("both actions failed: {a} / {c}"),
        }
    }
}

#[test]
fn racing_checkout_and_cancel_leave_no_payable_session() {
    for day in 3..13 {
        let harness = harness();
        let request = accepted_on(&harness, day);
        let requests = &harness.marketplace.requests;
        let settlement = &harness.marketplace.settlement;

        let (opened, cancelled) = thread::scope(|scope| {
            let checkout = scope.spawn(|| settlement.open_checkout(&request.id, &client()));
            let cancel = scope.spawn(|| requests.cancel(&request.id, &client()));
            (
                checkout.join().expect("checkout thread"),
                cancel.join().expect("cancel thread"),
            )
        });

        cancelled.expect("nothing was paid, so cancel wins");
        if let Err(error) = &opened {
            assert_eq!(error.kind(), ErrorKind::Conflict);
        }
        assert_eq!(status_of(&harness, &request.id), RequestStatus::CancelledByClient);
        assert!(harness
            .backend
            .sessions
            .active_for_request(&request.id)
            .expect("active session")
            .is_none());
        let sessions = harness
            .backend
            .sessions
            .for_request(&request.id)
            .expect("sessions");
        assert!(sessions
            .iter()
            .all(|session| session.status == SessionStatus::Cancelled));
        assert_eq!(harness.gateway.expired().len(), sessions.len());
    }
}
