//! HTTP API tests over the in-memory store.
//!
//! Exercises the full request path - extractors, engines, error mapping -
//! without a database. Includes the two end-to-end walkthroughs from the
//! product contract: the capacity-one event and the food-coupon lifecycle.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::too_many_lines)]
#![allow(missing_docs)]

mod common;

use common::{
    create_event, create_organization, event_body, test_server, test_server_with_config,
    ALICE_TOKEN, BOB_TOKEN, CAROL_TOKEN, MEMBER_TOKEN, OWNER_TOKEN,
};
use gather_server::config::RegistrationConfig;
use http::StatusCode;
use serde_json::{json, Value};

// ============================================================================
// Authentication and scoping
// ============================================================================

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let server = test_server();
    let response = server.post("/api/admin/checkin").json(&json!({})).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body = response.json::<Value>();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("unauthorized"));
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let server = test_server();
    let response = server
        .get("/api/me")
        .authorization_bearer("no-such-token")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_404_without_an_organization() {
    let server = test_server();
    // Alice holds a valid identity but no organization.
    let response = server
        .post("/api/admin/checkin")
        .authorization_bearer(ALICE_TOKEN)
        .json(&json!({ "eventId": uuid::Uuid::new_v4(), "userIdentifier": "x" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], json!("not_found"));
}

#[tokio::test]
async fn members_can_run_the_floor_but_not_manage_members() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(&server, event_body("Staffed Conf")).await;

    server
        .post("/api/admin/organizations/members")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({ "externalId": "org-staff" }))
        .await
        .assert_status(StatusCode::OK);

    // Member may scan attendees (an unknown attendee is 404, not 403/404-org).
    let response = server
        .post("/api/admin/checkin")
        .authorization_bearer(MEMBER_TOKEN)
        .json(&json!({ "eventId": event_id, "userIdentifier": "nobody" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>()["message"],
        json!("user not found")
    );

    // But may not change the member set.
    server
        .post("/api/admin/organizations/members")
        .authorization_bearer(MEMBER_TOKEN)
        .json(&json!({ "externalId": "someone-else" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

// ============================================================================
// Event CRUD
// ============================================================================

#[tokio::test]
async fn event_creation_validates_the_schedule() {
    let server = test_server();
    create_organization(&server).await;

    let response = server
        .post("/api/admin/events")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({
            "name": "Backwards Conf",
            "startTime": "2030-06-01T18:00:00Z",
            "endTime": "2030-06-01T09:00:00Z",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        json!("validation_error")
    );
}

#[tokio::test]
async fn public_event_detail_includes_sessions_and_coupons() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(&server, event_body("Open Conf")).await;

    server
        .post("/api/admin/sessions")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({
            "eventId": event_id,
            "name": "Keynote",
            "startTime": "2030-06-01T10:00:00Z",
            "endTime": "2030-06-01T11:00:00Z",
        }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/api/admin/coupons")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({ "eventId": event_id, "name": "Lunch" }))
        .await
        .assert_status(StatusCode::CREATED);

    // No authentication needed for browsing.
    let response = server.get(&format!("/api/events/{event_id}")).await;
    response.assert_status(StatusCode::OK);
    let data = response.json::<Value>()["data"].clone();
    assert_eq!(data["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(data["foodCoupons"].as_array().unwrap().len(), 1);
    assert_eq!(data["registeredCount"], json!(0));
}

#[tokio::test]
async fn deleting_an_event_hides_it_from_the_public_listing() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(&server, event_body("Doomed Conf")).await;

    server
        .delete(&format!("/api/admin/events/{event_id}"))
        .authorization_bearer(OWNER_TOKEN)
        .await
        .assert_status(StatusCode::OK);

    server
        .get(&format!("/api/events/{event_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn registration_round_trip_is_visible_from_both_views() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(&server, event_body("Round Trip Conf")).await;

    let response = server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await;
    response.assert_status(StatusCode::OK);
    let data = response.json::<Value>()["data"].clone();
    assert_eq!(data["status"], json!("confirmed"));
    let registration_date = data["registrationDate"].clone();

    // User-side view.
    let me = server
        .get("/api/me")
        .authorization_bearer(ALICE_TOKEN)
        .await
        .json::<Value>();
    let mine = me["data"]["registeredEvents"].as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["status"], json!("confirmed"));
    assert_eq!(mine[0]["registrationDate"], registration_date);

    // Event-side view.
    let detail = server
        .get(&format!("/api/events/{event_id}"))
        .await
        .json::<Value>();
    assert_eq!(detail["data"]["registeredCount"], json!(1));
}

#[tokio::test]
async fn duplicate_registration_is_rejected_with_a_reason_code() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(&server, event_body("Once Conf")).await;

    server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await
        .assert_status(StatusCode::OK);

    let response = server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        json!("already_registered")
    );
}

#[tokio::test]
async fn registration_past_the_deadline_is_rejected() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(
        &server,
        json!({
            "name": "Closed Conf",
            "startTime": "2030-06-01T09:00:00Z",
            "endTime": "2030-06-01T18:00:00Z",
            // Valid schedule (deadline before start), but already past.
            "registrationDeadline": "2020-01-01T00:00:00Z",
            "maxCapacity": 100,
        }),
    )
    .await;

    let response = server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], json!("deadline_passed"));
}

#[tokio::test]
async fn cancelling_frees_the_seat_and_repeat_cancel_conflicts() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(
        &server,
        json!({
            "name": "Tiny Conf",
            "startTime": "2030-06-01T09:00:00Z",
            "endTime": "2030-06-01T18:00:00Z",
            "maxCapacity": 1,
        }),
    )
    .await;

    server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await
        .assert_status(StatusCode::OK);
    server
        .delete(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await
        .assert_status(StatusCode::OK);
    server
        .delete(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await
        .assert_status(StatusCode::CONFLICT);

    // Bob takes the freed seat; Alice cannot re-register (her cancelled
    // record remains).
    server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(BOB_TOKEN)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn session_registration_can_be_gated_on_event_registration() {
    let server = test_server_with_config(&RegistrationConfig {
        require_event_registration: true,
    });
    create_organization(&server).await;
    let event_id = create_event(&server, event_body("Gated Conf")).await;
    let session = server
        .post("/api/admin/sessions")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({
            "eventId": event_id,
            "name": "Workshop",
            "startTime": "2030-06-01T10:00:00Z",
            "endTime": "2030-06-01T12:00:00Z",
        }))
        .await
        .json::<Value>();
    let session_id = session["data"]["id"].as_str().unwrap();

    let response = server
        .post("/api/sessions/register")
        .authorization_bearer(ALICE_TOKEN)
        .json(&json!({ "eventId": event_id, "sessionId": session_id }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], json!("not_registered"));

    server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await
        .assert_status(StatusCode::OK);
    server
        .post("/api/sessions/register")
        .authorization_bearer(ALICE_TOKEN)
        .json(&json!({ "eventId": event_id, "sessionId": session_id }))
        .await
        .assert_status(StatusCode::OK);
}

// ============================================================================
// Scenario: capacity-one event
// ============================================================================

#[tokio::test]
async fn capacity_one_event_walkthrough() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(
        &server,
        json!({
            "name": "Exclusive Conf",
            "startTime": "2030-06-01T09:00:00Z",
            "endTime": "2030-06-01T18:00:00Z",
            "maxCapacity": 1,
        }),
    )
    .await;

    // A registers: success.
    server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await
        .assert_status(StatusCode::OK);

    // B registers: capacity exceeded.
    let response = server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(BOB_TOKEN)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        json!("capacity_exceeded")
    );

    // Check A in: first scan is 200 with alreadyCheckedIn=false.
    let first = server
        .post("/api/admin/checkin")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({ "eventId": event_id, "userIdentifier": "alice-ext" }))
        .await;
    first.assert_status(StatusCode::OK);
    let first_body = first.json::<Value>();
    assert_eq!(first_body["data"]["alreadyCheckedIn"], json!(false));
    assert_eq!(first_body["data"]["userName"], json!("Alice Liddell"));
    let first_time = first_body["data"]["checkInTime"].clone();

    // Scan A again: 208 with the same timestamp.
    let repeat = server
        .post("/api/admin/checkin")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({ "eventId": event_id, "userIdentifier": "alice-ext" }))
        .await;
    repeat.assert_status(StatusCode::ALREADY_REPORTED);
    let repeat_body = repeat.json::<Value>();
    assert_eq!(repeat_body["success"], json!(true));
    assert_eq!(repeat_body["data"]["alreadyCheckedIn"], json!(true));
    assert_eq!(repeat_body["data"]["checkInTime"], first_time);

    // B was never admitted, so scanning B reports not registered.
    let unregistered = server
        .post("/api/admin/checkin")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({ "eventId": event_id, "userIdentifier": "bob-ext" }))
        .await;
    unregistered.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        unregistered.json::<Value>()["error"],
        json!("not_registered")
    );
}

// ============================================================================
// Scenario: food-coupon lifecycle
// ============================================================================

#[tokio::test]
async fn food_coupon_walkthrough() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(&server, event_body("Catered Conf")).await;

    // Define the Lunch coupon; it gets id 1.
    let coupon = server
        .post("/api/admin/coupons")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({ "eventId": event_id, "name": "Lunch", "quantity": 100 }))
        .await;
    coupon.assert_status(StatusCode::CREATED);
    assert_eq!(coupon.json::<Value>()["data"]["couponId"], json!(1));

    // Carol is not registered: redemption is rejected.
    let unregistered = server
        .post("/api/admin/coupons/redeem")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({
            "eventId": event_id,
            "userIdentifier": "carol-ext",
            "couponId": 1,
        }))
        .await;
    unregistered.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        unregistered.json::<Value>()["error"],
        json!("not_registered")
    );

    // After registering, redemption succeeds once.
    server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(CAROL_TOKEN)
        .await
        .assert_status(StatusCode::OK);
    let redeemed = server
        .post("/api/admin/coupons/redeem")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({
            "eventId": event_id,
            "userIdentifier": "carol-ext",
            "couponId": 1,
        }))
        .await;
    redeemed.assert_status(StatusCode::OK);
    assert_eq!(redeemed.json::<Value>()["data"]["couponName"], json!("Lunch"));

    // A second redemption is a hard conflict.
    let repeat = server
        .post("/api/admin/coupons/redeem")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({
            "eventId": event_id,
            "userIdentifier": "carol-ext",
            "couponId": 1,
        }))
        .await;
    repeat.assert_status(StatusCode::CONFLICT);
    assert_eq!(repeat.json::<Value>()["error"], json!("already_redeemed"));

    // A coupon id that was never defined is 404.
    server
        .post("/api/admin/coupons/redeem")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({
            "eventId": event_id,
            "userIdentifier": "carol-ext",
            "couponId": 42,
        }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // The attendee lookup shows the redeemed coupon.
    let attendee = server
        .get(&format!(
            "/api/admin/attendee?event_id={event_id}&identifier=carol-ext"
        ))
        .authorization_bearer(OWNER_TOKEN)
        .await;
    attendee.assert_status(StatusCode::OK);
    let used = attendee.json::<Value>()["data"]["couponsUsed"].clone();
    assert_eq!(used.as_array().unwrap().len(), 1);
    assert_eq!(used[0]["couponId"], json!(1));
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn notification_fan_out_and_inbox() {
    let server = test_server();
    create_organization(&server).await;
    let event_id = create_event(&server, event_body("Announced Conf")).await;

    server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(ALICE_TOKEN)
        .await
        .assert_status(StatusCode::OK);

    let created = server
        .post("/api/admin/notifications")
        .authorization_bearer(OWNER_TOKEN)
        .json(&json!({
            "eventId": event_id,
            "title": "Doors open",
            "message": "Hall A at 9am",
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let body = created.json::<Value>();
    assert_eq!(body["data"]["deliveredCount"], json!(1));
    let notification_id = body["data"]["notification"]["id"].as_str().unwrap().to_string();

    // Bob registers after creation: not retroactively delivered.
    server
        .post(&format!("/api/events/{event_id}/register"))
        .authorization_bearer(BOB_TOKEN)
        .await
        .assert_status(StatusCode::OK);
    let bob_inbox = server
        .get("/api/notifications")
        .authorization_bearer(BOB_TOKEN)
        .await
        .json::<Value>();
    assert_eq!(bob_inbox["data"].as_array().unwrap().len(), 0);

    // Alice reads hers; marking twice stays 200.
    let alice_inbox = server
        .get("/api/notifications")
        .authorization_bearer(ALICE_TOKEN)
        .await
        .json::<Value>();
    assert_eq!(alice_inbox["data"].as_array().unwrap().len(), 1);
    assert_eq!(alice_inbox["data"][0]["isRead"], json!(false));

    for _ in 0..2 {
        server
            .post(&format!("/api/notifications/{notification_id}/read"))
            .authorization_bearer(ALICE_TOKEN)
            .await
            .assert_status(StatusCode::OK);
    }
    let reread = server
        .get("/api/notifications")
        .authorization_bearer(ALICE_TOKEN)
        .await
        .json::<Value>();
    assert_eq!(reread["data"][0]["isRead"], json!(true));
}
