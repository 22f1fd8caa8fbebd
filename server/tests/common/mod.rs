//! Shared setup for HTTP tests: an in-memory store, a static identity
//! provider with well-known tokens, and a `TestServer` over the full
//! router.

#![allow(dead_code)] // not every suite uses every helper
#![allow(clippy::expect_used)]

use axum_test::TestServer;
use gather_auth::mocks::StaticIdentityProvider;
use gather_auth::Identity;
use gather_core::types::ExternalId;
use gather_core::SystemClock;
use gather_server::config::RegistrationConfig;
use gather_server::{build_router, AppState};
use gather_testing::MemoryStore;
use serde_json::Value;
use std::sync::Arc;

/// Token for the organization owner.
pub const OWNER_TOKEN: &str = "owner-token";
/// Token for an organization member (staff).
pub const MEMBER_TOKEN: &str = "member-token";
/// Tokens for attendees.
pub const ALICE_TOKEN: &str = "alice-token";
pub const BOB_TOKEN: &str = "bob-token";
pub const CAROL_TOKEN: &str = "carol-token";

fn identity(external_id: &str, email: &str, name: &str) -> Identity {
    Identity {
        external_id: ExternalId::new(external_id),
        email: Some(email.to_string()),
        full_name: Some(name.to_string()),
    }
}

/// Builds a server over a fresh store with the well-known identities.
pub fn test_server() -> TestServer {
    test_server_with_config(&RegistrationConfig {
        require_event_registration: false,
    })
}

/// Same, with explicit registration behavior.
pub fn test_server_with_config(config: &RegistrationConfig) -> TestServer {
    let store = Arc::new(MemoryStore::new());
    let provider = StaticIdentityProvider::new()
        .with_token(
            OWNER_TOKEN,
            identity("org-owner", "owner@example.com", "Olive Owner"),
        )
        .with_token(
            MEMBER_TOKEN,
            identity("org-staff", "staff@example.com", "Sam Staff"),
        )
        .with_token(
            ALICE_TOKEN,
            identity("alice-ext", "alice@example.com", "Alice Liddell"),
        )
        .with_token(BOB_TOKEN, identity("bob-ext", "bob@example.com", "Bob Bobberson"))
        .with_token(
            CAROL_TOKEN,
            identity("carol-ext", "carol@example.com", "Carol Kaye"),
        );

    let state = AppState::new(store, Arc::new(provider), Arc::new(SystemClock), config);
    TestServer::new(build_router(state)).expect("router should build")
}

/// Creates an organization owned by `OWNER_TOKEN`'s identity.
pub async fn create_organization(server: &TestServer) -> Value {
    let response = server
        .post("/api/admin/organizations")
        .authorization_bearer(OWNER_TOKEN)
        .json(&serde_json::json!({ "name": "Acme Conferences" }))
        .await;
    response.assert_status(http::StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

/// Creates an event via the admin API; returns its id as a string.
pub async fn create_event(server: &TestServer, body: Value) -> String {
    let response = server
        .post("/api/admin/events")
        .authorization_bearer(OWNER_TOKEN)
        .json(&body)
        .await;
    response.assert_status(http::StatusCode::CREATED);
    response.json::<Value>()["data"]["id"]
        .as_str()
        .expect("event id")
        .to_string()
}

/// A valid event body with a far-future window.
pub fn event_body(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "startTime": "2030-06-01T09:00:00Z",
        "endTime": "2030-06-01T18:00:00Z",
    })
}
