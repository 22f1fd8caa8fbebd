//! Organization endpoints.
//!
//! - `POST /api/admin/organizations` - create an organization (the caller
//!   becomes its owner)
//! - `GET /api/admin/organizations/me` - the caller's organization
//! - `POST /api/admin/organizations/members` - add a member identity

use super::{success, ApiSuccess};
use crate::auth::{CurrentUser, OrgActor};
use crate::server::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gather_auth::OrgAction;
use gather_core::types::{ExternalId, Organization, OrganizationId};
use gather_web::AppError;
use serde::{Deserialize, Serialize};

/// Request body for creating an organization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Contact email shown to attendees
    pub contact_email: Option<String>,
    /// Public website
    pub website: Option<String>,
}

/// Request body for adding a member.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    /// The member's external identity
    pub external_id: String,
}

/// Membership change payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberData {
    /// The organization
    pub organization_id: OrganizationId,
    /// The added member
    pub external_id: ExternalId,
}

/// Create an organization owned by the caller.
pub async fn create_organization(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<ApiSuccess<Organization>>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::bad_request("Organization name is required"));
    }

    let now = state.clock.now();
    let organization = Organization {
        id: OrganizationId::new(),
        name: request.name,
        description: request.description,
        contact_email: request.contact_email,
        website: request.website,
        owner_external_id: user.external_id,
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .create_organization(&organization)
        .await
        .map_err(gather_core::Error::from)?;
    tracing::info!(org_id = %organization.id, "organization created");

    Ok((
        StatusCode::CREATED,
        Json(success("Organization created", organization)),
    ))
}

/// The caller's organization.
pub async fn my_organization(
    actor: OrgActor,
) -> Result<Json<ApiSuccess<Organization>>, AppError> {
    Ok(Json(success("Organization", actor.organization)))
}

/// Add a member identity to the caller's organization. Owner only.
pub async fn add_member(
    actor: OrgActor,
    State(state): State<AppState>,
    Json(request): Json<AddMemberRequest>,
) -> Result<Json<ApiSuccess<MemberData>>, AppError> {
    actor.require(OrgAction::ManageMembers)?;
    if request.external_id.trim().is_empty() {
        return Err(AppError::bad_request("Member external id is required"));
    }

    let member = ExternalId::new(request.external_id);
    state
        .store
        .add_organization_member(actor.organization.id, &member)
        .await
        .map_err(gather_core::Error::from)?;

    Ok(Json(success(
        "Member added",
        MemberData {
            organization_id: actor.organization.id,
            external_id: member,
        },
    )))
}
