/// Community endpoints
///
/// # Endpoints
///
/// - `POST /v1/communities` - Create a community (caller becomes owner)
/// - `POST /v1/communities/join` - Request to join a community by handle
/// - `GET /v1/communities/:id` - Fetch a community (approved collaborators only)
/// - `GET /v1/communities/:id/seats` - Seat capacity per class
/// - `POST /v1/communities/:id/subscription` - Move the community to a plan
/// - `GET /v1/me/access` - Whether the caller has any approved membership

use crate::{
    app::AppState,
    error::{validation_error, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rolo_core::{
    access::{CommunityCreation, InviteRecipient},
    auth::middleware::AuthContext,
    models::collaborator::{Collaborator, CollaboratorRole},
    models::community::CreateCommunity,
    models::subscription::{CommunitySubscription, SubscriptionStatus},
    seats::{SeatCheck, SeatClass},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create community request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommunityRequest {
    /// Desired handle (lowercase alphanumeric, >= 3 chars; checked in core)
    #[validate(length(min = 1, message = "Handle is required"))]
    pub handle: String,

    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Contact email
    #[validate(email(message = "Contact email must be a valid email address"))]
    pub contact_email: String,

    /// Contact phone
    #[validate(length(min = 1, max = 32, message = "Contact phone must be 1-32 characters"))]
    pub contact_phone: String,

    /// Invites to issue once the community exists
    #[serde(default)]
    pub invitees: Vec<InviteRecipient>,
}

/// Join request body
#[derive(Debug, Deserialize, Validate)]
pub struct JoinRequest {
    /// Handle of the community to join
    #[validate(length(min = 1, message = "Handle is required"))]
    pub handle: String,
}

/// Update subscription request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubscriptionRequest {
    /// Plan name to move to (e.g. "free", "team", "unlimited")
    #[validate(length(min = 1, message = "Plan name is required"))]
    pub plan: String,

    /// Subscription state; defaults to active
    pub status: Option<SubscriptionStatus>,
}

/// Access check response
#[derive(Debug, Serialize)]
pub struct AccessCheckResponse {
    /// Whether the caller holds at least one approved membership
    pub has_access: bool,
}

/// Seat usage response
#[derive(Debug, Serialize)]
pub struct SeatUsageResponse {
    /// Team seats (owner, admin, limited_admin)
    pub team: SeatCheck,

    /// Viewer seats
    pub viewer: SeatCheck,
}

/// Create a community
///
/// The caller becomes the approved owner; both rows commit together. Any
/// `invitees` are invited afterwards, best-effort, with failures reported
/// in the response rather than failing the creation.
pub async fn create_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCommunityRequest>,
) -> ApiResult<Json<CommunityCreation>> {
    request.validate().map_err(validation_error)?;

    let data = CreateCommunity {
        handle: request.handle,
        name: request.name,
        contact_email: request.contact_email,
        contact_phone: request.contact_phone,
    };

    let creation = state
        .access
        .create_community(auth.user_id, &data, &request.invitees)
        .await?;

    Ok(Json(creation))
}

/// Request to join a community by handle
///
/// Creates a pending viewer membership awaiting approval; no seat is
/// consumed until an admin approves.
pub async fn request_join(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<Json<Collaborator>> {
    request.validate().map_err(validation_error)?;

    let collaborator = state
        .access
        .request_join(auth.user_id, &request.handle)
        .await?;

    Ok(Json(collaborator))
}

/// Fetch a community by id
///
/// Visible to any approved collaborator of the community.
pub async fn get_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(community_id): Path<Uuid>,
) -> ApiResult<Json<rolo_core::models::community::Community>> {
    state
        .access
        .authorize(
            auth.user_id,
            community_id,
            &[
                CollaboratorRole::Owner,
                CollaboratorRole::Admin,
                CollaboratorRole::LimitedAdmin,
                CollaboratorRole::Viewer,
            ],
        )
        .await?;

    let community = state.access.get_community(community_id).await?;

    Ok(Json(community))
}

/// Current seat usage per class under the community's plan
///
/// Visible to any approved collaborator; counts are a snapshot, the binding
/// check happens inside the grant transaction.
pub async fn seat_usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(community_id): Path<Uuid>,
) -> ApiResult<Json<SeatUsageResponse>> {
    state
        .access
        .authorize(
            auth.user_id,
            community_id,
            &[
                CollaboratorRole::Owner,
                CollaboratorRole::Admin,
                CollaboratorRole::LimitedAdmin,
                CollaboratorRole::Viewer,
            ],
        )
        .await?;

    let team = state.seats.check(community_id, SeatClass::Team).await?;
    let viewer = state.seats.check(community_id, SeatClass::Viewer).await?;

    Ok(Json(SeatUsageResponse { team, viewer }))
}

/// Move a community onto a named subscription plan
///
/// Owner only. Shrinking caps never evicts existing collaborators; the new
/// caps apply from the next grant.
pub async fn update_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(community_id): Path<Uuid>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> ApiResult<Json<CommunitySubscription>> {
    request.validate().map_err(validation_error)?;

    state
        .access
        .authorize(auth.user_id, community_id, &[CollaboratorRole::Owner])
        .await?;

    let subscription = state
        .access
        .update_subscription(
            auth.user_id,
            community_id,
            &request.plan,
            request.status.unwrap_or(SubscriptionStatus::Active),
        )
        .await?;

    Ok(Json(subscription))
}

/// Whether the caller holds any approved membership anywhere
pub async fn check_access(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AccessCheckResponse>> {
    let has_access = state.access.check_access(auth.user_id).await?;

    Ok(Json(AccessCheckResponse { has_access }))
}
