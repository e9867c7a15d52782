/// Invite endpoints
///
/// # Endpoints
///
/// - `GET /v1/communities/:id/invites` - List invites for a community
/// - `POST /v1/communities/:id/invites` - Issue an invite
/// - `POST /v1/invites/accept?token=rinv_...` - Redeem an invite token

use crate::{
    app::AppState,
    error::{validation_error, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use rolo_core::{
    auth::middleware::AuthContext,
    models::collaborator::{Collaborator, CollaboratorRole},
    models::invite::Invite,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Roles allowed to issue and list invites
const INVITE_MANAGERS: &[CollaboratorRole] = &[CollaboratorRole::Owner, CollaboratorRole::Admin];

/// Issue invite request
#[derive(Debug, Deserialize, Validate)]
pub struct SendInviteRequest {
    /// Address to invite
    #[validate(email(message = "Invitee email must be a valid email address"))]
    pub email: String,

    /// Role granted on acceptance; `owner` is rejected
    pub role: CollaboratorRole,
}

/// Accept invite query parameters
#[derive(Debug, Deserialize)]
pub struct AcceptInviteQuery {
    /// The `rinv_...` token from the invite
    pub token: String,
}

/// Invite as returned to inviters
///
/// The redemption token is included: the inviter may forward it over any
/// channel if delivery failed.
#[derive(Debug, Serialize)]
pub struct InviteResponse {
    /// Invite ID
    pub id: Uuid,

    /// Community invited into
    pub community_id: Uuid,

    /// Invitee address
    pub email: String,

    /// Role granted on acceptance
    pub role: CollaboratorRole,

    /// Redemption token
    pub token: String,

    /// Lifecycle status
    pub status: String,

    /// Hard expiry
    pub expires_at: chrono::DateTime<chrono::Utc>,

    /// When the invite was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Invite> for InviteResponse {
    fn from(invite: Invite) -> Self {
        InviteResponse {
            id: invite.id,
            community_id: invite.community_id,
            email: invite.email,
            role: invite.role,
            token: invite.token,
            status: invite.status.as_str().to_string(),
            expires_at: invite.expires_at,
            created_at: invite.created_at,
        }
    }
}

/// Invite list response
#[derive(Debug, Serialize)]
pub struct ListInvitesResponse {
    /// Invites for the community, newest first
    pub invites: Vec<InviteResponse>,
}

/// List invites for a community
pub async fn list_invites(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(community_id): Path<Uuid>,
) -> ApiResult<Json<ListInvitesResponse>> {
    state
        .access
        .authorize(auth.user_id, community_id, INVITE_MANAGERS)
        .await?;

    let invites = state.invites.list_invites(community_id).await?;

    Ok(Json(ListInvitesResponse {
        invites: invites.into_iter().map(InviteResponse::from).collect(),
    }))
}

/// Issue an invite
///
/// The invite commits before delivery is attempted; a delivery failure does
/// not invalidate the returned token.
pub async fn send_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(community_id): Path<Uuid>,
    Json(request): Json<SendInviteRequest>,
) -> ApiResult<Json<InviteResponse>> {
    request.validate().map_err(validation_error)?;

    state
        .access
        .authorize(auth.user_id, community_id, INVITE_MANAGERS)
        .await?;

    let invite = state
        .invites
        .send_invite(auth.user_id, community_id, &request.email, request.role)
        .await?;

    Ok(Json(InviteResponse::from(invite)))
}

/// Redeem an invite token for the caller
///
/// Unknown, consumed, and expired tokens all answer 404.
pub async fn accept_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AcceptInviteQuery>,
) -> ApiResult<Json<Collaborator>> {
    let collaborator = state
        .invites
        .accept_invite(auth.user_id, &query.token)
        .await?;

    Ok(Json(collaborator))
}
