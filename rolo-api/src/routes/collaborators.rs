/// Collaborator management endpoints
///
/// # Endpoints
///
/// - `GET /v1/communities/:id/collaborators` - List all collaborators
/// - `POST /v1/communities/:id/collaborators` - Directly add an approved collaborator
/// - `POST /v1/communities/:id/collaborators/:user_id/approve` - Approve a join request
/// - `POST /v1/communities/:id/collaborators/:user_id/reject` - Reject a join request
/// - `PUT /v1/communities/:id/collaborators/:user_id/role` - Change an approved collaborator's role

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rolo_core::{
    auth::middleware::AuthContext,
    models::collaborator::{Collaborator, CollaboratorRole},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles allowed to manage membership (add, approve, reject)
const MEMBERSHIP_MANAGERS: &[CollaboratorRole] = &[
    CollaboratorRole::Owner,
    CollaboratorRole::Admin,
    CollaboratorRole::LimitedAdmin,
];

/// Roles allowed to change other collaborators' roles
const ROLE_MANAGERS: &[CollaboratorRole] = &[CollaboratorRole::Owner, CollaboratorRole::Admin];

/// All roles; listing is open to any approved collaborator
const ANY_ROLE: &[CollaboratorRole] = &[
    CollaboratorRole::Owner,
    CollaboratorRole::Admin,
    CollaboratorRole::LimitedAdmin,
    CollaboratorRole::Viewer,
];

/// Direct-add request
#[derive(Debug, Deserialize)]
pub struct AddCollaboratorRequest {
    /// User to add
    pub user_id: Uuid,

    /// Role to grant; `owner` is rejected
    pub role: CollaboratorRole,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    /// New role; `owner` is rejected
    pub role: CollaboratorRole,
}

/// Collaborator list response
#[derive(Debug, Serialize)]
pub struct ListCollaboratorsResponse {
    /// All collaborators of the community, oldest first
    pub collaborators: Vec<Collaborator>,
}

/// List all collaborators of a community
pub async fn list_collaborators(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(community_id): Path<Uuid>,
) -> ApiResult<Json<ListCollaboratorsResponse>> {
    state
        .access
        .authorize(auth.user_id, community_id, ANY_ROLE)
        .await?;

    let collaborators = state.access.list_collaborators(community_id).await?;

    Ok(Json(ListCollaboratorsResponse { collaborators }))
}

/// Directly add an approved collaborator
///
/// Consumes a seat immediately; fails with 402 when the class is full.
pub async fn add_collaborator(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(community_id): Path<Uuid>,
    Json(request): Json<AddCollaboratorRequest>,
) -> ApiResult<Json<Collaborator>> {
    state
        .access
        .authorize(auth.user_id, community_id, MEMBERSHIP_MANAGERS)
        .await?;

    let collaborator = state
        .access
        .add_collaborator(auth.user_id, community_id, request.user_id, request.role)
        .await?;

    Ok(Json(collaborator))
}

/// Approve a pending join request
///
/// Consumes a seat in the requester's class; fails with 402 when full.
pub async fn approve_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((community_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Collaborator>> {
    state
        .access
        .authorize(auth.user_id, community_id, MEMBERSHIP_MANAGERS)
        .await?;

    let collaborator = state
        .access
        .resolve_request(auth.user_id, community_id, user_id, true)
        .await?;

    Ok(Json(collaborator))
}

/// Reject a pending join request
pub async fn reject_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((community_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Collaborator>> {
    state
        .access
        .authorize(auth.user_id, community_id, MEMBERSHIP_MANAGERS)
        .await?;

    let collaborator = state
        .access
        .resolve_request(auth.user_id, community_id, user_id, false)
        .await?;

    Ok(Json(collaborator))
}

/// Change an approved collaborator's role
pub async fn change_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((community_id, user_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ChangeRoleRequest>,
) -> ApiResult<Json<Collaborator>> {
    state
        .access
        .authorize(auth.user_id, community_id, ROLE_MANAGERS)
        .await?;

    let collaborator = state
        .access
        .change_role(auth.user_id, community_id, user_id, request.role)
        .await?;

    Ok(Json(collaborator))
}
