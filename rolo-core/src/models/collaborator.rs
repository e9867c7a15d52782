/// Collaborator model and database operations
///
/// A collaborator is a (user, community) membership record carrying a role
/// and an approval status. The pair is unique per community; exactly one
/// collaborator per community holds the `owner` role, created atomically
/// with the community itself.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE collaborator_role AS ENUM ('owner', 'admin', 'limited_admin', 'viewer');
/// CREATE TYPE collaborator_status AS ENUM ('pending', 'approved', 'rejected');
///
/// CREATE TABLE collaborators (
///     community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL,
///     role collaborator_role NOT NULL DEFAULT 'viewer',
///     status collaborator_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (community_id, user_id)
/// );
/// ```
///
/// # Lifecycle
///
/// Collaborators are created `pending` (join request) or `approved` (direct
/// add, owner-at-creation, invite acceptance). `pending -> approved` and
/// `pending -> rejected` are the only status transitions; both targets are
/// terminal. The role may change only while the status is `approved`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::seats::SeatClass;

/// Membership roles within a community
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "collaborator_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorRole {
    /// Full control; exactly one per community, created with it
    Owner,

    /// Can manage collaborators, invites, and the subscription
    Admin,

    /// Can manage members but not roles or billing
    LimitedAdmin,

    /// Read-only access
    Viewer,
}

impl CollaboratorRole {
    /// Converts role to its wire/storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            CollaboratorRole::Owner => "owner",
            CollaboratorRole::Admin => "admin",
            CollaboratorRole::LimitedAdmin => "limited_admin",
            CollaboratorRole::Viewer => "viewer",
        }
    }

    /// Parses a role from its storage string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(CollaboratorRole::Owner),
            "admin" => Some(CollaboratorRole::Admin),
            "limited_admin" => Some(CollaboratorRole::LimitedAdmin),
            "viewer" => Some(CollaboratorRole::Viewer),
            _ => None,
        }
    }

    /// The subscription seat class this role consumes when approved
    ///
    /// Owner, admin, and limited_admin count as team seats; viewers are
    /// tracked separately.
    pub fn seat_class(&self) -> SeatClass {
        match self {
            CollaboratorRole::Owner
            | CollaboratorRole::Admin
            | CollaboratorRole::LimitedAdmin => SeatClass::Team,
            CollaboratorRole::Viewer => SeatClass::Viewer,
        }
    }
}

impl std::fmt::Display for CollaboratorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval lifecycle states for a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "collaborator_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorStatus {
    /// Join request awaiting a decision
    Pending,

    /// Active membership
    Approved,

    /// Declined join request (terminal)
    Rejected,
}

impl CollaboratorStatus {
    /// Converts status to its wire/storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            CollaboratorStatus::Pending => "pending",
            CollaboratorStatus::Approved => "approved",
            CollaboratorStatus::Rejected => "rejected",
        }
    }

    /// Whether the one-way status state machine permits this transition
    ///
    /// Only `pending -> approved` and `pending -> rejected` are legal;
    /// `approved` and `rejected` are terminal.
    pub fn can_transition_to(&self, next: CollaboratorStatus) -> bool {
        matches!(
            (self, next),
            (
                CollaboratorStatus::Pending,
                CollaboratorStatus::Approved | CollaboratorStatus::Rejected
            )
        )
    }
}

impl std::fmt::Display for CollaboratorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collaborator model representing one user's membership in one community
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collaborator {
    /// Community ID
    pub community_id: Uuid,

    /// User ID (owned by the external identity provider)
    pub user_id: Uuid,

    /// Role within the community
    pub role: CollaboratorRole,

    /// Approval status
    pub status: CollaboratorStatus,

    /// When the membership record was created
    pub created_at: DateTime<Utc>,

    /// When the membership record was last updated
    pub updated_at: DateTime<Utc>,
}

const COLLABORATOR_COLUMNS: &str =
    "community_id, user_id, role, status, created_at, updated_at";

impl Collaborator {
    /// Inserts a new collaborator row
    ///
    /// # Errors
    ///
    /// Fails with a unique-constraint violation if the (community, user)
    /// pair already exists; callers surface that as a conflict.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
        status: CollaboratorStatus,
    ) -> Result<Self, sqlx::Error> {
        let collaborator = sqlx::query_as::<_, Collaborator>(&format!(
            r#"
            INSERT INTO collaborators (community_id, user_id, role, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLLABORATOR_COLUMNS}
            "#,
        ))
        .bind(community_id)
        .bind(user_id)
        .bind(role)
        .bind(status)
        .fetch_one(executor)
        .await?;

        Ok(collaborator)
    }

    /// Finds the membership record for a (community, user) pair
    pub async fn find(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let collaborator = sqlx::query_as::<_, Collaborator>(&format!(
            r#"
            SELECT {COLLABORATOR_COLUMNS}
            FROM collaborators
            WHERE community_id = $1 AND user_id = $2
            "#,
        ))
        .bind(community_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(collaborator)
    }

    /// Checks whether a user holds at least one approved membership anywhere
    pub async fn has_any_approved(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM collaborators
                WHERE user_id = $1 AND status = 'approved'
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Counts approved collaborators in one seat class of a community
    ///
    /// Team seats are owner/admin/limited_admin; viewer seats are viewers.
    /// Pending and rejected rows never consume seats.
    pub async fn count_approved_in_class(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
        class: SeatClass,
    ) -> Result<i64, sqlx::Error> {
        let sql = match class {
            SeatClass::Team => {
                r#"
                SELECT COUNT(*) FROM collaborators
                WHERE community_id = $1 AND status = 'approved'
                  AND role IN ('owner', 'admin', 'limited_admin')
                "#
            }
            SeatClass::Viewer => {
                r#"
                SELECT COUNT(*) FROM collaborators
                WHERE community_id = $1 AND status = 'approved'
                  AND role = 'viewer'
                "#
            }
        };

        let count: i64 = sqlx::query_scalar(sql)
            .bind(community_id)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// Applies a status transition, guarded against races
    ///
    /// The `WHERE status = 'pending'` clause re-checks the state machine at
    /// write time, so a concurrent approve/reject cannot double-apply.
    /// Returns `None` if the row was missing or no longer pending.
    pub async fn set_status(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
        user_id: Uuid,
        status: CollaboratorStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let collaborator = sqlx::query_as::<_, Collaborator>(&format!(
            r#"
            UPDATE collaborators
            SET status = $3, updated_at = NOW()
            WHERE community_id = $1 AND user_id = $2 AND status = 'pending'
            RETURNING {COLLABORATOR_COLUMNS}
            "#,
        ))
        .bind(community_id)
        .bind(user_id)
        .bind(status)
        .fetch_optional(executor)
        .await?;

        Ok(collaborator)
    }

    /// Changes a collaborator's role
    ///
    /// Only approved collaborators may change roles; the guard is enforced
    /// here as well as in the access controller. Returns `None` if the row
    /// was missing or not approved.
    pub async fn set_role(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let collaborator = sqlx::query_as::<_, Collaborator>(&format!(
            r#"
            UPDATE collaborators
            SET role = $3, updated_at = NOW()
            WHERE community_id = $1 AND user_id = $2 AND status = 'approved'
            RETURNING {COLLABORATOR_COLUMNS}
            "#,
        ))
        .bind(community_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await?;

        Ok(collaborator)
    }

    /// Lists all collaborators of a community, oldest first
    pub async fn list_by_community(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let collaborators = sqlx::query_as::<_, Collaborator>(&format!(
            r#"
            SELECT {COLLABORATOR_COLUMNS}
            FROM collaborators
            WHERE community_id = $1
            ORDER BY created_at ASC
            "#,
        ))
        .bind(community_id)
        .fetch_all(executor)
        .await?;

        Ok(collaborators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            CollaboratorRole::Owner,
            CollaboratorRole::Admin,
            CollaboratorRole::LimitedAdmin,
            CollaboratorRole::Viewer,
        ] {
            assert_eq!(CollaboratorRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(CollaboratorRole::from_str("superuser"), None);
    }

    #[test]
    fn test_role_seat_class() {
        assert_eq!(CollaboratorRole::Owner.seat_class(), SeatClass::Team);
        assert_eq!(CollaboratorRole::Admin.seat_class(), SeatClass::Team);
        assert_eq!(CollaboratorRole::LimitedAdmin.seat_class(), SeatClass::Team);
        assert_eq!(CollaboratorRole::Viewer.seat_class(), SeatClass::Viewer);
    }

    #[test]
    fn test_status_transitions_from_pending() {
        assert!(CollaboratorStatus::Pending.can_transition_to(CollaboratorStatus::Approved));
        assert!(CollaboratorStatus::Pending.can_transition_to(CollaboratorStatus::Rejected));
        assert!(!CollaboratorStatus::Pending.can_transition_to(CollaboratorStatus::Pending));
    }

    #[test]
    fn test_approved_and_rejected_are_terminal() {
        for terminal in [CollaboratorStatus::Approved, CollaboratorStatus::Rejected] {
            assert!(!terminal.can_transition_to(CollaboratorStatus::Pending));
            assert!(!terminal.can_transition_to(CollaboratorStatus::Approved));
            assert!(!terminal.can_transition_to(CollaboratorStatus::Rejected));
        }
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(CollaboratorStatus::Pending.as_str(), "pending");
        assert_eq!(CollaboratorStatus::Approved.as_str(), "approved");
        assert_eq!(CollaboratorStatus::Rejected.as_str(), "rejected");
    }
}
