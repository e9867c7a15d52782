/// Community model and database operations
///
/// A community is the top-level entity: every collaborator, invite, and
/// subscription belongs to exactly one community. Communities are identified
/// by a globally unique, human-chosen handle.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE communities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     handle VARCHAR(64) NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     contact_email VARCHAR(255) NOT NULL,
///     contact_phone VARCHAR(32) NOT NULL,
///     owner_id UUID NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Handles
///
/// Handles are lowercase alphanumeric slugs of at least 3 characters. They
/// are stored lowercase, so the unique index doubles as the case-insensitive
/// uniqueness check; lookups lowercase their input first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Minimum handle length in characters
pub const MIN_HANDLE_LENGTH: usize = 3;

/// Community model representing one managed community
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Community {
    /// Unique community ID (UUID v4)
    pub id: Uuid,

    /// Globally unique handle (lowercase alphanumeric, >= 3 chars)
    pub handle: String,

    /// Display name
    pub name: String,

    /// Contact email for the community
    pub contact_email: String,

    /// Contact phone for the community
    pub contact_phone: String,

    /// User ID of the community owner
    pub owner_id: Uuid,

    /// When the community was created
    pub created_at: DateTime<Utc>,

    /// When the community was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new community
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommunity {
    /// Desired handle (validated with [`validate_handle`])
    pub handle: String,

    /// Display name (required, non-empty)
    pub name: String,

    /// Contact email (required, well-formed)
    pub contact_email: String,

    /// Contact phone (required, non-empty)
    pub contact_phone: String,
}

/// Checks whether a handle is well-formed
///
/// A valid handle is at least [`MIN_HANDLE_LENGTH`] characters and contains
/// only ASCII lowercase letters and digits.
///
/// # Example
///
/// ```
/// use rolo_core::models::community::validate_handle;
///
/// assert!(validate_handle("testcorp").is_ok());
/// assert!(validate_handle("ab").is_err());
/// assert!(validate_handle("Testcorp").is_err());
/// ```
pub fn validate_handle(handle: &str) -> Result<(), String> {
    if handle.len() < MIN_HANDLE_LENGTH {
        return Err(format!(
            "Handle must be at least {} characters",
            MIN_HANDLE_LENGTH
        ));
    }

    if !handle
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err("Handle may only contain lowercase letters and digits".to_string());
    }

    Ok(())
}

impl Community {
    /// Creates a new community row
    ///
    /// The caller is responsible for validating `data` first and for running
    /// this inside the same transaction as the owner-collaborator grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is already taken (unique constraint
    /// violation) or the database call fails.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        owner_id: Uuid,
        data: &CreateCommunity,
    ) -> Result<Self, sqlx::Error> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            INSERT INTO communities (handle, name, contact_email, contact_phone, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, handle, name, contact_email, contact_phone, owner_id,
                      created_at, updated_at
            "#,
        )
        .bind(&data.handle)
        .bind(&data.name)
        .bind(&data.contact_email)
        .bind(&data.contact_phone)
        .bind(owner_id)
        .fetch_one(executor)
        .await?;

        Ok(community)
    }

    /// Finds a community by ID
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            SELECT id, handle, name, contact_email, contact_phone, owner_id,
                   created_at, updated_at
            FROM communities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(community)
    }

    /// Finds a community by handle (case-insensitive)
    ///
    /// Handles are stored lowercase; the input is lowercased before lookup so
    /// `"TestCorp"` resolves the community created as `"testcorp"`.
    pub async fn find_by_handle(
        executor: impl PgExecutor<'_>,
        handle: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            SELECT id, handle, name, contact_email, contact_phone, owner_id,
                   created_at, updated_at
            FROM communities
            WHERE handle = $1
            "#,
        )
        .bind(handle.to_ascii_lowercase())
        .fetch_optional(executor)
        .await?;

        Ok(community)
    }

    /// Takes a row-level lock on a community for the current transaction
    ///
    /// Grant paths lock the community row before counting seats so concurrent
    /// grants against the same community serialize. Returns `false` if the
    /// community does not exist.
    pub async fn lock_for_update(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM communities WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(locked.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_handle_accepts_lowercase_alnum() {
        assert!(validate_handle("testcorp").is_ok());
        assert!(validate_handle("abc").is_ok());
        assert!(validate_handle("club42").is_ok());
        assert!(validate_handle("123").is_ok());
    }

    #[test]
    fn test_validate_handle_rejects_short() {
        assert!(validate_handle("").is_err());
        assert!(validate_handle("ab").is_err());
    }

    #[test]
    fn test_validate_handle_rejects_bad_characters() {
        assert!(validate_handle("TestCorp").is_err());
        assert!(validate_handle("test corp").is_err());
        assert!(validate_handle("test-corp").is_err());
        assert!(validate_handle("test_corp").is_err());
        assert!(validate_handle("tëst").is_err());
    }

    #[test]
    fn test_validate_handle_length_is_in_chars() {
        // three multi-byte characters are still rejected by the charset rule
        assert!(validate_handle("ééé").is_err());
    }
}
