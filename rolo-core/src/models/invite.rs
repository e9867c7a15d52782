/// Invite model and database operations
///
/// An invite is a time-limited, single-use token that grants a role in a
/// community to whoever redeems it. Tokens expire 7 days after creation and
/// may be accepted at most once.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE invite_status AS ENUM ('pending', 'accepted', 'expired');
///
/// CREATE TABLE invites (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
///     email VARCHAR(255) NOT NULL,
///     role collaborator_role NOT NULL DEFAULT 'viewer',
///     token VARCHAR(64) NOT NULL UNIQUE,
///     status invite_status NOT NULL DEFAULT 'pending',
///     inviter_id UUID NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Token format
///
/// Tokens follow the pattern `rinv_{32_chars}` (prefix + 32 random base62
/// characters, ~2^190 combinations). Acceptance always re-checks
/// `expires_at` against the clock; the stored `expired` status is set by an
/// optional sweep and is never load-bearing.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::collaborator::CollaboratorRole;

/// Invite validity window after creation
pub const INVITE_TTL_DAYS: i64 = 7;

/// Invite token prefix
pub const TOKEN_PREFIX: &str = "rinv_";

/// Length of the random part of an invite token (characters)
const TOKEN_RANDOM_LENGTH: usize = 32;

/// Total length of an invite token (prefix + random)
pub const TOKEN_LENGTH: usize = 37;

/// Lifecycle states of an invite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invite_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    /// Issued and redeemable until expiry
    Pending,

    /// Redeemed; terminal and irreversible
    Accepted,

    /// Marked stale by the expiry sweep; cosmetic only
    Expired,
}

impl InviteStatus {
    /// Converts status to its wire/storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Expired => "expired",
        }
    }
}

/// Generates a new invite token
///
/// Uses `rand::thread_rng()` for cryptographic randomness; collision chance
/// against the unique index is negligible.
pub fn generate_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    format!("{}{}", TOKEN_PREFIX, random_part)
}

/// Invite model representing one outstanding (or consumed) invitation
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invite {
    /// Unique invite ID (UUID v4)
    pub id: Uuid,

    /// Community the invite grants access to
    pub community_id: Uuid,

    /// Email address the invite was sent to
    pub email: String,

    /// Role granted on acceptance
    pub role: CollaboratorRole,

    /// Single-use redemption token
    pub token: String,

    /// Lifecycle status
    pub status: InviteStatus,

    /// User who issued the invite
    pub inviter_id: Uuid,

    /// Hard expiry; acceptance at or after this instant fails
    pub expires_at: DateTime<Utc>,

    /// When the invite was created
    pub created_at: DateTime<Utc>,
}

const INVITE_COLUMNS: &str =
    "id, community_id, email, role, token, status, inviter_id, expires_at, created_at";

impl Invite {
    /// Whether the invite is past its expiry at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Inserts a new pending invite with a freshly generated token
    pub async fn create(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
        inviter_id: Uuid,
        email: &str,
        role: CollaboratorRole,
    ) -> Result<Self, sqlx::Error> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::days(INVITE_TTL_DAYS);

        let invite = sqlx::query_as::<_, Invite>(&format!(
            r#"
            INSERT INTO invites (community_id, email, role, token, inviter_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INVITE_COLUMNS}
            "#,
        ))
        .bind(community_id)
        .bind(email)
        .bind(role)
        .bind(&token)
        .bind(inviter_id)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;

        Ok(invite)
    }

    /// Loads a pending invite by token, locking the row for this transaction
    ///
    /// The `FOR UPDATE` lock serializes concurrent acceptances of the same
    /// token; the loser of the race sees no pending row. Expiry is checked by
    /// the caller against the clock, not here.
    pub async fn find_pending_by_token_for_update(
        executor: impl PgExecutor<'_>,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let invite = sqlx::query_as::<_, Invite>(&format!(
            r#"
            SELECT {INVITE_COLUMNS}
            FROM invites
            WHERE token = $1 AND status = 'pending'
            FOR UPDATE
            "#,
        ))
        .bind(token)
        .fetch_optional(executor)
        .await?;

        Ok(invite)
    }

    /// Marks an invite accepted, guarded on it still being pending
    ///
    /// Returns `false` if the row was not updated, which means the invite was
    /// consumed or swept between read and write.
    pub async fn mark_accepted(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invites SET status = 'accepted' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks all clock-expired pending invites as `expired`
    ///
    /// Cosmetic sweep; acceptance never depends on it. Returns the number of
    /// invites swept.
    pub async fn expire_stale(
        executor: impl PgExecutor<'_>,
        community_id: Option<Uuid>,
    ) -> Result<u64, sqlx::Error> {
        let result = match community_id {
            Some(community_id) => {
                sqlx::query(
                    r#"
                    UPDATE invites SET status = 'expired'
                    WHERE status = 'pending' AND expires_at <= NOW() AND community_id = $1
                    "#,
                )
                .bind(community_id)
                .execute(executor)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE invites SET status = 'expired'
                    WHERE status = 'pending' AND expires_at <= NOW()
                    "#,
                )
                .execute(executor)
                .await?
            }
        };

        Ok(result.rows_affected())
    }

    /// Lists invites for a community, newest first
    pub async fn list_by_community(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let invites = sqlx::query_as::<_, Invite>(&format!(
            r#"
            SELECT {INVITE_COLUMNS}
            FROM invites
            WHERE community_id = $1
            ORDER BY created_at DESC
            "#,
        ))
        .bind(community_id)
        .fetch_all(executor)
        .await?;

        Ok(invites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_format() {
        let token = generate_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token[TOKEN_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_token_is_not_constant() {
        // not a randomness test, just a guard against a broken generator
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let invite = Invite {
            id: Uuid::new_v4(),
            community_id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            role: CollaboratorRole::Admin,
            token: generate_token(),
            status: InviteStatus::Pending,
            inviter_id: Uuid::new_v4(),
            expires_at: now,
            created_at: now - Duration::days(INVITE_TTL_DAYS),
        };

        // expiry is inclusive: now >= expires_at means gone
        assert!(invite.is_expired_at(now));
        assert!(invite.is_expired_at(now + Duration::seconds(1)));
        assert!(!invite.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(InviteStatus::Pending.as_str(), "pending");
        assert_eq!(InviteStatus::Accepted.as_str(), "accepted");
        assert_eq!(InviteStatus::Expired.as_str(), "expired");
    }
}
