/// Subscription plan and community subscription models
///
/// Plans carry the seat caps a community is entitled to; a community's
/// subscription row points at its current plan. No payment processing
/// happens here, only recording of subscription state.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subscription_plans (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(64) NOT NULL UNIQUE,
///     max_team_members INT NOT NULL,
///     max_viewers INT NOT NULL
/// );
///
/// CREATE TABLE community_subscriptions (
///     community_id UUID PRIMARY KEY REFERENCES communities(id) ON DELETE CASCADE,
///     plan_id UUID NOT NULL REFERENCES subscription_plans(id),
///     status VARCHAR(16) NOT NULL DEFAULT 'active',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// A limit of `-1` means unlimited. A community without a subscription row
/// falls back to the free tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Subscription lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription in good standing
    Active,

    /// Payment lapsed; seats keep their caps
    PastDue,

    /// Subscription ended; community reverts to free-tier caps on renewal
    Canceled,
}

impl SubscriptionStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Parses status from its storage string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

/// A billing plan row with its seat caps
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionPlan {
    /// Unique plan ID
    pub id: Uuid,

    /// Plan name (e.g. "free", "team", "unlimited")
    pub name: String,

    /// Maximum approved team-role collaborators; -1 = unlimited
    pub max_team_members: i32,

    /// Maximum approved viewers; -1 = unlimited
    pub max_viewers: i32,
}

/// A community's current subscription
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommunitySubscription {
    /// Community ID (one subscription per community)
    pub community_id: Uuid,

    /// Current plan
    pub plan_id: Uuid,

    /// Subscription state as stored
    pub status: String,

    /// When the subscription was first recorded
    pub created_at: DateTime<Utc>,

    /// When the subscription last changed
    pub updated_at: DateTime<Utc>,
}

impl CommunitySubscription {
    /// Gets the parsed status enum
    pub fn get_status(&self) -> Option<SubscriptionStatus> {
        SubscriptionStatus::from_str(&self.status)
    }
}

impl SubscriptionPlan {
    /// Finds a plan by name
    pub async fn find_by_name(
        executor: impl PgExecutor<'_>,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT id, name, max_team_members, max_viewers
            FROM subscription_plans
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(plan)
    }

    /// Loads the plan currently covering a community, if subscribed
    pub async fn find_for_community(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT p.id, p.name, p.max_team_members, p.max_viewers
            FROM subscription_plans p
            JOIN community_subscriptions s ON s.plan_id = p.id
            WHERE s.community_id = $1
            "#,
        )
        .bind(community_id)
        .fetch_optional(executor)
        .await?;

        Ok(plan)
    }
}

impl CommunitySubscription {
    /// Records a subscription state transition for a community
    ///
    /// Upserts the single subscription row, so switching plans and
    /// reactivating a canceled subscription go through the same path.
    pub async fn set_plan(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
        plan_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<Self, sqlx::Error> {
        let subscription = sqlx::query_as::<_, CommunitySubscription>(
            r#"
            INSERT INTO community_subscriptions (community_id, plan_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (community_id)
            DO UPDATE SET plan_id = $2, status = $3, updated_at = NOW()
            RETURNING community_id, plan_id, status, created_at, updated_at
            "#,
        )
        .bind(community_id)
        .bind(plan_id)
        .bind(status.as_str())
        .fetch_one(executor)
        .await?;

        Ok(subscription)
    }

    /// Finds a community's subscription row
    pub async fn find(
        executor: impl PgExecutor<'_>,
        community_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let subscription = sqlx::query_as::<_, CommunitySubscription>(
            r#"
            SELECT community_id, plan_id, status, created_at, updated_at
            FROM community_subscriptions
            WHERE community_id = $1
            "#,
        )
        .bind(community_id)
        .fetch_optional(executor)
        .await?;

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_status_round_trip() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SubscriptionStatus::from_str("trialing"), None);
    }

    #[test]
    fn test_get_status_parses_stored_string() {
        let now = Utc::now();
        let sub = CommunitySubscription {
            community_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            status: "past_due".to_string(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(sub.get_status(), Some(SubscriptionStatus::PastDue));
    }
}
