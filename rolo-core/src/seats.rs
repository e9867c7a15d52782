/// Seat-limit enforcement for subscription plans
///
/// Subscription plans cap the number of approved collaborators per seat
/// class. Team seats (owner, admin, limited_admin) and viewer seats are
/// tracked independently; a cap of `-1` means unlimited.
///
/// Checks run at grant time, inside the granting transaction, after the
/// community row has been locked (see [`crate::access`]). That serializes
/// concurrent grants per community, so a near-full limit cannot be raced
/// past.
///
/// # Example
///
/// ```no_run
/// use rolo_core::seats::{SeatClass, SeatLimitEnforcer};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, community_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let enforcer = SeatLimitEnforcer::new(pool);
///
/// let check = enforcer.check(community_id, SeatClass::Team).await?;
/// if !check.allowed {
///     println!("team seats full: {}/{}", check.current, check.limit);
/// }
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AccessError;
use crate::models::collaborator::Collaborator;
use crate::models::subscription::SubscriptionPlan;

/// Sentinel limit value meaning "no cap"
pub const UNLIMITED: i32 = -1;

/// Which pool of subscription capacity a grant draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatClass {
    /// Owner, admin, and limited_admin collaborators
    Team,

    /// Viewer collaborators
    Viewer,
}

impl SeatClass {
    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Team => "team",
            SeatClass::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for SeatClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seat caps in effect for one community
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatLimits {
    /// Cap on approved team-role collaborators; -1 = unlimited
    pub max_team_members: i32,

    /// Cap on approved viewers; -1 = unlimited
    pub max_viewers: i32,
}

impl SeatLimits {
    /// Caps applied to communities without a subscription row
    pub fn free_tier() -> Self {
        SeatLimits {
            max_team_members: 3,
            max_viewers: 10,
        }
    }

    /// Builds limits from a plan row
    pub fn from_plan(plan: &SubscriptionPlan) -> Self {
        SeatLimits {
            max_team_members: plan.max_team_members,
            max_viewers: plan.max_viewers,
        }
    }

    /// Gets the cap for a seat class
    pub fn get(&self, class: SeatClass) -> i32 {
        match class {
            SeatClass::Team => self.max_team_members,
            SeatClass::Viewer => self.max_viewers,
        }
    }
}

/// Whether one more seat fits under a cap
///
/// `-1` is the unlimited sentinel and always fits.
pub fn within_limit(current: i64, limit: i32) -> bool {
    limit == UNLIMITED || current < i64::from(limit)
}

/// Result of a seat check
#[derive(Debug, Clone, Serialize)]
pub struct SeatCheck {
    /// Whether one more seat may be granted
    pub allowed: bool,

    /// Approved collaborators currently in the class
    pub current: i64,

    /// Plan cap for the class (-1 = unlimited)
    pub limit: i32,
}

impl SeatCheck {
    fn new(current: i64, limit: i32) -> Self {
        SeatCheck {
            allowed: within_limit(current, limit),
            current,
            limit,
        }
    }

    /// Seats remaining in the class; `None` when unlimited
    pub fn remaining(&self) -> Option<i64> {
        if self.limit == UNLIMITED {
            None
        } else {
            Some((i64::from(self.limit) - self.current).max(0))
        }
    }
}

/// Loads the seat limits in effect for a community
///
/// Unsubscribed communities get the free tier.
pub async fn load_limits(
    conn: &mut PgConnection,
    community_id: Uuid,
) -> Result<SeatLimits, AccessError> {
    let limits = match SubscriptionPlan::find_for_community(&mut *conn, community_id).await? {
        Some(plan) => SeatLimits::from_plan(&plan),
        None => SeatLimits::free_tier(),
    };

    Ok(limits)
}

/// Runs a seat check on an existing connection
///
/// Grant paths call this inside their transaction, after locking the
/// community row, so the count cannot move between check and insert.
pub async fn check_seats(
    conn: &mut PgConnection,
    community_id: Uuid,
    class: SeatClass,
) -> Result<SeatCheck, AccessError> {
    let limits = load_limits(&mut *conn, community_id).await?;
    let current = Collaborator::count_approved_in_class(&mut *conn, community_id, class).await?;

    Ok(SeatCheck::new(current, limits.get(class)))
}

/// Errors with seat detail when the class is full
pub async fn enforce_seats(
    conn: &mut PgConnection,
    community_id: Uuid,
    class: SeatClass,
) -> Result<(), AccessError> {
    let check = check_seats(conn, community_id, class).await?;

    if !check.allowed {
        return Err(AccessError::SeatLimitExceeded {
            class,
            limit: check.limit,
            current: check.current,
        });
    }

    Ok(())
}

/// Seat-limit enforcement service
///
/// Pool-holding wrapper for read-only checks outside a grant transaction
/// (e.g. showing remaining capacity). Grants go through [`enforce_seats`]
/// on the transaction connection instead.
#[derive(Clone)]
pub struct SeatLimitEnforcer {
    db: PgPool,
}

impl SeatLimitEnforcer {
    /// Creates a new seat limit enforcer
    pub fn new(db: PgPool) -> Self {
        SeatLimitEnforcer { db }
    }

    /// Checks whether a seat class has capacity for one more grant
    pub async fn check(
        &self,
        community_id: Uuid,
        class: SeatClass,
    ) -> Result<SeatCheck, AccessError> {
        let mut conn = self.db.acquire().await?;
        check_seats(&mut conn, community_id, class).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_limit_basic() {
        assert!(within_limit(0, 1));
        assert!(!within_limit(1, 1));
        assert!(!within_limit(5, 1));
        assert!(!within_limit(0, 0));
    }

    #[test]
    fn test_within_limit_unlimited() {
        assert!(within_limit(0, UNLIMITED));
        assert!(within_limit(1_000_000, UNLIMITED));
    }

    #[test]
    fn test_seat_check_remaining() {
        let check = SeatCheck::new(3, 10);
        assert!(check.allowed);
        assert_eq!(check.remaining(), Some(7));

        let full = SeatCheck::new(10, 10);
        assert!(!full.allowed);
        assert_eq!(full.remaining(), Some(0));

        let unlimited = SeatCheck::new(10, UNLIMITED);
        assert!(unlimited.allowed);
        assert_eq!(unlimited.remaining(), None);
    }

    #[test]
    fn test_free_tier_limits() {
        let limits = SeatLimits::free_tier();
        assert_eq!(limits.get(SeatClass::Team), 3);
        assert_eq!(limits.get(SeatClass::Viewer), 10);
    }

    #[test]
    fn test_limits_from_plan() {
        let plan = SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "unlimited".to_string(),
            max_team_members: UNLIMITED,
            max_viewers: UNLIMITED,
        };
        let limits = SeatLimits::from_plan(&plan);
        assert_eq!(limits.get(SeatClass::Team), UNLIMITED);
        assert_eq!(limits.get(SeatClass::Viewer), UNLIMITED);
    }

    #[test]
    fn test_seat_class_as_str() {
        assert_eq!(SeatClass::Team.as_str(), "team");
        assert_eq!(SeatClass::Viewer.as_str(), "viewer");
    }
}
