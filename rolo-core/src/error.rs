/// Error taxonomy for the access-control core
///
/// Every core operation returns [`AccessError`]. The variants follow the
/// caller-facing taxonomy: authentication, authorization, absence, conflict,
/// seat caps, validation, dependency failure, and internal inconsistency.
///
/// Dependency failures (store unavailable, timeout) are the only retryable
/// class; mutating operations are never retried implicitly, so a caller that
/// retries sees `Conflict` rather than a duplicate row.

use crate::models::collaborator::CollaboratorRole;
use crate::seats::SeatClass;

/// Unified error type for access-control operations
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Missing, malformed, or rejected credential
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated but lacking the required role or approval
    #[error("Forbidden: requires one of {required:?}")]
    Forbidden {
        /// Roles that would have been accepted
        required: Vec<CollaboratorRole>,
    },

    /// Community, collaborator, or invite absent (or token invalid/expired)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate collaborator, taken handle, or illegal state transition
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The community's plan cap for a seat class is already met
    #[error("{class} seat limit exceeded ({current}/{limit})")]
    SeatLimitExceeded {
        /// Seat class that is full
        class: SeatClass,
        /// Plan cap for the class
        limit: i32,
        /// Approved collaborators currently occupying the class
        current: i64,
    },

    /// Malformed input
    #[error("Validation failed on {field}: {message}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// Store call failed or timed out; retryable by the caller
    #[error("Store operation failed: {0}")]
    Dependency(#[from] sqlx::Error),

    /// A compound operation observed a state it just ruled out
    #[error("Inconsistent state: {0}")]
    Inconsistency(String),
}

impl AccessError {
    /// Builds a `Forbidden` error naming the accepted roles
    pub fn forbidden(required: &[CollaboratorRole]) -> Self {
        AccessError::Forbidden {
            required: required.to_vec(),
        }
    }

    /// Builds a `Validation` error
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AccessError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the caller may safely retry the operation as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::Dependency(_))
    }
}

/// Maps a database error to `Conflict` when it is a unique violation
///
/// Insert paths use this so a duplicate collaborator or a taken handle
/// surfaces as a conflict instead of an opaque dependency failure.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AccessError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AccessError::Conflict(message.to_string())
        }
        _ => AccessError::Dependency(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_names_required_roles() {
        let err = AccessError::forbidden(&[CollaboratorRole::Owner, CollaboratorRole::Admin]);
        let msg = err.to_string();
        assert!(msg.contains("Owner"));
        assert!(msg.contains("Admin"));
    }

    #[test]
    fn test_seat_limit_display() {
        let err = AccessError::SeatLimitExceeded {
            class: SeatClass::Team,
            limit: 3,
            current: 3,
        };
        assert_eq!(err.to_string(), "team seat limit exceeded (3/3)");
    }

    #[test]
    fn test_only_dependency_is_retryable() {
        assert!(AccessError::Dependency(sqlx::Error::PoolClosed).is_retryable());
        assert!(!AccessError::Unauthenticated.is_retryable());
        assert!(!AccessError::Conflict("x".to_string()).is_retryable());
        assert!(!AccessError::NotFound("community").is_retryable());
    }
}
