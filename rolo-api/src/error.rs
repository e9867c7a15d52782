/// Error handling for the API server
///
/// A unified error type mapping core errors to HTTP responses. Handlers
/// return `Result<T, ApiError>`, which converts automatically to a JSON
/// error envelope with the right status code.
///
/// # Status mapping
///
/// | Core error           | HTTP |
/// |----------------------|------|
/// | Unauthenticated      | 401  |
/// | Forbidden            | 403  |
/// | NotFound             | 404  |
/// | Conflict             | 409  |
/// | SeatLimitExceeded    | 402  |
/// | Validation           | 422  |
/// | Dependency           | 503  |
/// | Inconsistency        | 500  |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rolo_core::auth::jwt::IdentityError;
use rolo_core::error::AccessError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Unauthorized (401)
    Unauthorized(String),

    /// Payment required (402) - subscription seat limit reached
    SeatLimitExceeded(String),

    /// Forbidden (403) - carries the roles that would have been accepted
    Forbidden {
        message: String,
        required: Vec<String>,
    },

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., taken handle, duplicate collaborator
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503) - store unreachable; retryable
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "conflict", "seat_limit_exceeded")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional structured detail (validation failures, accepted roles)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::SeatLimitExceeded(msg) => write!(f, "Seat limit exceeded: {}", msg),
            ApiError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::SeatLimitExceeded(msg) => (
                StatusCode::PAYMENT_REQUIRED,
                "seat_limit_exceeded",
                msg,
                None,
            ),
            ApiError::Forbidden { message, required } => {
                let details = if required.is_empty() {
                    None
                } else {
                    Some(serde_json::json!({ "required_roles": required }))
                };
                (StatusCode::FORBIDDEN, "forbidden", message, details)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                serde_json::to_value(&errors).ok(),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert core access errors to API errors
impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => {
                ApiError::Unauthorized("Authentication required".to_string())
            }
            AccessError::Forbidden { required } => {
                let required: Vec<String> =
                    required.iter().map(|r| r.as_str().to_string()).collect();
                let message = if required.is_empty() {
                    "Insufficient role for this operation".to_string()
                } else {
                    format!(
                        "This operation requires one of the following roles: {}",
                        required.join(", ")
                    )
                };
                ApiError::Forbidden { message, required }
            }
            AccessError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            AccessError::Conflict(msg) => ApiError::Conflict(msg),
            AccessError::SeatLimitExceeded {
                class,
                limit,
                current,
            } => ApiError::SeatLimitExceeded(format!(
                "The {} seat limit for this community's plan is reached ({}/{})",
                class, current, limit
            )),
            AccessError::Validation { field, message } => {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: field.to_string(),
                    message,
                }])
            }
            AccessError::Dependency(e) => {
                ApiError::ServiceUnavailable(format!("Store unavailable: {}", e))
            }
            AccessError::Inconsistency(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Convert identity errors to API errors
impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Missing => {
                ApiError::Unauthorized("Missing authorization header".to_string())
            }
            IdentityError::Malformed(_) => {
                ApiError::Unauthorized("Invalid credential".to_string())
            }
            IdentityError::Expired => ApiError::Unauthorized("Credential expired".to_string()),
            IdentityError::Rejected(_) => {
                ApiError::Unauthorized("Invalid credential".to_string())
            }
            IdentityError::Mint(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Converts `validator` derive failures into a 422 with per-field details
pub fn validation_error(errors: validator::ValidationErrors) -> ApiError {
    let details = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| ValidationErrorDetail {
                field: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid value".to_string()),
            })
        })
        .collect();

    ApiError::ValidationError(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolo_core::seats::SeatClass;

    #[test]
    fn test_error_display() {
        let err = ApiError::Unauthorized("Invalid credential".to_string());
        assert_eq!(err.to_string(), "Unauthorized: Invalid credential");

        let err = ApiError::NotFound("Community not found".to_string());
        assert_eq!(err.to_string(), "Not found: Community not found");
    }

    #[test]
    fn test_seat_limit_maps_to_payment_required() {
        let core = AccessError::SeatLimitExceeded {
            class: SeatClass::Team,
            limit: 3,
            current: 3,
        };

        match ApiError::from(core) {
            ApiError::SeatLimitExceeded(msg) => {
                assert!(msg.contains("team"));
                assert!(msg.contains("3/3"));
            }
            other => panic!("expected SeatLimitExceeded, got {}", other),
        }
    }

    #[test]
    fn test_forbidden_names_accepted_roles() {
        use rolo_core::models::collaborator::CollaboratorRole;

        let core = AccessError::forbidden(&[CollaboratorRole::Owner, CollaboratorRole::Admin]);
        match ApiError::from(core) {
            ApiError::Forbidden { message, required } => {
                assert!(message.contains("owner"));
                assert!(message.contains("admin"));
                assert_eq!(required, vec!["owner", "admin"]);
            }
            other => panic!("expected Forbidden, got {}", other),
        }
    }

    #[test]
    fn test_malformed_credential_is_unauthorized() {
        let err = ApiError::from(IdentityError::Malformed("not a token".to_string()));
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_validation_error_detail_carried() {
        let core = AccessError::validation("handle", "Handle must be at least 3 characters");
        match ApiError::from(core) {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "handle");
            }
            other => panic!("expected ValidationError, got {}", other),
        }
    }
}
