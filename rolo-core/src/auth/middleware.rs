/// Request authentication context for Axum
///
/// The API layer validates the bearer credential once per request and
/// stashes an [`AuthContext`] in the request extensions; handlers pull it
/// back out with the `Extension` extractor.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use rolo_core::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}", auth.user_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::IdentityError;

/// Authentication context added to request extensions
///
/// Carries only the verified subject id. The community being acted on comes
/// from the request path, and authorization against it happens per call in
/// the access controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Verified user id for this request
    pub user_id: Uuid,
}

impl AuthContext {
    /// Creates an auth context for a verified user
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Extracts the bearer token from request headers
///
/// # Errors
///
/// - [`IdentityError::Missing`] if there is no Authorization header
/// - [`IdentityError::Malformed`] if the header is not a Bearer credential
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, IdentityError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(IdentityError::Missing)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| IdentityError::Malformed("Expected Bearer credential".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(IdentityError::Missing)));
    }

    #[test]
    fn test_non_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );

        assert!(matches!(
            bearer_token(&headers),
            Err(IdentityError::Malformed(_))
        ));
    }
}
