/// Identity verification via JWT bearer credentials
///
/// The identity provider is external; all this module assumes is that a
/// credential is an HS256-signed JWT whose subject is the stable user id.
/// [`verify_credential`] is the whole identity-verifier contract:
/// credential in, user id out, `IdentityError` otherwise.
///
/// Provider failures are mapped to typed errors in one place
/// ([`map_provider_error`]) so no caller ever matches on error message
/// strings.
///
/// # Example
///
/// ```
/// use rolo_core::auth::jwt::{mint_credential, verify_credential, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let secret = "test-secret-key-at-least-32-bytes-long";
///
/// let token = mint_credential(&Claims::new(user_id), secret)?;
/// let verified = verify_credential(&token, secret)?;
/// assert_eq!(verified, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token issuer expected in every credential
pub const ISSUER: &str = "rolo";

/// Default credential lifetime
pub const CREDENTIAL_TTL_HOURS: i64 = 24;

/// Error type for identity verification
///
/// All variants collapse to `Unauthenticated` at the access-control layer;
/// the distinction exists for logging and for callers that want to prompt a
/// re-login only on expiry.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// No credential was presented
    #[error("Missing credential")]
    Missing,

    /// Credential is not a parseable token
    #[error("Malformed credential: {0}")]
    Malformed(String),

    /// Credential was valid once but has expired
    #[error("Credential expired")]
    Expired,

    /// Provider rejected the credential (bad signature, wrong issuer, ...)
    #[error("Credential rejected: {0}")]
    Rejected(String),

    /// Could not mint a credential
    #[error("Failed to mint credential: {0}")]
    Mint(String),
}

/// Claims carried by a credential
///
/// Standard claims only; the community being acted on comes from the
/// request, never from the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id assigned by the identity provider
    pub sub: Uuid,

    /// Issuer, always [`ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims for a user with the default lifetime
    pub fn new(user_id: Uuid) -> Self {
        Self::with_lifetime(user_id, Duration::hours(CREDENTIAL_TTL_HOURS))
    }

    /// Creates claims with a custom lifetime
    pub fn with_lifetime(user_id: Uuid, lifetime: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Checks if the credential has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Mints a signed credential from claims
///
/// Used by tests and operational tooling; in production the identity
/// provider mints credentials.
pub fn mint_credential(claims: &Claims, secret: &str) -> Result<String, IdentityError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key).map_err(|e| IdentityError::Mint(e.to_string()))
}

/// Verifies a credential and extracts the subject user id
///
/// Checks signature, expiry, not-before, and issuer. Must be called per
/// request; downstream components trust the returned id only for the
/// lifetime of that call.
///
/// # Errors
///
/// Returns an [`IdentityError`] describing why the credential was refused.
pub fn verify_credential(token: &str, secret: &str) -> Result<Uuid, IdentityError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data =
        decode::<Claims>(token, &key, &validation).map_err(map_provider_error)?;

    Ok(token_data.claims.sub)
}

/// The one place provider error codes become typed identity errors
///
/// jsonwebtoken reports typed kinds, so this is a straight mapping table;
/// if the provider is ever swapped for one that only reports strings, the
/// parsing belongs here and nowhere else.
fn map_provider_error(err: jsonwebtoken::errors::Error) -> IdentityError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => IdentityError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => IdentityError::Malformed(err.to_string()),
        _ => IdentityError::Rejected(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_mint_and_verify_round_trip() {
        let user_id = Uuid::new_v4();
        let token = mint_credential(&Claims::new(user_id), SECRET).unwrap();

        let verified = verify_credential(&token, SECRET).unwrap();
        assert_eq!(verified, user_id);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = mint_credential(&Claims::new(Uuid::new_v4()), SECRET).unwrap();

        let result = verify_credential(&token, "a-different-secret-32-bytes-long!!");
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[test]
    fn test_expired_credential() {
        let claims = Claims::with_lifetime(Uuid::new_v4(), Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = mint_credential(&claims, SECRET).unwrap();
        let result = verify_credential(&token, SECRET);
        assert!(matches!(result, Err(IdentityError::Expired)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let result = verify_credential("not-a-token", SECRET);
        assert!(matches!(result, Err(IdentityError::Malformed(_))));
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        #[derive(Serialize)]
        struct ForeignClaims {
            sub: Uuid,
            iss: String,
            iat: i64,
            exp: i64,
            nbf: i64,
        }

        let now = Utc::now().timestamp();
        let claims = ForeignClaims {
            sub: Uuid::new_v4(),
            iss: "someone-else".to_string(),
            iat: now,
            exp: now + 3600,
            nbf: now,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = verify_credential(&token, SECRET);
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[test]
    fn test_claims_default_lifetime() {
        let claims = Claims::new(Uuid::new_v4());
        assert_eq!(claims.iss, ISSUER);
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, CREDENTIAL_TTL_HOURS * 3600);
    }
}
