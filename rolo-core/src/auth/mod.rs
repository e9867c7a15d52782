/// Identity verification for Rolo
///
/// Authentication mechanics (passwords, sessions, refresh) live with the
/// external identity provider. This module covers the one thing the core
/// needs: turning a bearer credential into a verified user id, per call.
///
/// # Modules
///
/// - [`jwt`]: credential verification and the typed provider-error mapping
/// - [`middleware`]: bearer extraction and the per-request [`middleware::AuthContext`]
///
/// # Example
///
/// ```no_run
/// use rolo_core::auth::jwt::verify_credential;
///
/// # fn example(token: &str, secret: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = verify_credential(token, secret)?;
/// println!("request is from {user_id}");
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
