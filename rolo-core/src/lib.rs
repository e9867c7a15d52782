//! # Rolo Core
//!
//! Access-control core for Rolo: communities, collaborators with roles and
//! approval states, time-limited invites, and subscription seat limits.
//! The HTTP surface lives in the `rolo-api` crate; everything that decides
//! who may do what lives here.
//!
//! ## Module Organization
//!
//! - `models`: database models (communities, collaborators, invites, plans)
//! - `access`: the access controller, entry point for membership mutations
//! - `invites`: invite issuance and redemption
//! - `seats`: subscription seat-limit enforcement
//! - `auth`: bearer-credential verification against the identity provider
//! - `audit`: fire-and-forget audit trail
//! - `events`: broadcast channel for access events
//! - `notify`: outbound invite/reset delivery
//! - `db`: connection pooling and migrations
//! - `error`: the unified error taxonomy

pub mod access;
pub mod audit;
pub mod auth;
pub mod db;
pub mod error;
pub mod events;
pub mod invites;
pub mod models;
pub mod notify;
pub mod seats;

/// Current version of the Rolo core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
