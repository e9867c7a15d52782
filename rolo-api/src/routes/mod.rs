/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `communities`: Community creation, join requests, subscription, access check
/// - `collaborators`: Membership listing, direct adds, approvals, role changes
/// - `invites`: Invite issuance, listing, and redemption

pub mod collaborators;
pub mod communities;
pub mod health;
pub mod invites;
