/// Database models for Rolo
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `community`: top-level communities identified by unique handles
/// - `collaborator`: (user, community) memberships with role and status
/// - `invite`: time-limited single-use invite tokens
/// - `subscription`: billing plans and per-community subscription state
///
/// # Example
///
/// ```no_run
/// use rolo_core::models::community::Community;
/// use rolo_core::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     max_connections: 10,
/// })
/// .await?;
///
/// if let Some(community) = Community::find_by_handle(&pool, "testcorp").await? {
///     println!("Found community {}", community.name);
/// }
/// # Ok(())
/// # }
/// ```

pub mod collaborator;
pub mod community;
pub mod invite;
pub mod subscription;
