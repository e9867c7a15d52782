/// Database layer for Rolo
///
/// Connection pooling and migrations; models live in the crate-root
/// `models` module.
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: embedded migration runner

pub mod migrations;
pub mod pool;
