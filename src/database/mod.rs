//! Database module
//!
//! This module handles database connections and operations

pub mod connection;
pub mod repositories;
pub mod service;

// Re-export commonly used database components
pub use connection::{DatabasePool, DatabaseConfig, create_pool, run_migrations, health_check};
pub use repositories::{DriverRepository, RouteRepository, ExpenseRepository, ReportRepository};
pub use service::DatabaseService;

/// Open the pool and bring the schema up to date
pub async fn connect(config: &DatabaseConfig) -> crate::utils::errors::Result<DatabaseService> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(DatabaseService::new(pool))
}
