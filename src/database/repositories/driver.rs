//! Driver repository implementation

use sqlx::SqlitePool;
use chrono::Utc;
use crate::models::driver::{Driver, CreateDriverRequest};
use crate::utils::errors::RouteBuddyError;

const DRIVER_COLUMNS: &str = "id, telegram_id, full_name, phone, created_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct DriverRepository {
    pool: SqlitePool,
}

impl DriverRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new driver; a second insert for the same Telegram id is a `Duplicate`
    pub async fn create(&self, request: CreateDriverRequest) -> Result<Driver, RouteBuddyError> {
        let driver = sqlx::query_as::<_, Driver>(&format!(
            "INSERT INTO drivers (telegram_id, full_name, phone, created_at) VALUES ($1, $2, $3, $4) RETURNING {}",
            DRIVER_COLUMNS
        ))
        .bind(request.telegram_id)
        .bind(request.full_name)
        .bind(request.phone)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RouteBuddyError::from_driver_insert(e, request.telegram_id))?;

        Ok(driver)
    }

    /// Find driver by Telegram ID
    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Driver>, RouteBuddyError> {
        let driver = sqlx::query_as::<_, Driver>(&format!(
            "SELECT {} FROM drivers WHERE telegram_id = $1",
            DRIVER_COLUMNS
        ))
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(driver)
    }

    /// Check whether a Telegram ID is registered
    pub async fn exists(&self, telegram_id: i64) -> Result<bool, RouteBuddyError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM drivers WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0 > 0)
    }
}
