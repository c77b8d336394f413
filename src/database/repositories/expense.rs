//! Expense repository implementation

use sqlx::SqlitePool;
use chrono::Utc;
use crate::models::expense::{CreateExpenseRequest, Expense};
use crate::utils::errors::RouteBuddyError;

const EXPENSE_SELECT: &str = r#"
    SELECT
        e.id AS id,
        e.driver_id AS driver_id,
        e.expense_type AS expense_type,
        e.amount AS amount,
        e.receipt_photo AS receipt_photo,
        e.comment AS comment,
        e.route_execution_id AS route_execution_id,
        e.created_at AS created_at,
        r.route_name AS route_name
    FROM expenses e
    LEFT JOIN route_executions re ON e.route_execution_id = re.id
    LEFT JOIN routes r ON re.route_id = r.id
"#;

#[derive(Clone)]
#[derive(Debug)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an expense stamped with the current time; returns the new id
    pub async fn create(&self, request: CreateExpenseRequest) -> Result<i64, RouteBuddyError> {
        if !(request.amount.is_finite() && request.amount > 0.0) {
            return Err(RouteBuddyError::Validation(format!(
                "expense amount must be positive, got {}",
                request.amount
            )));
        }

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO expenses (
                driver_id,
                expense_type,
                amount,
                receipt_photo,
                comment,
                route_execution_id,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(request.driver_id)
        .bind(request.category.code())
        .bind(request.amount)
        .bind(request.receipt_file_id)
        .bind(request.comment)
        .bind(request.route_execution_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// All expenses of a driver, newest first
    pub async fn list_for_driver(&self, driver_id: i64) -> Result<Vec<Expense>, RouteBuddyError> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "{} WHERE e.driver_id = $1 ORDER BY e.created_at DESC, e.id DESC",
            EXPENSE_SELECT
        ))
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// One expense, only if it belongs to the driver
    pub async fn find_for_driver(&self, driver_id: i64, expense_id: i64) -> Result<Option<Expense>, RouteBuddyError> {
        let expense = sqlx::query_as::<_, Expense>(&format!(
            "{} WHERE e.driver_id = $1 AND e.id = $2",
            EXPENSE_SELECT
        ))
        .bind(driver_id)
        .bind(expense_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(expense)
    }
}
