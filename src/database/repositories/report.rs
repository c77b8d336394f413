//! Reporting queries behind the operations dashboard
//!
//! Read-only aggregates; rendering is left to whoever consumes them.

use sqlx::SqlitePool;
use chrono::{DateTime, Utc};
use crate::models::report::{
    CategoryTotal, DriverPerformance, ExecutionFilter, FleetExecution, FleetSummary, RouteProfit,
};
use crate::utils::errors::RouteBuddyError;

const FLEET_EXECUTION_SELECT: &str = r#"
    SELECT
        re.id AS execution_id,
        r.route_name AS route_name,
        r.start_point AS origin,
        r.end_point AS destination,
        r.distance AS distance_km,
        r.price AS price,
        r.cargo_type AS cargo_type,
        d.telegram_id AS driver_id,
        d.full_name AS driver_name,
        re.start_time AS start_time,
        re.end_time AS end_time,
        re.status AS status
    FROM route_executions re
    JOIN routes r ON r.id = re.route_id
    JOIN drivers d ON d.telegram_id = re.driver_id
"#;

#[derive(Clone)]
#[derive(Debug)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Expense totals per category, largest first
    pub async fn expense_totals_by_category(&self, since: Option<DateTime<Utc>>) -> Result<Vec<CategoryTotal>, RouteBuddyError> {
        let totals = sqlx::query_as::<_, CategoryTotal>(
            r#"
            SELECT
                expense_type AS category,
                CAST(COALESCE(SUM(amount), 0.0) AS REAL) AS total,
                COUNT(*) AS count
            FROM expenses
            WHERE $1 IS NULL OR created_at >= $1
            GROUP BY expense_type
            ORDER BY total DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Completed-route metrics per driver, by revenue
    pub async fn driver_performance(&self) -> Result<Vec<DriverPerformance>, RouteBuddyError> {
        let rows = sqlx::query_as::<_, DriverPerformance>(
            r#"
            SELECT
                d.telegram_id AS telegram_id,
                d.full_name AS full_name,
                COUNT(re.id) AS completed_routes,
                CAST(COALESCE(SUM(r.distance), 0) AS INTEGER) AS total_distance_km,
                CAST(COALESCE(SUM(r.price), 0.0) AS REAL) AS revenue,
                CAST(AVG((julianday(re.end_time) - julianday(re.start_time)) * 24.0) AS REAL) AS avg_duration_hours
            FROM drivers d
            LEFT JOIN route_executions re
                ON re.driver_id = d.telegram_id AND re.status = 'completed'
            LEFT JOIN routes r ON r.id = re.route_id
            GROUP BY d.telegram_id, d.full_name
            ORDER BY revenue DESC, d.full_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Revenue minus linked expenses for completed routes, most profitable first
    pub async fn route_profitability(&self, limit: i64) -> Result<Vec<RouteProfit>, RouteBuddyError> {
        let rows = sqlx::query_as::<_, RouteProfit>(
            r#"
            SELECT
                r.id AS route_id,
                r.route_name AS route_name,
                CAST(r.price * COUNT(DISTINCT re.id) AS REAL) AS revenue,
                CAST(COALESCE((
                    SELECT SUM(e.amount)
                    FROM expenses e
                    JOIN route_executions x ON x.id = e.route_execution_id
                    WHERE x.route_id = r.id
                ), 0.0) AS REAL) AS expenses,
                CAST(r.price * COUNT(DISTINCT re.id) - COALESCE((
                    SELECT SUM(e.amount)
                    FROM expenses e
                    JOIN route_executions x ON x.id = e.route_execution_id
                    WHERE x.route_id = r.id
                ), 0.0) AS REAL) AS profit
            FROM routes r
            JOIN route_executions re ON re.route_id = r.id AND re.status = 'completed'
            GROUP BY r.id, r.route_name, r.price
            ORDER BY profit DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Fleet-wide headline numbers
    pub async fn fleet_summary(&self) -> Result<FleetSummary, RouteBuddyError> {
        let summary = sqlx::query_as::<_, FleetSummary>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM drivers) AS drivers,
                CAST((SELECT COALESCE(SUM(amount), 0.0) FROM expenses) AS REAL) AS total_expenses,
                CAST((
                    SELECT COALESCE(SUM(r.price), 0.0)
                    FROM route_executions re
                    JOIN routes r ON r.id = re.route_id
                    WHERE re.status = 'completed'
                ) AS REAL) AS completed_revenue,
                (SELECT COUNT(*) FROM route_executions WHERE status IN ('assigned', 'in_progress')) AS active_executions,
                (SELECT COUNT(*) FROM route_executions WHERE status = 'completed') AS completed_executions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Assigned and in-progress executions fleet-wide, latest start first
    pub async fn active_executions(&self) -> Result<Vec<FleetExecution>, RouteBuddyError> {
        let rows = sqlx::query_as::<_, FleetExecution>(&format!(
            "{} WHERE re.status IN ('assigned', 'in_progress') ORDER BY re.start_time DESC, re.id DESC",
            FLEET_EXECUTION_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Execution history narrowed by driver, status and cargo, latest start first
    pub async fn filtered_executions(&self, filter: &ExecutionFilter, limit: i64) -> Result<Vec<FleetExecution>, RouteBuddyError> {
        let rows = sqlx::query_as::<_, FleetExecution>(&format!(
            r#"
            {}
            WHERE ($1 IS NULL OR re.driver_id = $1)
            AND ($2 IS NULL OR re.status = $2)
            AND ($3 IS NULL OR r.cargo_type = $3)
            ORDER BY re.start_time DESC, re.id DESC
            LIMIT $4
            "#,
            FLEET_EXECUTION_SELECT
        ))
        .bind(filter.driver_id)
        .bind(filter.status)
        .bind(filter.cargo_type.as_deref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
