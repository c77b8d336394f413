//! Route and route execution repository implementation

use sqlx::SqlitePool;
use chrono::Utc;
use crate::models::route::{
    ActiveRoute, CompletedRoute, CreateRouteRequest, ExecutionStatus, Route, RouteExecution,
};
use crate::utils::errors::RouteBuddyError;

const ROUTE_COLUMNS: &str =
    "id, route_name, start_point, end_point, distance, price, cargo_type, created_at";
const EXECUTION_COLUMNS: &str = "id, route_id, driver_id, start_time, end_time, status";

#[derive(Clone)]
#[derive(Debug)]
pub struct RouteRepository {
    pool: SqlitePool,
}

impl RouteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a route, optionally assigning it to a driver in the same transaction
    pub async fn create(&self, request: CreateRouteRequest) -> Result<Route, RouteBuddyError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let route = sqlx::query_as::<_, Route>(&format!(
            r#"
            INSERT INTO routes (route_name, start_point, end_point, distance, price, cargo_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ROUTE_COLUMNS
        ))
        .bind(&request.name)
        .bind(&request.origin)
        .bind(&request.destination)
        .bind(request.distance_km)
        .bind(request.price)
        .bind(&request.cargo_type)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(driver_id) = request.assign_to {
            sqlx::query(
                "INSERT INTO route_executions (route_id, driver_id, status) VALUES ($1, $2, $3)",
            )
            .bind(route.id)
            .bind(driver_id)
            .bind(ExecutionStatus::Assigned)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(route)
    }

    /// Find route by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Route>, RouteBuddyError> {
        let route = sqlx::query_as::<_, Route>(&format!(
            "SELECT {} FROM routes WHERE id = $1",
            ROUTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(route)
    }

    /// Routes with no completed execution by any driver.
    ///
    /// Routes currently assigned or in progress stay in the list.
    pub async fn available(&self) -> Result<Vec<Route>, RouteBuddyError> {
        let routes = sqlx::query_as::<_, Route>(&format!(
            r#"
            SELECT {}
            FROM routes r
            WHERE NOT EXISTS (
                SELECT 1
                FROM route_executions re
                WHERE re.route_id = r.id
                AND re.status = 'completed'
            )
            ORDER BY r.id
            "#,
            ROUTE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(routes)
    }

    /// The driver's `in_progress` execution, if any
    pub async fn active_for_driver(&self, driver_id: i64) -> Result<Option<ActiveRoute>, RouteBuddyError> {
        let active = sqlx::query_as::<_, ActiveRoute>(
            r#"
            SELECT
                re.id AS execution_id,
                r.id AS route_id,
                r.route_name AS route_name,
                r.start_point AS origin,
                r.end_point AS destination,
                re.start_time AS start_time
            FROM route_executions re
            JOIN routes r ON r.id = re.route_id
            WHERE re.driver_id = $1 AND re.status = 'in_progress'
            ORDER BY re.id DESC
            LIMIT 1
            "#,
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(active)
    }

    /// Start a route for a driver.
    ///
    /// Fails with `Conflict` if the driver already has a route in progress and
    /// with `NotFound` for an unknown route. An `assigned` execution for the
    /// same pair is promoted instead of inserting a new row.
    pub async fn start(&self, driver_id: i64, route_id: i64) -> Result<RouteExecution, RouteBuddyError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let in_progress: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM route_executions WHERE driver_id = $1 AND status = 'in_progress'",
        )
        .bind(driver_id)
        .fetch_one(&mut *tx)
        .await?;
        if in_progress.0 > 0 {
            return Err(RouteBuddyError::Conflict(format!(
                "driver {} already has a route in progress",
                driver_id
            )));
        }

        let route_exists: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM routes WHERE id = $1")
            .bind(route_id)
            .fetch_one(&mut *tx)
            .await?;
        if route_exists.0 == 0 {
            return Err(RouteBuddyError::NotFound(format!("route {}", route_id)));
        }

        let assigned: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM route_executions WHERE driver_id = $1 AND route_id = $2 AND status = 'assigned' ORDER BY id LIMIT 1",
        )
        .bind(driver_id)
        .bind(route_id)
        .fetch_optional(&mut *tx)
        .await?;

        let execution = match assigned {
            Some((execution_id,)) => {
                sqlx::query_as::<_, RouteExecution>(&format!(
                    "UPDATE route_executions SET status = $1, start_time = $2 WHERE id = $3 RETURNING {}",
                    EXECUTION_COLUMNS
                ))
                .bind(ExecutionStatus::InProgress)
                .bind(now)
                .bind(execution_id)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, RouteExecution>(&format!(
                    "INSERT INTO route_executions (route_id, driver_id, start_time, status) VALUES ($1, $2, $3, $4) RETURNING {}",
                    EXECUTION_COLUMNS
                ))
                .bind(route_id)
                .bind(driver_id)
                .bind(now)
                .bind(ExecutionStatus::InProgress)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(execution)
    }

    /// Complete the driver's `in_progress` execution of a route
    pub async fn finish(&self, driver_id: i64, route_id: i64) -> Result<RouteExecution, RouteBuddyError> {
        let execution = sqlx::query_as::<_, RouteExecution>(&format!(
            r#"
            UPDATE route_executions
            SET status = $1,
                end_time = $2
            WHERE driver_id = $3
            AND route_id = $4
            AND status = 'in_progress'
            RETURNING {}
            "#,
            EXECUTION_COLUMNS
        ))
        .bind(ExecutionStatus::Completed)
        .bind(Utc::now())
        .bind(driver_id)
        .bind(route_id)
        .fetch_optional(&self.pool)
        .await?;

        execution.ok_or_else(|| {
            RouteBuddyError::NotFound(format!(
                "no route {} in progress for driver {}",
                route_id, driver_id
            ))
        })
    }

    /// Completed executions of a driver, most recently finished first
    pub async fn completed_for_driver(&self, driver_id: i64) -> Result<Vec<CompletedRoute>, RouteBuddyError> {
        let routes = sqlx::query_as::<_, CompletedRoute>(
            r#"
            SELECT
                re.id AS execution_id,
                r.id AS route_id,
                r.route_name AS route_name,
                r.start_point AS origin,
                r.end_point AS destination,
                re.start_time AS start_time,
                re.end_time AS end_time,
                r.distance AS distance_km,
                r.price AS price,
                r.cargo_type AS cargo_type
            FROM routes r
            JOIN route_executions re ON re.route_id = r.id
            WHERE re.driver_id = $1
            AND re.status = 'completed'
            ORDER BY re.end_time DESC, re.id DESC
            "#,
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(routes)
    }
}
