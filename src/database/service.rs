//! Database service layer
//!
//! The single choke point for persistence. Every operation takes one
//! exclusive lock for its whole duration, so multi-statement operations
//! never interleave with each other.

use std::sync::Arc;
use std::time::Instant;
use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::Mutex;
use crate::database::{DatabasePool, DriverRepository, RouteRepository, ExpenseRepository, ReportRepository};
use crate::models::*;
use crate::utils::errors::{RouteBuddyError, Result};
use crate::utils::logging::log_database_operation;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    drivers: DriverRepository,
    routes: RouteRepository,
    expenses: ExpenseRepository,
    reports: ReportRepository,
    gate: Arc<Mutex<()>>,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            drivers: DriverRepository::new(pool.clone()),
            routes: RouteRepository::new(pool.clone()),
            expenses: ExpenseRepository::new(pool.clone()),
            reports: ReportRepository::new(pool.clone()),
            pool,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Run one logical operation under the storage lock
    async fn locked<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let _guard = self.gate.lock().await;
        let started = Instant::now();
        let result = fut.await;
        let failed = matches!(result, Err(ref e) if e.kind() == crate::utils::ErrorKind::Storage);
        log_database_operation(operation, started.elapsed().as_millis() as u64, !failed);
        result
    }

    /// Whether a driver with this Telegram id is registered
    pub async fn driver_exists(&self, telegram_id: i64) -> Result<bool> {
        self.locked("driver_exists", self.drivers.exists(telegram_id)).await
    }

    /// Look up a registered driver
    pub async fn find_driver(&self, telegram_id: i64) -> Result<Option<Driver>> {
        self.locked("find_driver", self.drivers.find_by_telegram_id(telegram_id)).await
    }

    /// Register a driver; fails with `Duplicate` if the identity is taken
    pub async fn add_driver(&self, telegram_id: i64, full_name: &str, phone: &str) -> Result<Driver> {
        let request = CreateDriverRequest {
            telegram_id,
            full_name: full_name.to_string(),
            phone: phone.to_string(),
        };
        self.locked("add_driver", self.drivers.create(request)).await
    }

    /// The driver's unique `in_progress` execution, if any
    pub async fn active_route(&self, driver_id: i64) -> Result<Option<ActiveRoute>> {
        self.locked("active_route", self.routes.active_for_driver(driver_id)).await
    }

    /// Routes that nobody has completed yet
    pub async fn available_routes(&self) -> Result<Vec<Route>> {
        self.locked("available_routes", self.routes.available()).await
    }

    /// Route by id
    pub async fn route_details(&self, route_id: i64) -> Result<Option<Route>> {
        self.locked("route_details", self.routes.find_by_id(route_id)).await
    }

    /// Start a route; `Conflict` if the driver already has one in progress
    pub async fn start_route(&self, driver_id: i64, route_id: i64) -> Result<RouteExecution> {
        self.locked("start_route", self.routes.start(driver_id, route_id)).await
    }

    /// Complete the driver's in-progress execution of the route; `NotFound` if none
    pub async fn finish_route(&self, driver_id: i64, route_id: i64) -> Result<RouteExecution> {
        self.locked("finish_route", self.routes.finish(driver_id, route_id)).await
    }

    /// Completed executions of the driver, most recent first
    pub async fn completed_routes(&self, driver_id: i64) -> Result<Vec<CompletedRoute>> {
        self.locked("completed_routes", self.routes.completed_for_driver(driver_id)).await
    }

    /// Create a route, optionally pre-assigned to a driver
    pub async fn add_route(&self, request: CreateRouteRequest) -> Result<Route> {
        if request.distance_km <= 0 || !(request.price.is_finite() && request.price > 0.0) {
            return Err(RouteBuddyError::Validation(
                "route distance and price must be positive".to_string(),
            ));
        }
        self.locked("add_route", self.routes.create(request)).await
    }

    /// Create a route with random name number, distance and price for trying the bot out
    pub async fn add_test_route(&self, name_prefix: &str, origin: &str, destination: &str, cargo_type: &str) -> Result<Route> {
        let (number, distance_km, price) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(1..=100),
                rng.gen_range(1000..=2000),
                rng.gen_range(100_000..=500_000) as f64,
            )
        };

        self.add_route(CreateRouteRequest {
            name: format!("{} {}", name_prefix, number),
            origin: origin.to_string(),
            destination: destination.to_string(),
            distance_km,
            price,
            cargo_type: Some(cargo_type.to_string()),
            assign_to: None,
        })
        .await
    }

    /// All expenses of the driver, newest first
    pub async fn driver_expenses(&self, driver_id: i64) -> Result<Vec<Expense>> {
        self.locked("driver_expenses", self.expenses.list_for_driver(driver_id)).await
    }

    /// One of the driver's expenses
    pub async fn expense_details(&self, driver_id: i64, expense_id: i64) -> Result<Option<Expense>> {
        self.locked("expense_details", self.expenses.find_for_driver(driver_id, expense_id)).await
    }

    /// Persist an expense; the timestamp is assigned here
    pub async fn add_expense(&self, request: CreateExpenseRequest) -> Result<i64> {
        self.locked("add_expense", self.expenses.create(request)).await
    }

    pub async fn expense_totals_by_category(&self, since: Option<DateTime<Utc>>) -> Result<Vec<CategoryTotal>> {
        self.locked("expense_totals_by_category", self.reports.expense_totals_by_category(since)).await
    }

    pub async fn driver_performance(&self) -> Result<Vec<DriverPerformance>> {
        self.locked("driver_performance", self.reports.driver_performance()).await
    }

    pub async fn route_profitability(&self, limit: i64) -> Result<Vec<RouteProfit>> {
        self.locked("route_profitability", self.reports.route_profitability(limit)).await
    }

    pub async fn fleet_summary(&self) -> Result<FleetSummary> {
        self.locked("fleet_summary", self.reports.fleet_summary()).await
    }

    pub async fn active_executions(&self) -> Result<Vec<FleetExecution>> {
        self.locked("active_executions", self.reports.active_executions()).await
    }

    pub async fn filtered_executions(&self, filter: &ExecutionFilter, limit: i64) -> Result<Vec<FleetExecution>> {
        self.locked("filtered_executions", self.reports.filtered_executions(filter, limit)).await
    }

    /// Close the underlying pool; later operations fail with a storage error
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
