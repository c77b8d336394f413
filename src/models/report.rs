//! Aggregated reporting rows

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::route::ExecutionStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriverPerformance {
    pub telegram_id: i64,
    pub full_name: String,
    pub completed_routes: i64,
    pub total_distance_km: i64,
    pub revenue: f64,
    pub avg_duration_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RouteProfit {
    pub route_id: i64,
    pub route_name: String,
    pub revenue: f64,
    pub expenses: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct FleetSummary {
    pub drivers: i64,
    pub total_expenses: f64,
    pub completed_revenue: f64,
    pub active_executions: i64,
    pub completed_executions: i64,
}

/// One route execution with its route and driver, for fleet-wide views
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FleetExecution {
    pub execution_id: i64,
    pub route_name: String,
    pub origin: String,
    pub destination: String,
    pub distance_km: i64,
    pub price: f64,
    pub cargo_type: Option<String>,
    pub driver_id: i64,
    pub driver_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
}

/// Narrowing of the execution history; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFilter {
    pub driver_id: Option<i64>,
    pub status: Option<ExecutionStatus>,
    pub cargo_type: Option<String>,
}
