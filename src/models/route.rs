//! Route and route execution models

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Route {
    pub id: i64,
    #[sqlx(rename = "route_name")]
    pub name: String,
    #[sqlx(rename = "start_point")]
    pub origin: String,
    #[sqlx(rename = "end_point")]
    pub destination: String,
    #[sqlx(rename = "distance")]
    pub distance_km: i64,
    pub price: f64,
    pub cargo_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRouteRequest {
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub distance_km: i64,
    pub price: f64,
    pub cargo_type: Option<String>,
    /// Pre-assign the route to this driver's Telegram id
    pub assign_to: Option<i64>,
}

/// Lifecycle of one driver's attempt at a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Assigned,
    InProgress,
    Completed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Assigned => "assigned",
            ExecutionStatus::InProgress => "in_progress",
            ExecutionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(ExecutionStatus::Assigned),
            "in_progress" => Ok(ExecutionStatus::InProgress),
            "completed" => Ok(ExecutionStatus::Completed),
            other => Err(format!("unknown execution status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RouteExecution {
    pub id: i64,
    pub route_id: i64,
    pub driver_id: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
}

/// A driver's current `in_progress` execution joined with its route
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActiveRoute {
    pub execution_id: i64,
    pub route_id: i64,
    pub route_name: String,
    pub origin: String,
    pub destination: String,
    pub start_time: Option<DateTime<Utc>>,
}

/// A completed execution joined with its route, for the history view
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompletedRoute {
    pub execution_id: i64,
    pub route_id: i64,
    pub route_name: String,
    pub origin: String,
    pub destination: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub distance_km: i64,
    pub price: f64,
    pub cargo_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [ExecutionStatus::Assigned, ExecutionStatus::InProgress, ExecutionStatus::Completed] {
            assert_eq!(status.as_str().parse::<ExecutionStatus>(), Ok(status));
        }
        assert!("pending".parse::<ExecutionStatus>().is_err());
    }

    #[test]
    fn test_status_serde_matches_column_values() {
        let json = serde_json::to_string(&ExecutionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
