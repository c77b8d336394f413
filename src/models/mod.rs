//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod driver;
pub mod route;
pub mod expense;
pub mod report;

// Re-export commonly used models
pub use driver::{Driver, CreateDriverRequest};
pub use route::{Route, RouteExecution, ExecutionStatus, ActiveRoute, CompletedRoute, CreateRouteRequest};
pub use expense::{Expense, ExpenseCategory, CreateExpenseRequest};
pub use report::{CategoryTotal, DriverPerformance, ExecutionFilter, FleetExecution, FleetSummary, RouteProfit};
