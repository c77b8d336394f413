//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod driver;
pub mod route;
pub mod expense;
pub mod report;

// Re-export repositories
pub use driver::DriverRepository;
pub use route::RouteRepository;
pub use expense::ExpenseRepository;
pub use report::ReportRepository;
