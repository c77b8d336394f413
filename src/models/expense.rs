//! Expense model

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Kinds of costs a driver can log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Fuel,
    Oil,
    Tires,
    Repair,
    Food,
    Parking,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 6] = [
        ExpenseCategory::Fuel,
        ExpenseCategory::Oil,
        ExpenseCategory::Tires,
        ExpenseCategory::Repair,
        ExpenseCategory::Food,
        ExpenseCategory::Parking,
    ];

    /// Stored column value and callback payload
    pub fn code(&self) -> &'static str {
        match self {
            ExpenseCategory::Fuel => "fuel",
            ExpenseCategory::Oil => "oil",
            ExpenseCategory::Tires => "tires",
            ExpenseCategory::Repair => "repair",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Parking => "parking",
        }
    }

    /// Translation key of the display name
    pub fn translation_key(&self) -> String {
        format!("expenses.categories.{}", self.code())
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .iter()
            .copied()
            .find(|c| c.code() == s)
            .ok_or_else(|| format!("unknown expense category: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: i64,
    pub driver_id: i64,
    #[sqlx(rename = "expense_type")]
    pub category: String,
    pub amount: f64,
    #[sqlx(rename = "receipt_photo")]
    pub receipt_file_id: Option<String>,
    pub comment: Option<String>,
    pub route_execution_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// Name of the route the expense was logged on, if any
    pub route_name: Option<String>,
}

impl Expense {
    /// Parsed category; rows written by other tools may carry unknown codes
    pub fn category(&self) -> Option<ExpenseCategory> {
        self.category.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpenseRequest {
    pub driver_id: i64,
    pub category: ExpenseCategory,
    pub amount: f64,
    pub receipt_file_id: Option<String>,
    pub comment: Option<String>,
    pub route_execution_id: Option<i64>,
}
