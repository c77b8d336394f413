//! Conversation context management
//!
//! This module tracks where each user is inside the two multi-step dialogs
//! (driver registration and expense entry) together with the data entered so
//! far. A user with no stored context is idle.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::ExpenseCategory;

/// Which dialog a state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Registration,
    ExpenseEntry,
}

/// Current step of a user's dialog, carrying the data collected so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ConversationState {
    AwaitingName,
    AwaitingPhone {
        full_name: String,
    },
    AwaitingExpenseCategory,
    AwaitingAmount {
        category: ExpenseCategory,
    },
    AwaitingReceipt {
        category: ExpenseCategory,
        amount: f64,
    },
    AwaitingComment {
        category: ExpenseCategory,
        amount: f64,
        receipt_file_id: String,
    },
}

impl ConversationState {
    pub fn dialog(&self) -> Dialog {
        match self {
            ConversationState::AwaitingName | ConversationState::AwaitingPhone { .. } => {
                Dialog::Registration
            }
            _ => Dialog::ExpenseEntry,
        }
    }

    /// Short step name for logs
    pub fn step_name(&self) -> &'static str {
        match self {
            ConversationState::AwaitingName => "awaiting_name",
            ConversationState::AwaitingPhone { .. } => "awaiting_phone",
            ConversationState::AwaitingExpenseCategory => "awaiting_expense_category",
            ConversationState::AwaitingAmount { .. } => "awaiting_amount",
            ConversationState::AwaitingReceipt { .. } => "awaiting_receipt",
            ConversationState::AwaitingComment { .. } => "awaiting_comment",
        }
    }
}

/// User conversation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// User ID this context belongs to
    pub user_id: i64,
    /// Current dialog step
    pub state: ConversationState,
    /// When this context was last updated
    pub updated_at: DateTime<Utc>,
}

impl ConversationContext {
    /// Create a new conversation context for a user
    pub fn new(user_id: i64, state: ConversationState) -> Self {
        Self {
            user_id,
            state,
            updated_at: Utc::now(),
        }
    }

    /// Move to the next step
    pub fn advance(&mut self, state: ConversationState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    /// Whether the context is at the given step, ignoring collected data
    pub fn is_at(&self, step: &ConversationState) -> bool {
        std::mem::discriminant(&self.state) == std::mem::discriminant(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization_is_tagged() {
        let state = ConversationState::AwaitingReceipt {
            category: ExpenseCategory::Fuel,
            amount: 25000.0,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["step"], "awaiting_receipt");
        assert_eq!(json["category"], "fuel");
        assert_eq!(json["amount"], 25000.0);

        let back: ConversationState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_dialog_classification() {
        assert_eq!(ConversationState::AwaitingName.dialog(), Dialog::Registration);
        assert_eq!(
            ConversationState::AwaitingPhone { full_name: "A".into() }.dialog(),
            Dialog::Registration
        );
        assert_eq!(ConversationState::AwaitingExpenseCategory.dialog(), Dialog::ExpenseEntry);
    }

    #[test]
    fn test_context_advance() {
        let mut context = ConversationContext::new(1, ConversationState::AwaitingExpenseCategory);
        assert!(context.is_at(&ConversationState::AwaitingExpenseCategory));

        context.advance(ConversationState::AwaitingAmount { category: ExpenseCategory::Oil });
        assert!(context.is_at(&ConversationState::AwaitingAmount { category: ExpenseCategory::Fuel }));
        assert!(!context.is_at(&ConversationState::AwaitingExpenseCategory));
    }
}
