//! Helper functions and utilities
//!
//! Formatting and parsing helpers shared by the conversation engine.

use chrono::{DateTime, Utc};

/// Parse a user-entered expense amount.
///
/// Accepts a comma as decimal separator and spaces as thousand separators.
/// Returns `None` for anything that is not a finite positive number.
pub fn parse_amount(input: &str) -> Option<f64> {
    let normalized: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if normalized.is_empty() {
        return None;
    }

    let amount = normalized.parse::<f64>().ok()?;
    if amount.is_finite() && amount > 0.0 {
        Some(amount)
    } else {
        None
    }
}

/// Format a money amount as whole units with space-separated thousands
pub fn format_amount(amount: f64) -> String {
    let whole = amount.trunc() as i64;
    let digits = whole.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    if whole < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format a timestamp for user display
pub fn format_datetime(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%d.%m.%Y %H:%M").to_string()
}

/// Format a timestamp as a date only
pub fn format_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%d.%m.%Y").to_string()
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
