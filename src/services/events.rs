//! Transport-neutral inbound events and outbound replies
//!
//! The Telegram handlers translate updates into [`Event`]s and render the
//! [`Reply`] values the conversation engine produces.

use std::fmt;
use std::str::FromStr;
use crate::models::ExpenseCategory;

/// One inbound user event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Telegram user id, also the driver's identity
    pub user_id: i64,
    /// IETF language tag reported by the client
    pub language_code: Option<String>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(user_id: i64, kind: EventKind) -> Self {
        Self {
            user_id,
            language_code: None,
            kind,
        }
    }

    pub fn with_language(mut self, language_code: Option<String>) -> Self {
        self.language_code = language_code;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Command(BotCommand),
    /// Free text, including reply keyboard button presses
    Text(String),
    /// All size variants of one photo
    Photo(Vec<PhotoVariant>),
    /// Inline button press with its callback data
    Callback(String),
}

/// Slash commands understood by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Cancel,
    Expenses,
    Routes,
    History,
    /// `origin;destination;distance;price;cargo[;driver_telegram_id]`
    AddRoute(String),
    Stats,
    /// Fleet-wide assigned and in-progress trips
    Active,
    /// `driver=<id>; status=<status>; cargo=<cargo>`, all optional
    Executions(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoVariant {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

impl PhotoVariant {
    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// The variant with the most pixels
pub fn largest_photo(variants: &[PhotoVariant]) -> Option<&PhotoVariant> {
    variants.iter().max_by_key(|variant| variant.area())
}

/// Outbound effect of handling an event
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// New message in the user's chat
    Text {
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Replace the message whose inline button was pressed
    Edit {
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Resend a stored photo
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    /// Short answer to an inline button press
    Notice(String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn text_with(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Reply::Text {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    /// Text carried by the reply, if any
    pub fn body(&self) -> Option<&str> {
        match self {
            Reply::Text { text, .. } | Reply::Edit { text, .. } | Reply::Notice(text) => Some(text),
            Reply::Photo { caption, .. } => caption.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Keyboard {
    /// Persistent reply keyboard of button labels
    Menu(Vec<Vec<String>>),
    Inline(Vec<Vec<InlineButton>>),
    /// Hide the reply keyboard
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            text: text.into(),
            data: action.to_string(),
        }
    }
}

/// Decoded `action:param` callback data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Category(ExpenseCategory),
    ExpenseDetail(i64),
    Receipt(i64),
    RouteDetail(i64),
    StartRoute(i64),
    BackToRoutes,
    FinishRoute,
    /// Completed execution by id
    HistoryDetail(i64),
    BackToHistory,
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Category(category) => write!(f, "expense:{}", category.code()),
            CallbackAction::ExpenseDetail(id) => write!(f, "expense_detail:{}", id),
            CallbackAction::Receipt(id) => write!(f, "receipt:{}", id),
            CallbackAction::RouteDetail(id) => write!(f, "route:{}", id),
            CallbackAction::StartRoute(id) => write!(f, "route_start:{}", id),
            CallbackAction::BackToRoutes => f.write_str("routes:back"),
            CallbackAction::FinishRoute => f.write_str("route_finish"),
            CallbackAction::HistoryDetail(id) => write!(f, "history:{}", id),
            CallbackAction::BackToHistory => f.write_str("history:back"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = String;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let (action, param) = match data.split_once(':') {
            Some((action, param)) => (action, Some(param)),
            None => (data, None),
        };

        let id = || {
            param
                .and_then(|p| p.parse::<i64>().ok())
                .ok_or_else(|| format!("Invalid id in callback data: {}", data))
        };

        match (action, param) {
            ("expense", Some(code)) => code.parse().map(CallbackAction::Category),
            ("expense_detail", _) => id().map(CallbackAction::ExpenseDetail),
            ("receipt", _) => id().map(CallbackAction::Receipt),
            ("routes", Some("back")) => Ok(CallbackAction::BackToRoutes),
            ("route", _) => id().map(CallbackAction::RouteDetail),
            ("route_start", _) => id().map(CallbackAction::StartRoute),
            ("route_finish", None) => Ok(CallbackAction::FinishRoute),
            ("history", Some("back")) => Ok(CallbackAction::BackToHistory),
            ("history", _) => id().map(CallbackAction::HistoryDetail),
            _ => Err(format!("Unknown callback data: {}", data)),
        }
    }
}
