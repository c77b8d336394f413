//! Conversation engine
//!
//! Drives the registration and expense-entry dialogs and answers the
//! stateless one-shot commands. Events of one user are handled strictly in
//! arrival order: the user's lock is held for the whole event, so a stale
//! button press observed after a cancel finds the state already cleared.

mod admin;
mod one_shot;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::database::DatabaseService;
use crate::i18n::I18n;
use crate::models::{CreateExpenseRequest, ExpenseCategory};
use crate::state::{ConversationContext, ConversationState, Dialog, StateStorage, UserLocks};
use crate::utils::errors::{ErrorKind, RouteBuddyError, Result};
use crate::utils::helpers::parse_amount;
use crate::utils::logging::{log_expense_recorded, log_handler_error, log_user_action};
use super::events::{
    largest_photo, BotCommand, CallbackAction, Event, EventKind, InlineButton, Keyboard, Reply,
};

/// English cancel word accepted regardless of the user's language
const CANCEL_WORD: &str = "cancel";

const MENU_KEYS: [[&str; 2]; 3] = [
    ["buttons.menu.add_expense", "buttons.menu.my_expenses"],
    ["buttons.menu.my_routes", "buttons.menu.route_history"],
    ["buttons.menu.add_test_route", "buttons.menu.cancel"],
];

/// Who sent the event and in which language to answer
#[derive(Debug, Clone)]
pub(crate) struct Ctx {
    pub user_id: i64,
    pub lang: String,
}

#[derive(Clone)]
pub struct ConversationEngine {
    db: DatabaseService,
    state: StateStorage,
    locks: UserLocks,
    i18n: Arc<I18n>,
    admin_ids: Vec<i64>,
}

impl ConversationEngine {
    pub fn new(db: DatabaseService, state: StateStorage, i18n: Arc<I18n>, admin_ids: Vec<i64>) -> Self {
        Self {
            db,
            state,
            locks: UserLocks::new(),
            i18n,
            admin_ids,
        }
    }

    /// Handle one event and return what to send back.
    ///
    /// Errors never escape: they are logged and turned into a user-facing
    /// message. Conversation state is only advanced after the step's side
    /// effects succeeded, so a failed step can simply be resent.
    pub async fn handle(&self, event: Event) -> Vec<Reply> {
        let lock = self.locks.for_user(event.user_id).await;
        let _guard = lock.lock().await;

        let ctx = Ctx {
            user_id: event.user_id,
            lang: self.i18n.detect_user_language(event.language_code.as_deref()),
        };
        let is_callback = matches!(event.kind, EventKind::Callback(_));

        match self.dispatch(&ctx, event.kind).await {
            Ok(replies) => replies,
            Err(error) => self.error_replies(&ctx, &error, is_callback),
        }
    }

    async fn dispatch(&self, ctx: &Ctx, kind: EventKind) -> Result<Vec<Reply>> {
        let context = self.state.load_context(ctx.user_id).await?;

        if self.is_cancel(&kind) {
            return self.cancel(ctx, context).await;
        }

        match kind {
            EventKind::Command(command) => self.command(ctx, command).await,
            EventKind::Callback(data) => self.callback(ctx, context, &data).await,
            kind => match context {
                Some(context) => self.continue_dialog(ctx, context, kind).await,
                None => self.idle_input(ctx, kind).await,
            },
        }
    }

    fn is_cancel(&self, kind: &EventKind) -> bool {
        match kind {
            EventKind::Command(BotCommand::Cancel) => true,
            EventKind::Text(text) => {
                let text = text.trim().to_lowercase();
                text == CANCEL_WORD
                    || self
                        .i18n
                        .supported_languages()
                        .iter()
                        .any(|lang| self.i18n.t("buttons.menu.cancel", lang, None).to_lowercase() == text)
            }
            _ => false,
        }
    }

    async fn cancel(&self, ctx: &Ctx, context: Option<ConversationContext>) -> Result<Vec<Reply>> {
        let Some(context) = context else {
            debug!(user_id = ctx.user_id, "Cancel while idle ignored");
            return Ok(Vec::new());
        };

        self.state.delete_context(ctx.user_id).await?;
        log_user_action(ctx.user_id, "cancel", Some(context.state.step_name()));

        match context.state.dialog() {
            Dialog::Registration => {
                Ok(vec![Reply::text_with(self.t(ctx, "commands.cancel.registration"), Keyboard::Remove)])
            }
            Dialog::ExpenseEntry => {
                Ok(vec![Reply::text_with(self.t(ctx, "commands.cancel.done"), self.main_menu(ctx))])
            }
        }
    }

    async fn command(&self, ctx: &Ctx, command: BotCommand) -> Result<Vec<Reply>> {
        match command {
            BotCommand::Start => self.start(ctx).await,
            BotCommand::Help => Ok(vec![Reply::text(self.t(ctx, "commands.help.text"))]),
            // consumed by is_cancel before dispatch
            BotCommand::Cancel => Ok(Vec::new()),
            BotCommand::Expenses => {
                self.require_driver(ctx).await?;
                self.show_expenses(ctx).await
            }
            BotCommand::Routes => {
                self.require_driver(ctx).await?;
                self.show_routes(ctx).await
            }
            BotCommand::History => {
                self.require_driver(ctx).await?;
                self.show_history(ctx).await
            }
            BotCommand::AddRoute(args) => self.add_route(ctx, &args).await,
            BotCommand::Stats => self.stats(ctx).await,
            BotCommand::Active => self.active_executions(ctx).await,
            BotCommand::Executions(args) => self.filtered_executions(ctx, &args).await,
        }
    }

    async fn start(&self, ctx: &Ctx) -> Result<Vec<Reply>> {
        log_user_action(ctx.user_id, "start", None);

        if self.db.driver_exists(ctx.user_id).await? {
            return Ok(vec![Reply::text_with(
                self.t(ctx, "commands.start.already_registered"),
                self.main_menu(ctx),
            )]);
        }

        let context = ConversationContext::new(ctx.user_id, ConversationState::AwaitingName);
        self.state.save_context(&context).await?;

        Ok(vec![Reply::text_with(self.t(ctx, "commands.start.welcome_new"), Keyboard::Remove)])
    }

    async fn callback(&self, ctx: &Ctx, context: Option<ConversationContext>, data: &str) -> Result<Vec<Reply>> {
        let action = match data.parse::<CallbackAction>() {
            Ok(action) => action,
            Err(reason) => {
                debug!(user_id = ctx.user_id, reason = %reason, "Unrecognized callback data");
                return Ok(vec![Reply::Notice(self.t(ctx, "commands.errors.action_expired"))]);
            }
        };

        if let CallbackAction::Category(category) = action {
            return match context {
                Some(mut context) if context.is_at(&ConversationState::AwaitingExpenseCategory) => {
                    context.advance(ConversationState::AwaitingAmount { category });
                    self.state.save_context(&context).await?;
                    Ok(vec![
                        Reply::Edit {
                            text: format!(
                                "{}: {}",
                                self.t(ctx, "expenses.choose_category").trim_end_matches(':'),
                                self.t(ctx, &category.translation_key())
                            ),
                            keyboard: None,
                        },
                        Reply::text(self.t(ctx, "expenses.ask_amount")),
                    ])
                }
                _ => {
                    debug!(user_id = ctx.user_id, category = %category, "Stale category press ignored");
                    Ok(vec![Reply::Notice(self.t(ctx, "commands.errors.action_expired"))])
                }
            };
        }

        self.require_driver(ctx).await?;
        self.one_shot_callback(ctx, action).await
    }

    /// Input arriving while a dialog is active belongs to the dialog
    async fn continue_dialog(&self, ctx: &Ctx, mut context: ConversationContext, kind: EventKind) -> Result<Vec<Reply>> {
        debug!(user_id = ctx.user_id, step = context.state.step_name(), "Continuing dialog");

        match (context.state.clone(), kind) {
            (ConversationState::AwaitingName, EventKind::Text(text)) => {
                let full_name = text.trim();
                if full_name.is_empty() {
                    return Ok(vec![Reply::text(self.t(ctx, "commands.start.name_required"))]);
                }
                context.advance(ConversationState::AwaitingPhone {
                    full_name: full_name.to_string(),
                });
                self.state.save_context(&context).await?;
                Ok(vec![Reply::text(self.t(ctx, "commands.start.ask_phone"))])
            }
            (ConversationState::AwaitingName, _) => {
                Ok(vec![Reply::text(self.t(ctx, "commands.start.name_required"))])
            }

            (ConversationState::AwaitingPhone { full_name }, EventKind::Text(text)) => {
                let phone = text.trim();
                if phone.is_empty() {
                    return Ok(vec![Reply::text(self.t(ctx, "commands.start.phone_required"))]);
                }
                self.register(ctx, &full_name, phone).await
            }
            (ConversationState::AwaitingPhone { .. }, _) => {
                Ok(vec![Reply::text(self.t(ctx, "commands.start.phone_required"))])
            }

            (ConversationState::AwaitingExpenseCategory, _) => {
                Ok(vec![Reply::text_with(self.t(ctx, "expenses.choose_category"), self.category_keyboard(ctx))])
            }

            (ConversationState::AwaitingAmount { category }, EventKind::Text(text)) => {
                match parse_amount(&text) {
                    Some(amount) => {
                        context.advance(ConversationState::AwaitingReceipt { category, amount });
                        self.state.save_context(&context).await?;
                        Ok(vec![Reply::text(self.t(ctx, "expenses.ask_receipt"))])
                    }
                    None if is_non_positive_number(&text) => {
                        Ok(vec![Reply::text(self.t(ctx, "expenses.amount_not_positive"))])
                    }
                    None => Ok(vec![Reply::text(self.t(ctx, "expenses.amount_invalid"))]),
                }
            }
            (ConversationState::AwaitingAmount { .. }, _) => {
                Ok(vec![Reply::text(self.t(ctx, "expenses.amount_invalid"))])
            }

            (ConversationState::AwaitingReceipt { category, amount }, EventKind::Photo(variants)) => {
                let Some(photo) = largest_photo(&variants) else {
                    return Ok(vec![Reply::text(self.t(ctx, "expenses.receipt_required"))]);
                };
                context.advance(ConversationState::AwaitingComment {
                    category,
                    amount,
                    receipt_file_id: photo.file_id.clone(),
                });
                self.state.save_context(&context).await?;
                Ok(vec![Reply::text(self.t(ctx, "expenses.ask_comment"))])
            }
            (ConversationState::AwaitingReceipt { .. }, _) => {
                Ok(vec![Reply::text(self.t(ctx, "expenses.receipt_required"))])
            }

            (ConversationState::AwaitingComment { category, amount, receipt_file_id }, EventKind::Text(text)) => {
                self.save_expense(ctx, category, amount, receipt_file_id, text.trim()).await
            }
            (ConversationState::AwaitingComment { .. }, _) => {
                Ok(vec![Reply::text(self.t(ctx, "expenses.ask_comment"))])
            }
        }
    }

    async fn register(&self, ctx: &Ctx, full_name: &str, phone: &str) -> Result<Vec<Reply>> {
        match self.db.add_driver(ctx.user_id, full_name, phone).await {
            Ok(driver) => {
                self.end_committed_dialog(ctx).await;
                info!(user_id = ctx.user_id, driver_id = driver.id, "Driver registered");
                Ok(vec![
                    Reply::text(self.t(ctx, "commands.start.registered")),
                    Reply::text_with(self.t(ctx, "commands.start.choose_action"), self.main_menu(ctx)),
                ])
            }
            Err(RouteBuddyError::Duplicate { .. }) => {
                self.state.delete_context(ctx.user_id).await?;
                Ok(vec![Reply::text_with(
                    self.t(ctx, "commands.start.already_registered"),
                    self.main_menu(ctx),
                )])
            }
            Err(error) => Err(error),
        }
    }

    async fn save_expense(
        &self,
        ctx: &Ctx,
        category: ExpenseCategory,
        amount: f64,
        receipt_file_id: String,
        comment: &str,
    ) -> Result<Vec<Reply>> {
        let route_execution_id = self
            .db
            .active_route(ctx.user_id)
            .await?
            .map(|active| active.execution_id);

        let request = CreateExpenseRequest {
            driver_id: ctx.user_id,
            category,
            amount,
            receipt_file_id: Some(receipt_file_id),
            comment: (!comment.is_empty()).then(|| comment.to_string()),
            route_execution_id,
        };
        let expense_id = self.db.add_expense(request).await?;
        self.end_committed_dialog(ctx).await;

        log_expense_recorded(ctx.user_id, expense_id, category.code(), amount, route_execution_id);

        Ok(vec![Reply::text_with(self.t(ctx, "expenses.saved"), self.main_menu(ctx))])
    }

    /// Clear the dialog once its data is committed; a failed clear is only logged
    async fn end_committed_dialog(&self, ctx: &Ctx) -> bool {
        committed_dialog_cleared(ctx.user_id, self.state.delete_context(ctx.user_id).await)
    }

    /// Text or photo while no dialog is active: menu buttons or nothing
    async fn idle_input(&self, ctx: &Ctx, kind: EventKind) -> Result<Vec<Reply>> {
        let EventKind::Text(text) = kind else {
            return self.unknown_input(ctx).await;
        };

        let pressed = |key: &str| self.i18n.matches_any(key, &text);

        if pressed("buttons.menu.add_expense") {
            self.require_driver(ctx).await?;
            let context = ConversationContext::new(ctx.user_id, ConversationState::AwaitingExpenseCategory);
            self.state.save_context(&context).await?;
            log_user_action(ctx.user_id, "add_expense", None);
            Ok(vec![Reply::text_with(self.t(ctx, "expenses.choose_category"), self.category_keyboard(ctx))])
        } else if pressed("buttons.menu.my_expenses") {
            self.require_driver(ctx).await?;
            self.show_expenses(ctx).await
        } else if pressed("buttons.menu.my_routes") {
            self.require_driver(ctx).await?;
            self.show_routes(ctx).await
        } else if pressed("buttons.menu.route_history") {
            self.require_driver(ctx).await?;
            self.show_history(ctx).await
        } else if pressed("buttons.menu.add_test_route") {
            self.require_driver(ctx).await?;
            self.add_test_route(ctx).await
        } else {
            self.unknown_input(ctx).await
        }
    }

    async fn unknown_input(&self, ctx: &Ctx) -> Result<Vec<Reply>> {
        self.require_driver(ctx).await?;
        Ok(vec![Reply::text_with(self.t(ctx, "commands.errors.unknown_input"), self.main_menu(ctx))])
    }

    async fn require_driver(&self, ctx: &Ctx) -> Result<()> {
        if self.db.driver_exists(ctx.user_id).await? {
            Ok(())
        } else {
            Err(RouteBuddyError::DriverNotRegistered { telegram_id: ctx.user_id })
        }
    }

    fn error_replies(&self, ctx: &Ctx, error: &RouteBuddyError, is_callback: bool) -> Vec<Reply> {
        let key = match error {
            RouteBuddyError::DriverNotRegistered { .. } => "commands.errors.not_registered",
            RouteBuddyError::PermissionDenied(_) => "commands.errors.admin_only",
            _ => {
                log_handler_error(ctx.user_id, error, "conversation");
                match error.kind() {
                    ErrorKind::NotFound if is_callback => "commands.errors.action_expired",
                    _ => "commands.errors.generic",
                }
            }
        };

        let text = self.t(ctx, key);
        if is_callback {
            vec![Reply::Notice(text)]
        } else {
            vec![Reply::text(text)]
        }
    }

    pub(crate) fn t(&self, ctx: &Ctx, key: &str) -> String {
        self.i18n.t(key, &ctx.lang, None)
    }

    pub(crate) fn tf(&self, ctx: &Ctx, key: &str, params: &[(&str, String)]) -> String {
        self.i18n.tf(key, &ctx.lang, params)
    }

    pub(crate) fn main_menu(&self, ctx: &Ctx) -> Keyboard {
        Keyboard::Menu(
            MENU_KEYS
                .iter()
                .map(|row| row.iter().map(|key| self.t(ctx, key)).collect())
                .collect(),
        )
    }

    fn category_keyboard(&self, ctx: &Ctx) -> Keyboard {
        Keyboard::Inline(
            ExpenseCategory::ALL
                .chunks(2)
                .map(|row| {
                    row.iter()
                        .map(|category| {
                            InlineButton::new(
                                self.t(ctx, &category.translation_key()),
                                CallbackAction::Category(*category),
                            )
                        })
                        .collect()
                })
                .collect(),
        )
    }
}

/// Whether state was cleared after a committed write; failures are logged, not raised
fn committed_dialog_cleared(user_id: i64, outcome: Result<bool>) -> bool {
    match outcome {
        Ok(_) => true,
        Err(error) => {
            warn!(user_id = user_id, error = %error, "Failed to clear dialog after commit");
            false
        }
    }
}

/// A well-formed number that is zero or negative, as opposed to garbage
fn is_non_positive_number(input: &str) -> bool {
    let normalized: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    matches!(normalized.parse::<f64>(), Ok(value) if value.is_finite() && value <= 0.0)
}
