//! Stateless commands: expenses, routes, route history and test routes

use tracing::debug;

use crate::models::{ActiveRoute, CompletedRoute, Expense, Route};
use crate::utils::errors::{RouteBuddyError, Result};
use crate::utils::helpers::{format_amount, format_date, format_datetime, truncate_text};
use crate::utils::logging::{log_route_event, log_user_action};
use crate::services::events::{CallbackAction, InlineButton, Keyboard, Reply};
use super::{ConversationEngine, Ctx};

/// Telegram caps messages at 4096 characters and rejects oversized keyboards
const MAX_LISTED_EXPENSES: usize = 20;
const BUTTON_NAME_CHARS: usize = 24;

impl ConversationEngine {
    pub(super) async fn one_shot_callback(&self, ctx: &Ctx, action: CallbackAction) -> Result<Vec<Reply>> {
        debug!(user_id = ctx.user_id, action = %action, "One-shot callback");

        match action {
            // dialog-only, routed before reaching here
            CallbackAction::Category(_) => Ok(Vec::new()),
            CallbackAction::ExpenseDetail(expense_id) => self.expense_details(ctx, expense_id).await,
            CallbackAction::Receipt(expense_id) => self.show_receipt(ctx, expense_id).await,
            CallbackAction::RouteDetail(route_id) => self.route_details(ctx, route_id).await,
            CallbackAction::StartRoute(route_id) => self.start_route(ctx, route_id).await,
            CallbackAction::BackToRoutes => {
                let (text, keyboard) = self.routes_view(ctx).await?;
                Ok(vec![Reply::Edit { text, keyboard }])
            }
            CallbackAction::FinishRoute => self.finish_route(ctx).await,
            CallbackAction::HistoryDetail(execution_id) => self.history_details(ctx, execution_id).await,
            CallbackAction::BackToHistory => {
                let (text, keyboard) = self.history_view(ctx).await?;
                Ok(vec![Reply::Edit { text, keyboard }])
            }
        }
    }

    pub(super) async fn show_expenses(&self, ctx: &Ctx) -> Result<Vec<Reply>> {
        let expenses = self.db.driver_expenses(ctx.user_id).await?;
        if expenses.is_empty() {
            return Ok(vec![Reply::text_with(self.t(ctx, "expenses.none"), self.main_menu(ctx))]);
        }

        let total: f64 = expenses.iter().map(|expense| expense.amount).sum();
        let mut sections = vec![self.t(ctx, "expenses.list_header")];
        sections.extend(
            expenses
                .iter()
                .take(MAX_LISTED_EXPENSES)
                .map(|expense| self.expense_list_item(ctx, expense)),
        );
        sections.push(self.tf(ctx, "expenses.list_total", &[("total", format_amount(total))]));
        if expenses.len() > MAX_LISTED_EXPENSES {
            sections.push(self.tf(ctx, "expenses.list_truncated", &[
                ("shown", MAX_LISTED_EXPENSES.to_string()),
                ("count", expenses.len().to_string()),
            ]));
        }

        let buttons = expenses
            .iter()
            .take(MAX_LISTED_EXPENSES)
            .map(|expense| {
                vec![InlineButton::new(
                    self.tf(ctx, "expenses.button", &[
                        ("date", format_date(expense.created_at)),
                        ("category", self.category_name(ctx, expense)),
                        ("amount", format_amount(expense.amount)),
                    ]),
                    CallbackAction::ExpenseDetail(expense.id),
                )]
            })
            .collect();

        Ok(vec![Reply::text_with(sections.join("\n\n"), Keyboard::Inline(buttons))])
    }

    fn expense_list_item(&self, ctx: &Ctx, expense: &Expense) -> String {
        self.tf(ctx, "expenses.list_item", &[
            ("amount", format_amount(expense.amount)),
            ("category", self.category_name(ctx, expense)),
            ("date", format_datetime(expense.created_at)),
            ("route", expense.route_name.clone().unwrap_or_else(|| self.t(ctx, "expenses.no_route"))),
            ("comment", expense.comment.clone().unwrap_or_else(|| self.t(ctx, "expenses.no_comment"))),
        ])
    }

    /// Translated category, or the raw stored code for rows written by other tools
    fn category_name(&self, ctx: &Ctx, expense: &Expense) -> String {
        match expense.category() {
            Some(category) => self.t(ctx, &category.translation_key()),
            None => expense.category.clone(),
        }
    }

    async fn expense_details(&self, ctx: &Ctx, expense_id: i64) -> Result<Vec<Reply>> {
        let Some(expense) = self.db.expense_details(ctx.user_id, expense_id).await? else {
            return Ok(vec![Reply::Notice(self.t(ctx, "expenses.not_found"))]);
        };

        let text = self.tf(ctx, "expenses.details", &[
            ("date", format_datetime(expense.created_at)),
            ("category", self.category_name(ctx, &expense)),
            ("amount", format_amount(expense.amount)),
            ("comment", expense.comment.clone().unwrap_or_else(|| self.t(ctx, "expenses.no_comment"))),
        ]);

        let reply = if expense.receipt_file_id.is_some() {
            Reply::text_with(text, Keyboard::Inline(vec![vec![InlineButton::new(
                self.t(ctx, "buttons.show_receipt"),
                CallbackAction::Receipt(expense.id),
            )]]))
        } else {
            Reply::text(text)
        };

        Ok(vec![reply])
    }

    async fn show_receipt(&self, ctx: &Ctx, expense_id: i64) -> Result<Vec<Reply>> {
        let expense = self.db.expense_details(ctx.user_id, expense_id).await?;

        match expense.and_then(|expense| expense.receipt_file_id) {
            Some(file_id) => Ok(vec![Reply::Photo {
                file_id,
                caption: Some(self.t(ctx, "expenses.receipt_caption")),
            }]),
            None => Ok(vec![Reply::Notice(self.t(ctx, "expenses.receipt_missing"))]),
        }
    }

    pub(super) async fn show_routes(&self, ctx: &Ctx) -> Result<Vec<Reply>> {
        let (text, keyboard) = self.routes_view(ctx).await?;
        Ok(vec![Reply::Text { text, keyboard }])
    }

    /// The active route with a finish button, otherwise the available routes
    async fn routes_view(&self, ctx: &Ctx) -> Result<(String, Option<Keyboard>)> {
        if let Some(active) = self.db.active_route(ctx.user_id).await? {
            return Ok((
                self.active_route_text(ctx, &active),
                Some(Keyboard::Inline(vec![vec![InlineButton::new(
                    self.t(ctx, "buttons.finish_route"),
                    CallbackAction::FinishRoute,
                )]])),
            ));
        }

        let routes = self.db.available_routes().await?;
        if routes.is_empty() {
            return Ok((self.t(ctx, "routes.none_available"), None));
        }

        let buttons = routes
            .iter()
            .map(|route| {
                vec![InlineButton::new(
                    self.tf(ctx, "routes.button", &[
                        ("name", truncate_text(&route.name, BUTTON_NAME_CHARS)),
                        ("origin", route.origin.clone()),
                        ("destination", route.destination.clone()),
                    ]),
                    CallbackAction::RouteDetail(route.id),
                )]
            })
            .collect();

        Ok((self.t(ctx, "routes.available_header"), Some(Keyboard::Inline(buttons))))
    }

    fn active_route_text(&self, ctx: &Ctx, active: &ActiveRoute) -> String {
        self.tf(ctx, "routes.active", &[
            ("name", active.route_name.clone()),
            ("origin", active.origin.clone()),
            ("destination", active.destination.clone()),
            ("start", self.optional_datetime(ctx, active.start_time)),
        ])
    }

    async fn route_details(&self, ctx: &Ctx, route_id: i64) -> Result<Vec<Reply>> {
        let Some(route) = self.db.route_details(route_id).await? else {
            return Ok(vec![Reply::Notice(self.t(ctx, "routes.not_found"))]);
        };

        Ok(vec![Reply::Edit {
            text: self.route_text(ctx, "routes.details", &route),
            keyboard: Some(Keyboard::Inline(vec![
                vec![InlineButton::new(self.t(ctx, "buttons.start_route"), CallbackAction::StartRoute(route.id))],
                vec![InlineButton::new(self.t(ctx, "buttons.back_to_routes"), CallbackAction::BackToRoutes)],
            ])),
        }])
    }

    fn route_text(&self, ctx: &Ctx, key: &str, route: &Route) -> String {
        self.tf(ctx, key, &[
            ("name", route.name.clone()),
            ("origin", route.origin.clone()),
            ("destination", route.destination.clone()),
            ("distance", route.distance_km.to_string()),
            ("price", format_amount(route.price)),
            ("cargo", route.cargo_type.clone().unwrap_or_else(|| self.t(ctx, "routes.no_cargo"))),
        ])
    }

    async fn start_route(&self, ctx: &Ctx, route_id: i64) -> Result<Vec<Reply>> {
        match self.db.start_route(ctx.user_id, route_id).await {
            Ok(execution) => {
                log_route_event(ctx.user_id, route_id, "started");
                let started = match self.db.route_details(execution.route_id).await? {
                    Some(route) => self.tf(ctx, "routes.started", &[
                        ("name", route.name),
                        ("origin", route.origin),
                        ("destination", route.destination),
                    ]),
                    None => self.t(ctx, "routes.started_notice"),
                };
                Ok(vec![
                    Reply::Notice(self.t(ctx, "routes.started_notice")),
                    Reply::Edit { text: started, keyboard: None },
                ])
            }
            Err(RouteBuddyError::Conflict(reason)) => {
                debug!(user_id = ctx.user_id, route_id = route_id, reason = %reason, "Start refused");
                Ok(vec![Reply::Notice(self.t(ctx, "routes.already_active"))])
            }
            Err(RouteBuddyError::NotFound(_)) => Ok(vec![Reply::Notice(self.t(ctx, "routes.not_found"))]),
            Err(error) => Err(error),
        }
    }

    async fn finish_route(&self, ctx: &Ctx) -> Result<Vec<Reply>> {
        let Some(active) = self.db.active_route(ctx.user_id).await? else {
            return Ok(vec![Reply::Notice(self.t(ctx, "routes.no_active"))]);
        };

        match self.db.finish_route(ctx.user_id, active.route_id).await {
            Ok(_) => {
                log_route_event(ctx.user_id, active.route_id, "finished");
                Ok(vec![
                    Reply::Notice(self.t(ctx, "routes.finished_notice")),
                    Reply::Edit { text: self.t(ctx, "routes.finished"), keyboard: None },
                    Reply::text_with(self.t(ctx, "routes.after_finish"), self.main_menu(ctx)),
                ])
            }
            Err(RouteBuddyError::NotFound(_)) => Ok(vec![Reply::Notice(self.t(ctx, "routes.no_active"))]),
            Err(error) => Err(error),
        }
    }

    pub(super) async fn show_history(&self, ctx: &Ctx) -> Result<Vec<Reply>> {
        let (text, keyboard) = self.history_view(ctx).await?;
        Ok(vec![Reply::Text { text, keyboard }])
    }

    async fn history_view(&self, ctx: &Ctx) -> Result<(String, Option<Keyboard>)> {
        let completed = self.db.completed_routes(ctx.user_id).await?;
        if completed.is_empty() {
            return Ok((self.t(ctx, "routes.history_none"), None));
        }

        let buttons = completed
            .iter()
            .map(|route| {
                vec![InlineButton::new(
                    self.tf(ctx, "routes.history_button", &[
                        ("name", truncate_text(&route.route_name, BUTTON_NAME_CHARS)),
                        ("start", self.optional_date(ctx, route.start_time)),
                        ("end", self.optional_date(ctx, route.end_time)),
                    ]),
                    CallbackAction::HistoryDetail(route.execution_id),
                )]
            })
            .collect();

        Ok((self.t(ctx, "routes.history_header"), Some(Keyboard::Inline(buttons))))
    }

    async fn history_details(&self, ctx: &Ctx, execution_id: i64) -> Result<Vec<Reply>> {
        let completed = self.db.completed_routes(ctx.user_id).await?;
        let Some(route) = completed.into_iter().find(|route| route.execution_id == execution_id) else {
            return Ok(vec![Reply::Notice(self.t(ctx, "routes.not_found"))]);
        };

        Ok(vec![Reply::Edit {
            text: self.completed_route_text(ctx, &route),
            keyboard: Some(Keyboard::Inline(vec![vec![InlineButton::new(
                self.t(ctx, "buttons.back_to_history"),
                CallbackAction::BackToHistory,
            )]])),
        }])
    }

    fn completed_route_text(&self, ctx: &Ctx, route: &CompletedRoute) -> String {
        self.tf(ctx, "routes.history_details", &[
            ("name", route.route_name.clone()),
            ("origin", route.origin.clone()),
            ("destination", route.destination.clone()),
            ("distance", route.distance_km.to_string()),
            ("price", format_amount(route.price)),
            ("cargo", route.cargo_type.clone().unwrap_or_else(|| self.t(ctx, "routes.no_cargo"))),
        ])
    }

    pub(super) async fn add_test_route(&self, ctx: &Ctx) -> Result<Vec<Reply>> {
        let route = self
            .db
            .add_test_route(
                &self.t(ctx, "routes.test_name"),
                &self.t(ctx, "routes.test_origin"),
                &self.t(ctx, "routes.test_destination"),
                &self.t(ctx, "routes.test_cargo"),
            )
            .await?;

        log_user_action(ctx.user_id, "add_test_route", Some(&route.name));

        Ok(vec![Reply::text_with(
            self.route_text(ctx, "routes.test_added", &route),
            self.main_menu(ctx),
        )])
    }

    fn optional_datetime(&self, ctx: &Ctx, timestamp: Option<chrono::DateTime<chrono::Utc>>) -> String {
        timestamp
            .map(format_datetime)
            .unwrap_or_else(|| self.t(ctx, "routes.unknown_date"))
    }

    fn optional_date(&self, ctx: &Ctx, timestamp: Option<chrono::DateTime<chrono::Utc>>) -> String {
        timestamp
            .map(format_date)
            .unwrap_or_else(|| self.t(ctx, "routes.unknown_date"))
    }
}
