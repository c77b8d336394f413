//! Operator commands: route creation and fleet statistics

use crate::models::{CreateRouteRequest, ExecutionFilter, FleetExecution};
use crate::utils::errors::{RouteBuddyError, Result};
use crate::utils::helpers::{format_amount, format_datetime, parse_amount};
use crate::utils::logging::log_admin_action;
use crate::services::events::Reply;
use super::{ConversationEngine, Ctx};

const TOP_ROUTES: i64 = 5;
const MAX_LISTED_EXECUTIONS: i64 = 20;

/// Parsed `/addroute` arguments
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RouteArgs {
    pub origin: String,
    pub destination: String,
    pub distance_km: i64,
    pub price: f64,
    pub cargo_type: String,
    pub assign_to: Option<i64>,
}

impl RouteArgs {
    /// `origin;destination;distance;price;cargo[;driver_telegram_id]`
    pub fn parse(args: &str) -> Option<Self> {
        let fields: Vec<&str> = args.split(';').map(str::trim).collect();
        if !(5..=6).contains(&fields.len()) || fields[..5].iter().any(|field| field.is_empty()) {
            return None;
        }

        let distance_km = fields[2].parse::<i64>().ok().filter(|km| *km > 0)?;
        let price = parse_amount(fields[3])?;
        let assign_to = match fields.get(5) {
            Some(id) if !id.is_empty() => Some(id.parse::<i64>().ok()?),
            _ => None,
        };

        Some(Self {
            origin: fields[0].to_string(),
            destination: fields[1].to_string(),
            distance_km,
            price,
            cargo_type: fields[4].to_string(),
            assign_to,
        })
    }
}

/// `/executions` filter: `driver=<telegram_id>; status=<status>; cargo=<cargo type>`,
/// every part optional
pub(crate) fn parse_execution_filter(args: &str) -> Option<ExecutionFilter> {
    let mut filter = ExecutionFilter::default();

    for part in args.split(';').map(str::trim).filter(|part| !part.is_empty()) {
        let (key, value) = part.split_once('=')?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match key.trim() {
            "driver" => filter.driver_id = Some(value.parse().ok()?),
            "status" => filter.status = Some(value.parse().ok()?),
            "cargo" => filter.cargo_type = Some(value.to_string()),
            _ => return None,
        }
    }

    Some(filter)
}

impl ConversationEngine {
    fn require_admin(&self, ctx: &Ctx, action: &str) -> Result<()> {
        if self.admin_ids.contains(&ctx.user_id) {
            Ok(())
        } else {
            Err(RouteBuddyError::PermissionDenied(action.to_string()))
        }
    }

    pub(super) async fn add_route(&self, ctx: &Ctx, args: &str) -> Result<Vec<Reply>> {
        self.require_admin(ctx, "addroute")?;

        let Some(args) = RouteArgs::parse(args) else {
            return Ok(vec![Reply::text(self.t(ctx, "admin.route_usage"))]);
        };

        if let Some(driver_id) = args.assign_to {
            if !self.db.driver_exists(driver_id).await? {
                return Ok(vec![Reply::text(self.tf(ctx, "admin.driver_not_found", &[("id", driver_id.to_string())]))]);
            }
        }

        let name = self.tf(ctx, "admin.route_name", &[
            ("origin", args.origin.clone()),
            ("destination", args.destination.clone()),
        ]);
        let route = self
            .db
            .add_route(CreateRouteRequest {
                name,
                origin: args.origin,
                destination: args.destination,
                distance_km: args.distance_km,
                price: args.price,
                cargo_type: Some(args.cargo_type),
                assign_to: args.assign_to,
            })
            .await?;

        log_admin_action(ctx.user_id, "add_route", Some(&format!("route_id={} assign_to={:?}", route.id, args.assign_to)));

        Ok(vec![Reply::text(self.tf(ctx, "admin.route_added", &[
            ("name", route.name),
            ("id", route.id.to_string()),
        ]))])
    }

    /// Assigned and in-progress trips across the fleet
    pub(super) async fn active_executions(&self, ctx: &Ctx) -> Result<Vec<Reply>> {
        self.require_admin(ctx, "active")?;

        let rows = self.db.active_executions().await?;
        log_admin_action(ctx.user_id, "active", Some(&format!("rows={}", rows.len())));
        Ok(vec![Reply::text(self.execution_list(ctx, "admin.active_header", "admin.active_none", &rows))])
    }

    pub(super) async fn filtered_executions(&self, ctx: &Ctx, args: &str) -> Result<Vec<Reply>> {
        self.require_admin(ctx, "executions")?;

        let Some(filter) = parse_execution_filter(args) else {
            return Ok(vec![Reply::text(self.t(ctx, "admin.executions_usage"))]);
        };

        let rows = self.db.filtered_executions(&filter, MAX_LISTED_EXECUTIONS).await?;
        log_admin_action(ctx.user_id, "executions", Some(&format!("filter={:?} rows={}", filter, rows.len())));
        Ok(vec![Reply::text(self.execution_list(ctx, "admin.executions_header", "admin.executions_none", &rows))])
    }

    fn execution_list(&self, ctx: &Ctx, header_key: &str, empty_key: &str, rows: &[FleetExecution]) -> String {
        if rows.is_empty() {
            return self.t(ctx, empty_key);
        }

        let mut lines = vec![self.t(ctx, header_key)];
        lines.extend(rows.iter().map(|row| {
            let timestamp = |value: Option<chrono::DateTime<chrono::Utc>>| {
                value.map(format_datetime).unwrap_or_else(|| self.t(ctx, "routes.unknown_date"))
            };
            self.tf(ctx, "admin.execution_line", &[
                ("name", row.route_name.clone()),
                ("origin", row.origin.clone()),
                ("destination", row.destination.clone()),
                ("driver", row.driver_name.clone()),
                ("status", self.t(ctx, &format!("admin.status.{}", row.status.as_str()))),
                ("cargo", row.cargo_type.clone().unwrap_or_else(|| self.t(ctx, "routes.no_cargo"))),
                ("start", timestamp(row.start_time)),
                ("end", timestamp(row.end_time)),
            ])
        }));
        lines.join("\n")
    }

    pub(super) async fn stats(&self, ctx: &Ctx) -> Result<Vec<Reply>> {
        self.require_admin(ctx, "stats")?;

        let summary = self.db.fleet_summary().await?;
        let categories = self.db.expense_totals_by_category(None).await?;
        let drivers = self.db.driver_performance().await?;
        let routes = self.db.route_profitability(TOP_ROUTES).await?;

        let mut sections = vec![self.tf(ctx, "admin.stats_summary", &[
            ("drivers", summary.drivers.to_string()),
            ("active", summary.active_executions.to_string()),
            ("completed", summary.completed_executions.to_string()),
            ("revenue", format_amount(summary.completed_revenue)),
            ("expenses", format_amount(summary.total_expenses)),
        ])];

        if !categories.is_empty() {
            let mut lines = vec![self.t(ctx, "admin.stats_categories")];
            lines.extend(categories.iter().map(|total| {
                let category = match total.category.parse::<crate::models::ExpenseCategory>() {
                    Ok(category) => self.t(ctx, &category.translation_key()),
                    Err(_) => total.category.clone(),
                };
                self.tf(ctx, "admin.stats_category_line", &[
                    ("category", category),
                    ("total", format_amount(total.total)),
                    ("count", total.count.to_string()),
                ])
            }));
            sections.push(lines.join("\n"));
        }

        if !drivers.is_empty() {
            let mut lines = vec![self.t(ctx, "admin.stats_drivers")];
            lines.extend(drivers.iter().map(|driver| {
                self.tf(ctx, "admin.stats_driver_line", &[
                    ("name", driver.full_name.clone()),
                    ("routes", driver.completed_routes.to_string()),
                    ("distance", driver.total_distance_km.to_string()),
                    ("revenue", format_amount(driver.revenue)),
                    ("hours", driver.avg_duration_hours.map_or_else(|| "-".to_string(), |h| format!("{:.1}", h))),
                ])
            }));
            sections.push(lines.join("\n"));
        }

        if !routes.is_empty() {
            let mut lines = vec![self.t(ctx, "admin.stats_routes")];
            lines.extend(routes.iter().map(|route| {
                self.tf(ctx, "admin.stats_route_line", &[
                    ("name", route.route_name.clone()),
                    ("profit", format_amount(route.profit)),
                ])
            }));
            sections.push(lines.join("\n"));
        }

        log_admin_action(ctx.user_id, "stats", None);
        Ok(vec![Reply::text(sections.join("\n\n"))])
    }
}
