//! Conversation engine tests
//!
//! Registration and expense-entry dialogs, cancellation, validation and
//! failure handling, driven through the engine exactly as the bot does.

mod helpers;

use helpers::*;
use route_buddy::models::ExpenseCategory;
use route_buddy::services::{BotCommand, CallbackAction, Event, EventKind, Reply};
use route_buddy::state::ConversationState;

const USER: i64 = 4242;

#[tokio::test]
async fn test_registration_flow() {
    let ctx = TestContext::new().await;

    let replies = ctx.command(USER, BotCommand::Start).await;
    assert!(has_text(&replies, &ctx.t("commands.start.welcome_new")));
    assert_eq!(ctx.state_of(USER).await, Some(ConversationState::AwaitingName));

    let replies = ctx.text(USER, "  Иван Петров ").await;
    assert!(has_text(&replies, &ctx.t("commands.start.ask_phone")));
    assert_eq!(
        ctx.state_of(USER).await,
        Some(ConversationState::AwaitingPhone { full_name: "Иван Петров".to_string() })
    );

    let replies = ctx.text(USER, "+77001234567").await;
    assert!(has_text(&replies, &ctx.t("commands.start.registered")));
    assert!(shows_menu(&replies));
    assert_eq!(ctx.state_of(USER).await, None);

    let driver = ctx.db.find_driver(USER).await.unwrap().expect("driver persisted");
    assert_eq!(driver.full_name, "Иван Петров");
    assert_eq!(driver.phone, "+77001234567");
}

#[tokio::test]
async fn test_start_when_registered_shows_menu() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;

    let replies = ctx.command(USER, BotCommand::Start).await;
    assert!(has_text(&replies, &ctx.t("commands.start.already_registered")));
    assert!(shows_menu(&replies));
    assert_eq!(ctx.state_of(USER).await, None);
}

#[tokio::test]
async fn test_duplicate_registration_ends_dialog() {
    let ctx = TestContext::new().await;

    ctx.command(USER, BotCommand::Start).await;
    ctx.text(USER, "Иван Петров").await;
    // registered from elsewhere while the dialog was suspended
    ctx.register(USER).await;

    let replies = ctx.text(USER, "+77001234567").await;
    assert!(has_text(&replies, &ctx.t("commands.start.already_registered")));
    assert_eq!(ctx.state_of(USER).await, None);
    assert_eq!(ctx.count_records("drivers").await, 1);
}

#[tokio::test]
async fn test_expense_flow_persists_expense() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;

    let replies = ctx.menu(USER, "buttons.menu.add_expense").await;
    assert!(has_text(&replies, &ctx.t("expenses.choose_category")));
    assert!(button_data(&replies).contains(&"expense:fuel".to_string()));
    assert_eq!(ctx.state_of(USER).await, Some(ConversationState::AwaitingExpenseCategory));

    let replies = ctx.press(USER, CallbackAction::Category(ExpenseCategory::Fuel)).await;
    assert!(has_text(&replies, &ctx.t("expenses.ask_amount")));
    assert_eq!(
        ctx.state_of(USER).await,
        Some(ConversationState::AwaitingAmount { category: ExpenseCategory::Fuel })
    );

    let replies = ctx.text(USER, "25 000").await;
    assert!(has_text(&replies, &ctx.t("expenses.ask_receipt")));
    assert_eq!(
        ctx.state_of(USER).await,
        Some(ConversationState::AwaitingReceipt { category: ExpenseCategory::Fuel, amount: 25000.0 })
    );

    let replies = ctx.photo(USER, "receipt-large").await;
    assert!(has_text(&replies, &ctx.t("expenses.ask_comment")));
    assert_eq!(
        ctx.state_of(USER).await,
        Some(ConversationState::AwaitingComment {
            category: ExpenseCategory::Fuel,
            amount: 25000.0,
            receipt_file_id: "receipt-large".to_string(),
        })
    );

    let replies = ctx.text(USER, "АЗС на трассе").await;
    assert!(has_text(&replies, &ctx.t("expenses.saved")));
    assert!(shows_menu(&replies));
    assert_eq!(ctx.state_of(USER).await, None);

    let expenses = ctx.db.driver_expenses(USER).await.unwrap();
    assert_eq!(expenses.len(), 1);
    let expense = &expenses[0];
    assert_eq!(expense.amount, 25000.0);
    assert_eq!(expense.category, "fuel");
    assert_eq!(expense.receipt_file_id.as_deref(), Some("receipt-large"));
    assert_eq!(expense.comment.as_deref(), Some("АЗС на трассе"));
    assert_eq!(expense.route_execution_id, None);
}

#[tokio::test]
async fn test_expense_links_to_active_route() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;
    let route = ctx.db.add_route(route_request("Маршрут 7")).await.unwrap();
    let execution = ctx.db.start_route(USER, route.id).await.unwrap();

    ctx.log_expense(USER, "4500", "receipt", "Обед").await;

    let expenses = ctx.db.driver_expenses(USER).await.unwrap();
    assert_eq!(expenses[0].route_execution_id, Some(execution.id));
    assert_eq!(expenses[0].route_name.as_deref(), Some("Маршрут 7"));
}

#[tokio::test]
async fn test_invalid_amounts_keep_state() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;
    ctx.menu(USER, "buttons.menu.add_expense").await;
    ctx.press(USER, CallbackAction::Category(ExpenseCategory::Oil)).await;
    let awaiting = Some(ConversationState::AwaitingAmount { category: ExpenseCategory::Oil });

    for input in ["0", "-10", "0,0"] {
        let replies = ctx.text(USER, input).await;
        assert!(has_text(&replies, &ctx.t("expenses.amount_not_positive")), "input {:?}", input);
        assert_eq!(ctx.state_of(USER).await, awaiting);
    }

    for input in ["пять тысяч", "NaN", "inf", "12abc", ""] {
        let replies = ctx.text(USER, input).await;
        assert!(has_text(&replies, &ctx.t("expenses.amount_invalid")), "input {:?}", input);
        assert_eq!(ctx.state_of(USER).await, awaiting);
    }

    // a photo is not an amount either
    ctx.photo(USER, "stray").await;
    assert_eq!(ctx.state_of(USER).await, awaiting);

    ctx.text(USER, "12,5").await;
    assert_eq!(
        ctx.state_of(USER).await,
        Some(ConversationState::AwaitingReceipt { category: ExpenseCategory::Oil, amount: 12.5 })
    );
}

#[tokio::test]
async fn test_receipt_step_requires_photo() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;
    ctx.menu(USER, "buttons.menu.add_expense").await;
    ctx.press(USER, CallbackAction::Category(ExpenseCategory::Parking)).await;
    ctx.text(USER, "1500").await;

    let replies = ctx.text(USER, "чек потерял").await;
    assert!(has_text(&replies, &ctx.t("expenses.receipt_required")));
    assert_eq!(
        ctx.state_of(USER).await,
        Some(ConversationState::AwaitingReceipt { category: ExpenseCategory::Parking, amount: 1500.0 })
    );

    let replies = ctx.send(USER, EventKind::Photo(Vec::new())).await;
    assert!(has_text(&replies, &ctx.t("expenses.receipt_required")));
}

#[tokio::test]
async fn test_menu_text_inside_dialog_is_input() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;
    ctx.menu(USER, "buttons.menu.add_expense").await;
    ctx.press(USER, CallbackAction::Category(ExpenseCategory::Food)).await;

    let replies = ctx.menu(USER, "buttons.menu.my_expenses").await;
    assert!(has_text(&replies, &ctx.t("expenses.amount_invalid")));
    assert_eq!(
        ctx.state_of(USER).await,
        Some(ConversationState::AwaitingAmount { category: ExpenseCategory::Food })
    );
}

/// Drive `user` into the n-th dialog step
async fn reach_step(ctx: &TestContext, user: i64, step: usize) {
    match step {
        0 => {
            ctx.command(user, BotCommand::Start).await;
        }
        1 => {
            ctx.command(user, BotCommand::Start).await;
            ctx.text(user, "Иван Петров").await;
        }
        _ => {
            ctx.register(user).await;
            ctx.menu(user, "buttons.menu.add_expense").await;
            if step >= 3 {
                ctx.press(user, CallbackAction::Category(ExpenseCategory::Repair)).await;
            }
            if step >= 4 {
                ctx.text(user, "70000").await;
            }
            if step >= 5 {
                ctx.photo(user, "receipt").await;
            }
        }
    }
}

#[tokio::test]
async fn test_cancel_from_every_step_discards_everything() {
    let cancels = [
        EventKind::Text("Отмена".to_string()),
        EventKind::Text("  CANCEL ".to_string()),
        EventKind::Text("отмена".to_string()),
        EventKind::Command(BotCommand::Cancel),
    ];

    for step in 0..=5 {
        for (i, cancel) in cancels.iter().enumerate() {
            let ctx = TestContext::new().await;
            let user = USER + (step * 10 + i) as i64;
            reach_step(&ctx, user, step).await;
            assert!(ctx.state_of(user).await.is_some(), "step {} not reached", step);
            let drivers_before = ctx.count_records("drivers").await;

            let replies = ctx.send(user, cancel.clone()).await;

            assert_eq!(ctx.state_of(user).await, None, "step {} cancel {:?}", step, cancel);
            assert!(!replies.is_empty());
            assert_eq!(ctx.count_records("expenses").await, 0);
            assert_eq!(ctx.count_records("drivers").await, drivers_before);
        }
    }
}

#[tokio::test]
async fn test_cancel_registration_says_how_to_restart() {
    let ctx = TestContext::new().await;
    reach_step(&ctx, USER, 1).await;

    let replies = ctx.text(USER, "Отмена").await;
    assert!(has_text(&replies, &ctx.t("commands.cancel.registration")));
    assert_eq!(ctx.count_records("drivers").await, 0);
}

#[tokio::test]
async fn test_cancel_while_idle_is_silent() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;

    assert!(ctx.text(USER, "Отмена").await.is_empty());
    assert!(ctx.command(USER, BotCommand::Cancel).await.is_empty());
    assert_eq!(ctx.state_of(USER).await, None);
}

#[tokio::test]
async fn test_stale_category_press_after_cancel_is_ignored() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;
    ctx.menu(USER, "buttons.menu.add_expense").await;
    ctx.text(USER, "Отмена").await;

    let replies = ctx.press(USER, CallbackAction::Category(ExpenseCategory::Fuel)).await;
    assert_eq!(replies, vec![Reply::Notice(ctx.t("commands.errors.action_expired"))]);
    assert_eq!(ctx.state_of(USER).await, None);
}

#[tokio::test]
async fn test_category_press_only_counts_once() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;
    ctx.menu(USER, "buttons.menu.add_expense").await;
    ctx.press(USER, CallbackAction::Category(ExpenseCategory::Fuel)).await;

    // second press on the old keyboard must not reset the step
    let replies = ctx.press(USER, CallbackAction::Category(ExpenseCategory::Tires)).await;
    assert_eq!(replies, vec![Reply::Notice(ctx.t("commands.errors.action_expired"))]);
    assert_eq!(
        ctx.state_of(USER).await,
        Some(ConversationState::AwaitingAmount { category: ExpenseCategory::Fuel })
    );
}

#[tokio::test]
async fn test_unregistered_user_is_sent_to_start() {
    let ctx = TestContext::new().await;

    let replies = ctx.menu(USER, "buttons.menu.add_expense").await;
    assert!(has_text(&replies, &ctx.t("commands.errors.not_registered")));
    assert_eq!(ctx.state_of(USER).await, None);

    for command in [BotCommand::Expenses, BotCommand::Routes, BotCommand::History] {
        let replies = ctx.command(USER, command).await;
        assert!(has_text(&replies, &ctx.t("commands.errors.not_registered")));
    }

    let replies = ctx.command(USER, BotCommand::Help).await;
    assert!(has_text(&replies, &ctx.t("commands.help.text")));
}

#[tokio::test]
async fn test_storage_failure_keeps_state() {
    let ctx = TestContext::new().await;
    ctx.register(USER).await;
    ctx.menu(USER, "buttons.menu.add_expense").await;
    ctx.press(USER, CallbackAction::Category(ExpenseCategory::Fuel)).await;
    ctx.text(USER, "9000").await;
    ctx.photo(USER, "receipt").await;
    let before = ctx.state_of(USER).await;
    assert!(matches!(before, Some(ConversationState::AwaitingComment { .. })));

    ctx.db.close().await;

    let replies = ctx.text(USER, "комментарий").await;
    assert!(has_text(&replies, &ctx.t("commands.errors.generic")));
    assert_eq!(ctx.state_of(USER).await, before);
}

#[tokio::test]
async fn test_replies_follow_user_language() {
    let ctx = TestContext::new().await;

    let replies = ctx
        .engine
        .handle(Event::new(USER, EventKind::Command(BotCommand::Start)).with_language(Some("en-GB".to_string())))
        .await;
    assert!(has_text(&replies, &ctx.i18n.t("commands.start.welcome_new", "en", None)));

    // English cancel button works too
    let replies = ctx
        .engine
        .handle(Event::new(USER, EventKind::Text("Cancel".to_string())).with_language(Some("en".to_string())))
        .await;
    assert!(has_text(&replies, &ctx.i18n.t("commands.cancel.registration", "en", None)));
    assert_eq!(ctx.state_of(USER).await, None);
}

#[tokio::test]
async fn test_users_are_independent() {
    let ctx = TestContext::new().await;
    let other = USER + 1;
    ctx.register(USER).await;
    ctx.register(other).await;

    ctx.menu(USER, "buttons.menu.add_expense").await;
    ctx.press(USER, CallbackAction::Category(ExpenseCategory::Fuel)).await;

    ctx.menu(other, "buttons.menu.add_expense").await;
    ctx.text(other, "Отмена").await;

    assert_eq!(
        ctx.state_of(USER).await,
        Some(ConversationState::AwaitingAmount { category: ExpenseCategory::Fuel })
    );
    assert_eq!(ctx.state_of(other).await, None);
}

#[tokio::test]
async fn test_concurrent_registrations() {
    let ctx = TestContext::new().await;

    let mut tasks = Vec::new();
    for user in 1..=8i64 {
        let engine = ctx.engine.clone();
        tasks.push(tokio::spawn(async move {
            engine.handle(Event::new(user, EventKind::Command(BotCommand::Start))).await;
            engine.handle(Event::new(user, EventKind::Text(format!("Водитель {}", user)))).await;
            engine.handle(Event::new(user, EventKind::Text(format!("+7700000000{}", user)))).await
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(ctx.count_records("drivers").await, 8);
    for user in 1..=8i64 {
        assert_eq!(ctx.state_of(user).await, None);
    }
}
