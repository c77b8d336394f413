//! Test context for unified test setup
//!
//! Every context owns a private in-memory SQLite database, an in-memory
//! conversation store and an engine using the built-in translations.

use std::sync::Arc;
use route_buddy::config::Settings;
use route_buddy::database::{create_pool, run_migrations, DatabaseConfig, DatabasePool, DatabaseService};
use route_buddy::i18n::I18n;
use route_buddy::models::Driver;
use route_buddy::services::{BotCommand, CallbackAction, ConversationEngine, Event, EventKind, PhotoVariant, Reply};
use route_buddy::state::{ConversationState, StateStorage};

use super::test_data::{fake_driver_name, fake_phone};

/// Telegram id configured as admin in every test context
pub const ADMIN_ID: i64 = 900_000;

pub struct TestContext {
    pub pool: DatabasePool,
    pub db: DatabaseService,
    pub state: StateStorage,
    pub engine: ConversationEngine,
    pub i18n: Arc<I18n>,
}

impl TestContext {
    pub async fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let pool = create_pool(&DatabaseConfig::in_memory())
            .await
            .expect("Failed to create in-memory pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let db = DatabaseService::new(pool.clone());
        let state = StateStorage::in_memory();
        let i18n = Arc::new(I18n::embedded(&Settings::default().i18n).expect("Failed to load translations"));
        let engine = ConversationEngine::new(db.clone(), state.clone(), i18n.clone(), vec![ADMIN_ID]);

        Self { pool, db, state, engine, i18n }
    }

    /// Default-language (Russian) translation
    pub fn t(&self, key: &str) -> String {
        self.i18n.t(key, "ru", None)
    }

    pub async fn send(&self, user_id: i64, kind: EventKind) -> Vec<Reply> {
        self.engine.handle(Event::new(user_id, kind)).await
    }

    pub async fn text(&self, user_id: i64, text: &str) -> Vec<Reply> {
        self.send(user_id, EventKind::Text(text.to_string())).await
    }

    /// Press a main menu button by its translation key
    pub async fn menu(&self, user_id: i64, key: &str) -> Vec<Reply> {
        self.text(user_id, &self.t(key)).await
    }

    pub async fn command(&self, user_id: i64, command: BotCommand) -> Vec<Reply> {
        self.send(user_id, EventKind::Command(command)).await
    }

    pub async fn press(&self, user_id: i64, action: CallbackAction) -> Vec<Reply> {
        self.send(user_id, EventKind::Callback(action.to_string())).await
    }

    /// Send a photo whose largest variant has `file_id`
    pub async fn photo(&self, user_id: i64, file_id: &str) -> Vec<Reply> {
        let variants = vec![
            PhotoVariant { file_id: format!("{}-thumb", file_id), width: 90, height: 67 },
            PhotoVariant { file_id: file_id.to_string(), width: 1280, height: 960 },
            PhotoVariant { file_id: format!("{}-medium", file_id), width: 320, height: 240 },
        ];
        self.send(user_id, EventKind::Photo(variants)).await
    }

    pub async fn state_of(&self, user_id: i64) -> Option<ConversationState> {
        self.state
            .load_context(user_id)
            .await
            .expect("Failed to load context")
            .map(|context| context.state)
    }

    /// Register a driver directly through the gateway
    pub async fn register(&self, user_id: i64) -> Driver {
        self.db
            .add_driver(user_id, &fake_driver_name(), &fake_phone())
            .await
            .expect("Failed to register driver")
    }

    /// Walk a registered driver through the whole expense dialog
    pub async fn log_expense(&self, user_id: i64, amount: &str, receipt: &str, comment: &str) -> Vec<Reply> {
        self.menu(user_id, "buttons.menu.add_expense").await;
        self.press(user_id, CallbackAction::Category(route_buddy::models::ExpenseCategory::Fuel)).await;
        self.text(user_id, amount).await;
        self.photo(user_id, receipt).await;
        self.text(user_id, comment).await
    }

    pub async fn count_records(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count records");
        count
    }
}
