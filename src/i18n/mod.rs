//! Internationalization module
//!
//! Russian and English texts for every prompt, button and report the bot
//! sends, with dotted-key lookup and `{param}` substitution.

pub mod loader;

pub use loader::{I18n, TranslationParams};
