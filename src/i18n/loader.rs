//! Translation loader and i18n management
//!
//! Translations are nested JSON objects addressed with dotted keys such as
//! `expenses.ask_amount`. Files are read from the configured directory at
//! startup; the copies compiled into the binary are used for any language
//! whose file is missing.

use std::collections::HashMap;
use std::path::Path;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, info, warn};
use crate::config::I18nConfig;
use crate::utils::errors::{RouteBuddyError, Result};

const EMBEDDED: &[(&str, &str)] = &[
    ("ru", include_str!("../../translations/ru.json")),
    ("en", include_str!("../../translations/en.json")),
];

/// Main internationalization manager
#[derive(Debug, Clone)]
pub struct I18n {
    translations: HashMap<String, Map<String, Value>>,
    default_language: String,
    supported_languages: Vec<String>,
    translations_dir: String,
}

/// Translation parameters for message formatting
pub type TranslationParams = HashMap<String, String>;

impl I18n {
    /// Create an empty I18n instance; call [`I18n::load_translations`] before use
    pub fn new(config: &I18nConfig) -> Self {
        Self {
            translations: HashMap::new(),
            default_language: config.default_language.clone(),
            supported_languages: config.supported_languages.clone(),
            translations_dir: config.translations_dir.clone(),
        }
    }

    /// Create an instance backed only by the translations compiled into the binary
    pub fn embedded(config: &I18nConfig) -> Result<Self> {
        let mut i18n = Self::new(config);
        for lang_code in config.supported_languages.clone() {
            i18n.load_embedded(&lang_code)?;
        }
        i18n.ensure_default_loaded()?;
        Ok(i18n)
    }

    /// Load all translation files from the translations directory
    pub async fn load_translations(&mut self) -> Result<()> {
        let translations_dir = Path::new(&self.translations_dir).to_path_buf();

        for lang_code in self.supported_languages.clone() {
            let file_path = translations_dir.join(format!("{}.json", lang_code));

            if fs::try_exists(&file_path).await.unwrap_or(false) {
                let content = fs::read_to_string(&file_path).await?;
                self.insert_language(&lang_code, &content)?;
                info!("Loaded translations for language: {} from {}", lang_code, file_path.display());
            } else {
                warn!("Translation file not found: {}, using built-in copy", file_path.display());
                self.load_embedded(&lang_code)?;
            }
        }

        self.ensure_default_loaded()
    }

    fn load_embedded(&mut self, lang_code: &str) -> Result<()> {
        match EMBEDDED.iter().find(|(code, _)| *code == lang_code) {
            Some((_, content)) => self.insert_language(lang_code, content),
            None => {
                warn!("No built-in translations for language: {}", lang_code);
                Ok(())
            }
        }
    }

    fn insert_language(&mut self, lang_code: &str, content: &str) -> Result<()> {
        match serde_json::from_str::<Value>(content)? {
            Value::Object(map) => {
                debug!("Loaded {} top-level translation sections for {}", map.len(), lang_code);
                self.translations.insert(lang_code.to_string(), map);
                Ok(())
            }
            _ => Err(RouteBuddyError::Config(
                format!("Invalid translation file format for {}", lang_code)
            )),
        }
    }

    fn ensure_default_loaded(&self) -> Result<()> {
        if self.translations.contains_key(&self.default_language) {
            Ok(())
        } else {
            Err(RouteBuddyError::Config(
                format!("No translations available for default language: {}", self.default_language)
            ))
        }
    }

    /// Get a translated message, falling back to the default language and then to the key itself
    pub fn t(&self, key: &str, lang: &str, params: Option<&TranslationParams>) -> String {
        let effective_lang = self.get_effective_language(lang);

        let template = self
            .get_translation_value(key, effective_lang)
            .or_else(|| self.get_translation_value(key, &self.default_language));

        match template {
            Some(text) => self.format_message(text, params),
            None => {
                warn!("Translation key '{}' not found in any language", key);
                key.to_string()
            }
        }
    }

    /// Shorthand for [`I18n::t`] with inline parameters
    pub fn tf(&self, key: &str, lang: &str, params: &[(&str, String)]) -> String {
        let params: TranslationParams = params
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        self.t(key, lang, Some(&params))
    }

    /// Whether `text` equals the translation of `key` in any loaded language
    pub fn matches_any(&self, key: &str, text: &str) -> bool {
        let text = text.trim();
        self.translations
            .keys()
            .filter_map(|lang| self.get_translation_value(key, lang))
            .any(|translation| translation == text)
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, lang: &str) -> bool {
        self.supported_languages.iter().any(|supported| supported == lang)
    }

    fn get_effective_language<'a>(&'a self, lang: &'a str) -> &'a str {
        if self.is_language_supported(lang) && self.translations.contains_key(lang) {
            lang
        } else {
            &self.default_language
        }
    }

    /// Walk the nested JSON structure for keys like "routes.details"
    fn get_translation_value(&self, key: &str, lang: &str) -> Option<&str> {
        let mut current = self.translations.get(lang)?;
        let mut parts = key.split('.').peekable();

        while let Some(part) = parts.next() {
            let value = current.get(part)?;
            if parts.peek().is_none() {
                return value.as_str();
            }
            current = value.as_object()?;
        }

        None
    }

    /// Substitute `{name}` placeholders in one left-to-right pass.
    ///
    /// Substituted values are never rescanned, so user text containing
    /// braces comes out as entered. Unknown placeholders stay literal.
    fn format_message(&self, template: &str, params: Option<&TranslationParams>) -> String {
        let Some(params) = params else {
            return template.to_string();
        };

        let mut result = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            result.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => match params.get(&after[..close]) {
                    Some(value) => {
                        result.push_str(value);
                        rest = &after[close + 1..];
                    }
                    None => {
                        result.push('{');
                        rest = after;
                    }
                },
                None => {
                    result.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Get supported languages
    pub fn supported_languages(&self) -> &[String] {
        &self.supported_languages
    }

    /// Get default language
    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Detect user language from Telegram language code
    pub fn detect_user_language(&self, telegram_lang: Option<&str>) -> String {
        if let Some(lang) = telegram_lang {
            // "en-US" -> "en"
            let lang_code = lang.split('-').next().unwrap_or(lang);

            if self.is_language_supported(lang_code) {
                return lang_code.to_string();
            }
        }

        self.default_language.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> I18nConfig {
        I18nConfig {
            default_language: "ru".to_string(),
            supported_languages: vec!["ru".to_string(), "en".to_string()],
            translations_dir: "translations".to_string(),
        }
    }

    #[test]
    fn test_substituted_values_are_not_expanded_again() {
        let i18n = I18n::embedded(&create_test_config()).unwrap();
        let params = [
            ("date", "05.03.2024 14:07".to_string()),
            ("category", "Бензин".to_string()),
            ("amount", "25 000".to_string()),
            ("comment", "paid {amount} cash {category}".to_string()),
        ];

        for _ in 0..50 {
            let text = i18n.tf("expenses.details", "en", &params);
            assert!(text.contains("paid {amount} cash {category}"), "{}", text);
            assert!(text.contains("25 000"));
        }
    }

    #[test]
    fn test_format_keeps_unknown_and_unbalanced_braces() {
        let i18n = I18n::new(&create_test_config());
        let params: TranslationParams = [("name".to_string(), "Иван".to_string())].into_iter().collect();

        assert_eq!(i18n.format_message("{name} {other} {", Some(&params)), "Иван {other} {");
        assert_eq!(i18n.format_message("{{name}}", Some(&params)), "{Иван}");
        assert_eq!(i18n.format_message("plain {name}", None), "plain {name}");
    }

    #[test]
    fn test_language_detection() {
        let i18n = I18n::new(&create_test_config());

        assert_eq!(i18n.detect_user_language(Some("en-US")), "en");
        assert_eq!(i18n.detect_user_language(Some("ru")), "ru");
        assert_eq!(i18n.detect_user_language(Some("fr")), "ru");
        assert_eq!(i18n.detect_user_language(None), "ru");
    }

    #[test]
    fn test_message_formatting() {
        let i18n = I18n::new(&create_test_config());

        let mut params = HashMap::new();
        params.insert("name".to_string(), "Иван".to_string());
        params.insert("count".to_string(), "5".to_string());

        let result = i18n.format_message("{name}: {count} рейсов", Some(&params));
        assert_eq!(result, "Иван: 5 рейсов");
    }

    #[test]
    fn test_embedded_translations_resolve_nested_keys() {
        let i18n = I18n::embedded(&create_test_config()).unwrap();

        assert_eq!(i18n.t("expenses.categories.fuel", "ru", None), "Бензин");
        assert_eq!(i18n.t("expenses.categories.fuel", "en", None), "Fuel");
        // unsupported language falls back to the default
        assert_eq!(i18n.t("expenses.categories.fuel", "de", None), "Бензин");
        assert_eq!(i18n.t("no.such.key", "en", None), "no.such.key");
    }

    #[test]
    fn test_matches_any_language() {
        let i18n = I18n::embedded(&create_test_config()).unwrap();

        assert!(i18n.matches_any("buttons.menu.cancel", "Отмена"));
        assert!(i18n.matches_any("buttons.menu.cancel", "Cancel"));
        assert!(!i18n.matches_any("buttons.menu.cancel", "Отменить"));
    }

    #[test]
    fn test_locales_share_keys() {
        fn keys(prefix: &str, map: &Map<String, Value>, out: &mut Vec<String>) {
            for (key, value) in map {
                let full = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
                match value {
                    Value::Object(nested) => keys(&full, nested, out),
                    _ => out.push(full),
                }
            }
        }

        let i18n = I18n::embedded(&create_test_config()).unwrap();
        let mut ru = Vec::new();
        let mut en = Vec::new();
        keys("", &i18n.translations["ru"], &mut ru);
        keys("", &i18n.translations["en"], &mut en);
        ru.sort();
        en.sort();
        assert_eq!(ru, en);
    }

    #[tokio::test]
    async fn test_missing_directory_uses_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.translations_dir = dir.path().join("absent").display().to_string();

        let mut i18n = I18n::new(&config);
        i18n.load_translations().await.unwrap();
        assert_eq!(i18n.t("buttons.menu.cancel", "en", None), "Cancel");
    }

    #[tokio::test]
    async fn test_directory_overrides_embedded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ru.json"),
            r#"{"buttons": {"menu": {"cancel": "Стоп"}}}"#,
        ).unwrap();
        let mut config = create_test_config();
        config.translations_dir = dir.path().display().to_string();

        let mut i18n = I18n::new(&config);
        i18n.load_translations().await.unwrap();
        assert_eq!(i18n.t("buttons.menu.cancel", "ru", None), "Стоп");
    }
}
