//! # Localization Module
//!
//! Fluent-based message catalog. Resources are compiled into the binary and
//! the language is chosen per message from the Telegram user's language code.

use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

pub const DEFAULT_LANGUAGE: &str = "en";

const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("fr", include_str!("../locales/fr/main.ftl")),
];

/// Localization manager for the bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a manager with every embedded language loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for (language, source) in RESOURCES {
            bundles.insert(language.to_string(), Self::create_bundle(language, source)?);
        }
        Ok(Self { bundles })
    }

    fn create_bundle(language: &str, source: &str) -> Result<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = language.parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Unicode isolation marks would end up in chat messages
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow::anyhow!("Invalid {language} resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("Duplicate {language} messages: {errors:?}"))?;
        Ok(bundle)
    }

    /// Supported language for a Telegram language code (`"fr-CA"` → `"fr"`)
    pub fn resolve_language<'a>(&self, language_code: Option<&'a str>) -> &'a str {
        language_code
            .and_then(|code| code.parse::<LanguageIdentifier>().ok())
            .and_then(|id| {
                RESOURCES
                    .iter()
                    .map(|(language, _)| *language)
                    .find(|language| *language == id.language.as_str())
            })
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Get a localized message in the given language, falling back to English
    pub fn get_message_in_language(
        &self,
        key: &str,
        language_code: Option<&str>,
        args: Option<&HashMap<&str, String>>,
    ) -> String {
        let language = self.resolve_language(language_code);
        let Some(bundle) = self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        else {
            return format!("Missing translation: {key}");
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            return format!("Missing translation: {key}");
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(value.clone()));
            }
            fluent_args
        });

        let mut errors = Vec::new();
        bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors)
            .into_owned()
    }
}

static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> = LazyLock::new(|| {
    LocalizationManager::new().unwrap_or_else(|e| {
        log::error!("Failed to load embedded translations: {e}");
        LocalizationManager {
            bundles: HashMap::new(),
        }
    })
});

/// Get a localized message
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    LOCALIZATION_MANAGER.get_message_in_language(key, language_code, None)
}

/// Get a localized message with arguments
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let args: HashMap<&str, String> = args.iter().map(|(k, v)| (*k, v.to_string())).collect();
    LOCALIZATION_MANAGER.get_message_in_language(key, language_code, Some(&args))
}
