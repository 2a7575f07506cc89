use std::collections::HashMap;

use fluent_templates::{
    fluent_bundle::FluentValue,
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use unic_langid::LanguageIdentifier;

use crate::config;
use crate::core::error::AppError;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "ar",
    };
}

/// Languages the bot speaks.
///
/// Arabic is the primary language (falls back to it for missing keys),
/// English the secondary. A user's choice survives session clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Ar,
    En,
}

static AR: Lazy<LanguageIdentifier> = Lazy::new(|| "ar".parse().unwrap_or_default());
static EN: Lazy<LanguageIdentifier> = Lazy::new(|| "en".parse().unwrap_or_default());

impl Lang {
    /// Short language code ("ar" / "en").
    pub fn code(self) -> &'static str {
        match self {
            Lang::Ar => "ar",
            Lang::En => "en",
        }
    }

    /// Human-readable name of the language.
    pub fn name(self) -> &'static str {
        match self {
            Lang::Ar => "العربية",
            Lang::En => "English",
        }
    }

    /// Parses a language code, tolerating regional variants ("en-US" -> En).
    pub fn from_code(code: &str) -> Option<Lang> {
        let base = code.split('-').next().unwrap_or(code).to_lowercase();
        match base.as_str() {
            "ar" => Some(Lang::Ar),
            "en" => Some(Lang::En),
            _ => None,
        }
    }

    fn lang_id(self) -> &'static LanguageIdentifier {
        match self {
            Lang::Ar => &AR,
            Lang::En => &EN,
        }
    }
}

/// Language used for users who never picked one (DEFAULT_LANGUAGE env var).
pub fn default_lang() -> Lang {
    Lang::from_code(&config::DEFAULT_LANGUAGE).unwrap_or(Lang::Ar)
}

/// Returns a localized string for the given key.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(lang: Lang, key: &str) -> String {
    let text = LOCALES
        .lookup(lang.lang_id(), key)
        .unwrap_or_else(|| LOCALES.lookup(&AR, key).unwrap_or_else(|| key.to_string()));
    text.replace("\\n", "\n")
}

/// Returns a localized string with arguments for interpolation.
pub fn t_args(lang: Lang, key: &str, args: &[(&str, FluentValue<'static>)]) -> String {
    let args_map: HashMap<String, FluentValue> =
        args.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect();

    let text = LOCALES.lookup_with_args(lang.lang_id(), key, &args_map).unwrap_or_else(|| {
        LOCALES
            .lookup_with_args(&AR, key, &args_map)
            .unwrap_or_else(|| key.to_string())
    });
    text.replace("\\n", "\n")
}

/// Renders the one user-facing message an error maps to.
///
/// Internal detail stays in the logs; the user only ever sees the
/// localized text for the error's taxonomy entry.
pub fn error_message(lang: Lang, err: &AppError) -> String {
    match err {
        AppError::RateLimited { wait_secs } => {
            t_args(lang, "err-rate-limited", &[("seconds", FluentValue::from(*wait_secs))])
        }
        AppError::TooLarge { limit_mb } => {
            t_args(lang, "err-too-large", &[("max", FluentValue::from(*limit_mb))])
        }
        other => t(lang, other.message_key()),
    }
}
