//! Response locales.
//!
//! Every stage threads a locale through its prompt so the model answers in
//! the user's language. The locale also owns the one user-facing string the
//! pipeline itself produces: the generic failure message.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The languages the pipeline can answer in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
    Ja,
    Zh,
    Ru,
    Fr,
    Ar,
    He,
    Fa,
}

/// Error returned when parsing an unrecognized locale code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized locale code: {0}")]
pub struct UnknownLocale(pub String);

impl Locale {
    /// All supported locales, in display order.
    pub fn all() -> [Locale; 9] {
        [
            Locale::En,
            Locale::Ko,
            Locale::Ja,
            Locale::Zh,
            Locale::Ru,
            Locale::Fr,
            Locale::Ar,
            Locale::He,
            Locale::Fa,
        ]
    }

    /// ISO 639-1 code, e.g. "ko".
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ko => "ko",
            Locale::Ja => "ja",
            Locale::Zh => "zh",
            Locale::Ru => "ru",
            Locale::Fr => "fr",
            Locale::Ar => "ar",
            Locale::He => "he",
            Locale::Fa => "fa",
        }
    }

    /// English language name, as written into prompts.
    pub fn language_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Ko => "Korean",
            Locale::Ja => "Japanese",
            Locale::Zh => "Chinese",
            Locale::Ru => "Russian",
            Locale::Fr => "French",
            Locale::Ar => "Arabic",
            Locale::He => "Hebrew",
            Locale::Fa => "Persian",
        }
    }

    /// The generic failure message shown to users in this language.
    pub fn error_message(&self) -> &'static str {
        match self {
            Locale::En => "Something went wrong while creating your story. Please try again.",
            Locale::Ko => "이야기를 만드는 중 문제가 발생했습니다. 다시 시도해 주세요.",
            Locale::Ja => "ストーリーの作成中に問題が発生しました。もう一度お試しください。",
            Locale::Zh => "生成故事时出现问题，请重试。",
            Locale::Ru => "Не удалось создать историю. Пожалуйста, попробуйте ещё раз.",
            Locale::Fr => {
                "Une erreur est survenue lors de la création de votre histoire. Veuillez réessayer."
            }
            Locale::Ar => "حدث خطأ أثناء إنشاء قصتك. يرجى المحاولة مرة أخرى.",
            Locale::He => "אירעה שגיאה ביצירת הסיפור. נסו שוב.",
            Locale::Fa => "هنگام ساخت داستان مشکلی پیش آمد. لطفاً دوباره تلاش کنید.",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ko" => Ok(Locale::Ko),
            "ja" => Ok(Locale::Ja),
            "zh" => Ok(Locale::Zh),
            "ru" => Ok(Locale::Ru),
            "fr" => Ok(Locale::Fr),
            "ar" => Ok(Locale::Ar),
            "he" => Ok(Locale::He),
            "fa" => Ok(Locale::Fa),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for locale in Locale::all() {
            assert_eq!(locale.code().parse::<Locale>().unwrap(), locale);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("KO".parse::<Locale>().unwrap(), Locale::Ko);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "de".parse::<Locale>().unwrap_err();
        assert_eq!(err, UnknownLocale("de".to_string()));
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&Locale::Ja).unwrap();
        assert_eq!(json, r#""ja""#);
        let back: Locale = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Locale::Ja);
    }

    #[test]
    fn test_every_locale_has_a_message() {
        for locale in Locale::all() {
            assert!(!locale.error_message().is_empty());
            assert!(!locale.language_name().is_empty());
        }
    }
}
