// locale/language.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the languages that a title can be catalogued as supporting.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    /// English
    En,
    /// Japanese
    Ja,
    /// French
    Fr,
    /// German
    De,
    /// Spanish
    Es,
    /// Italian
    It,
    /// Dutch
    Nl,
    /// Portuguese
    Pt,
    /// Swedish
    Sv,
    /// Norwegian
    No,
    /// Danish
    Da,
    /// Finnish
    Fi,
    /// Chinese
    Zh,
    /// Korean
    Ko,
    /// Polish
    Pl,
    /// Russian
    Ru,
}

#[derive(Debug, Error)]
#[error("unknown language code {0:?}")]
pub struct ParseLanguageError(String);

impl Language {
    pub const ALL: [Language; 16] = [
        Language::En, Language::Ja, Language::Fr, Language::De, Language::Es, Language::It,
        Language::Nl, Language::Pt, Language::Sv, Language::No, Language::Da, Language::Fi,
        Language::Zh, Language::Ko, Language::Pl, Language::Ru,
    ];

    /// The order languages are listed in within the catalog. Anything missing from it is listed
    /// last.
    pub const OUTPUT_ORDER: [Language; 15] = [
        Language::En, Language::Ja, Language::Fr, Language::De, Language::Es, Language::It,
        Language::Nl, Language::Pt, Language::Sv, Language::No, Language::Da, Language::Fi,
        Language::Zh, Language::Ko, Language::Pl,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "En",
            Language::Ja => "Ja",
            Language::Fr => "Fr",
            Language::De => "De",
            Language::Es => "Es",
            Language::It => "It",
            Language::Nl => "Nl",
            Language::Pt => "Pt",
            Language::Sv => "Sv",
            Language::No => "No",
            Language::Da => "Da",
            Language::Fi => "Fi",
            Language::Zh => "Zh",
            Language::Ko => "Ko",
            Language::Pl => "Pl",
            Language::Ru => "Ru",
        }
    }

    pub fn english_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ja => "Japanese",
            Language::Fr => "French",
            Language::De => "German",
            Language::Es => "Spanish",
            Language::It => "Italian",
            Language::Nl => "Dutch",
            Language::Pt => "Portuguese",
            Language::Sv => "Swedish",
            Language::No => "Norwegian",
            Language::Da => "Danish",
            Language::Fi => "Finnish",
            Language::Zh => "Chinese",
            Language::Ko => "Korean",
            Language::Pl => "Polish",
            Language::Ru => "Russian",
        }
    }

    /// Whether titles in this language need to be romanized before they can be used in a
    /// catalog name.
    pub fn uses_non_latin_script(self) -> bool {
        matches!(self, Language::Ja | Language::Zh | Language::Ko)
    }

    fn output_rank(self) -> usize {
        Language::OUTPUT_ORDER.iter().position(|l| *l == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ParseLanguageError;

    /// Parses a language from its two letter code in any case, which also covers the lowercase
    /// ISO 639-1 codes used by the eShop.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLanguageError(s.to_owned()))
    }
}

/// Sorts languages into catalog output order.
pub fn sort_for_output(languages: impl IntoIterator<Item = Language>) -> Vec<Language> {
    let mut sorted: Vec<Language> = languages.into_iter().collect();
    sorted.sort_by_key(|l| (l.output_rank(), *l));
    sorted.dedup();
    sorted
}

/// Joins languages into the comma-separated code list used in the catalog.
pub fn join_codes(languages: impl IntoIterator<Item = Language>) -> String {
    sort_for_output(languages).iter().map(|l| l.code()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_language() {
        assert_eq!("ja".parse::<Language>().unwrap(), Language::Ja);
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert_eq!("Ko".parse::<Language>().unwrap(), Language::Ko);
        assert!("xx".parse::<Language>().is_err());
    }

    #[test]
    fn test_output_order() {
        let codes = join_codes([Language::Ru, Language::Ko, Language::En, Language::Fr, Language::Ja]);
        assert_eq!(codes, "En,Ja,Fr,Ko,Ru");
    }
}
