// locale/classifier.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Statistical language identification, used to settle which language a banner title shared by
// several language slots is really written in.

use log::{trace, warn};
use whatlang::{Detector, Lang};
use crate::locale::language::Language;

/// Characters trimmed from text before and after classification.
pub const TRIM_CHARS: [char; 6] = [' ', '\u{3000}', '\t', '\r', '\n', '\0'];

/// Something that can guess the language a piece of text is written in.
pub trait LanguageClassifier: Send + Sync {
    /// Ranks the likely languages of some text, most likely first. An empty list means no guess
    /// could be made.
    fn rank(&self, text: &str) -> Vec<Language>;
}

/// A classifier backed by whatlang's trigram models. whatlang only reports a single best guess,
/// so a ranking is built by repeatedly removing the winner from the allowed languages.
#[derive(Debug, Clone)]
pub struct WhatlangClassifier {
    max_guesses: usize,
}

impl Default for WhatlangClassifier {
    fn default() -> Self {
        WhatlangClassifier { max_guesses: 4 }
    }
}

impl WhatlangClassifier {
    pub fn new(max_guesses: usize) -> Self {
        WhatlangClassifier { max_guesses }
    }
}

fn to_whatlang(language: Language) -> Lang {
    match language {
        Language::En => Lang::Eng,
        Language::Ja => Lang::Jpn,
        Language::Fr => Lang::Fra,
        Language::De => Lang::Deu,
        Language::Es => Lang::Spa,
        Language::It => Lang::Ita,
        Language::Nl => Lang::Nld,
        Language::Pt => Lang::Por,
        Language::Sv => Lang::Swe,
        Language::No => Lang::Nob,
        Language::Da => Lang::Dan,
        Language::Fi => Lang::Fin,
        Language::Zh => Lang::Cmn,
        Language::Ko => Lang::Kor,
        Language::Pl => Lang::Pol,
        Language::Ru => Lang::Rus,
    }
}

fn from_whatlang(lang: Lang) -> Option<Language> {
    Language::ALL.into_iter().find(|l| to_whatlang(*l) == lang)
}

impl LanguageClassifier for WhatlangClassifier {
    fn rank(&self, text: &str) -> Vec<Language> {
        let text = text.trim_matches(TRIM_CHARS);
        let mut ranked = Vec::new();
        if text.is_empty() {
            return ranked;
        }
        let mut allowlist: Vec<Lang> = Language::ALL.into_iter().map(to_whatlang).collect();
        while ranked.len() < self.max_guesses && !allowlist.is_empty() {
            let Some(info) = Detector::with_allowlist(allowlist.clone()).detect(text) else {
                break;
            };
            allowlist.retain(|lang| *lang != info.lang());
            if let Some(language) = from_whatlang(info.lang()) {
                ranked.push(language);
            }
        }
        match ranked.first() {
            Some(best) => trace!("The most likely language for {:?} is {}", text, best),
            None => warn!("The most likely language for {:?} could not be determined", text),
        }
        ranked
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rank_scripts() {
        let classifier = WhatlangClassifier::default();
        assert_eq!(classifier.rank("ゲームのタイトルはここにあります").first(), Some(&Language::Ja));
        assert_eq!(classifier.rank("한국어로 된 게임 제목입니다").first(), Some(&Language::Ko));
    }

    #[test]
    fn test_rank_is_bounded_and_unique() {
        let classifier = WhatlangClassifier::new(3);
        let ranked = classifier.rank("The quick brown fox jumps over the lazy dog");
        assert!(ranked.len() <= 3);
        assert_eq!(ranked.first(), Some(&Language::En));
        let mut deduped = ranked.clone();
        deduped.dedup();
        assert_eq!(deduped, ranked);
    }

    #[test]
    fn test_rank_empty_text() {
        assert!(WhatlangClassifier::default().rank(" \u{3000} ").is_empty());
    }
}
