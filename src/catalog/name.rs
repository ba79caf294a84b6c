// catalog/name.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the conversion of banner titles into catalog names following the No-Intro naming
// convention.

use crate::locale::language::Language;
use crate::title::rom::{LocalizedTitleSet, TitleSlot};

const TRADEMARK_REMINDERS: [char; 3] = ['™', '®', '©'];
const ALLOWED_PUNCTUATION: &str = " $!#%'()+,-.;=@[]^_{}~";
const COMMON_ARTICLES: [&str; 3] = ["the", "a", "an"];

/// Something that can write text from a non-Latin script in Latin characters.
pub trait Transliterator: Send + Sync {
    fn romanize(&self, text: &str, language: Language) -> String;
}

/// Transliterates with deunicode's per-character tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeunicodeTransliterator;

impl Transliterator for DeunicodeTransliterator {
    fn romanize(&self, text: &str, _language: Language) -> String {
        deunicode::deunicode(text)
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(c)
}

/// Strips trademark reminders, folds to low ASCII, drops anything the naming convention doesn't
/// allow, and trims separator characters.
fn clean_segment(text: &str) -> String {
    let without_reminders: String = text.chars().filter(|c| !TRADEMARK_REMINDERS.contains(c)).collect();
    deunicode::deunicode(&without_reminders)
        .chars()
        .filter(|c| is_allowed(*c))
        .collect::<String>()
        .trim_matches([' ', ':', '-'])
        .to_owned()
}

/// Moves a leading article to the end, so "The Game" becomes "Game, The". Only one article is
/// moved, so a title that still starts with one afterwards changes again on a second pass.
fn move_article(title: String) -> String {
    for article in COMMON_ARTICLES {
        let prefix_len = article.len() + 1;
        let Some(prefix) = title.get(..prefix_len) else {
            continue;
        };
        if prefix[..article.len()].eq_ignore_ascii_case(article) && prefix.ends_with(' ') {
            return format!("{}, {}", &title[prefix_len..], &title[..article.len()]);
        }
    }
    title
}

/// Builds the catalog name of a title from its banner title and optional subtitle. Japanese,
/// Chinese and Korean text is romanized before anything else, since every later step expects
/// ASCII.
pub fn canonical_display_name(title: &str, subtitle: Option<&str>, language: Language, transliterator: &dyn Transliterator) -> String {
    let subtitle = subtitle.filter(|s| !s.trim().is_empty());
    let romanize = |text: &str| {
        if language.uses_non_latin_script() {
            transliterator.romanize(text, language)
        } else {
            text.to_owned()
        }
    };
    let mut name = move_article(clean_segment(&romanize(title)));
    if let Some(subtitle) = subtitle {
        name.push_str(" - ");
        name.push_str(&clean_segment(&romanize(subtitle)));
    }
    name.split_whitespace().collect::<Vec<_>>().join(" ").trim_matches([' ', '.']).to_owned()
}

/// Picks the banner title a catalog name is built from: the slot of the primary language, or the
/// first localized slot when that one is missing. A subtitle is only present when the title has a
/// line between its title and publisher lines.
pub fn name_source(titles: &LocalizedTitleSet, primary: Language) -> Option<(String, Option<String>, Language)> {
    let preferred = TitleSlot::for_language(primary);
    let (text, language) = match titles.get_unless_default(preferred) {
        Some(text) => (text, primary),
        None => TitleSlot::ALL
            .into_iter()
            .find_map(|slot| titles.get_unless_default(slot).map(|text| (text, slot.language())))?,
    };
    let parts: Vec<&str> = text.split('\n').collect();
    let subtitle = if parts.len() > 2 { Some(parts[1].to_owned()) } else { None };
    Some((parts[0].to_owned(), subtitle, language))
}

#[cfg(test)]
mod test {
    use super::*;

    struct UppercaseTransliterator;

    impl Transliterator for UppercaseTransliterator {
        fn romanize(&self, _text: &str, _language: Language) -> String {
            "ROMANIZED".to_owned()
        }
    }

    fn name(title: &str, subtitle: Option<&str>) -> String {
        canonical_display_name(title, subtitle, Language::En, &DeunicodeTransliterator)
    }

    #[test]
    fn test_articles() {
        assert_eq!(name("The Legend of Zelda", None), "Legend of Zelda, The");
        assert_eq!(name("a Boy and His Blob", None), "Boy and His Blob, a");
        assert_eq!(name("An Adventure", None), "Adventure, An");
        assert_eq!(name("Theatre", None), "Theatre");
        // Only the title has its article moved.
        assert_eq!(name("Puzzle", Some("The Sequel")), "Puzzle - The Sequel");
    }

    #[test]
    fn test_cleaning() {
        assert_eq!(name("Pokémon™ Dash", None), "Pokemon Dash");
        assert_eq!(name("  Game: ", Some("  -Edition-  ")), "Game - Edition");
        assert_eq!(name("Quiz*Show  \"Deluxe\"", None), "QuizShow Deluxe");
        assert_eq!(name("Dr. Mario.", None), "Dr. Mario");
        assert_eq!(name("Game", Some("   ")), "Game");
    }

    #[test]
    fn test_romanization_only_for_non_latin_languages() {
        assert_eq!(canonical_display_name("ゲーム", None, Language::Ja, &UppercaseTransliterator), "ROMANIZED");
        assert_eq!(canonical_display_name("Jeu", None, Language::Fr, &UppercaseTransliterator), "Jeu");
        let romanized = canonical_display_name("ゲーム", None, Language::Ja, &DeunicodeTransliterator);
        assert!(!romanized.is_empty());
        assert!(romanized.is_ascii());
    }

    #[test]
    fn test_idempotent() {
        for (title, subtitle) in [
            ("The Legend of Zelda", None),
            ("Pokémon™ Dash", Some("Deluxe")),
            ("  Game: ", Some("Edition")),
            ("Art Style: PiCTOBiTS", None),
        ] {
            let once = name(title, subtitle);
            assert_eq!(name(&once, None), once);
        }
    }

    #[test]
    fn test_only_one_article_moves() {
        let once = name("The The Game", None);
        assert_eq!(once, "The Game, The");
        assert_eq!(name(&once, None), "Game, The, The");
    }

    #[test]
    fn test_name_source() {
        let mut slots: [Option<String>; 8] = Default::default();
        slots[TitleSlot::English.index()] = Some("Game\nSubtitle\nPublisher".to_owned());
        slots[TitleSlot::French.index()] = Some("Jeu\nÉditeur".to_owned());
        let titles = LocalizedTitleSet::new(slots);
        assert_eq!(
            name_source(&titles, Language::En),
            Some(("Game".to_owned(), Some("Subtitle".to_owned()), Language::En))
        );
        assert_eq!(name_source(&titles, Language::Fr), Some(("Jeu".to_owned(), None, Language::Fr)));
        // Japanese isn't localized, so the first localized slot is used.
        assert_eq!(name_source(&titles, Language::Ja).map(|s| s.2), Some(Language::En));
        assert_eq!(name_source(&LocalizedTitleSet::default(), Language::En), None);
    }
}
