// locale/resolver.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the resolution of the languages a title supports from its banner titles, its region,
// and (when one exists) an authoritative language list from another storefront.

use std::collections::BTreeSet;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use crate::locale::classifier::{LanguageClassifier, TRIM_CHARS};
use crate::locale::language::Language;
use crate::locale::region::{expected_languages, primary_region, Region, RegionSet};
use crate::title::rom::LocalizedTitleSet;
use crate::title::TitleId;

const CONFUSING_CHARACTERS: [char; 13] = ['.', '?', '!', ':', ';', '\'', '"', '™', '®', '©', '×', '/', '\\'];

/// Words that show up in titles regardless of their language, and so only confuse a classifier.
pub const CONFUSING_PROPER_NOUNS: [&str; 26] = [
    "Nintendo", "iQue", "3DS", "DSi", "DS", "TWL", "Twl", "Banner", "TWLBanner", "TWLBannerImage",
    "Mario", "Luigi", "Wario", "Waluigi", "WarioWare", "Zelda", "Link", "GmbH",
    "Default", "Title", "Subtitle", "Publisher", "default", "title", "subtitle", "publisher",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// How a title's languages were determined, from most to least certain.
pub enum DeterminationMethod {
    /// Taken from a storefront listing of the same title.
    Authoritative,
    /// Every language had a banner title of its own.
    Banner,
    /// At least one language was picked by the classifier from a shared banner title.
    Classifier,
    /// At least one language fell back to the default of the title's region.
    RegionDefault,
}

impl DeterminationMethod {
    /// Describes the method for the media export.
    pub fn description(self) -> &'static str {
        match self {
            DeterminationMethod::Authoritative => "3DS eShop Port",
            DeterminationMethod::Banner | DeterminationMethod::Classifier | DeterminationMethod::RegionDefault => "Guessed From ROM Titles",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLanguages {
    pub confirmed: BTreeSet<Language>,
    /// Languages that were inferred rather than observed, in the order they were chosen. Each is
    /// also in `confirmed`.
    pub nebulous: Vec<Language>,
    pub method: DeterminationMethod,
}

impl ResolvedLanguages {
    /// Gets the confirmed language that ranks earliest in the expected languages of the regions,
    /// falling back to enum order for languages the regions don't expect.
    pub fn primary_language(&self, regions: RegionSet) -> Language {
        let expected = expected_languages(regions);
        self.confirmed
            .iter()
            .copied()
            .min_by_key(|l| (expected.iter().position(|e| e == l).unwrap_or(usize::MAX), *l))
            .unwrap_or_else(|| region_default(regions))
    }
}

/// Something that knows the real language list of a title, keyed by Title ID and two letter
/// storefront country code.
pub trait LanguageSource: Send + Sync {
    /// Looks up the languages of a title in one storefront. Any failure is reported as no data.
    fn languages(&self, title_id: &TitleId, country_code: &str) -> Option<Vec<Language>>;

    /// Whether the source expects to know about a title at all.
    fn covers(&self, title_id: &TitleId) -> bool;
}

/// A language source that never knows anything, for when remote lookups are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLanguageSource;

impl LanguageSource for NoLanguageSource {
    fn languages(&self, _title_id: &TitleId, _country_code: &str) -> Option<Vec<Language>> {
        None
    }

    fn covers(&self, _title_id: &TitleId) -> bool {
        false
    }
}

/// Gets the order in which storefronts are checked for a title: each of its regions, most
/// specific first, followed by the regions related to it.
pub fn lookup_regions(regions: RegionSet) -> Vec<Region> {
    let mut walk: Vec<Region> = Vec::new();
    let decomposed: Vec<Region> = regions.iter().collect();
    for region in decomposed.into_iter().rev() {
        for candidate in std::iter::once(region).chain(region.related_regions().iter().copied()) {
            if !walk.contains(&candidate) {
                walk.push(candidate);
            }
        }
    }
    walk
}

/// Walks the storefronts of a title's regions until one of them lists its languages.
pub fn authoritative_languages(source: &dyn LanguageSource, title_id: &TitleId, regions: RegionSet) -> Option<Vec<Language>> {
    if !source.covers(title_id) {
        return None;
    }
    for region in lookup_regions(regions) {
        if let Some(languages) = source.languages(title_id, region.country_code()).filter(|l| !l.is_empty()) {
            debug!("Title {} is listed in the {} storefront with languages {:?}", title_id, region.name(), languages);
            return Some(languages);
        }
    }
    warn!("Title {} is supposed to have a storefront listing, but nothing was found", title_id);
    None
}

/// Gets the first expected language of a set's primary region.
pub fn region_default(regions: RegionSet) -> Language {
    primary_region(regions).expected_languages().first().copied().unwrap_or(Language::En)
}

fn split_camel_case(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;
    for c in word.chars() {
        if c.is_ascii_uppercase() && prev.is_some_and(|p| !p.is_ascii_uppercase()) {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev = Some(c);
    }
    parts.push(current);
    parts
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    let cased: String = match chars.next() {
        Some(first) if word.chars().count() > 1 => {
            let rest = chars.as_str().to_lowercase();
            first.to_uppercase().chain(rest.chars()).collect()
        }
        _ => word.to_uppercase(),
    };
    cased.trim_matches(TRIM_CHARS).to_owned()
}

/// Reduces a banner title to the words that say something about its language: punctuation,
/// digits, the publisher line, language-neutral proper nouns and short acronyms are removed, and
/// what remains is title cased.
pub fn sanitize_for_detection(title: &str) -> String {
    let stripped: String = title
        .chars()
        .filter(|c| !CONFUSING_CHARACTERS.contains(c) && !c.is_ascii_digit())
        .collect();
    let lines: Vec<&str> = stripped.split('\n').collect();
    let text = if lines.len() > 1 { lines[..lines.len() - 1].join(" ") } else { stripped.clone() };
    let mut words: Vec<String> = Vec::new();
    for word in text.split([' ', '\u{3000}']).flat_map(split_camel_case) {
        if !CONFUSING_PROPER_NOUNS.contains(&word.as_str()) && !words.contains(&word) {
            words.push(word);
        }
    }
    words
        .into_iter()
        .filter(|w| {
            let upper = w.to_uppercase();
            *w != upper || w.chars().count() >= 4
        })
        .map(|w| title_case(&w))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_owned()
}

/// Banner slots that share the same sanitized text, in slot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGroup {
    pub text: String,
    pub languages: Vec<Language>,
}

/// Groups the localized (non-default) titles by their sanitized text.
pub fn group_slots(titles: &LocalizedTitleSet) -> Vec<SlotGroup> {
    let mut groups: Vec<SlotGroup> = Vec::new();
    for (slot, _) in titles.iter() {
        let Some(title) = titles.get_unless_default(slot) else {
            continue;
        };
        let text = sanitize_for_detection(title);
        match groups.iter_mut().find(|g| g.text == text) {
            Some(group) => group.languages.push(slot.language()),
            None => groups.push(SlotGroup { text, languages: vec![slot.language()] }),
        }
    }
    groups
}

/// Picks the language of a group of slots that share one title. The classifier's guesses are
/// limited to the languages of the group (and, for system titles, to those the console offers in
/// the primary region), those the region expects are moved to the front, and the first one that
/// isn't already confirmed wins.
pub fn resolve_conflict(ranked: &[Language], group: &SlotGroup, confirmed: &BTreeSet<Language>, regions: RegionSet, is_system: bool) -> Option<Language> {
    let expected = expected_languages(regions);
    let system_languages = primary_region(regions).system_languages();
    let mut candidates: Vec<Language> = ranked
        .iter()
        .copied()
        .filter(|l| group.languages.contains(l))
        .filter(|l| !is_system || system_languages.contains(l))
        .collect();
    candidates.sort_by_key(|l| !expected.contains(l));
    let choice = candidates.iter().position(|l| !confirmed.contains(l))?;
    if choice > 0 {
        debug!(
            "The first choice of language was not chosen, as it was already confirmed. Choice {} was chosen ({}) for {:?}",
            choice, candidates[choice], group.text
        );
    }
    Some(candidates[choice])
}

/// Resolves the languages of a title. An authoritative list wins outright; otherwise banner titles
/// unique to one slot confirm that slot's language, titles shared by several slots are settled by
/// the classifier, and the region default fills any gap.
pub fn resolve_languages(
    title_id: &TitleId,
    titles: &LocalizedTitleSet,
    regions: RegionSet,
    is_system: bool,
    authoritative: Option<&[Language]>,
    classifier: &dyn LanguageClassifier,
) -> ResolvedLanguages {
    if let Some(languages) = authoritative.filter(|l| !l.is_empty()) {
        return ResolvedLanguages {
            confirmed: languages.iter().copied().collect(),
            nebulous: Vec::new(),
            method: DeterminationMethod::Authoritative,
        };
    }
    let mut resolved = ResolvedLanguages {
        confirmed: BTreeSet::new(),
        nebulous: Vec::new(),
        method: DeterminationMethod::Banner,
    };
    let groups = group_slots(titles);
    for group in groups.iter().filter(|g| g.languages.len() == 1) {
        resolved.confirmed.extend(group.languages.iter().copied());
    }
    for group in groups.iter().filter(|g| g.languages.len() > 1) {
        if group.text.trim_matches(TRIM_CHARS).is_empty() {
            debug!("Title {} shares a title with nothing left to classify between {:?}", title_id, group.languages);
            continue;
        }
        trace!("Title {} has a title conflict for {:?} ({} titles are the same)", title_id, group.text, group.languages.len());
        let ranked = classifier.rank(&group.text);
        let language = match resolve_conflict(&ranked, group, &resolved.confirmed, regions, is_system) {
            Some(language) => {
                resolved.method = resolved.method.max(DeterminationMethod::Classifier);
                language
            }
            None => {
                let language = region_default(regions);
                warn!(
                    "No language could be determined for title {}'s conflict {:?}. Proceeding with the default language for the region, {}",
                    title_id, group.text, language
                );
                resolved.method = DeterminationMethod::RegionDefault;
                language
            }
        };
        resolved.confirmed.insert(language);
        resolved.nebulous.push(language);
    }
    if resolved.confirmed.is_empty() {
        let language = region_default(regions);
        warn!("No languages were found for title {}. Proceeding with the default language for the region, {}", title_id, language);
        resolved.confirmed.insert(language);
        resolved.nebulous.push(language);
        resolved.method = DeterminationMethod::RegionDefault;
    }
    resolved
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use crate::title::rom::TitleSlot;

    /// A classifier that always gives the same ranking.
    struct FixedClassifier(Vec<Language>);

    impl LanguageClassifier for FixedClassifier {
        fn rank(&self, _text: &str) -> Vec<Language> {
            self.0.clone()
        }
    }

    fn tid() -> TitleId {
        "000300044b474645".parse().unwrap()
    }

    fn titles(entries: &[(TitleSlot, &str)]) -> LocalizedTitleSet {
        let mut slots: [Option<String>; 8] = Default::default();
        for (slot, title) in entries {
            slots[slot.index()] = Some(title.to_string());
        }
        LocalizedTitleSet::new(slots)
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_for_detection("Nintendo DSi Sound\nNintendo"), "Sound");
        assert_eq!(sanitize_for_detection("WarioWare: Snapped!\nNintendo"), "Ware Snapped");
        assert_eq!(sanitize_for_detection("ABC Game 2\nPublisher"), "Game");
        assert_eq!(sanitize_for_detection("MAGIC WORDS"), "Magic Words");
        assert_eq!(sanitize_for_detection("game game\nPub"), "Game");
        assert_eq!(sanitize_for_detection("default title\ndefault subtitle\ndefault publisher"), "");
    }

    #[test]
    fn test_single_slot_is_confirmed() {
        let set = titles(&[(TitleSlot::Japanese, "ゲーム\n任天堂")]);
        let resolved = resolve_languages(&tid(), &set, Region::Japan.into(), false, None, &FixedClassifier(vec![]));
        assert_eq!(resolved.confirmed, BTreeSet::from([Language::Ja]));
        assert!(resolved.nebulous.is_empty());
        assert_eq!(resolved.method, DeterminationMethod::Banner);
    }

    #[test]
    fn test_default_slots_are_ignored() {
        let set = titles(&[
            (TitleSlot::English, "Puzzle Quest\nPublisher"),
            (TitleSlot::French, "default title\ndefault subtitle\ndefault publisher"),
        ]);
        let resolved = resolve_languages(&tid(), &set, Region::Usa.into(), false, None, &FixedClassifier(vec![]));
        assert_eq!(resolved.confirmed, BTreeSet::from([Language::En]));
        assert!(resolved.nebulous.is_empty());
    }

    #[test]
    fn test_conflict_picks_one_winner() {
        let set = titles(&[
            (TitleSlot::English, "Flower Garden\nPublisher"),
            (TitleSlot::French, "Flower Garden\nPublisher"),
        ]);
        let classifier = FixedClassifier(vec![Language::En, Language::Fr]);
        let resolved = resolve_languages(&tid(), &set, Region::Usa.into(), false, None, &classifier);
        assert_eq!(resolved.confirmed, BTreeSet::from([Language::En]));
        assert_eq!(resolved.nebulous, [Language::En]);
        assert_eq!(resolved.method, DeterminationMethod::Classifier);
    }

    #[test]
    fn test_conflict_prefers_expected_languages() {
        let group = SlotGroup { text: "Jardin".to_owned(), languages: vec![Language::En, Language::Fr] };
        // Japan doesn't expect French, so English is moved ahead of it.
        let ranked = [Language::Fr, Language::En];
        let choice = resolve_conflict(&ranked, &group, &BTreeSet::new(), Region::Japan.into(), false);
        assert_eq!(choice, Some(Language::En));
        // Already confirmed languages are passed over.
        let choice = resolve_conflict(&ranked, &group, &BTreeSet::from([Language::En]), Region::Japan.into(), false);
        assert_eq!(choice, Some(Language::Fr));
    }

    #[test]
    fn test_conflict_system_languages() {
        let group = SlotGroup { text: "Reloj".to_owned(), languages: vec![Language::Ja, Language::Es] };
        // Japanese consoles only offer Japanese.
        let choice = resolve_conflict(&[Language::Es, Language::Ja], &group, &BTreeSet::new(), Region::Japan.into(), true);
        assert_eq!(choice, Some(Language::Ja));
    }

    #[test]
    fn test_conflict_falls_back_to_region_default() {
        let set = titles(&[
            (TitleSlot::German, "Blumen Garten\nPublisher"),
            (TitleSlot::Italian, "Blumen Garten\nPublisher"),
        ]);
        // Nothing the classifier suggests is in the group.
        let classifier = FixedClassifier(vec![Language::Nl]);
        let resolved = resolve_languages(&tid(), &set, Region::Europe.into(), false, None, &classifier);
        assert_eq!(resolved.confirmed, BTreeSet::from([Language::En]));
        assert_eq!(resolved.nebulous, [Language::En]);
        assert_eq!(resolved.method, DeterminationMethod::RegionDefault);
    }

    #[test]
    fn test_nothing_localized_uses_region_default() {
        let resolved = resolve_languages(&tid(), &LocalizedTitleSet::default(), Region::Korea.into(), false, None, &FixedClassifier(vec![]));
        assert_eq!(resolved.confirmed, BTreeSet::from([Language::Ko]));
        assert_eq!(resolved.nebulous, [Language::Ko]);
    }

    #[test]
    fn test_authoritative_wins() {
        let set = titles(&[(TitleSlot::English, "Game\nPublisher")]);
        let authoritative = [Language::En, Language::Fr, Language::Es];
        let resolved = resolve_languages(&tid(), &set, Region::Usa.into(), false, Some(&authoritative[..]), &FixedClassifier(vec![]));
        assert_eq!(resolved.confirmed.len(), 3);
        assert_eq!(resolved.method, DeterminationMethod::Authoritative);
        // An empty list is the same as none.
        let resolved = resolve_languages(&tid(), &set, Region::Usa.into(), false, Some(&[][..]), &FixedClassifier(vec![]));
        assert_eq!(resolved.method, DeterminationMethod::Banner);
    }

    #[test]
    fn test_primary_language() {
        let resolved = ResolvedLanguages {
            confirmed: BTreeSet::from([Language::Fr, Language::De, Language::Nl]),
            nebulous: Vec::new(),
            method: DeterminationMethod::Banner,
        };
        assert_eq!(resolved.primary_language(Region::Europe.into()), Language::Fr);
        // Neither language is expected in Japan, so enum order decides.
        let resolved = ResolvedLanguages { confirmed: BTreeSet::from([Language::Nl, Language::De]), ..resolved };
        assert_eq!(resolved.primary_language(Region::Japan.into()), Language::De);
    }

    #[test]
    fn test_lookup_regions() {
        let walk = lookup_regions(Region::Europe | Region::Australia);
        assert_eq!(walk[0], Region::Australia);
        assert_eq!(walk[1], Region::Europe);
        assert_eq!(walk.iter().filter(|r| **r == Region::Europe).count(), 1);
    }

    struct MapSource {
        listings: HashMap<&'static str, Vec<Language>>,
        queried: Mutex<Vec<String>>,
    }

    impl LanguageSource for MapSource {
        fn languages(&self, _title_id: &TitleId, country_code: &str) -> Option<Vec<Language>> {
            self.queried.lock().unwrap().push(country_code.to_owned());
            self.listings.get(country_code).cloned()
        }

        fn covers(&self, _title_id: &TitleId) -> bool {
            true
        }
    }

    #[test]
    fn test_authoritative_walk() {
        let source = MapSource {
            listings: HashMap::from([("GB", vec![Language::En, Language::De])]),
            queried: Mutex::new(Vec::new()),
        };
        let languages = authoritative_languages(&source, &tid(), Region::Australia.into());
        assert_eq!(languages, Some(vec![Language::En, Language::De]));
        assert_eq!(*source.queried.lock().unwrap(), ["AU", "GB"]);
        assert_eq!(authoritative_languages(&NoLanguageSource, &tid(), Region::Usa.into()), None);
    }
}
