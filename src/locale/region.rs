// locale/region.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the regions that a title can be released in, and the fixed tables relating them to
// game code characters, languages and eShop storefronts.

use enumflags2::{bitflags, BitFlags};
use serde::{Deserialize, Serialize};
use crate::locale::language::Language;

/// Every region a DSiWare title can be catalogued under. A release can belong to several at once,
/// which is represented by a `RegionSet`.
#[bitflags]
#[repr(u16)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Region {
    Usa,
    Japan,
    Europe,
    Australia,
    Korea,
    China,
    Germany,
    France,
    Italy,
    Spain,
    Netherlands,
    SouthAmerica,
    World,
}

/// A `BitFlags` of `Region`s.
pub type RegionSet = BitFlags<Region, u16>;

impl Region {
    /// The order in which regions are chosen when a set has to be reduced to a single primary
    /// region.
    pub const PRIMARY_PRIORITY: [Region; 13] = [
        Region::Usa,
        Region::Japan,
        Region::Europe,
        Region::Australia,
        Region::Korea,
        Region::China,
        Region::Germany,
        Region::France,
        Region::Italy,
        Region::Spain,
        Region::Netherlands,
        Region::SouthAmerica,
        Region::World,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Region::Usa => "USA",
            Region::Japan => "Japan",
            Region::Europe => "Europe",
            Region::Australia => "Australia",
            Region::Korea => "Korea",
            Region::China => "China",
            Region::Germany => "Germany",
            Region::France => "France",
            Region::Italy => "Italy",
            Region::Spain => "Spain",
            Region::Netherlands => "Netherlands",
            Region::SouthAmerica => "South America",
            Region::World => "World",
        }
    }

    /// The languages a release for this region is expected to support, most likely first.
    pub fn expected_languages(self) -> &'static [Language] {
        use Language::*;
        match self {
            Region::Usa => &[En, Ja, Es],
            Region::Japan => &[Ja, En],
            Region::Europe => &[En, Fr, De, It],
            Region::Australia => &[En, Ja],
            Region::Korea => &[Ko, Ja, En],
            Region::China => &[Zh, Ja, En],
            Region::Germany => &[De, Ja],
            Region::France => &[Fr, En, Ja],
            Region::Italy => &[It, En],
            Region::Spain => &[Es],
            Region::Netherlands => &[De],
            Region::SouthAmerica => &[Es, Pt, En],
            Region::World => &[En, Ja],
        }
    }

    /// The languages that the system menu of a console from this region can be set to. System
    /// titles follow the console language instead of offering a selector of their own.
    pub fn system_languages(self) -> &'static [Language] {
        use Language::*;
        match self {
            Region::Usa => &[En, Fr, Es],
            Region::Japan => &[Ja],
            Region::Europe => &[En, Fr, De, It, Es],
            Region::Australia => &[En],
            Region::Korea => &[Ko],
            Region::China => &[Zh],
            Region::Germany => &[De],
            Region::France => &[Fr],
            Region::Italy => &[It],
            Region::Spain => &[Es],
            Region::Netherlands => &[En, Fr, De, It, Es],
            Region::SouthAmerica => &[En, Fr, Es],
            Region::World => &[En, Ja, Fr, De, Es, It],
        }
    }

    /// The two letter country code of the eShop storefront that serves this region.
    pub fn country_code(self) -> &'static str {
        match self {
            Region::Usa => "US",
            Region::Japan => "JP",
            Region::Europe => "GB",
            Region::Australia => "AU",
            Region::Korea => "KR",
            Region::China => "CN",
            Region::Germany => "DE",
            Region::France => "FR",
            Region::Italy => "IT",
            Region::Spain => "ES",
            Region::Netherlands => "NL",
            Region::SouthAmerica => "BR",
            Region::World => "US",
        }
    }

    /// Regions whose storefronts are likely to carry the same release when this region's does not.
    pub fn related_regions(self) -> &'static [Region] {
        match self {
            Region::Usa => &[Region::Europe, Region::SouthAmerica],
            Region::Japan => &[Region::Europe, Region::Usa],
            Region::Europe => &[
                Region::France,
                Region::Italy,
                Region::Germany,
                Region::Netherlands,
                Region::Spain,
                Region::Usa,
                Region::SouthAmerica,
            ],
            Region::Australia => &[Region::Europe],
            Region::Korea => &[Region::Japan, Region::China],
            Region::China => &[Region::Japan, Region::Korea],
            Region::Germany => &[Region::Netherlands, Region::Europe],
            Region::France | Region::Italy | Region::Spain => &[Region::Europe],
            Region::Netherlands => &[Region::Germany, Region::Europe],
            Region::SouthAmerica => &[Region::Usa, Region::Spain],
            Region::World => &[Region::Europe, Region::Usa],
        }
    }
}

/// Maps the region character at the end of a game code to the regions it covers. Unknown
/// characters are treated as region-free.
pub fn region_from_code(code: char) -> RegionSet {
    match code {
        'E' => Region::Usa.into(),
        'J' => Region::Japan.into(),
        'P' => Region::Europe.into(),
        'U' => Region::Australia.into(),
        'K' => Region::Korea.into(),
        'V' => Region::Europe | Region::Australia,
        'C' => Region::China.into(),
        'D' => Region::Germany.into(),
        'F' => Region::France.into(),
        'I' => Region::Italy.into(),
        'S' => Region::Spain.into(),
        'O' => Region::Usa | Region::Europe,
        'X' => Region::Europe.into(),
        'T' => Region::Usa | Region::Australia,
        'H' => Region::Netherlands.into(),
        _ => Region::World.into(),
    }
}

/// Reduces a set of regions to the single region used for lookups and defaults.
pub fn primary_region(regions: RegionSet) -> Region {
    if let Some(region) = regions.exactly_one() {
        return region;
    }
    Region::PRIMARY_PRIORITY
        .into_iter()
        .find(|region| regions.contains(*region))
        .unwrap_or(Region::World)
}

/// Gets the expected languages of every region in a set, in region order, without duplicates.
pub fn expected_languages(regions: RegionSet) -> Vec<Language> {
    let mut languages = Vec::new();
    for region in regions.iter() {
        for language in region.expected_languages() {
            if !languages.contains(language) {
                languages.push(*language);
            }
        }
    }
    languages
}

/// Formats a set of regions the way they're written in the catalog, e.g. "Europe, Australia".
pub fn region_names(regions: RegionSet) -> String {
    if regions.is_empty() {
        return Region::World.name().to_owned();
    }
    regions.iter().map(|r| r.name()).collect::<Vec<_>>().join(", ")
}
