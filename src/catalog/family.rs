// catalog/family.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements grouping regional releases of a title into families, choosing the parent of each
// family, and numbering the catalog.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use log::debug;
use crate::catalog::record::TitleRecord;
use crate::locale::language::Language;

/// Region characters in order of preference for a family's parent, used only to break ties.
pub const REGION_PREFERENCE: &str = "AVPOTEUXFDSIHJKC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneMarker {
    /// The only member of its family.
    Single,
    Parent,
    /// A clone of the entry with the given archive number.
    CloneOf(u32),
}

impl CloneMarker {
    /// Gets the value written to the clone attribute of the catalog.
    pub fn attribute(self) -> String {
        match self {
            CloneMarker::Single => String::new(),
            CloneMarker::Parent => "P".to_owned(),
            CloneMarker::CloneOf(parent) => format_archive_number(parent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A numbered catalog entry, referring to its record by index.
pub struct CatalogEntry {
    pub record: usize,
    pub archive_id: u32,
    pub clone: CloneMarker,
}

impl CatalogEntry {
    pub fn archive_number(&self) -> String {
        format_archive_number(self.archive_id)
    }
}

pub fn format_archive_number(archive_id: u32) -> String {
    format!("{:04}", archive_id)
}

/// Groups records by family key. Families come out in family key order, and members keep the
/// order they have in `records`.
pub fn group_families(records: &[TitleRecord]) -> Vec<Vec<usize>> {
    let mut families: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        families.entry(record.title_id.family_key()).or_default().push(i);
    }
    families.into_values().collect()
}

fn region_preference(code: char) -> usize {
    REGION_PREFERENCE.find(code).unwrap_or(usize::MAX)
}

/// Orders the members of a family so that the parent comes first. Releases with English come
/// first, then releases with more languages, then the region preference order decides.
pub fn resolve_family(records: &[TitleRecord], family: &mut [usize]) {
    family.sort_by_key(|i| {
        let record = &records[*i];
        (
            !record.has_language(Language::En),
            Reverse(record.languages.confirmed.len()),
            region_preference(record.region_code),
        )
    });
}

/// Resolves every family and numbers the catalog from 1, family by family.
pub fn assign_archive_ids(records: &[TitleRecord]) -> Vec<CatalogEntry> {
    let mut entries = Vec::with_capacity(records.len());
    let mut next_id: u32 = 1;
    for mut family in group_families(records) {
        resolve_family(records, &mut family);
        let parent_id = next_id;
        let single = family.len() == 1;
        for (rank, record) in family.into_iter().enumerate() {
            let clone = match (single, rank) {
                (true, _) => CloneMarker::Single,
                (false, 0) => CloneMarker::Parent,
                (false, _) => CloneMarker::CloneOf(parent_id),
            };
            debug!("{} {} is {:?}", format_archive_number(next_id), records[record].title_id, clone);
            entries.push(CatalogEntry { record, archive_id: next_id, clone });
            next_id += 1;
        }
    }
    entries
}
