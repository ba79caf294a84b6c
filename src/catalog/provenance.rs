// catalog/provenance.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the provenance of a catalogued title: every file that makes it up, and which
// contributor dumped which of them on what date.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, error};
use crate::catalog::record::TitleRecord;
use crate::title::filetypes::TICKET_FILE_NAME;
use crate::title::hasher::{HashCollection, HashError};
use crate::title::headers::{artifact_timestamp, modified_time};
use crate::title::versions::catalog_version_string;
use crate::title::TitleId;

pub const ENCRYPTED_FORMAT: &str = "CDN";
pub const DECRYPTED_FORMAT: &str = "CDNdec";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Ticket,
    Tmd,
    MetaId,
    Misc,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One file of a title, as it appears in the catalog.
pub struct ProvenanceEntry {
    pub kind: EntryKind,
    pub encrypted: bool,
    pub file_name: String,
    /// The name written to the catalog when it differs from the file name.
    pub display_name: Option<String>,
    pub hashes: HashCollection,
    pub timestamp: Option<DateTime<Utc>>,
    pub version: Option<String>,
    pub serial: Option<String>,
    /// Whether the file exists in the local archive, rather than only through its hash sidecar.
    pub local: bool,
}

impl ProvenanceEntry {
    pub fn format(&self) -> &'static str {
        if self.encrypted { ENCRYPTED_FORMAT } else { DECRYPTED_FORMAT }
    }

    pub fn force_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.file_name)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|t| t.date_naive())
    }
}

/// A set of entries credited to one contributor and dumped on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    pub dumper: String,
    pub tool: String,
    pub date: Option<NaiveDate>,
    pub known_dump_date: bool,
    pub entries: Vec<ProvenanceEntry>,
}

/// A secondary contributor, along with the reference tables describing their dumps.
#[derive(Debug, Clone, Default)]
pub struct Contributor {
    pub name: String,
    pub tool: String,
    /// (Title ID, lowercase file name) of every file they dumped.
    pub membership: HashSet<(TitleId, String)>,
    pub dates: HashMap<(TitleId, String), NaiveDate>,
    /// Tickets of theirs that differ from the local ones.
    pub replacements: HashMap<TitleId, HashCollection>,
    pub default_date: Option<NaiveDate>,
}

pub fn primary_tool() -> String {
    format!("nuscat v{}", env!("CARGO_PKG_VERSION"))
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Builds the entry for a file whose hashes are read through its sidecar and whose timestamp comes
/// from its recorded headers.
fn downloaded_entry(kind: EntryKind, path: &Path) -> Result<ProvenanceEntry, HashError> {
    Ok(ProvenanceEntry {
        kind,
        encrypted: true,
        file_name: file_name(path),
        display_name: None,
        hashes: HashCollection::read_through(path)?,
        timestamp: artifact_timestamp(path),
        version: None,
        serial: None,
        local: path.exists(),
    })
}

/// Tickets and TMDs aren't encrypted as a whole, so the same file is listed in both formats.
fn both_formats(entry: ProvenanceEntry) -> [ProvenanceEntry; 2] {
    let decrypted = ProvenanceEntry { encrypted: false, ..entry.clone() };
    [entry, decrypted]
}

/// Logs a file of a title that couldn't be hashed, so that it's left out of the catalog.
fn hashed(title_id: &TitleId, path: &Path, entry: Result<ProvenanceEntry, HashError>) -> Option<ProvenanceEntry> {
    entry.map_err(|err| error!("Leaving {:?} of title {} out of the catalog: {}", path, title_id, err)).ok()
}

/// Lists every file of a title. Files that can be read neither directly nor through their sidecar
/// are logged and left out, and the rest of the title is still listed.
pub fn build_entries(record: &TitleRecord) -> Vec<ProvenanceEntry> {
    let title_id = &record.title_id;
    let inventory = &record.inventory;
    let mut entries = Vec::new();
    for ticket in &inventory.tickets {
        if let Some(mut entry) = hashed(title_id, &ticket.path, downloaded_entry(EntryKind::Ticket, &ticket.path)) {
            entry.display_name = Some(format!("{}.{}", TICKET_FILE_NAME, ticket.title_version));
            entry.version = Some(catalog_version_string(ticket.title_version));
            entries.extend(both_formats(entry));
        }
    }
    for tmd in &inventory.tmds {
        if let Some(mut entry) = hashed(title_id, &tmd.path, downloaded_entry(EntryKind::Tmd, &tmd.path)) {
            entry.version = Some(catalog_version_string(tmd.title_version));
            entries.extend(both_formats(entry));
        }
    }
    for path in &inventory.meta_ids {
        entries.extend(hashed(title_id, path, downloaded_entry(EntryKind::MetaId, path)));
    }
    for path in &inventory.misc {
        entries.extend(hashed(title_id, path, downloaded_entry(EntryKind::Misc, path)));
    }
    for content in &inventory.decrypted_contents {
        let version = content.version.map(catalog_version_string);
        let encrypted_path = content.encrypted_path();
        if let Some(mut entry) = hashed(title_id, &encrypted_path, downloaded_entry(EntryKind::Content, &encrypted_path)) {
            entry.version = version.clone();
            entry.serial = content.serial.clone();
            entries.push(entry);
        }
        // Both forms of a content are catalogued under its Content ID.
        let decrypted = HashCollection::from_file(&content.path).map(|hashes| ProvenanceEntry {
            kind: EntryKind::Content,
            encrypted: false,
            file_name: format!("{:08x}", content.content_id),
            display_name: None,
            hashes,
            timestamp: modified_time(&content.path),
            version,
            serial: content.serial.clone(),
            local: true,
        });
        entries.extend(hashed(title_id, &content.path, decrypted));
    }
    entries
}

/// Key that sorts dated groups chronologically ahead of undated ones.
type GroupKey = (bool, Option<NaiveDate>, bool);

fn into_groups(dumper: &str, tool: &str, dated: Vec<(Option<NaiveDate>, bool, ProvenanceEntry)>) -> Vec<SourceGroup> {
    let mut groups: BTreeMap<GroupKey, Vec<ProvenanceEntry>> = BTreeMap::new();
    for (date, known, entry) in dated {
        groups.entry((date.is_none(), date, !known)).or_default().push(entry);
    }
    groups
        .into_iter()
        .map(|((_, date, unknown), entries)| SourceGroup {
            dumper: dumper.to_owned(),
            tool: tool.to_owned(),
            date,
            known_dump_date: !unknown,
            entries,
        })
        .collect()
}

/// Credits the primary contributor with every entry present in the local archive, one group per
/// dump date. The encrypted files of deleted titles come from other contributors, so only their
/// decrypted forms are credited.
pub fn primary_groups(dumper: &str, record: &TitleRecord, entries: &[ProvenanceEntry]) -> Vec<SourceGroup> {
    let dated = entries
        .iter()
        .filter(|e| e.local && !(record.deleted && e.encrypted))
        .map(|e| (e.date(), e.date().is_some(), e.clone()))
        .collect();
    into_groups(dumper, &primary_tool(), dated)
}

/// Credits a secondary contributor with the encrypted entries they're known to have dumped. A
/// ticket of theirs that differs from the local one replaces it. Dates come from their date table,
/// then their default date; only the former counts as a known dump date.
pub fn secondary_groups(contributor: &Contributor, title_id: &TitleId, entries: &[ProvenanceEntry]) -> Vec<SourceGroup> {
    let mut owned: Vec<ProvenanceEntry> = entries
        .iter()
        .filter(|e| e.encrypted && contributor.membership.contains(&(*title_id, e.file_name.to_lowercase())))
        .cloned()
        .collect();
    if owned.is_empty() {
        return Vec::new();
    }
    if let Some(hashes) = contributor.replacements.get(title_id) {
        match owned.iter_mut().find(|e| e.file_name == TICKET_FILE_NAME && e.encrypted) {
            Some(ticket) => {
                debug!("Replacing {}'s ticket of {} with theirs ({})", contributor.name, title_id, hashes.crc32);
                *ticket = ProvenanceEntry {
                    kind: EntryKind::Ticket,
                    encrypted: true,
                    file_name: TICKET_FILE_NAME.to_owned(),
                    display_name: Some(format!("{}.{}", TICKET_FILE_NAME, hashes.crc32)),
                    hashes: hashes.clone(),
                    timestamp: None,
                    version: None,
                    serial: None,
                    local: false,
                };
            }
            None => debug!("{} has a replacement ticket for {}, but no ticket in their dump", contributor.name, title_id),
        }
    }
    let dated = owned
        .into_iter()
        .map(|e| {
            match contributor.dates.get(&(*title_id, e.file_name.to_lowercase())) {
                Some(date) => (Some(*date), true, e),
                None => (contributor.default_date, false, e),
            }
        })
        .collect();
    into_groups(&contributor.name, &contributor.tool, dated)
}

/// Gets every non-empty source group of a title, the primary contributor's first.
pub fn source_groups(primary_dumper: &str, contributors: &[Contributor], record: &TitleRecord, entries: &[ProvenanceEntry]) -> Vec<SourceGroup> {
    let mut groups = primary_groups(primary_dumper, record, entries);
    for contributor in contributors {
        groups.extend(secondary_groups(contributor, &record.title_id, entries));
    }
    groups.retain(|g| !g.entries.is_empty());
    groups
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use crate::catalog::record::test::test_record;
    use crate::locale::language::Language;

    fn hashes(crc32: &str) -> HashCollection {
        HashCollection { size: Some(4), crc32: crc32.to_owned(), md5: String::new(), sha1: String::new(), sha256: String::new() }
    }

    fn entry(file_name: &str, encrypted: bool, day: Option<u32>) -> ProvenanceEntry {
        ProvenanceEntry {
            kind: if file_name == TICKET_FILE_NAME { EntryKind::Ticket } else { EntryKind::Content },
            encrypted,
            file_name: file_name.to_owned(),
            display_name: None,
            hashes: hashes("00000000"),
            timestamp: day.map(|d| Utc.with_ymd_and_hms(2018, 11, d, 12, 0, 0).unwrap()),
            version: None,
            serial: None,
            local: true,
        }
    }

    #[test]
    fn test_primary_groups_by_date() {
        let record = test_record("000300044b474645", &[Language::En]);
        let entries = vec![
            entry("00000000", true, Some(20)),
            entry("cetk", true, None),
            entry("00000000.app", false, Some(18)),
            entry("tmd", true, Some(20)),
        ];
        let groups = primary_groups("Me", &record, &entries);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2018, 11, 18));
        assert_eq!(groups[1].date, NaiveDate::from_ymd_opt(2018, 11, 20));
        assert_eq!(groups[1].entries.len(), 2);
        assert_eq!(groups[2].date, None);
        assert!(!groups[2].known_dump_date);
        assert!(groups[0].known_dump_date);
        assert!(groups[0].tool.starts_with("nuscat v"));
    }

    #[test]
    fn test_primary_groups_skip_missing_and_deleted_encrypted() {
        let mut record = test_record("000300044b474645", &[Language::En]);
        let mut remote = entry("00000001", true, Some(20));
        remote.local = false;
        let entries = vec![remote, entry("00000000", true, Some(20)), entry("00000000.app", false, Some(20))];
        assert_eq!(primary_groups("Me", &record, &entries)[0].entries.len(), 2);
        record.deleted = true;
        let groups = primary_groups("Me", &record, &entries);
        assert_eq!(groups[0].entries.len(), 1);
        assert!(!groups[0].entries[0].encrypted);
    }

    #[test]
    fn test_secondary_groups() {
        let tid: TitleId = "000300044b474645".parse().unwrap();
        let contributor = Contributor {
            name: "Other".to_owned(),
            tool: "Custom".to_owned(),
            membership: [(tid, "cetk".to_owned()), (tid, "00000000".to_owned()), (tid, "00000000.app".to_owned())].into_iter().collect(),
            dates: [((tid, "00000000".to_owned()), NaiveDate::from_ymd_opt(2018, 11, 1).unwrap())].into_iter().collect(),
            replacements: [(tid, hashes("deadbeef"))].into_iter().collect(),
            default_date: NaiveDate::from_ymd_opt(2018, 11, 17),
        };
        let entries = vec![
            entry("cetk", true, None),
            entry("cetk", false, None),
            entry("00000000", true, None),
            entry("00000000.app", false, None),
            entry("tmd", true, None),
        ];
        let groups = secondary_groups(&contributor, &tid, &entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2018, 11, 1));
        assert!(groups[0].known_dump_date);
        assert_eq!(groups[0].entries[0].file_name, "00000000");
        assert_eq!(groups[1].date, NaiveDate::from_ymd_opt(2018, 11, 17));
        assert!(!groups[1].known_dump_date);
        assert_eq!(groups[1].entries.len(), 1);
        assert_eq!(groups[1].entries[0].force_name(), "cetk.deadbeef");
        assert_eq!(groups[1].entries[0].hashes.size, None);
    }

    #[test]
    fn test_contributors_without_files_are_omitted() {
        let record = test_record("000300044b474645", &[Language::En]);
        let contributor = Contributor { name: "Other".to_owned(), tool: "Custom".to_owned(), ..Default::default() };
        let entries = vec![entry("cetk", true, Some(20))];
        let groups = source_groups("Me", &[contributor], &record, &entries);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].dumper, "Me");
        assert!(source_groups("Me", &[], &record, &[]).is_empty());
    }
}
