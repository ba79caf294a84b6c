// catalog/record.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the information collection pass, which turns every title directory of an archive into
// a TitleRecord, and the checkpoint file that caches the results between runs.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;
use crate::catalog::name::{canonical_display_name, name_source, Transliterator};
use crate::catalog::CatalogError;
use crate::locale::classifier::LanguageClassifier;
use crate::locale::language::Language;
use crate::locale::region::{primary_region, region_from_code, Region, RegionSet};
use crate::locale::resolver::{authoritative_languages, resolve_languages, LanguageSource, ResolvedLanguages};
use crate::title::filetypes::{content_id, meta_id_position, TitleDirListing};
use crate::title::rom::{LocalizedTitleSet, RomInfo, TitleSlot};
use crate::title::ticket::Ticket;
use crate::title::tmd::TMD;
use crate::title::TitleId;

/// Titles with fewer TMD and content files than this are treated as incomplete rips.
pub const MIN_CORE_FILES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFile {
    pub path: PathBuf,
    pub title_version: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmdFile {
    pub path: PathBuf,
    pub title_version: u16,
    /// The Content IDs listed in the TMD, in record order.
    pub content_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A decrypted content, along with what's known about it from its TMD and ROM header.
pub struct ContentFile {
    pub path: PathBuf,
    pub content_id: u32,
    /// The title version of the oldest TMD listing this content.
    pub version: Option<u16>,
    /// The game code and game title from the content's ROM header.
    pub serial: Option<String>,
}

impl ContentFile {
    /// Gets the path of the encrypted original, which sits next to the decrypted copy.
    pub fn encrypted_path(&self) -> PathBuf {
        self.path.with_file_name(format!("{:08x}", self.content_id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInventory {
    pub tickets: Vec<TicketFile>,
    pub tmds: Vec<TmdFile>,
    pub meta_ids: Vec<PathBuf>,
    pub misc: Vec<PathBuf>,
    pub encrypted_contents: Vec<PathBuf>,
    pub decrypted_contents: Vec<ContentFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Everything the catalog needs to know about one title directory.
pub struct TitleRecord {
    pub title_id: TitleId,
    pub title_dir: PathBuf,
    pub game_code: String,
    pub game_title: String,
    pub region_code: char,
    pub regions: RegionSet,
    pub primary_region: Region,
    pub titles: LocalizedTitleSet,
    pub languages: ResolvedLanguages,
    pub primary_language: Language,
    pub display_name: String,
    pub system: bool,
    pub deleted: bool,
    /// The decrypted content that titles and region were read from, which is the first content
    /// of the newest TMD.
    pub newest_content: PathBuf,
    pub inventory: ArtifactInventory,
}

impl TitleRecord {
    pub fn has_language(&self, language: Language) -> bool {
        self.languages.confirmed.contains(&language)
    }
}

/// The collaborators and reference data used while collecting titles.
pub struct CollectionContext<'a> {
    pub classifier: &'a dyn LanguageClassifier,
    pub language_source: &'a dyn LanguageSource,
    pub transliterator: &'a dyn Transliterator,
    pub title_overrides: &'a HashMap<TitleId, String>,
}

/// Gets the index of the newest TMD, which is the one with the highest title version. Later TMDs
/// win ties.
pub fn newest_tmd(tmds: &[TmdFile]) -> Option<usize> {
    let mut newest: Option<usize> = None;
    for (i, tmd) in tmds.iter().enumerate().rev() {
        if newest.is_none_or(|n| tmd.title_version > tmds[n].title_version) {
            newest = Some(i);
        }
    }
    newest
}

/// Checks that the TMD copies stored at the special metadata Content IDs line up with the TMDs.
/// Historical rips are often incomplete, so problems are only warned about.
pub fn cross_check_metadata(title_id: &TitleId, tmd_count: usize, meta_ids: &[PathBuf]) -> bool {
    let mut positions: Vec<u16> = meta_ids
        .iter()
        .filter_map(|path| path.file_name().and_then(|f| f.to_str()).and_then(meta_id_position))
        .collect();
    positions.sort_unstable();
    let mut consistent = true;
    if positions.len() != tmd_count {
        warn!("Title {} has {} TMDs but {} metadata ID files", title_id, tmd_count, positions.len());
        consistent = false;
    }
    for (expected, position) in positions.iter().enumerate() {
        if *position as usize != expected {
            warn!("Title {} is missing metadata ID file {} of its sequence", title_id, expected);
            consistent = false;
            break;
        }
    }
    consistent
}

fn rom_serial(rom: &RomInfo) -> Option<String> {
    if !rom.valid {
        return None;
    }
    let parts: Vec<&str> = [rom.game_code.as_str(), rom.game_title.trim()].into_iter().filter(|p| !p.is_empty()).collect();
    if parts.is_empty() { None } else { Some(parts.join(",")) }
}

fn read_tmds(paths: &[PathBuf]) -> Result<Vec<TmdFile>, CatalogError> {
    let mut tmds = Vec::with_capacity(paths.len());
    for path in paths {
        let tmd = TMD::from_bytes(&fs::read(path)?).map_err(|source| CatalogError::TMD { path: path.clone(), source })?;
        tmds.push(TmdFile {
            path: path.clone(),
            title_version: tmd.title_version,
            content_ids: tmd.content_records.iter().map(|r| r.content_id).collect(),
        });
    }
    Ok(tmds)
}

fn read_tickets(paths: &[PathBuf]) -> Result<Vec<TicketFile>, CatalogError> {
    let mut tickets = Vec::with_capacity(paths.len());
    for path in paths {
        let ticket = Ticket::from_bytes(&fs::read(path)?).map_err(|source| CatalogError::Ticket { path: path.clone(), source })?;
        tickets.push(TicketFile { path: path.clone(), title_version: ticket.title_version });
    }
    Ok(tickets)
}

/// Reads every decrypted content, noting its version and serial. Returns the ROM info of each
/// content along with it so the banner of the newest one can be used without reading it twice.
fn read_contents(paths: &[PathBuf], tmds: &[TmdFile]) -> Result<Vec<(ContentFile, RomInfo)>, CatalogError> {
    let mut contents = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(cid) = path.file_name().and_then(|f| f.to_str()).and_then(content_id) else {
            continue;
        };
        let rom = RomInfo::from_file(path)?;
        let version = tmds.iter().find(|tmd| tmd.content_ids.contains(&cid)).map(|tmd| tmd.title_version);
        contents.push((
            ContentFile { path: path.clone(), content_id: cid, version, serial: rom_serial(&rom) },
            rom,
        ));
    }
    Ok(contents)
}

/// Collects everything about one title directory.
pub fn collect_title(title_dir: &Path, ctx: &CollectionContext) -> Result<TitleRecord, CatalogError> {
    let title_id = TitleId::from_dir_name(title_dir).ok_or_else(|| CatalogError::BadTitleDirectory(title_dir.to_path_buf()))?;
    let listing = TitleDirListing::read(title_dir)?;
    let count = listing.core_file_count();
    if count < MIN_CORE_FILES {
        return Err(CatalogError::TooFewFiles { title_id, count });
    }
    let tmds = read_tmds(&listing.tmds)?;
    let newest = newest_tmd(&tmds).ok_or(CatalogError::MissingTmd(title_id))?;
    let tickets = read_tickets(&listing.tickets)?;
    cross_check_metadata(&title_id, tmds.len(), &listing.meta_ids);

    let contents = read_contents(&listing.decrypted_contents, &tmds)?;
    if contents.len() != listing.encrypted_contents.len() {
        error!(
            "Title {} has {} decrypted contents but {} encrypted contents",
            title_id, contents.len(), listing.encrypted_contents.len()
        );
    }
    let referenced: BTreeSet<u32> = tmds.iter().flat_map(|tmd| tmd.content_ids.iter().copied()).collect();
    for cid in &referenced {
        if !contents.iter().any(|(c, _)| c.content_id == *cid) {
            error!("Title {} has no decrypted copy of content {:08x}", title_id, cid);
        }
    }

    let (newest_content, rom) = tmds[newest]
        .content_ids
        .first()
        .and_then(|cid| contents.iter().find(|(c, _)| c.content_id == *cid))
        .map(|(c, rom)| (c.path.clone(), rom.clone()))
        .ok_or(CatalogError::MissingNewestContent(title_id))?;
    if !rom.valid {
        warn!("The newest content of title {} ({:?}) is not a valid ROM, so it has no banner titles", title_id, newest_content);
    }
    let region_code = match rom.region_code {
        Some(code) => code,
        None => {
            let code = title_id.region_byte() as char;
            warn!("Title {} has no region character in its game code, using {:?} from its Title ID", title_id, code);
            code
        }
    };
    let game_code = if rom.valid { rom.game_code.clone() } else { title_id.game_code() };
    let regions = region_from_code(region_code);
    let is_system = rom.has_system_game_code();
    let authoritative = authoritative_languages(ctx.language_source, &title_id, regions);
    let languages = resolve_languages(&title_id, &rom.titles, regions, is_system, authoritative.as_deref(), ctx.classifier);
    let primary_language = languages.primary_language(regions);
    let system = is_system || rom.titles.get_unless_default(TitleSlot::for_language(primary_language)).is_none();
    let display_name = display_name(&title_id, &rom, primary_language, ctx);
    debug!("Title {} is {:?} in {:?} ({:?})", title_id, display_name, languages.confirmed, languages.method);

    Ok(TitleRecord {
        title_id,
        title_dir: title_dir.to_path_buf(),
        game_code,
        game_title: rom.game_title.clone(),
        region_code,
        regions,
        primary_region: primary_region(regions),
        titles: rom.titles,
        languages,
        primary_language,
        display_name,
        system,
        deleted: listing.deleted,
        newest_content,
        inventory: ArtifactInventory {
            tickets,
            tmds,
            meta_ids: listing.meta_ids,
            misc: listing.misc,
            encrypted_contents: listing.encrypted_contents,
            decrypted_contents: contents.into_iter().map(|(c, _)| c).collect(),
        },
    })
}

fn display_name(title_id: &TitleId, rom: &RomInfo, primary: Language, ctx: &CollectionContext) -> String {
    if let Some(name) = ctx.title_overrides.get(title_id) {
        return name.clone();
    }
    match name_source(&rom.titles, primary) {
        Some((title, subtitle, language)) => canonical_display_name(&title, subtitle.as_deref(), language, ctx.transliterator),
        None if !rom.game_title.trim().is_empty() => {
            warn!("Title {} has no localized banner titles, naming it after its game title", title_id);
            canonical_display_name(&rom.game_title, None, Language::En, ctx.transliterator)
        }
        None => {
            warn!("Title {} has neither banner titles nor a game title, naming it after its game code", title_id);
            title_id.game_code()
        }
    }
}

/// Lists the title directories directly inside an archive directory, in Title ID order.
pub fn title_directories(archive_dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(archive_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() && TitleId::from_dir_name(entry.path()).is_some() {
            dirs.push(entry.into_path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Collects every title of an archive in parallel. Titles that can't be collected are logged and
/// left out, and the rest are returned sorted by Title ID.
pub fn collect_archive(archive_dir: &Path, ctx: &CollectionContext) -> Result<Vec<TitleRecord>, CatalogError> {
    let dirs = title_directories(archive_dir)?;
    info!("Collecting information on {} titles in {:?}", dirs.len(), archive_dir);
    let mut records: Vec<TitleRecord> = dirs
        .par_iter()
        .filter_map(|dir| match collect_title(dir, ctx) {
            Ok(record) => Some(record),
            Err(err) => {
                error!("Skipping {:?}: {}", dir, err);
                None
            }
        })
        .collect();
    records.sort_by(|a, b| a.title_id.cmp(&b.title_id));
    info!("Collected {} of {} titles", records.len(), dirs.len());
    Ok(records)
}

/// Loads the collected titles from a checkpoint, or collects them and writes the checkpoint when
/// it doesn't exist yet. A checkpoint that exists but can't be read stops the run, since the
/// archive numbering can't be trusted without every title.
pub fn load_or_collect(checkpoint: Option<&Path>, archive_dir: &Path, ctx: &CollectionContext) -> Result<Vec<TitleRecord>, CatalogError> {
    if let Some(path) = checkpoint.filter(|p| p.exists()) {
        info!("Loading collected titles from checkpoint {:?}", path);
        let text = fs::read_to_string(path)?;
        return serde_json::from_str(&text).map_err(|source| CatalogError::Checkpoint { path: path.to_path_buf(), source });
    }
    let records = collect_archive(archive_dir, ctx)?;
    if let Some(path) = checkpoint {
        fs::write(path, serde_json::to_string(&records)?)?;
        debug!("Wrote checkpoint {:?}", path);
    }
    Ok(records)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::locale::resolver::DeterminationMethod;
    use crate::title::decrypt::decrypted_path;

    /// Builds a bare record for tests that only care about identity and languages.
    pub(crate) fn test_record(title_id: &str, languages: &[Language]) -> TitleRecord {
        let title_id: TitleId = title_id.parse().unwrap();
        let region_code = title_id.region_byte() as char;
        let regions = region_from_code(region_code);
        TitleRecord {
            title_id,
            title_dir: PathBuf::from(title_id.to_string()),
            game_code: title_id.game_code(),
            game_title: "GAME".to_owned(),
            region_code,
            regions,
            primary_region: primary_region(regions),
            titles: LocalizedTitleSet::default(),
            languages: ResolvedLanguages {
                confirmed: languages.iter().copied().collect(),
                nebulous: Vec::new(),
                method: DeterminationMethod::Banner,
            },
            primary_language: languages.first().copied().unwrap_or(Language::En),
            display_name: format!("Game {}", region_code),
            system: false,
            deleted: false,
            newest_content: decrypted_path(&Path::new(&title_id.to_string()).join("00000000")),
            inventory: ArtifactInventory::default(),
        }
    }

    fn tmd_file(title_version: u16) -> TmdFile {
        TmdFile { path: PathBuf::from("tmd"), title_version, content_ids: vec![0] }
    }

    #[test]
    fn test_newest_tmd() {
        assert_eq!(newest_tmd(&[]), None);
        assert_eq!(newest_tmd(&[tmd_file(0), tmd_file(256), tmd_file(16)]), Some(1));
        assert_eq!(newest_tmd(&[tmd_file(256), tmd_file(256)]), Some(1));
    }

    #[test]
    fn test_cross_check_metadata() {
        let tid: TitleId = "000300044b474645".parse().unwrap();
        let meta = |names: &[&str]| names.iter().map(PathBuf::from).collect::<Vec<_>>();
        assert!(cross_check_metadata(&tid, 2, &meta(&["fffeffff", "fffefffe"])));
        assert!(!cross_check_metadata(&tid, 3, &meta(&["fffeffff", "fffefffe"])));
        assert!(!cross_check_metadata(&tid, 2, &meta(&["fffeffff", "fffefffd"])));
        assert!(cross_check_metadata(&tid, 0, &[]));
    }

    #[test]
    fn test_rom_serial() {
        let rom = RomInfo { valid: true, game_title: "GAME TITLE  ".to_owned(), game_code: "KGFE".to_owned(), ..Default::default() };
        assert_eq!(rom_serial(&rom).as_deref(), Some("KGFE,GAME TITLE"));
        let untitled = RomInfo { valid: true, game_code: "KGFE".to_owned(), ..Default::default() };
        assert_eq!(rom_serial(&untitled).as_deref(), Some("KGFE"));
        assert_eq!(rom_serial(&RomInfo::default()), None);
    }

    #[test]
    fn test_checkpoint_is_fatal_when_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("checkpoint.json");
        fs::write(&checkpoint, "not json").unwrap();
        let classifier = crate::locale::classifier::WhatlangClassifier::default();
        let ctx = CollectionContext {
            classifier: &classifier,
            language_source: &crate::locale::resolver::NoLanguageSource,
            transliterator: &crate::catalog::name::DeunicodeTransliterator,
            title_overrides: &HashMap::new(),
        };
        let result = load_or_collect(Some(&checkpoint), dir.path(), &ctx);
        assert!(matches!(result, Err(CatalogError::Checkpoint { .. })));
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("checkpoint.json");
        let records = vec![test_record("000300044b474645", &[Language::En, Language::Fr])];
        fs::write(&checkpoint, serde_json::to_string(&records).unwrap()).unwrap();
        let classifier = crate::locale::classifier::WhatlangClassifier::default();
        let ctx = CollectionContext {
            classifier: &classifier,
            language_source: &crate::locale::resolver::NoLanguageSource,
            transliterator: &crate::catalog::name::DeunicodeTransliterator,
            title_overrides: &HashMap::new(),
        };
        assert_eq!(load_or_collect(Some(&checkpoint), dir.path(), &ctx).unwrap(), records);
    }
}
