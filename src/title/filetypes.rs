// title/filetypes.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Common code for identifying the role of each file in a title directory ripped from the NUS.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use regex::{Regex, RegexBuilder};
use crate::title::hasher::CHECKS_SUFFIX;
use crate::title::headers::HEADERS_SUFFIX;

pub const TICKET_FILE_NAME: &str = "cetk";
pub const DELETED_MARKER_FILE_NAME: &str = "DeletedTitle.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    Ticket,
    Tmd,
    /// A copy of a TMD fetched from one of the special content IDs counting down from fffeffff.
    MetaId,
    EncryptedContent,
    Misc,
    DecryptedContent,
    DeletedMarker,
}

fn pattern(expr: &str) -> Regex {
    // Every pattern below is a literal, so building one can only fail if it is edited badly.
    RegexBuilder::new(expr).case_insensitive(true).build().expect("file role patterns are valid")
}

// Checked in order, the first match wins.
static ROLE_PATTERNS: LazyLock<[(FileRole, Regex); 7]> = LazyLock::new(|| [
    (FileRole::Ticket, pattern(r"cetk")),
    (FileRole::Tmd, pattern(r"tmd(\.\d+)?$")),
    (FileRole::MetaId, pattern(r"fffe[\da-f]{4}$")),
    (FileRole::EncryptedContent, pattern(r"^[\da-e][\da-f]{7}$")),
    (FileRole::Misc, pattern(r"^[\df][\da-f]{7}$")),
    (FileRole::DecryptedContent, pattern(r"^[\da-f]{8}\.\w+$")),
    (FileRole::DeletedMarker, pattern(r"DeletedTitle\.txt")),
]);

/// Whether a file is one of the header or hash sidecars kept alongside downloaded files.
pub fn is_sidecar(file_name: &str) -> bool {
    file_name.ends_with(HEADERS_SUFFIX) || file_name.ends_with(CHECKS_SUFFIX)
}

pub fn identify_file_role(file_name: &str) -> Option<FileRole> {
    if is_sidecar(file_name) {
        return None;
    }
    ROLE_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(file_name))
        .map(|(role, _)| *role)
}

/// Identifies the role of a file from the final component of its path.
pub fn identify_path_role(path: &Path) -> Option<FileRole> {
    identify_file_role(path.file_name()?.to_str()?)
}

/// Gets the numeric version suffix of a TMD file name, e.g. 256 for "tmd.256". An unversioned
/// "tmd" has no suffix.
pub fn tmd_suffix(file_name: &str) -> Option<u32> {
    file_name.rsplit_once('.').and_then(|(_, suffix)| suffix.parse().ok())
}

/// Gets the position of a "fffeXXXX" file in the sequence counting down from fffeffff, so that
/// fffeffff is 0 and fffefffe is 1.
pub fn meta_id_position(file_name: &str) -> Option<u16> {
    let suffix = file_name.get(file_name.len().checked_sub(4)?..)?;
    u16::from_str_radix(suffix, 16).ok().map(|low| 0xFFFF - low)
}

/// Gets the Content ID of an encrypted content file, or of the content a decrypted file came from.
pub fn content_id(file_name: &str) -> Option<u32> {
    u32::from_str_radix(file_name.get(..8)?, 16).ok()
}

/// The files of one title directory, sorted into their roles. Every list is in file name order,
/// except TMDs, which are ordered by their version suffix with the unversioned "tmd" first.
#[derive(Debug, Default, Clone)]
pub struct TitleDirListing {
    pub tickets: Vec<PathBuf>,
    pub tmds: Vec<PathBuf>,
    pub meta_ids: Vec<PathBuf>,
    pub encrypted_contents: Vec<PathBuf>,
    pub misc: Vec<PathBuf>,
    pub decrypted_contents: Vec<PathBuf>,
    pub deleted: bool,
}

impl TitleDirListing {
    pub fn read(dir: &Path) -> Result<Self, std::io::Error> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        let mut listing = TitleDirListing::default();
        for path in paths {
            match identify_path_role(&path) {
                Some(FileRole::Ticket) => listing.tickets.push(path),
                Some(FileRole::Tmd) => listing.tmds.push(path),
                Some(FileRole::MetaId) => listing.meta_ids.push(path),
                Some(FileRole::EncryptedContent) => listing.encrypted_contents.push(path),
                Some(FileRole::Misc) => listing.misc.push(path),
                Some(FileRole::DecryptedContent) => listing.decrypted_contents.push(path),
                Some(FileRole::DeletedMarker) => listing.deleted = true,
                None => {}
            }
        }
        listing.tmds.sort_by_key(|path| path.file_name().and_then(|f| f.to_str()).and_then(tmd_suffix));
        Ok(listing)
    }

    /// The number of files that make up the title itself, used to spot incomplete rips.
    pub fn core_file_count(&self) -> usize {
        self.tmds.len() + self.encrypted_contents.len() + self.decrypted_contents.len()
    }
}
