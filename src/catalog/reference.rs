// catalog/reference.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements loading the two column reference tables that describe contributors' dumps, title name
// overrides, 3DS ports and known Title Keys.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use chrono::NaiveDate;
use log::warn;
use thiserror::Error;
use crate::title::hasher::HashCollection;
use crate::title::TitleId;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference table {path:?} could not be opened")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reference table {path:?} is not valid CSV")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Reads the rows of a reference table as key/value pairs. The first row is a header, lines
/// starting with '#' are comments, and any columns past the first are joined back together with
/// commas to form the value.
pub fn parse_table(reader: impl Read, path: &Path) -> Result<Vec<(String, String)>, ReferenceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|source| ReferenceError::Csv { path: path.to_path_buf(), source })?;
        let Some(key) = record.get(0).map(str::trim).filter(|k| !k.is_empty()) else {
            continue;
        };
        let value = record.iter().skip(1).collect::<Vec<_>>().join(",");
        rows.push((key.to_owned(), value.trim().to_owned()));
    }
    Ok(rows)
}

pub fn read_table(path: &Path) -> Result<Vec<(String, String)>, ReferenceError> {
    let file = File::open(path).map_err(|source| ReferenceError::Open { path: path.to_path_buf(), source })?;
    parse_table(file, path)
}

fn parse_title_id(value: &str, path: &Path) -> Option<TitleId> {
    match value.trim().parse() {
        Ok(title_id) => Some(title_id),
        Err(err) => {
            warn!("Skipping row of {:?} with bad Title ID {:?}: {}", path, value, err);
            None
        }
    }
}

/// Splits a "<title id> <file name>" key.
fn parse_file_key(value: &str, path: &Path) -> Option<(TitleId, String)> {
    let Some((title_id, file_name)) = value.trim().split_once(' ') else {
        warn!("Skipping row of {:?} without a file name: {:?}", path, value);
        return None;
    };
    Some((parse_title_id(title_id, path)?, file_name.trim().to_lowercase()))
}

/// Loads the set of files a contributor dumped, as (Title ID, file name) pairs. File names are
/// lowercased.
pub fn load_membership(path: &Path) -> Result<HashSet<(TitleId, String)>, ReferenceError> {
    Ok(read_table(path)?
        .into_iter()
        .filter_map(|(title_id, file_name)| Some((parse_title_id(&title_id, path)?, file_name.to_lowercase())))
        .collect())
}

/// Loads the dates on which a contributor dumped individual files, keyed by Title ID and file name.
pub fn load_dump_dates(path: &Path) -> Result<HashMap<(TitleId, String), NaiveDate>, ReferenceError> {
    let mut dates = HashMap::new();
    for (key, date) in read_table(path)? {
        let Some(key) = parse_file_key(&key, path) else {
            continue;
        };
        match NaiveDate::parse_from_str(&date, DATE_FORMAT) {
            Ok(date) => {
                dates.insert(key, date);
            }
            Err(err) => warn!("Skipping row of {:?} with bad date {:?}: {}", path, date, err),
        }
    }
    Ok(dates)
}

/// Loads display names that replace the ones derived from the banner.
pub fn load_title_overrides(path: &Path) -> Result<HashMap<TitleId, String>, ReferenceError> {
    Ok(read_table(path)?
        .into_iter()
        .filter(|(_, name)| !name.is_empty())
        .filter_map(|(title_id, name)| Some((parse_title_id(&title_id, path)?, name)))
        .collect())
}

/// Loads the map from DSi Title IDs to the Title IDs of their 3DS ports.
pub fn load_port_map(path: &Path) -> Result<HashMap<TitleId, TitleId>, ReferenceError> {
    Ok(read_table(path)?
        .into_iter()
        .filter_map(|(dsi, ctr)| Some((parse_title_id(&dsi, path)?, parse_title_id(&ctr, path)?)))
        .collect())
}

/// Loads the tickets a contributor holds that differ from the local ones, given as
/// "<crc32> <md5> <sha1>". Their size is unknown.
pub fn load_replacements(path: &Path) -> Result<HashMap<TitleId, HashCollection>, ReferenceError> {
    let mut replacements = HashMap::new();
    for (title_id, hashes) in read_table(path)? {
        let Some(title_id) = parse_title_id(&title_id, path) else {
            continue;
        };
        let parts: Vec<&str> = hashes.split_whitespace().collect();
        let &[crc32, md5, sha1] = &parts[..] else {
            warn!("Skipping row of {:?} for {} without exactly 3 hashes", path, title_id);
            continue;
        };
        replacements.insert(title_id, HashCollection {
            size: None,
            crc32: crc32.to_lowercase(),
            md5: md5.to_lowercase(),
            sha1: sha1.to_lowercase(),
            sha256: String::new(),
        });
    }
    Ok(replacements)
}

/// Loads known decrypted Title Keys, given as 32 hex characters.
pub fn load_title_keys(path: &Path) -> Result<HashMap<TitleId, [u8; 16]>, ReferenceError> {
    let mut keys = HashMap::new();
    for (title_id, key) in read_table(path)? {
        let Some(title_id) = parse_title_id(&title_id, path) else {
            continue;
        };
        let mut title_key = [0u8; 16];
        match hex::decode_to_slice(key.trim(), &mut title_key) {
            Ok(()) => {
                keys.insert(title_id, title_key);
            }
            Err(err) => warn!("Skipping row of {:?} for {} with a bad Title Key: {}", path, title_id, err),
        }
    }
    Ok(keys)
}
