// title/mod.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Root for all title-related modules and implementation of the TitleId type shared by the rest of
// the crate.

pub mod crypto;
pub mod decrypt;
pub mod filetypes;
pub mod hasher;
pub mod headers;
pub mod keygen;
pub mod rom;
pub mod ticket;
pub mod tmd;
pub mod versions;

use std::error::Error;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum TitleIdError {
    BadLength(usize),
    BadHex(hex::FromHexError),
}

impl fmt::Display for TitleIdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TitleIdError::BadLength(len) => write!(f, "a Title ID must be 16 hex characters long, got {}", len),
            TitleIdError::BadHex(_) => f.write_str("the provided Title ID is not valid hex"),
        }
    }
}

impl Error for TitleIdError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
/// An 8-byte DSi Title ID. The high word identifies the title type, the low word is the title's
/// game code in ASCII, so its final byte doubles as the region character.
pub struct TitleId([u8; 8]);

impl TitleId {
    pub fn new(bytes: [u8; 8]) -> Self {
        TitleId(bytes)
    }

    pub fn bytes(&self) -> [u8; 8] {
        self.0
    }

    /// Gets the region-agnostic family key, which is the first 14 hex characters of the Title ID.
    /// All regional releases of one title share it.
    pub fn family_key(&self) -> String {
        hex::encode(&self.0[..7])
    }

    /// Gets the final byte of the Title ID, which is the region character of its game code.
    pub fn region_byte(&self) -> u8 {
        self.0[7]
    }

    /// Reads a Title ID from the name of a title directory.
    pub fn from_dir_name(dir: &Path) -> Option<Self> {
        dir.file_name()?.to_str()?.parse().ok()
    }

    /// Derives the 4 character game code from the low word of the Title ID.
    pub fn game_code(&self) -> String {
        self.0[4..].iter().map(|b| *b as char).collect()
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for TitleId {
    type Err = TitleIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(TitleIdError::BadLength(s.len()));
        }
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(s, &mut bytes).map_err(TitleIdError::BadHex)?;
        Ok(TitleId(bytes))
    }
}

impl TryFrom<String> for TitleId {
    type Error = TitleIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TitleId> for String {
    fn from(value: TitleId) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_title_id() {
        let tid: TitleId = "00030004484E4541".parse().unwrap();
        assert_eq!(tid.to_string(), "00030004484e4541");
        assert_eq!(tid.game_code(), "HNEA");
        assert_eq!(tid.region_byte(), b'A');
        assert_eq!(tid.family_key(), "00030004484e45");
    }

    #[test]
    fn test_family_key_shared_across_regions() {
        let usa: TitleId = "000300044b474645".parse().unwrap();
        let jpn: TitleId = "000300044b47464a".parse().unwrap();
        assert_eq!(usa.family_key(), jpn.family_key());
        assert_ne!(usa, jpn);
    }

    #[test]
    fn test_from_dir_name() {
        let tid = TitleId::from_dir_name(Path::new("archive/00030004484e4541")).unwrap();
        assert_eq!(tid.game_code(), "HNEA");
        assert!(TitleId::from_dir_name(Path::new("archive/logs")).is_none());
    }

    #[test]
    fn test_bad_title_ids() {
        assert!(matches!("0003".parse::<TitleId>(), Err(TitleIdError::BadLength(4))));
        assert!(matches!("000300044g4e4541".parse::<TitleId>(), Err(TitleIdError::BadHex(_))));
    }
}
