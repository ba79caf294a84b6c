// title/rom.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements parsing of the header and banner of a decrypted DSiWare ROM, which is where a title's
// game code, region and localized titles come from.

use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use byteorder::{LittleEndian, ReadBytesExt};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::locale::language::Language;

const GAME_TITLE_OFFSET: usize = 0x0;
const GAME_TITLE_SIZE: usize = 12;
const GAME_CODE_OFFSET: usize = 0xC;
const GAME_CODE_SIZE: usize = 4;
const BANNER_ADDRESS_OFFSET: u64 = 0x68;
const HEADER_CHECKSUM_OFFSET: usize = 0x15E;
const BANNER_TITLES_OFFSET: u64 = 0x240;
const BANNER_TITLE_SIZE: usize = 0x100;

/// The text that unlocalized banner titles are left filled with.
pub const DEFAULT_TITLE: &str = "default title\ndefault subtitle\ndefault publisher";
/// The first character of the game codes of system titles and utilities.
pub const SYSTEM_GAME_CODE_PREFIX: char = 'H';

#[derive(Debug, Error)]
pub enum RomError {
    #[error("ROM data could not be read")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The fixed order that localized titles are stored in within a banner.
pub enum TitleSlot {
    Japanese = 0,
    English = 1,
    French = 2,
    German = 3,
    Italian = 4,
    Spanish = 5,
    Chinese = 6,
    Korean = 7,
}

impl TitleSlot {
    pub const ALL: [TitleSlot; 8] = [
        TitleSlot::Japanese,
        TitleSlot::English,
        TitleSlot::French,
        TitleSlot::German,
        TitleSlot::Italian,
        TitleSlot::Spanish,
        TitleSlot::Chinese,
        TitleSlot::Korean,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn language(self) -> Language {
        match self {
            TitleSlot::Japanese => Language::Ja,
            TitleSlot::English => Language::En,
            TitleSlot::French => Language::Fr,
            TitleSlot::German => Language::De,
            TitleSlot::Italian => Language::It,
            TitleSlot::Spanish => Language::Es,
            TitleSlot::Chinese => Language::Zh,
            TitleSlot::Korean => Language::Ko,
        }
    }

    /// Gets the banner slot for a language. Languages without a slot of their own read the
    /// English one.
    pub fn for_language(language: Language) -> TitleSlot {
        TitleSlot::ALL
            .into_iter()
            .find(|slot| slot.language() == language)
            .unwrap_or(TitleSlot::English)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Up to 8 localized banner titles. Each is made up of a title line, an optional subtitle line and
/// a publisher line, joined with newlines.
pub struct LocalizedTitleSet {
    slots: [Option<String>; 8],
}

impl LocalizedTitleSet {
    pub fn new(slots: [Option<String>; 8]) -> Self {
        LocalizedTitleSet { slots }
    }

    pub fn get(&self, slot: TitleSlot) -> Option<&str> {
        self.slots[slot.index()].as_deref()
    }

    pub fn is_default(&self, slot: TitleSlot) -> bool {
        self.get(slot).is_some_and(|title| title.eq_ignore_ascii_case(DEFAULT_TITLE))
    }

    /// Gets a title, treating the default placeholder as missing.
    pub fn get_unless_default(&self, slot: TitleSlot) -> Option<&str> {
        if self.is_default(slot) {
            None
        } else {
            self.get(slot)
        }
    }

    /// Gets a title with its lines joined by spaces.
    pub fn friendly(&self, slot: TitleSlot) -> Option<String> {
        let title = self.get_unless_default(slot)?;
        Some(title.split('\n').map(|line| line.trim_matches([' ', '\0'])).collect::<Vec<_>>().join(" "))
    }

    /// Gets a title without its publisher line.
    pub fn title_only(&self, slot: TitleSlot) -> Option<String> {
        let title = self.get_unless_default(slot)?;
        let lines: Vec<&str> = title.split('\n').collect();
        let keep = if lines.len() > 1 { lines.len() - 1 } else { lines.len() };
        Some(lines[..keep].iter().map(|line| line.trim_matches([' ', '\0'])).collect::<Vec<_>>().join(" "))
    }

    /// Iterates over every slot along with its raw title.
    pub fn iter(&self) -> impl Iterator<Item = (TitleSlot, Option<&str>)> + '_ {
        TitleSlot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RomInfo {
    /// Whether the header checksum matched, meaning this is real decrypted content.
    pub valid: bool,
    pub game_title: String,
    pub game_code: String,
    pub region_code: Option<char>,
    pub banner_version: Option<u16>,
    pub titles: LocalizedTitleSet,
}

impl RomInfo {
    /// Parses the header and banner titles of a decrypted ROM. Data with a bad header checksum
    /// (most often the result of decrypting with the wrong key) is returned as invalid rather than
    /// as an error.
    pub fn from_bytes(data: &[u8]) -> Self {
        if data.len() < HEADER_CHECKSUM_OFFSET + 2 {
            return RomInfo::default();
        }
        let expected = u16::from_le_bytes([data[HEADER_CHECKSUM_OFFSET], data[HEADER_CHECKSUM_OFFSET + 1]]);
        if crc16_modbus(&data[..HEADER_CHECKSUM_OFFSET]) != expected {
            return RomInfo::default();
        }
        let game_title: String = data[GAME_TITLE_OFFSET..GAME_TITLE_OFFSET + GAME_TITLE_SIZE]
            .iter()
            .map(|b| *b as char)
            .collect::<String>()
            .trim_end_matches('\0')
            .to_owned();
        let game_code: String = data[GAME_CODE_OFFSET..GAME_CODE_OFFSET + GAME_CODE_SIZE]
            .iter()
            .map(|b| *b as char)
            .collect();
        let region_code = game_code.chars().nth(GAME_CODE_SIZE - 1).filter(|c| *c != '\0');
        if region_code.is_none() {
            warn!("The game code {:?} is not valid", game_code);
        }
        let (banner_version, titles) = match read_banner_titles(data) {
            Ok(banner) => banner,
            Err(_) => {
                warn!("The banner of {} ({}) runs past the end of the ROM", game_title, game_code);
                (None, LocalizedTitleSet::default())
            }
        };
        RomInfo {
            valid: true,
            game_title,
            game_code,
            region_code,
            banner_version,
            titles,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, RomError> {
        let data = fs::read(path)?;
        Ok(RomInfo::from_bytes(&data))
    }

    /// Whether the game code marks this as a system title.
    pub fn has_system_game_code(&self) -> bool {
        self.game_code.starts_with(SYSTEM_GAME_CODE_PREFIX)
    }

    /// Gets a name combining the internal game title and the banner title, for display purposes.
    pub fn proper_name(&self, slot: TitleSlot) -> String {
        match self.titles.friendly(slot) {
            Some(title) => format!("{} - {}", self.game_title, title),
            None => self.game_title.clone(),
        }
    }
}

fn read_banner_titles(data: &[u8]) -> Result<(Option<u16>, LocalizedTitleSet), std::io::Error> {
    let mut buf = Cursor::new(data);
    buf.seek(SeekFrom::Start(BANNER_ADDRESS_OFFSET))?;
    let banner_address = buf.read_u32::<LittleEndian>()? as u64;
    if banner_address == 0 {
        return Ok((None, LocalizedTitleSet::default()));
    }
    buf.seek(SeekFrom::Start(banner_address))?;
    let banner_version = buf.read_u16::<LittleEndian>()?;
    let title_count = match banner_version {
        0x0001 => 6,
        0x0002 => 7,
        _ => 8,
    };
    let mut slots: [Option<String>; 8] = Default::default();
    for (i, slot) in slots.iter_mut().enumerate().take(title_count) {
        buf.seek(SeekFrom::Start(banner_address + BANNER_TITLES_OFFSET + (BANNER_TITLE_SIZE * i) as u64))?;
        let mut raw = [0u8; BANNER_TITLE_SIZE];
        buf.read_exact(&mut raw)?;
        let units: Vec<u16> = raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        let title = String::from_utf16_lossy(&units);
        let title = title.trim_matches(['\0', '\u{FFFF}']);
        if !title.is_empty() {
            *slot = Some(title.to_owned());
        }
    }
    Ok((Some(banner_version), LocalizedTitleSet::new(slots)))
}

/// Calculates the CRC16 (Modbus variant) used for DS header checksums.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= *byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Builds a minimal decrypted ROM with a valid header checksum and a version 1 banner. Room is
    /// left for all 8 title slots.
    pub(crate) fn build_rom(game_title: &str, game_code: &str, titles: &[(TitleSlot, &str)]) -> Vec<u8> {
        let banner_address = 0x200usize;
        let mut data = vec![0u8; banner_address + 0xA40];
        data[..game_title.len()].copy_from_slice(game_title.as_bytes());
        data[GAME_CODE_OFFSET..GAME_CODE_OFFSET + 4].copy_from_slice(game_code.as_bytes());
        data[0x68..0x6C].copy_from_slice(&(banner_address as u32).to_le_bytes());
        let crc = crc16_modbus(&data[..HEADER_CHECKSUM_OFFSET]);
        data[HEADER_CHECKSUM_OFFSET..HEADER_CHECKSUM_OFFSET + 2].copy_from_slice(&crc.to_le_bytes());
        data[banner_address..banner_address + 2].copy_from_slice(&1u16.to_le_bytes());
        for (slot, title) in titles {
            let start = banner_address + 0x240 + 0x100 * slot.index();
            for (i, unit) in title.encode_utf16().enumerate() {
                data[start + i * 2..start + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn test_crc16_modbus() {
        assert_eq!(crc16_modbus(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_parse_rom() {
        let data = build_rom("KGF", "KGFE", &[
            (TitleSlot::English, "Game\nThe Subtitle\nPublisher"),
            (TitleSlot::French, "default title\ndefault subtitle\ndefault publisher"),
        ]);
        let rom = RomInfo::from_bytes(&data);
        assert!(rom.valid);
        assert_eq!(rom.game_title, "KGF");
        assert_eq!(rom.game_code, "KGFE");
        assert_eq!(rom.region_code, Some('E'));
        assert_eq!(rom.banner_version, Some(1));
        assert_eq!(rom.titles.get(TitleSlot::English), Some("Game\nThe Subtitle\nPublisher"));
        assert_eq!(rom.titles.friendly(TitleSlot::English).as_deref(), Some("Game The Subtitle Publisher"));
        assert_eq!(rom.titles.title_only(TitleSlot::English).as_deref(), Some("Game The Subtitle"));
        assert!(rom.titles.get(TitleSlot::French).is_some());
        assert!(rom.titles.get_unless_default(TitleSlot::French).is_none());
        assert!(rom.titles.get(TitleSlot::Japanese).is_none());
        assert_eq!(rom.proper_name(TitleSlot::English), "KGF - Game The Subtitle Publisher");
    }

    #[test]
    fn test_bad_checksum_is_invalid() {
        let mut data = build_rom("KGF", "KGFE", &[]);
        data[0] ^= 0xFF;
        assert!(!RomInfo::from_bytes(&data).valid);
        assert!(!RomInfo::from_bytes(&data[..0x100]).valid);
    }

    #[test]
    fn test_system_game_code() {
        let rom = RomInfo::from_bytes(&build_rom("SYSMENU", "HNAE", &[]));
        assert!(rom.has_system_game_code());
    }

    #[test]
    fn test_banner_version_limits_slots() {
        // A version 1 banner only has 6 slots, so Chinese text past them is never read.
        let data = build_rom("KGF", "KGFC", &[(TitleSlot::Chinese, "Title\nPublisher")]);
        assert!(RomInfo::from_bytes(&data).titles.get(TitleSlot::Chinese).is_none());
    }

    #[test]
    fn test_slot_languages() {
        assert_eq!(TitleSlot::for_language(Language::Ko), TitleSlot::Korean);
        assert_eq!(TitleSlot::for_language(Language::Nl), TitleSlot::English);
        assert_eq!(TitleSlot::Italian.language(), Language::It);
    }
}
