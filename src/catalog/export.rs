// catalog/export.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the flat CSV exports written alongside the catalog: a media sheet summarizing how the
// languages of every title were determined, and a table of catalog names by Title ID.

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::catalog::family::CatalogEntry;
use crate::catalog::record::TitleRecord;
use crate::locale::language::Language;
use crate::title::rom::TitleSlot;

pub const TITLES_FILE_NAME: &str = "titles.csv";

/// The languages that have a column of their own in the media sheet, in column order.
pub const MEDIA_LANGUAGES: [Language; 8] = [
    Language::En, Language::Ja, Language::Fr, Language::De,
    Language::Es, Language::It, Language::Zh, Language::Ko,
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("the export could not be written")]
    Csv(#[from] csv::Error),
    #[error("the export could not be written")]
    IO(#[from] std::io::Error),
}

/// Gets the path of the title table, which sits next to the media sheet.
pub fn titles_path(media_path: &Path) -> PathBuf {
    media_path.with_file_name(TITLES_FILE_NAME)
}

fn media_header() -> Vec<&'static str> {
    let mut header = vec!["Archive ID", "Language Determination Method", "Nebulously-Determined Languages", "Only Title"];
    header.extend(MEDIA_LANGUAGES.iter().map(|l| l.english_name()));
    header
}

/// Builds the media sheet row of a title. Titles only fill the columns of confirmed languages, and
/// the "Only Title" column only when the title has exactly one language.
pub fn media_row(record: &TitleRecord, entry: &CatalogEntry) -> Vec<String> {
    let languages = &record.languages;
    let only_title = if languages.confirmed.len() == 1 {
        record.titles.title_only(TitleSlot::for_language(record.primary_language)).unwrap_or_default()
    } else {
        String::new()
    };
    let mut row = vec![
        entry.archive_number(),
        languages.method.description().to_owned(),
        languages.nebulous.iter().map(|l| l.code()).collect::<Vec<_>>().join(","),
        only_title,
    ];
    for language in MEDIA_LANGUAGES {
        let title = if record.has_language(language) {
            record.titles.title_only(TitleSlot::for_language(language)).unwrap_or_default()
        } else {
            String::new()
        };
        row.push(title);
    }
    row
}

pub fn write_media<W: Write>(inner: W, records: &[TitleRecord], entries: &[CatalogEntry]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(inner);
    writer.write_record(media_header())?;
    for entry in entries {
        writer.write_record(media_row(&records[entry.record], entry))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_titles<W: Write>(inner: W, records: &[TitleRecord], entries: &[CatalogEntry]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(inner);
    writer.write_record(["Title ID", "No-Intro Title"])?;
    for entry in entries {
        let record = &records[entry.record];
        writer.write_record([record.title_id.to_string().as_str(), record.display_name.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the media sheet to a file, and the title table next to it.
pub fn write_media_files(media_path: &Path, records: &[TitleRecord], entries: &[CatalogEntry]) -> Result<PathBuf, ExportError> {
    write_media(std::fs::File::create(media_path)?, records, entries)?;
    let titles_path = titles_path(media_path);
    write_titles(std::fs::File::create(&titles_path)?, records, entries)?;
    Ok(titles_path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::family::assign_archive_ids;
    use crate::catalog::record::test::test_record;
    use crate::locale::resolver::DeterminationMethod;
    use crate::title::rom::LocalizedTitleSet;

    fn titled_record() -> TitleRecord {
        let mut record = test_record("000300044b474645", &[Language::En, Language::Fr]);
        let mut slots: [Option<String>; 8] = Default::default();
        slots[TitleSlot::English.index()] = Some("Game, Deluxe\nNintendo".to_owned());
        slots[TitleSlot::French.index()] = Some("Jeu\nNintendo".to_owned());
        slots[TitleSlot::German.index()] = Some("Spiel\nNintendo".to_owned());
        record.titles = LocalizedTitleSet::new(slots);
        record.languages.nebulous = vec![Language::Fr];
        record.languages.method = DeterminationMethod::Classifier;
        record
    }

    #[test]
    fn test_media_row() {
        let records = vec![titled_record()];
        let entries = assign_archive_ids(&records);
        let row = media_row(&records[0], &entries[0]);
        assert_eq!(row.len(), 12);
        assert_eq!(row[0], "0001");
        assert_eq!(row[1], "Guessed From ROM Titles");
        assert_eq!(row[2], "Fr");
        assert_eq!(row[3], "");
        assert_eq!(row[4], "Game, Deluxe");
        assert_eq!(row[6], "Jeu");
        // German has a banner title but isn't a confirmed language.
        assert_eq!(row[7], "");
    }

    #[test]
    fn test_only_title() {
        let mut record = titled_record();
        record.languages.confirmed = [Language::Fr].into_iter().collect();
        record.primary_language = Language::Fr;
        let records = vec![record];
        let entries = assign_archive_ids(&records);
        assert_eq!(media_row(&records[0], &entries[0])[3], "Jeu");
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![titled_record()];
        let entries = assign_archive_ids(&records);
        let media_path = dir.path().join("media.csv");
        let titles = write_media_files(&media_path, &records, &entries).unwrap();
        assert_eq!(titles, dir.path().join(TITLES_FILE_NAME));
        let media = std::fs::read_to_string(&media_path).unwrap();
        let mut lines = media.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Archive ID,Language Determination Method,Nebulously-Determined Languages,Only Title,English,Japanese,French,German,Spanish,Italian,Chinese,Korean"
        );
        assert!(lines.next().unwrap().contains("\"Game, Deluxe\""));
        let titles = std::fs::read_to_string(&titles).unwrap();
        assert_eq!(titles, "Title ID,No-Intro Title\n000300044b474645,Game E\n");
    }
}
