// catalog/dat.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements writing the catalog as a DAT-o-MATIC compatible XML datafile.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use chrono::NaiveDate;
use log::{info, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use thiserror::Error;
use crate::catalog::family::CatalogEntry;
use crate::catalog::provenance::{build_entries, source_groups, Contributor, ProvenanceEntry, SourceGroup};
use crate::catalog::record::TitleRecord;
use crate::locale::language::join_codes;
use crate::locale::region::region_names;

const DOCTYPE: &str = r#"datafile PUBLIC "http://www.logiqx.com/Dats/datafile.dtd" "-//Logiqx//DTD ROM Management Datafile//EN""#;
const DATE_FORMAT: &str = "%Y-%m-%d";
const SYSTEM_MARKER: &str = "System";
const DELETED_MARKER: &str = "Removed";
const ORIGIN: &str = "CDN";
const SECTION: &str = "Trusted Dump";

#[derive(Debug, Error)]
pub enum DatError {
    #[error("the catalog could not be written as XML")]
    Xml(#[from] quick_xml::Error),
    #[error("the catalog could not be written")]
    IO(#[from] std::io::Error),
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Writes a datafile one title at a time. The document is closed by `finish`.
pub struct DatWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> DatWriter<W> {
    /// Starts a datafile, writing everything up to and including its empty header.
    pub fn new(inner: W) -> Result<Self, DatError> {
        let mut writer = Writer::new_with_indent(inner, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::DocType(BytesText::from_escaped(DOCTYPE)))?;
        writer.write_event(Event::Start(BytesStart::new("datafile")))?;
        writer.write_event(Event::Empty(BytesStart::new("header")))?;
        Ok(DatWriter { writer })
    }

    pub fn write_title(&mut self, record: &TitleRecord, entry: &CatalogEntry, groups: &[SourceGroup]) -> Result<(), DatError> {
        let archive_number = entry.archive_number();
        let region = region_names(record.regions);
        let languages = join_codes(record.languages.confirmed.iter().copied());
        let clone = entry.clone.attribute();
        self.writer.write_event(Event::Start(BytesStart::new("game").with_attributes([("name", record.display_name.as_str())])))?;
        self.writer.write_event(Event::Empty(BytesStart::new("archive").with_attributes([
            ("number", archive_number.as_str()),
            ("name", record.display_name.as_str()),
            ("namealt", ""),
            ("region", region.as_str()),
            ("languages", languages.as_str()),
            ("version", ""),
            ("devstatus", ""),
            ("additional", ""),
            ("special1", if record.system { SYSTEM_MARKER } else { "" }),
            ("special2", if record.deleted { DELETED_MARKER } else { "" }),
            ("gameid", ""),
            ("clone", clone.as_str()),
            ("regionalparent", ""),
        ])))?;
        self.writer.write_event(Event::Empty(BytesStart::new("flags").with_attributes([
            ("bios", "0"),
            ("licensed", "1"),
            ("pirate", "0"),
            ("physical", "0"),
            ("complete", "1"),
            ("nodump", "0"),
            ("public", "1"),
            ("dat", "1"),
        ])))?;
        for group in groups.iter().filter(|g| !g.entries.is_empty()) {
            self.write_source(record, group)?;
        }
        self.writer.write_event(Event::End(BytesEnd::new("game")))?;
        Ok(())
    }

    fn write_source(&mut self, record: &TitleRecord, group: &SourceGroup) -> Result<(), DatError> {
        let date = format_date(group.date);
        let title_id = record.title_id.to_string();
        self.writer.write_event(Event::Start(BytesStart::new("source")))?;
        self.writer.write_event(Event::Empty(BytesStart::new("details").with_attributes([
            ("section", SECTION),
            ("rominfo", ""),
            ("dumpdate", date.as_str()),
            ("knowndumpdate", flag(group.known_dump_date)),
            ("releasedate", date.as_str()),
            ("knownreleasedate", "0"),
            ("dumper", group.dumper.as_str()),
            ("project", ""),
            ("session", ""),
            ("tool", group.tool.as_str()),
            ("origin", ORIGIN),
            ("comment1", ""),
            ("comment2", ""),
            ("link1", ""),
            ("link2", ""),
            ("region", ""),
            ("mediatitle", ""),
        ])))?;
        self.writer.write_event(Event::Empty(BytesStart::new("serials").with_attributes([
            ("mediaserial1", ""),
            ("mediaserial2", ""),
            ("pcbserial", ""),
            ("romchipserial1", ""),
            ("romchipserial2", ""),
            ("lockoutserial", ""),
            ("savechipserial", ""),
            ("chipserial", ""),
            ("boxserial", ""),
            ("mediastamp", ""),
            ("boxbarcode", ""),
            ("digitalserial1", title_id.as_str()),
            ("digitalserial2", record.title_id.game_code().as_str()),
        ])))?;
        for entry in &group.entries {
            self.write_rom(entry)?;
        }
        self.writer.write_event(Event::End(BytesEnd::new("source")))?;
        Ok(())
    }

    fn write_rom(&mut self, entry: &ProvenanceEntry) -> Result<(), DatError> {
        let date = format_date(entry.date());
        let size = entry.hashes.size.map(|s| s.to_string()).unwrap_or_default();
        self.writer.write_event(Event::Empty(BytesStart::new("rom").with_attributes([
            ("dirname", ""),
            ("forcename", entry.force_name()),
            ("extension", ""),
            ("item", ""),
            ("date", date.as_str()),
            ("format", entry.format()),
            ("version", entry.version.as_deref().unwrap_or("")),
            ("utype", ""),
            ("size", size.as_str()),
            ("crc", entry.hashes.crc32.as_str()),
            ("md5", entry.hashes.md5.as_str()),
            ("sha1", entry.hashes.sha1.as_str()),
            ("sha256", entry.hashes.sha256.as_str()),
            ("serial", entry.serial.as_deref().unwrap_or("")),
            ("bad", "0"),
        ])))?;
        Ok(())
    }

    /// Closes the datafile and hands back the underlying writer.
    pub fn finish(mut self) -> Result<W, DatError> {
        self.writer.write_event(Event::End(BytesEnd::new("datafile")))?;
        let mut inner = self.writer.into_inner();
        inner.write_all(b"\n")?;
        Ok(inner)
    }
}

/// Writes the whole catalog, walking the numbered entries in order.
pub fn write_catalog<W: Write>(
    inner: W,
    records: &[TitleRecord],
    entries: &[CatalogEntry],
    primary_dumper: &str,
    contributors: &[Contributor],
) -> Result<W, DatError> {
    let mut dat = DatWriter::new(inner)?;
    for entry in entries {
        let record = &records[entry.record];
        info!("{} - {} - {}", entry.archive_number(), record.title_id, record.game_code);
        let provenance = build_entries(record);
        let groups = source_groups(primary_dumper, contributors, record, &provenance);
        if groups.is_empty() {
            warn!("Title {} has no files credited to any contributor", record.title_id);
        }
        dat.write_title(record, entry, &groups)?;
    }
    dat.finish()
}

pub fn write_catalog_file(
    path: &Path,
    records: &[TitleRecord],
    entries: &[CatalogEntry],
    primary_dumper: &str,
    contributors: &[Contributor],
) -> Result<(), DatError> {
    let file = BufWriter::new(File::create(path)?);
    write_catalog(file, records, entries, primary_dumper, contributors)?.flush()?;
    Ok(())
}

/// Gets the path of the convenience copy of a title's newest content.
pub fn nds_copy_path(record: &TitleRecord) -> PathBuf {
    record.title_dir.join(format!("{} ({}).nds", record.display_name, region_names(record.regions)))
}

/// Copies the newest content of every title next to it under its catalog name, overwriting any
/// earlier copy.
pub fn write_nds_copies(records: &[TitleRecord], entries: &[CatalogEntry]) -> Result<usize, DatError> {
    let mut copied = 0;
    for entry in entries {
        let record = &records[entry.record];
        let target = nds_copy_path(record);
        fs::copy(&record.newest_content, &target)?;
        copied += 1;
    }
    info!("Copied the newest content of {} titles", copied);
    Ok(copied)
}
