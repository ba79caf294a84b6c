// title/headers.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Reads the upload timestamps recorded in the ".headers.txt" sidecars saved alongside every file
// downloaded from the NUS.

use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};

pub const HEADERS_SUFFIX: &str = ".headers.txt";
const LAST_MODIFIED_LABEL: &str = "Last-Modified";

pub fn headers_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(HEADERS_SUFFIX);
    PathBuf::from(name)
}

/// Finds the Last-Modified header in the text of a response header dump. The NUS sends it in the
/// RFC 1123 form, e.g. "Wed, 14 Nov 2018 21:03:52 GMT".
pub fn parse_last_modified(text: &str) -> Option<DateTime<Utc>> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(label, _)| label.trim().eq_ignore_ascii_case(LAST_MODIFIED_LABEL))
        .and_then(|(_, value)| DateTime::parse_from_rfc2822(value.trim()).ok())
        .map(|date| date.with_timezone(&Utc))
}

/// Gets the upload time of an artifact from its header sidecar, if it has one.
pub fn recorded_upload_time(artifact: &Path) -> Option<DateTime<Utc>> {
    let text = fs::read_to_string(headers_path(artifact)).ok()?;
    parse_last_modified(&text)
}

/// Gets the modification time of a file on disk.
pub fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}

/// Gets the best known timestamp for an artifact: the recorded upload time, falling back to the
/// file's modification time.
pub fn artifact_timestamp(artifact: &Path) -> Option<DateTime<Utc>> {
    recorded_upload_time(artifact).or_else(|| {
        log::debug!("No Last-Modified header recorded for {:?}, using its modification time", artifact);
        modified_time(artifact)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_last_modified() {
        let text = "Content-Type: application/octet-stream\nLast-Modified: Wed, 14 Nov 2018 21:03:52 GMT\nETag: \"abc\"\n";
        let date = parse_last_modified(text).unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2018, 11, 14));
        assert_eq!((date.hour(), date.minute(), date.second()), (21, 3, 52));
    }

    #[test]
    fn test_missing_or_bad_header() {
        assert!(parse_last_modified("Server: nginx\n").is_none());
        assert!(parse_last_modified("Last-Modified: yesterday\n").is_none());
    }

    #[test]
    fn test_artifact_timestamp_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("cetk");
        fs::write(&artifact, b"ticket").unwrap();
        assert_eq!(artifact_timestamp(&artifact), modified_time(&artifact));
        fs::write(headers_path(&artifact), "Last-Modified: Sat, 17 Nov 2018 00:00:00 GMT\n").unwrap();
        assert_eq!(artifact_timestamp(&artifact).unwrap().year(), 2018);
    }
}
