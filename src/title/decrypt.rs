// title/decrypt.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements Title Key recovery and the decryption of the contents of ripped titles, verifying every
// decrypted content against the hash recorded in its TMD.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use log::{debug, error, info, trace, warn};
use rayon::prelude::*;
use thiserror::Error;
use crate::title::crypto::{decrypt_content, CryptoError};
use crate::title::filetypes::TitleDirListing;
use crate::title::hasher::sha1_digest;
use crate::title::keygen::{Pbkdf2KeyDeriver, TitleKeyDeriver, DEFAULT_PASSWORDS};
use crate::title::rom::RomInfo;
use crate::title::ticket::{Ticket, TicketError};
use crate::title::tmd::{ContentRecord, TMDError, TMD};
use crate::title::TitleId;

/// The extension given to decrypted contents, which are written next to their encrypted originals.
pub const DECRYPTED_EXTENSION: &str = "app";

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("{path:?} is {len} bytes long, which is not a multiple of the AES block size")]
    Misaligned { path: PathBuf, len: usize },
    #[error("the directory {0:?} is not named after a Title ID")]
    BadTitleDirectory(PathBuf),
    #[error("title {0} has no TMD")]
    MissingTmd(TitleId),
    #[error("no candidate password recovers the Title Key of {0}")]
    KeyNotRecovered(TitleId),
    #[error("TMD {path:?} could not be parsed")]
    TMD {
        path: PathBuf,
        #[source]
        source: TMDError,
    },
    #[error("ticket could not be parsed")]
    Ticket(#[from] TicketError),
    #[error("title data could not be read or written")]
    IO(#[from] std::io::Error),
}

/// Where the Title Key used for a title came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Ticket,
    Override,
    Password(String),
}

/// The outcome of trying every candidate password against a title's first content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRecovery {
    Recovered { title_key: [u8; 16], password: String },
    Exhausted,
}

impl KeyRecovery {
    /// Whether a candidate key produced a valid decrypted ROM.
    pub fn validated(&self) -> bool {
        matches!(self, KeyRecovery::Recovered { .. })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Counts of what happened while decrypting one or more titles.
pub struct DecryptReport {
    pub titles: usize,
    pub skipped_titles: usize,
    pub decrypted: usize,
    pub hash_mismatches: usize,
    pub missing: usize,
    pub failed: usize,
}

impl AddAssign for DecryptReport {
    fn add_assign(&mut self, rhs: Self) {
        self.titles += rhs.titles;
        self.skipped_titles += rhs.skipped_titles;
        self.decrypted += rhs.decrypted;
        self.hash_mismatches += rhs.hash_mismatches;
        self.missing += rhs.missing;
        self.failed += rhs.failed;
    }
}

/// Gets the path that the decrypted copy of an encrypted content is written to.
pub fn decrypted_path(encrypted_path: &Path) -> PathBuf {
    let mut name = encrypted_path.as_os_str().to_owned();
    name.push(".");
    name.push(DECRYPTED_EXTENSION);
    PathBuf::from(name)
}

fn misaligned(path: &Path, err: CryptoError) -> DecryptError {
    match err {
        CryptoError::Misaligned(len) => DecryptError::Misaligned { path: path.to_path_buf(), len },
    }
}

/// Decrypts an encrypted content file with a Title Key, writing the result next to it. Returns
/// the path of the decrypted file.
pub fn decrypt_content_file(title_key: [u8; 16], index: u16, encrypted_path: &Path) -> Result<PathBuf, DecryptError> {
    let data = fs::read(encrypted_path)?;
    let content = decrypt_content(&data, title_key, index).map_err(|e| misaligned(encrypted_path, e))?;
    let out_path = decrypted_path(encrypted_path);
    fs::write(&out_path, content)?;
    Ok(out_path)
}

/// Checks a decrypted content against the SHA1 recorded in its content record. A mismatch is
/// logged but is not an error.
pub fn verify_content(record: &ContentRecord, decrypted_path: &Path, tmd_path: &Path) -> Result<bool, DecryptError> {
    let hash = sha1_digest(&fs::read(decrypted_path)?);
    if hash != record.content_hash {
        error!(
            "Hash for {:?} does not match the recorded hash in {:?} (content index {}). ({} != {})",
            decrypted_path, tmd_path, record.index, hex::encode(record.content_hash), hex::encode(hash)
        );
        return Ok(false);
    }
    trace!("Hash for {:?} matches the recorded hash in {:?} (content index {})", decrypted_path, tmd_path, record.index);
    Ok(true)
}

/// Recovers Title Keys and decrypts the contents of ripped titles.
pub struct Decryptor {
    common_key: Option<[u8; 16]>,
    deriver: Box<dyn TitleKeyDeriver>,
    passwords: Vec<String>,
    key_overrides: HashMap<TitleId, [u8; 16]>,
}

impl Decryptor {
    /// Creates a decryptor using the standard key generator and password list. Without a common
    /// key, tickets can't be used and every Title Key has to be recovered or overridden.
    pub fn new(common_key: Option<[u8; 16]>) -> Self {
        Decryptor {
            common_key,
            deriver: Box::new(Pbkdf2KeyDeriver),
            passwords: DEFAULT_PASSWORDS.iter().map(|p| p.to_string()).collect(),
            key_overrides: HashMap::new(),
        }
    }

    pub fn with_deriver(mut self, deriver: impl TitleKeyDeriver + 'static) -> Self {
        self.deriver = Box::new(deriver);
        self
    }

    pub fn with_passwords(mut self, passwords: Vec<String>) -> Self {
        self.passwords = passwords;
        self
    }

    pub fn with_key_overrides(mut self, key_overrides: HashMap<TitleId, [u8; 16]>) -> Self {
        self.key_overrides = key_overrides;
        self
    }

    /// Tries each candidate password in order, decrypting the first content with the key derived
    /// from it until the result is a ROM with a valid header. The decrypted content of the winning
    /// password is left on disk; if every password fails, the trial output is removed.
    pub fn recover_title_key(&self, title_id: &TitleId, encrypted_path: &Path, index: u16) -> Result<KeyRecovery, DecryptError> {
        let data = fs::read(encrypted_path)?;
        let out_path = decrypted_path(encrypted_path);
        for password in &self.passwords {
            let title_key = self.deriver.derive(title_id, password);
            let content = decrypt_content(&data, title_key, index).map_err(|e| misaligned(encrypted_path, e))?;
            fs::write(&out_path, &content)?;
            if RomInfo::from_bytes(&content).valid {
                trace!("{:?} is the password for the Title Key of {}", password, title_id);
                return Ok(KeyRecovery::Recovered { title_key, password: password.clone() });
            }
            debug!("{:?} is not the password for the Title Key of {}", password, title_id);
        }
        if out_path.exists() {
            fs::remove_file(&out_path)?;
        }
        error!("Unable to find the password for the Title Key of {:?}", encrypted_path);
        Ok(KeyRecovery::Exhausted)
    }

    /// Works out the Title Key of a title: from its ticket when there is one and a common key to
    /// decrypt it, then from the override table, then by recovering it from the first content of
    /// each TMD in turn.
    fn title_key(&self, title_id: &TitleId, title_dir: &Path, listing: &TitleDirListing, tmds: &[(PathBuf, TMD)]) -> Result<([u8; 16], KeySource), DecryptError> {
        if let Some(ticket_path) = listing.tickets.first() {
            match self.common_key {
                Some(common_key) => {
                    trace!("A ticket exists for {}", title_id);
                    let ticket = Ticket::from_bytes(&fs::read(ticket_path)?)?;
                    return Ok((ticket.dec_title_key(common_key), KeySource::Ticket));
                }
                None => warn!("Title {} has a ticket, but no common key was provided to decrypt it", title_id),
            }
        }
        if let Some(title_key) = self.key_overrides.get(title_id) {
            debug!("Using the overridden Title Key for {}", title_id);
            return Ok((*title_key, KeySource::Override));
        }
        for (tmd_path, tmd) in tmds {
            let Some(first) = tmd.content_records.first() else {
                debug!("{:?} lists no contents", tmd_path);
                continue;
            };
            let encrypted_path = title_dir.join(first.file_name());
            if !encrypted_path.exists() {
                continue;
            }
            if let KeyRecovery::Recovered { title_key, password } = self.recover_title_key(title_id, &encrypted_path, first.index)? {
                return Ok((title_key, KeySource::Password(password)));
            }
        }
        Err(DecryptError::KeyNotRecovered(*title_id))
    }

    /// Decrypts every content of a title directory. Contents listed in a TMD are verified against
    /// it; any other encrypted content is decrypted as index 0 with a warning.
    pub fn decrypt_title(&self, title_dir: &Path) -> Result<DecryptReport, DecryptError> {
        let title_id = TitleId::from_dir_name(title_dir).ok_or_else(|| DecryptError::BadTitleDirectory(title_dir.to_path_buf()))?;
        info!("Starting on {}", title_id);
        let listing = TitleDirListing::read(title_dir)?;
        let mut tmds = Vec::with_capacity(listing.tmds.len());
        for path in &listing.tmds {
            let tmd = TMD::from_bytes(&fs::read(path)?).map_err(|source| DecryptError::TMD { path: path.clone(), source })?;
            tmds.push((path.clone(), tmd));
        }
        if tmds.is_empty() {
            return Err(DecryptError::MissingTmd(title_id));
        }
        let (title_key, source) = self.title_key(&title_id, title_dir, &listing, &tmds)?;
        debug!("Title Key source for {}: {:?}", title_id, source);

        let mut report = DecryptReport { titles: 1, ..Default::default() };
        let mut decrypted: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut attempted: HashSet<PathBuf> = HashSet::new();
        for (tmd_path, tmd) in &tmds {
            for record in &tmd.content_records {
                let encrypted_path = title_dir.join(record.file_name());
                if !encrypted_path.exists() {
                    error!("Content {} listed in {:?} is missing", record.file_name(), tmd_path);
                    report.missing += 1;
                    continue;
                }
                attempted.insert(encrypted_path.clone());
                let out_path = match decrypted.get(&encrypted_path) {
                    Some(out_path) => out_path.clone(),
                    None => match decrypt_content_file(title_key, record.index, &encrypted_path) {
                        Ok(out_path) => {
                            report.decrypted += 1;
                            decrypted.insert(encrypted_path.clone(), out_path.clone());
                            out_path
                        }
                        Err(err @ DecryptError::Misaligned { .. }) => {
                            error!("{}", err);
                            report.failed += 1;
                            continue;
                        }
                        Err(err) => return Err(err),
                    },
                };
                if !verify_content(record, &out_path, tmd_path)? {
                    report.hash_mismatches += 1;
                }
            }
        }

        for encrypted_path in listing.encrypted_contents.iter().filter(|p| !attempted.contains(*p)) {
            warn!("Attempting to decrypt content without associated metadata: {:?}", encrypted_path);
            match decrypt_content_file(title_key, 0, encrypted_path) {
                Ok(_) => report.decrypted += 1,
                Err(err @ DecryptError::Misaligned { .. }) => {
                    error!("{}", err);
                    report.failed += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    /// Decrypts every title directory inside an archive directory, optionally limited to one
    /// title. Titles are independent of each other, so they are processed in parallel, and a title
    /// that fails is logged and skipped.
    pub fn decrypt_archive(&self, archive_dir: &Path, only: Option<TitleId>) -> Result<DecryptReport, DecryptError> {
        let mut title_dirs = Vec::new();
        for entry in fs::read_dir(archive_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            if only.is_none() || TitleId::from_dir_name(&path) == only {
                title_dirs.push(path);
            }
        }
        title_dirs.sort();
        info!("Beginning batch decryption of {} titles in {:?}", title_dirs.len(), archive_dir);
        let reports: Vec<DecryptReport> = title_dirs
            .par_iter()
            .map(|dir| match self.decrypt_title(dir) {
                Ok(report) => report,
                Err(err) => {
                    error!("Skipping {:?}: {}", dir, err);
                    DecryptReport { skipped_titles: 1, ..Default::default() }
                }
            })
            .collect();
        let mut total = DecryptReport::default();
        for report in reports {
            total += report;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;
    use crate::title::crypto::encrypt_content;
    use crate::title::rom::test::build_rom;
    use crate::title::tmd::test::{build_tmd, TEST_TITLE_ID};

    /// Derives a key by repeating the first byte of the password, and remembers every attempt.
    #[derive(Default)]
    struct RecordingDeriver {
        attempts: Mutex<Vec<String>>,
    }

    impl TitleKeyDeriver for RecordingDeriver {
        fn derive(&self, _title_id: &TitleId, password: &str) -> [u8; 16] {
            self.attempts.lock().unwrap().push(password.to_owned());
            [password.bytes().next().unwrap_or(0); 16]
        }
    }

    impl TitleKeyDeriver for std::sync::Arc<RecordingDeriver> {
        fn derive(&self, title_id: &TitleId, password: &str) -> [u8; 16] {
            self.as_ref().derive(title_id, password)
        }
    }

    fn passwords(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    /// Writes a title whose only content is a ROM encrypted with the given key.
    fn write_title(root: &Path, title_key: [u8; 16], recorded_hash: Option<[u8; 20]>) -> (PathBuf, Vec<u8>) {
        let rom = build_rom("KGF", "KGFE", &[]);
        let title_dir = root.join(TitleId::new(TEST_TITLE_ID).to_string());
        fs::create_dir_all(&title_dir).unwrap();
        let hash = recorded_hash.unwrap_or_else(|| sha1_digest(&rom));
        fs::write(title_dir.join("tmd.0"), build_tmd(TEST_TITLE_ID, 0, &[(0, 0, rom.len() as u64, hash)])).unwrap();
        fs::write(title_dir.join("00000000"), encrypt_content(&rom, title_key, 0)).unwrap();
        (title_dir, rom)
    }

    #[test]
    fn test_recover_second_password() {
        let dir = tempfile::tempdir().unwrap();
        let (title_dir, rom) = write_title(dir.path(), [b'b'; 16], None);
        let deriver = std::sync::Arc::new(RecordingDeriver::default());
        let decryptor = Decryptor::new(None)
            .with_deriver(deriver.clone())
            .with_passwords(passwords(&["a", "b", "c"]));
        let recovery = decryptor
            .recover_title_key(&TitleId::new(TEST_TITLE_ID), &title_dir.join("00000000"), 0)
            .unwrap();
        assert!(recovery.validated());
        assert_eq!(recovery, KeyRecovery::Recovered { title_key: [b'b'; 16], password: "b".to_owned() });
        assert_eq!(*deriver.attempts.lock().unwrap(), ["a", "b"]);
        assert_eq!(fs::read(title_dir.join("00000000.app")).unwrap(), rom);
    }

    #[test]
    fn test_recover_exhausted_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let (title_dir, _) = write_title(dir.path(), [b'z'; 16], None);
        let decryptor = Decryptor::new(None)
            .with_deriver(RecordingDeriver::default())
            .with_passwords(passwords(&["a", "b", "c"]));
        let recovery = decryptor
            .recover_title_key(&TitleId::new(TEST_TITLE_ID), &title_dir.join("00000000"), 0)
            .unwrap();
        assert!(!recovery.validated());
        assert!(!title_dir.join("00000000.app").exists());
        assert!(matches!(decryptor.decrypt_title(&title_dir), Err(DecryptError::KeyNotRecovered(_))));
    }

    #[test]
    fn test_decrypt_title_verifies_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let (title_dir, _) = write_title(dir.path(), [b'b'; 16], None);
        let decryptor = Decryptor::new(None)
            .with_deriver(RecordingDeriver::default())
            .with_passwords(passwords(&["b"]));
        let report = decryptor.decrypt_title(&title_dir).unwrap();
        assert_eq!(report.decrypted, 1);
        assert_eq!(report.hash_mismatches, 0);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_hash_mismatch_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let (title_dir, _) = write_title(dir.path(), [b'b'; 16], Some([0u8; 20]));
        // An extra content that no TMD lists still gets decrypted.
        fs::write(title_dir.join("00000005"), encrypt_content(&[7u8; 32], [b'b'; 16], 0)).unwrap();
        let decryptor = Decryptor::new(None)
            .with_deriver(RecordingDeriver::default())
            .with_passwords(passwords(&["b"]));
        let report = decryptor.decrypt_archive(dir.path(), None).unwrap();
        assert_eq!(report.titles, 1);
        assert_eq!(report.hash_mismatches, 1);
        assert_eq!(report.decrypted, 2);
        assert_eq!(fs::read(title_dir.join("00000005.app")).unwrap(), [7u8; 32]);
    }

    #[test]
    fn test_key_override() {
        let dir = tempfile::tempdir().unwrap();
        let (title_dir, rom) = write_title(dir.path(), [0x42; 16], None);
        let deriver = std::sync::Arc::new(RecordingDeriver::default());
        let decryptor = Decryptor::new(None)
            .with_deriver(deriver.clone())
            .with_key_overrides(HashMap::from([(TitleId::new(TEST_TITLE_ID), [0x42; 16])]));
        let report = decryptor.decrypt_title(&title_dir).unwrap();
        assert_eq!(report.hash_mismatches, 0);
        assert!(deriver.attempts.lock().unwrap().is_empty());
        assert_eq!(fs::read(title_dir.join("00000000.app")).unwrap(), rom);
    }

    #[test]
    fn test_misaligned_content_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        let (title_dir, _) = write_title(dir.path(), [0x42; 16], None);
        fs::write(title_dir.join("00000003"), [0u8; 17]).unwrap();
        let decryptor = Decryptor::new(None)
            .with_key_overrides(HashMap::from([(TitleId::new(TEST_TITLE_ID), [0x42; 16])]));
        let report = decryptor.decrypt_title(&title_dir).unwrap();
        assert_eq!(report.decrypted, 1);
        assert_eq!(report.failed, 1);
    }
}
