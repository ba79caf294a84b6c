// title/hasher.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the hash collection recorded for every artifact, along with the ".checks.txt" sidecar
// files that cache it next to the artifact.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use thiserror::Error;

const CHUNK_SIZE: usize = 64 * 1024;
pub const CHECKS_SUFFIX: &str = ".checks.txt";

const SIZE_LABEL: &str = "Size";
const CRC32_LABEL: &str = "CRC32";
const MD5_LABEL: &str = "MD5";
const SHA1_LABEL: &str = "SHA1";
const SHA256_LABEL: &str = "SHA256";

#[derive(Debug, Error)]
pub enum HashError {
    #[error("neither the hash sidecar {sidecar:?} nor its artifact could be read")]
    MissingArtifact { sidecar: PathBuf },
    #[error("hash data could not be read or written")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The size and CRC32/MD5/SHA1/SHA256 digests of one artifact, as lowercase hex strings.
pub struct HashCollection {
    pub size: Option<u64>,
    pub crc32: String,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

impl HashCollection {
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut sha1 = Sha1::new();
        sha1.update(data);
        let mut sha256 = Sha256::new();
        sha256.update(data);
        HashCollection {
            size: Some(data.len() as u64),
            crc32: format!("{:08x}", crc32fast::hash(data)),
            md5: format!("{:x}", md5::compute(data)),
            sha1: hex::encode(sha1.finalize()),
            sha256: hex::encode(sha256.finalize()),
        }
    }

    /// Hashes a file on disk in fixed-size chunks.
    pub fn from_file(path: &Path) -> Result<Self, HashError> {
        let mut file = File::open(path)?;
        let mut crc = crc32fast::Hasher::new();
        let mut md5_ctx = md5::Context::new();
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();
        let mut size: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            crc.update(&buf[..n]);
            md5_ctx.consume(&buf[..n]);
            sha1.update(&buf[..n]);
            sha256.update(&buf[..n]);
            size += n as u64;
        }
        Ok(HashCollection {
            size: Some(size),
            crc32: format!("{:08x}", crc.finalize()),
            md5: format!("{:x}", md5_ctx.compute()),
            sha1: hex::encode(sha1.finalize()),
            sha256: hex::encode(sha256.finalize()),
        })
    }

    /// Parses the contents of a ".checks.txt" sidecar. Unknown lines are ignored, and an
    /// unparseable size is treated as unknown.
    pub fn parse_sidecar(text: &str) -> Self {
        let mut hashes = HashCollection {
            size: None,
            crc32: String::new(),
            md5: String::new(),
            sha1: String::new(),
            sha256: String::new(),
        };
        for line in text.lines() {
            let Some((label, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match label.trim() {
                SIZE_LABEL => hashes.size = value.parse().ok(),
                CRC32_LABEL => hashes.crc32 = value.to_lowercase(),
                MD5_LABEL => hashes.md5 = value.to_lowercase(),
                SHA1_LABEL => hashes.sha1 = value.to_lowercase(),
                SHA256_LABEL => hashes.sha256 = value.to_lowercase(),
                _ => {}
            }
        }
        hashes
    }

    pub fn to_sidecar_string(&self) -> String {
        let size = self.size.map(|s| s.to_string()).unwrap_or_default();
        format!(
            "{}: {}\n{}: {}\n{}: {}\n{}: {}\n{}: {}\n",
            SIZE_LABEL, size,
            CRC32_LABEL, self.crc32,
            MD5_LABEL, self.md5,
            SHA1_LABEL, self.sha1,
            SHA256_LABEL, self.sha256,
        )
    }

    pub fn write_sidecar(&self, artifact: &Path) -> Result<(), HashError> {
        fs::write(sidecar_path(artifact), self.to_sidecar_string())?;
        Ok(())
    }

    /// Reads the hashes of an artifact through its ".checks.txt" sidecar. The sidecar is trusted
    /// as long as its CRC32 matches the live artifact; if it is missing or disagrees, the hashes
    /// are recomputed from the artifact and the sidecar is rewritten.
    pub fn read_through(artifact: &Path) -> Result<Self, HashError> {
        let sidecar = sidecar_path(artifact);
        if !artifact.exists() {
            return match fs::read_to_string(&sidecar) {
                Ok(text) => {
                    warn!("Artifact {:?} is missing, trusting its hash sidecar as-is", artifact);
                    Ok(HashCollection::parse_sidecar(&text))
                }
                Err(_) => Err(HashError::MissingArtifact { sidecar }),
            };
        }
        let live = HashCollection::from_file(artifact)?;
        match fs::read_to_string(&sidecar) {
            Ok(text) => {
                let recorded = HashCollection::parse_sidecar(&text);
                if recorded.crc32 == live.crc32 {
                    return Ok(recorded);
                }
                error!(
                    "CRC32 in {:?} does not match {:?} ({} != {}), recalculating",
                    sidecar, artifact, recorded.crc32, live.crc32
                );
            }
            Err(_) => {
                warn!("No hash sidecar for {:?}, calculating it", artifact);
            }
        }
        live.write_sidecar(artifact)?;
        Ok(live)
    }
}

pub fn sidecar_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(CHECKS_SUFFIX);
    PathBuf::from(name)
}

/// Gets the SHA1 of a blob of data, for comparing against the hashes stored in content records.
pub fn sha1_digest(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}
