// decrypt.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Code for the decrypt command in the nuscat CLI.

use std::fs;
use std::path::Path;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use nuscat::catalog::reference::load_title_keys;
use nuscat::title::decrypt::Decryptor;
use nuscat::title::TitleId;

/// Reads the common key, which can be given directly as hex or as a file containing either the raw
/// key or its hex.
fn read_common_key(value: &str) -> Result<[u8; 16]> {
    let mut key = [0u8; 16];
    let path = Path::new(value);
    if path.is_file() {
        let data = fs::read(path).with_context(|| format!("The common key file \"{}\" could not be read.", path.display()))?;
        if data.len() == 16 {
            key.copy_from_slice(&data);
            return Ok(key);
        }
        let text = String::from_utf8_lossy(&data);
        hex::decode_to_slice(text.trim(), &mut key).with_context(|| "The common key file does not contain a valid key.")?;
        return Ok(key);
    }
    hex::decode_to_slice(value.trim(), &mut key).with_context(|| "The provided common key is not a valid file or 32 hex characters.")?;
    Ok(key)
}

pub fn decrypt(archive: &Path, common_key: Option<&str>, title: Option<&str>, passwords: Option<Vec<String>>, title_keys: Option<&Path>) -> Result<()> {
    if !archive.is_dir() {
        bail!("Archive directory \"{}\" does not exist.", archive.display());
    }
    let common_key = common_key.map(read_common_key).transpose()?;
    if common_key.is_none() {
        warn!("No common key was provided, so tickets can't be used and every Title Key will have to be recovered");
    }
    let only: Option<TitleId> = title
        .map(|tid| tid.parse().with_context(|| format!("\"{}\" is not a valid Title ID.", tid)))
        .transpose()?;
    let mut decryptor = Decryptor::new(common_key);
    if let Some(passwords) = passwords {
        decryptor = decryptor.with_passwords(passwords);
    }
    if let Some(path) = title_keys {
        let keys = load_title_keys(path).with_context(|| format!("The Title Key table \"{}\" could not be loaded.", path.display()))?;
        info!("Loaded {} known Title Keys", keys.len());
        decryptor = decryptor.with_key_overrides(keys);
    }
    let report = decryptor.decrypt_archive(archive, only).with_context(|| "The archive could not be decrypted.")?;
    info!(
        "Decrypted {} contents from {} titles ({} titles skipped, {} hash mismatches, {} missing, {} failed)",
        report.decrypted, report.titles, report.skipped_titles, report.hash_mismatches, report.missing, report.failed
    );
    if report.titles == 0 && report.skipped_titles > 0 {
        bail!("None of the {} titles could be decrypted.", report.skipped_titles);
    }
    println!("Successfully decrypted {} contents from {} titles.", report.decrypted, report.titles);
    Ok(())
}
