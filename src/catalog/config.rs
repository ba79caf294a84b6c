// catalog/config.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the catalog configuration file, which names the contributors of an archive and where
// their reference tables live.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::catalog::provenance::Contributor;
use crate::catalog::reference::{self, ReferenceError};
use crate::title::TitleId;

pub const DEFAULT_CONFIG_FILE: &str = "nuscat.toml";
pub const DEFAULT_DUMPER: &str = "Unknown";
pub const DEFAULT_TOOL: &str = "Custom";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path:?} could not be read")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path:?} is not valid")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn default_dumper() -> String {
    DEFAULT_DUMPER.to_owned()
}

fn default_tool() -> String {
    DEFAULT_TOOL.to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// The name credited with everything in the local archive.
    pub primary_dumper: String,
    /// The directory relative reference table paths are resolved against.
    pub reference_dir: PathBuf,
    pub title_overrides: Option<PathBuf>,
    pub port_map: Option<PathBuf>,
    pub contributors: Vec<ContributorConfig>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            primary_dumper: default_dumper(),
            reference_dir: PathBuf::new(),
            title_overrides: None,
            port_map: None,
            contributors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Another party whose dumps of some of the archive's files are credited in the catalog.
pub struct ContributorConfig {
    pub name: String,
    #[serde(default = "default_tool")]
    pub tool: String,
    pub membership: PathBuf,
    pub dates: Option<PathBuf>,
    pub replacements: Option<PathBuf>,
    pub default_date: Option<NaiveDate>,
}

impl CatalogConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Loads a config file. A file that doesn't exist yields the default config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => CatalogConfig::from_toml(&text, path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {:?}, using defaults", path);
                Ok(CatalogConfig::default())
            }
            Err(source) => Err(ConfigError::Read { path: path.to_path_buf(), source }),
        }
    }

    /// Resolves a reference table path against the reference directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.reference_dir.join(path)
    }

    pub fn load_title_overrides(&self) -> Result<HashMap<TitleId, String>, ReferenceError> {
        match &self.title_overrides {
            Some(path) => reference::load_title_overrides(&self.resolve(path)),
            None => Ok(HashMap::new()),
        }
    }

    pub fn load_port_map(&self) -> Result<HashMap<TitleId, TitleId>, ReferenceError> {
        match &self.port_map {
            Some(path) => reference::load_port_map(&self.resolve(path)),
            None => Ok(HashMap::new()),
        }
    }

    /// Loads the reference tables of every secondary contributor.
    pub fn load_contributors(&self) -> Result<Vec<Contributor>, ReferenceError> {
        let mut contributors = Vec::with_capacity(self.contributors.len());
        for config in &self.contributors {
            contributors.push(Contributor {
                name: config.name.clone(),
                tool: config.tool.clone(),
                membership: reference::load_membership(&self.resolve(&config.membership))?,
                dates: match &config.dates {
                    Some(path) => reference::load_dump_dates(&self.resolve(path))?,
                    None => HashMap::new(),
                },
                replacements: match &config.replacements {
                    Some(path) => reference::load_replacements(&self.resolve(path))?,
                    None => HashMap::new(),
                },
                default_date: config.default_date,
            });
        }
        Ok(contributors)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_config() {
        let text = r#"
primary_dumper = "Someone"
reference_dir = "references"
port_map = "DSi23DS.csv"

[[contributors]]
name = "Other"
membership = "OtherFiles.csv"
dates = "OtherFileDates.csv"
default_date = "2018-11-17"
"#;
        let config = CatalogConfig::from_toml(text, Path::new(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config.primary_dumper, "Someone");
        assert_eq!(config.title_overrides, None);
        assert_eq!(config.resolve(Path::new("DSi23DS.csv")), Path::new("references").join("DSi23DS.csv"));
        assert_eq!(config.contributors.len(), 1);
        assert_eq!(config.contributors[0].tool, DEFAULT_TOOL);
        assert_eq!(config.contributors[0].default_date, NaiveDate::from_ymd_opt(2018, 11, 17));
    }

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CatalogConfig::load(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.primary_dumper, DEFAULT_DUMPER);
        assert!(config.load_contributors().unwrap().is_empty());
    }

    #[test]
    fn test_bad_config() {
        let result = CatalogConfig::from_toml("contributors = 5", Path::new(DEFAULT_CONFIG_FILE));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_contributors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("files.csv"), "Title ID,File\n000300044b474645,cetk\n").unwrap();
        let text = r#"
[[contributors]]
name = "Other"
tool = "Their Tool"
membership = "files.csv"
"#;
        let mut config = CatalogConfig::from_toml(text, Path::new(DEFAULT_CONFIG_FILE)).unwrap();
        config.reference_dir = dir.path().to_path_buf();
        let contributors = config.load_contributors().unwrap();
        assert_eq!(contributors[0].tool, "Their Tool");
        assert_eq!(contributors[0].membership.len(), 1);
        assert!(contributors[0].dates.is_empty());
    }
}
