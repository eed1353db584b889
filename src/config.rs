//! Where GlobalBridge keeps its files.
//!
//! The data directory is resolved from, in order:
//! - an explicit path (the `--data-dir` flag)
//! - the `GLOBALBRIDGE_DATA_DIR` environment variable
//! - the platform data directory for `globalbridge`

use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "GLOBALBRIDGE_DATA_DIR";

const STORE_FILE: &str = "globalbridge.db";
const PARTICIPANTS_FILE: &str = "participants.txt";
const MATCHES_FILE: &str = "matches.txt";
const ACTIVITIES_FILE: &str = "activities.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Resolve the data directory, preferring `explicit` over the environment.
    pub fn resolve(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(dir) = explicit {
            return Ok(Self::new(dir));
        }
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        let dirs = directories::ProjectDirs::from("", "", "globalbridge")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(Self::new(dirs.data_dir()))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The full-state store file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    pub fn participants_export_path(&self) -> PathBuf {
        self.data_dir.join(PARTICIPANTS_FILE)
    }

    pub fn matches_export_path(&self) -> PathBuf {
        self.data_dir.join(MATCHES_FILE)
    }

    pub fn activities_export_path(&self) -> PathBuf {
        self.data_dir.join(ACTIVITIES_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let config = Config::resolve(Some(PathBuf::from("/tmp/gb"))).unwrap();
        assert_eq!(config.data_dir(), Path::new("/tmp/gb"));
    }

    #[test]
    fn test_derived_paths() {
        let config = Config::new("/data");
        assert_eq!(config.store_path(), PathBuf::from("/data/globalbridge.db"));
        assert_eq!(
            config.participants_export_path(),
            PathBuf::from("/data/participants.txt")
        );
        assert_eq!(config.matches_export_path(), PathBuf::from("/data/matches.txt"));
        assert_eq!(
            config.activities_export_path(),
            PathBuf::from("/data/activities.txt")
        );
    }
}
