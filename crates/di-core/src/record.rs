use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::InstallError;

pub const RECORD_FILE: &str = "package.json";

/// The `package.json` shipped at the root of an installation.
///
/// Only `version` matters here; every other field is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    pub version: String,
}

impl InstallRecord {
    #[must_use]
    pub fn path_in(install_dir: &Path) -> PathBuf {
        install_dir.join(RECORD_FILE)
    }

    /// An installation exists when the directory holds a record file.
    #[must_use]
    pub fn exists_in(install_dir: &Path) -> bool {
        install_dir.is_dir() && Self::path_in(install_dir).is_file()
    }

    /// Read the record from `install_dir`.
    ///
    /// # Errors
    /// Returns an error when the file is missing, unreadable, or has no
    /// string `version` field.
    pub fn load(install_dir: &Path) -> Result<Self, InstallError> {
        let path = Self::path_in(install_dir);
        let content = std::fs::read_to_string(&path)
            .map_err(|error| InstallError::install_record(&path, error))?;
        serde_json::from_str(&content).map_err(|error| InstallError::install_record(&path, error))
    }

    /// Load the record if an installation is present.
    ///
    /// # Errors
    /// Returns an error when a record exists but cannot be parsed.
    pub fn detect(install_dir: &Path) -> Result<Option<Self>, InstallError> {
        if Self::exists_in(install_dir) {
            Self::load(install_dir).map(Some)
        } else {
            Ok(None)
        }
    }
}
