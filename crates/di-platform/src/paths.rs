use std::path::PathBuf;
use thiserror::Error;

const APP_DIR_NAME: &str = "di-installer";
const INSTALL_DIR_NAME: &str = "DI";
const RUNTIME_DIR_NAME: &str = "node";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

/// Directories the installer itself owns: its settings and its log file.
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Build application paths for the current platform.
    ///
    /// # Errors
    /// Returns an error when the user config or data directory cannot be
    /// determined.
    pub fn new() -> Result<Self, AppPathsError> {
        Ok(Self {
            config_dir: dirs::config_dir()
                .ok_or(AppPathsError::ConfigDirUnavailable)?
                .join(APP_DIR_NAME),
            data_dir: dirs::data_dir()
                .ok_or(AppPathsError::DataDirUnavailable)?
                .join(APP_DIR_NAME),
        })
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("di-installer.log")
    }

    /// Ensure the config and data directories exist on disk.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

/// Default destination offered at the prompt: `<home>/DI`, falling back to
/// the working directory when no home directory is known.
#[must_use]
pub fn default_install_dir() -> PathBuf {
    dirs::home_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(INSTALL_DIR_NAME)
}

/// Directory a downloaded runtime distribution is extracted into.
///
/// Lives under the per-user application data directory (`%APPDATA%` on
/// Windows) and falls back to the system temp directory.
#[must_use]
pub fn runtime_cache_dir() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| {
        log::debug!("No data directory available, caching runtime in temp dir");
        std::env::temp_dir()
    });
    base.join(APP_DIR_NAME).join(RUNTIME_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::{AppPaths, default_install_dir, runtime_cache_dir};

    fn test_paths(root: &std::path::Path) -> AppPaths {
        AppPaths {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    #[test]
    fn file_paths_use_expected_filenames() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let paths = test_paths(temp.path());

        assert!(
            paths
                .settings_file()
                .ends_with(std::path::Path::new("config").join("settings.json"))
        );
        assert!(
            paths
                .log_file()
                .ends_with(std::path::Path::new("data").join("di-installer.log"))
        );
    }

    #[test]
    fn ensure_dirs_creates_all_directories() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let paths = test_paths(temp.path());

        paths
            .ensure_dirs()
            .expect("ensure_dirs should create application directories");

        assert!(paths.config_dir.is_dir());
        assert!(paths.data_dir.is_dir());
    }

    #[test]
    fn default_install_dir_ends_with_project_name() {
        let dir = default_install_dir();

        assert_eq!(dir.file_name().and_then(|n| n.to_str()), Some("DI"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(dir, home.join("DI"));
        }
    }

    #[test]
    fn runtime_cache_dir_is_namespaced() {
        let dir = runtime_cache_dir();

        assert!(dir.ends_with(std::path::Path::new("di-installer").join("node")));
    }
}
