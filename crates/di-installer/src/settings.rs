use std::path::{Path, PathBuf};
use std::time::Duration;

use di_core::{
    DEFAULT_NODE_MIRROR, DEFAULT_RUNTIME_VERSION, HttpOptions, InstallerConfig,
    RuntimeDistribution, default_release_api_url,
};
use di_platform::{AppPaths, SearchPath, default_install_dir, runtime_cache_dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerSettings {
    #[serde(default = "default_release_api_url")]
    pub release_api_url: String,

    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,

    #[serde(default = "default_node_mirror")]
    pub node_dist_mirror: String,

    /// Distribution architecture to download, e.g. `armv6l` on a Pi Zero
    /// where the host reports plain `arm`.
    #[serde(default)]
    pub runtime_arch: Option<String>,

    /// Overrides the per-user runtime cache location.
    #[serde(default)]
    pub runtime_cache_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub verify_runtime_checksum: bool,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_retry_delays")]
    pub retry_delays_secs: Vec<u64>,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_runtime_version() -> String {
    DEFAULT_RUNTIME_VERSION.to_string()
}

fn default_node_mirror() -> String {
    DEFAULT_NODE_MIRROR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_http_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_retry_delays() -> Vec<u64> {
    vec![0, 2, 5]
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            release_api_url: default_release_api_url(),
            runtime_version: default_runtime_version(),
            node_dist_mirror: default_node_mirror(),
            runtime_arch: None,
            runtime_cache_dir: None,
            verify_runtime_checksum: true,
            http_timeout_secs: default_http_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            retry_delays_secs: default_retry_delays(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl InstallerSettings {
    /// Settings from the per-user data directory.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, SettingsError> {
        let Ok(paths) = AppPaths::new() else {
            return Ok(Self::default());
        };
        Self::load_from(&paths.settings_file())
    }

    /// A missing file means defaults.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if cli.debug {
            self.debug_logging = true;
        }
        if let Some(version) = &cli.runtime_version {
            self.runtime_version.clone_from(version);
        }
        if let Some(mirror) = &cli.node_mirror {
            self.node_dist_mirror.clone_from(mirror);
        }
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.http_timeout_secs),
            retry_delays: self
                .retry_delays_secs
                .iter()
                .copied()
                .map(Duration::from_secs)
                .collect(),
        }
    }

    pub fn installer_config(&self, cli: &Cli, search_path: SearchPath) -> InstallerConfig {
        InstallerConfig {
            default_install_dir: default_install_dir(),
            install_dir: cli.path.clone(),
            assume_default: cli.yes,
            release_api_url: self.release_api_url.clone(),
            runtime: RuntimeDistribution::for_platform(
                &self.runtime_version,
                &self.node_dist_mirror,
                std::env::consts::OS,
                self.runtime_arch.as_deref().unwrap_or(std::env::consts::ARCH),
            ),
            runtime_cache_dir: self
                .runtime_cache_dir
                .clone()
                .unwrap_or_else(runtime_cache_dir),
            search_path,
            verify_runtime_checksum: self.verify_runtime_checksum,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use clap::Parser;
    use di_platform::SearchPath;

    use super::{InstallerSettings, SettingsError};
    use crate::cli::Cli;

    #[test]
    fn defaults_pin_runtime_and_retry_schedule() {
        let settings = InstallerSettings::default();

        assert_eq!(settings.runtime_version, "8.4.0");
        assert_eq!(settings.node_dist_mirror, "https://nodejs.org/dist");
        assert!(settings.verify_runtime_checksum);
        assert_eq!(settings.http_timeout_secs, 30);
        assert_eq!(settings.connect_timeout_secs, 10);
        assert_eq!(settings.retry_delays_secs, vec![0, 2, 5]);
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
        assert!(settings.release_api_url.ends_with("/releases/latest"));
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("settings.json");
        std::fs::write(&path, r#"{"runtime_version": "v10.24.1", "debug_logging": true}"#)
            .expect("settings should be written");

        let settings = InstallerSettings::load_from(&path).expect("settings should parse");

        assert_eq!(settings.runtime_version, "v10.24.1");
        assert!(settings.debug_logging);
        assert_eq!(settings.retry_delays_secs, vec![0, 2, 5]);
    }

    #[test]
    fn missing_file_means_defaults() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("settings.json");

        let settings = InstallerSettings::load_from(&path).expect("missing file is not an error");

        assert_eq!(settings.runtime_version, "8.4.0");
    }

    #[test]
    fn malformed_file_is_reported_with_its_path() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{ nope").expect("settings should be written");

        let error = InstallerSettings::load_from(&path).expect_err("malformed file should fail");

        assert!(matches!(error, SettingsError::Parse { .. }));
        assert!(error.to_string().contains("settings.json"));
    }

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "di-installer",
            "--debug",
            "--runtime-version",
            "10.24.1",
            "--node-mirror",
            "https://mirror.test/node/",
        ])
        .expect("flags should parse");
        let mut settings = InstallerSettings::default();

        settings.apply_cli(&cli);
        let config = settings.installer_config(&cli, SearchPath::default());

        assert!(settings.debug_logging);
        assert_eq!(config.runtime.version, "10.24.1");
        assert_eq!(config.runtime.mirror, "https://mirror.test/node");
        assert_eq!(
            config.runtime.checksums_url(),
            "https://mirror.test/node/v10.24.1/SHASUMS256.txt"
        );
    }

    #[test]
    fn installer_config_carries_path_flags_and_cache_override() {
        let cli = Cli::try_parse_from(["di-installer", "--path", "/srv/DI", "--yes"])
            .expect("flags should parse");
        let settings = InstallerSettings {
            runtime_cache_dir: Some(PathBuf::from("/var/cache/di-node")),
            verify_runtime_checksum: false,
            ..InstallerSettings::default()
        };

        let config = settings.installer_config(&cli, SearchPath::default());

        assert_eq!(config.install_dir, Some(PathBuf::from("/srv/DI")));
        assert!(config.assume_default);
        assert_eq!(config.runtime_cache_dir, PathBuf::from("/var/cache/di-node"));
        assert!(!config.verify_runtime_checksum);
        assert!(config.default_install_dir.ends_with("DI"));
    }

    #[test]
    fn runtime_arch_override_replaces_host_arch() {
        let cli = Cli::try_parse_from(["di-installer"]).expect("flags should parse");
        let settings = InstallerSettings {
            runtime_arch: Some("armv6l".to_string()),
            ..InstallerSettings::default()
        };

        let config = settings.installer_config(&cli, SearchPath::default());

        assert_eq!(config.runtime.arch, "armv6l");
        assert_eq!(config.runtime.os, std::env::consts::OS);
    }

    #[test]
    fn http_options_follow_settings() {
        let settings = InstallerSettings {
            retry_delays_secs: vec![1, 3],
            http_timeout_secs: 45,
            ..InstallerSettings::default()
        };

        let options = settings.http_options();

        assert_eq!(
            options.retry_delays,
            vec![Duration::from_secs(1), Duration::from_secs(3)]
        );
        assert_eq!(options.read_timeout, Duration::from_secs(45));
    }
}
