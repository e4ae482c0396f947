use std::path::{Path, PathBuf};

use di_platform::{SearchPath, locate_executable, locate_file};
use log::info;

use crate::archive::extract_archive;
use crate::checksum::verify_file;
use crate::error::InstallError;
use crate::traits::Downloader;
use crate::version::strip_tag_prefix;

pub const DEFAULT_RUNTIME_VERSION: &str = "8.4.0";
pub const DEFAULT_NODE_MIRROR: &str = "https://nodejs.org/dist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeOs {
    Linux,
    Darwin,
    Windows,
}

impl RuntimeOs {
    #[must_use]
    pub fn dist_name(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "win",
        }
    }
}

/// Platform and architecture as named by the Node.js distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeTarget {
    pub os: RuntimeOs,
    pub arch: &'static str,
}

impl RuntimeTarget {
    /// Accepts Rust's `std::env::consts` names as well as the distribution's
    /// own architecture names, so `armv6l` or `ppc64le` can be asked for
    /// directly.
    ///
    /// # Errors
    /// Returns an error for unknown OS or architecture names.
    pub fn from_consts(os: &str, arch: &str) -> Result<Self, InstallError> {
        let unsupported = || InstallError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os_kind = match os {
            "linux" => RuntimeOs::Linux,
            "macos" | "darwin" => RuntimeOs::Darwin,
            "windows" | "win" => RuntimeOs::Windows,
            _ => return Err(unsupported()),
        };
        let arch = match arch {
            "x86_64" | "x64" => "x64",
            "aarch64" | "arm64" => "arm64",
            "x86" => "x86",
            "arm" | "armv7l" => "armv7l",
            "armv6l" => "armv6l",
            "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
            "ppc64le" => "ppc64le",
            "s390x" => "s390x",
            _ => return Err(unsupported()),
        };

        Ok(Self { os: os_kind, arch })
    }

    fn is_windows(self) -> bool {
        self.os == RuntimeOs::Windows
    }

    #[must_use]
    pub fn archive_extension(self) -> &'static str {
        if self.is_windows() { ".zip" } else { ".tar.gz" }
    }

    /// Directory holding `node` once a distribution is extracted into
    /// `cache_dir`.
    #[must_use]
    pub fn bin_dir(self, cache_dir: &Path) -> PathBuf {
        if self.is_windows() {
            cache_dir.to_path_buf()
        } else {
            cache_dir.join("bin")
        }
    }

    #[must_use]
    pub fn node_file_name(self) -> &'static str {
        if self.is_windows() { "node.exe" } else { "node" }
    }

    #[must_use]
    pub fn npm_file_name(self) -> &'static str {
        if self.is_windows() { "npm.cmd" } else { "npm" }
    }
}

/// Where a cached distribution keeps `node` on this host.
fn host_bin_dir(cache_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        cache_dir.to_path_buf()
    } else {
        cache_dir.join("bin")
    }
}

fn host_npm_file_name() -> &'static str {
    if cfg!(windows) { "npm.cmd" } else { "npm" }
}

/// npm ships next to node; fall back to the search path for distro packages
/// that split them.
fn npm_for(node: &Path, search_path: &SearchPath) -> PathBuf {
    let npm_name = host_npm_file_name();
    let sibling = node.with_file_name(npm_name);
    if sibling.exists() {
        return sibling;
    }
    locate_file(npm_name, search_path).unwrap_or(sibling)
}

/// A pinned Node.js release on a distribution mirror.
///
/// The platform is kept as given and only resolved to a [`RuntimeTarget`]
/// when an archive is actually needed, so hosts without published binaries
/// can still use a runtime that is already installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDistribution {
    pub version: String,
    pub mirror: String,
    pub os: String,
    pub arch: String,
}

impl RuntimeDistribution {
    /// Distribution for the host platform.
    #[must_use]
    pub fn new(version: &str, mirror: &str) -> Self {
        Self::for_platform(
            version,
            mirror,
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }

    #[must_use]
    pub fn for_platform(version: &str, mirror: &str, os: &str, arch: &str) -> Self {
        Self {
            version: strip_tag_prefix(version.trim()).to_string(),
            mirror: mirror.trim_end_matches('/').to_string(),
            os: os.to_string(),
            arch: arch.trim().to_string(),
        }
    }

    /// # Errors
    /// Returns an error when no binaries are published for the platform.
    pub fn target(&self) -> Result<RuntimeTarget, InstallError> {
        RuntimeTarget::from_consts(&self.os, &self.arch)
    }

    /// e.g. `node-v8.4.0-linux-x64.tar.gz`
    ///
    /// # Errors
    /// Returns an error when no binaries are published for the platform.
    pub fn archive_name(&self) -> Result<String, InstallError> {
        let target = self.target()?;
        Ok(format!(
            "node-v{}-{}-{}{}",
            self.version,
            target.os.dist_name(),
            target.arch,
            target.archive_extension()
        ))
    }

    /// # Errors
    /// Returns an error when no binaries are published for the platform.
    pub fn archive_url(&self) -> Result<String, InstallError> {
        Ok(format!(
            "{}/v{}/{}",
            self.mirror,
            self.version,
            self.archive_name()?
        ))
    }

    #[must_use]
    pub fn checksums_url(&self) -> String {
        format!("{}/v{}/SHASUMS256.txt", self.mirror, self.version)
    }
}

/// A usable runtime plus the search path child processes should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    pub node: PathBuf,
    pub npm: PathBuf,
    pub search_path: SearchPath,
    pub downloaded: bool,
}

/// Finds a Node.js runtime on the search path, or installs the pinned
/// distribution into the runtime cache directory.
pub struct RuntimeEnsurer<'a> {
    cache_dir: PathBuf,
    distribution: RuntimeDistribution,
    downloader: &'a dyn Downloader,
    verify_checksum: bool,
}

impl<'a> RuntimeEnsurer<'a> {
    #[must_use]
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        distribution: RuntimeDistribution,
        downloader: &'a dyn Downloader,
    ) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            distribution,
            downloader,
            verify_checksum: true,
        }
    }

    #[must_use]
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    #[must_use]
    pub fn distribution(&self) -> &RuntimeDistribution {
        &self.distribution
    }

    fn augmented_search_path(&self, search_path: &SearchPath) -> SearchPath {
        search_path.with_appended(host_bin_dir(&self.cache_dir))
    }

    /// Look for `node` on the search path extended with the cache directory.
    /// Never touches the network.
    #[must_use]
    pub fn locate(&self, search_path: &SearchPath) -> Option<Runtime> {
        let search_path = self.augmented_search_path(search_path);
        let node = locate_executable("node", &search_path)?;
        let npm = npm_for(&node, &search_path);
        info!("Using node at {}", node.display());

        Some(Runtime {
            node,
            npm,
            search_path,
            downloaded: false,
        })
    }

    /// Download and extract the pinned distribution into the cache.
    ///
    /// # Errors
    /// Returns an error when the platform has no published binaries, when
    /// downloading, verifying or extracting fails, or when the archive does
    /// not contain the expected executable.
    pub async fn install(&self, search_path: &SearchPath) -> Result<Runtime, InstallError> {
        let target = self.distribution.target()?;
        let archive_name = self.distribution.archive_name()?;
        std::fs::create_dir_all(&self.cache_dir).map_err(|error| {
            InstallError::filesystem("failed to create runtime cache", &self.cache_dir, error)
        })?;
        let staging = tempfile::Builder::new()
            .prefix(".download")
            .tempdir_in(&self.cache_dir)
            .map_err(|error| {
                InstallError::filesystem("failed to create staging directory", &self.cache_dir, error)
            })?;

        let archive_path = staging.path().join(&archive_name);
        self.downloader
            .download_to(&self.distribution.archive_url()?, &archive_path)
            .await?;

        if self.verify_checksum {
            let checksums_url = self.distribution.checksums_url();
            let checksums = self.downloader.get_text(&checksums_url).await?;
            verify_file(&archive_path, &archive_name, &checksums, &checksums_url)?;
        }

        let cache_dir = self.cache_dir.clone();
        let extract_from = archive_path.clone();
        tokio::task::spawn_blocking(move || extract_archive(&extract_from, &cache_dir, 1))
            .await??;
        drop(staging);

        let bin_dir = target.bin_dir(&self.cache_dir);
        let node = bin_dir.join(target.node_file_name());
        if !node.is_file() {
            return Err(InstallError::RuntimeMissing { path: node });
        }
        info!(
            "Installed node v{} to {}",
            self.distribution.version,
            self.cache_dir.display()
        );

        Ok(Runtime {
            npm: bin_dir.join(target.npm_file_name()),
            node,
            search_path: self.augmented_search_path(search_path),
            downloaded: true,
        })
    }

    /// Return a runtime, downloading one only when none can be found.
    ///
    /// # Errors
    /// Returns an error when a download is needed and fails.
    pub async fn ensure(&self, search_path: &SearchPath) -> Result<Runtime, InstallError> {
        match self.locate(search_path) {
            Some(runtime) => Ok(runtime),
            None => self.install(search_path).await,
        }
    }
}
