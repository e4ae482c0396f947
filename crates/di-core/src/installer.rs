use std::path::{Path, PathBuf};
use std::sync::Arc;

use di_platform::SearchPath;
use log::{debug, info};

use crate::archive::extract_archive;
use crate::error::InstallError;
use crate::progress::InstallProgress;
use crate::record::InstallRecord;
use crate::release::{ReleaseManifest, fetch_latest_release};
use crate::runtime::{Runtime, RuntimeDistribution, RuntimeEnsurer};
use crate::traits::{Console, Downloader, Invocation, OutputMode, ProcessRunner};
use crate::version::{is_newer_version, strip_tag_prefix};

#[derive(Debug, Clone)]
pub struct InstallerConfig {
    pub default_install_dir: PathBuf,
    /// Skips the prompt when set.
    pub install_dir: Option<PathBuf>,
    /// Accept the default destination without prompting.
    pub assume_default: bool,
    pub release_api_url: String,
    pub runtime: RuntimeDistribution,
    pub runtime_cache_dir: PathBuf,
    pub search_path: SearchPath,
    pub verify_runtime_checksum: bool,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub install_dir: PathBuf,
    pub version: String,
    pub updated: bool,
    pub downloaded: bool,
    pub runtime_downloaded: bool,
    pub injected: bool,
}

/// Drives one install or update of DI from prompt to injection.
pub struct Installer {
    config: InstallerConfig,
    console: Arc<dyn Console>,
    downloader: Arc<dyn Downloader>,
    runner: Arc<dyn ProcessRunner>,
}

impl Installer {
    #[must_use]
    pub fn new(
        config: InstallerConfig,
        console: Arc<dyn Console>,
        downloader: Arc<dyn Downloader>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            config,
            console,
            downloader,
            runner,
        }
    }

    #[must_use]
    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    fn prompt_text(&self) -> String {
        format!(
            "Where should DI be installed to?\nDefault path is <{}>",
            self.config.default_install_dir.display()
        )
    }

    /// Pick the destination from flags or the prompt. Blank answers mean the
    /// default.
    ///
    /// # Errors
    /// Returns an error when the terminal cannot be read.
    pub async fn resolve_destination(&self) -> Result<PathBuf, InstallError> {
        let install_dir = if let Some(dir) = &self.config.install_dir {
            dir.clone()
        } else if self.config.assume_default {
            self.config.default_install_dir.clone()
        } else {
            let answer = self.console.ask(&self.prompt_text()).await?;
            match answer.trim() {
                "" => self.config.default_install_dir.clone(),
                path => PathBuf::from(path),
            }
        };

        self.console.report(&InstallProgress::Installing {
            install_dir: install_dir.clone(),
        });
        Ok(install_dir)
    }

    /// # Errors
    /// Returns an error when a record exists but cannot be read.
    pub fn detect_existing(&self, install_dir: &Path) -> Result<Option<InstallRecord>, InstallError> {
        let existing = InstallRecord::detect(install_dir)?;
        if let Some(record) = &existing {
            self.console.report(&InstallProgress::ExistingInstallation {
                version: strip_tag_prefix(&record.version).to_string(),
            });
        }
        Ok(existing)
    }

    /// # Errors
    /// Returns an error when the release API cannot be reached or answers
    /// with something other than a release.
    pub async fn fetch_manifest(&self) -> Result<ReleaseManifest, InstallError> {
        self.console.report(&InstallProgress::FetchingRelease);
        fetch_latest_release(self.downloader.as_ref(), &self.config.release_api_url).await
    }

    /// Download and unpack the release unless the installed copy is at least
    /// as new. Returns whether anything was downloaded.
    ///
    /// # Errors
    /// Returns an error when downloading or extracting fails.
    pub async fn sync_release(
        &self,
        install_dir: &Path,
        existing: Option<&InstallRecord>,
        manifest: &ReleaseManifest,
    ) -> Result<bool, InstallError> {
        if let Some(record) = existing
            && !is_newer_version(&record.version, manifest.version())
        {
            self.console.report(&InstallProgress::SkippingDownload {
                installed: strip_tag_prefix(&record.version).to_string(),
                latest: manifest.version().to_string(),
            });
            return Ok(false);
        }

        self.console.report(&InstallProgress::DownloadingRelease {
            version: manifest.version().to_string(),
        });

        let staging = tempfile::Builder::new()
            .prefix("di-release")
            .tempdir()
            .map_err(|error| {
                InstallError::filesystem(
                    "failed to create staging directory",
                    std::env::temp_dir(),
                    error,
                )
            })?;
        let archive_path = staging.path().join("release.zip");
        self.downloader
            .download_to(&manifest.zipball_url, &archive_path)
            .await?;

        let dest = install_dir.to_path_buf();
        tokio::task::spawn_blocking(move || extract_archive(&archive_path, &dest, 1)).await??;
        info!(
            "Extracted {} into {}",
            manifest.tag_name,
            install_dir.display()
        );
        Ok(true)
    }

    /// Re-read the record the release just laid down.
    ///
    /// # Errors
    /// Returns an error when the record is missing or unparseable.
    pub fn verify_version(&self, install_dir: &Path) -> Result<InstallRecord, InstallError> {
        let record = InstallRecord::load(install_dir)?;
        self.console.report(&InstallProgress::DetectedVersion {
            version: strip_tag_prefix(&record.version).to_string(),
        });
        Ok(record)
    }

    /// # Errors
    /// Returns an error when no runtime is available and fetching one fails,
    /// or when the runtime cannot report its version.
    pub async fn ensure_runtime(&self, install_dir: &Path) -> Result<Runtime, InstallError> {
        self.console.report(&InstallProgress::CheckingRuntime);

        let ensurer = RuntimeEnsurer::new(
            &self.config.runtime_cache_dir,
            self.config.runtime.clone(),
            self.downloader.as_ref(),
        )
        .verify_checksum(self.config.verify_runtime_checksum);

        let runtime = if let Some(runtime) = ensurer.locate(&self.config.search_path) {
            runtime
        } else {
            self.console.report(&InstallProgress::DownloadingRuntime {
                version: ensurer.distribution().version.clone(),
            });
            ensurer.install(&self.config.search_path).await?
        };

        let version = self
            .runner
            .capture(
                &Invocation::new(&runtime.node, ["-v"], install_dir)
                    .search_path(runtime.search_path.clone()),
            )
            .await?;
        self.console.report(&InstallProgress::RuntimeReady { version });
        Ok(runtime)
    }

    /// # Errors
    /// Returns an error when `npm install` fails.
    pub async fn install_dependencies(
        &self,
        install_dir: &Path,
        runtime: &Runtime,
    ) -> Result<(), InstallError> {
        self.console.report(&InstallProgress::InstallingDependencies);
        let invocation = Invocation::new(&runtime.npm, ["install"], install_dir)
            .search_path(runtime.search_path.clone())
            .output(OutputMode::Silent);
        self.runner.run(&invocation).await
    }

    /// # Errors
    /// Returns an error when the plugin install script fails.
    pub async fn install_plugin_dependencies(
        &self,
        install_dir: &Path,
        runtime: &Runtime,
    ) -> Result<(), InstallError> {
        self.console.report(&InstallProgress::InstallingPluginDependencies);
        let invocation = Invocation::new(&runtime.node, ["install-plugins"], install_dir)
            .search_path(runtime.search_path.clone());
        self.runner.run(&invocation).await
    }

    /// # Errors
    /// Returns an error when the injection script fails.
    pub async fn inject(&self, install_dir: &Path, runtime: &Runtime) -> Result<(), InstallError> {
        self.console.report(&InstallProgress::RunningInjection);
        let invocation = Invocation::new(&runtime.node, ["install", "inject"], install_dir)
            .search_path(runtime.search_path.clone());
        self.runner.run(&invocation).await
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// # Errors
    /// Returns the first step's error; nothing is rolled back.
    pub async fn run(&self) -> Result<InstallOutcome, InstallError> {
        let install_dir = self.resolve_destination().await?;
        let existing = self.detect_existing(&install_dir)?;
        let updated = existing.is_some();

        let manifest = self.fetch_manifest().await?;
        let downloaded = self
            .sync_release(&install_dir, existing.as_ref(), &manifest)
            .await?;
        let record = self.verify_version(&install_dir)?;

        let runtime = self.ensure_runtime(&install_dir).await?;
        self.install_dependencies(&install_dir, &runtime).await?;
        self.install_plugin_dependencies(&install_dir, &runtime).await?;

        if !updated {
            self.inject(&install_dir, &runtime).await?;
        }

        self.console.report(&InstallProgress::Complete);
        debug!("Install finished for {}", install_dir.display());

        Ok(InstallOutcome {
            install_dir,
            version: strip_tag_prefix(&record.version).to_string(),
            updated,
            downloaded,
            runtime_downloaded: runtime.downloaded,
            injected: !updated,
        })
    }
}
