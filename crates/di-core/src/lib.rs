//! Install and update logic for DI.
//!
//! Everything here is independent of the terminal front end:
//! - Release manifest fetching and version comparison.
//! - Installation record detection.
//! - Archive download, verification and extraction.
//! - Node.js runtime discovery and provisioning.
//! - The [`Installer`] that sequences the steps over injected capabilities.

mod archive;
mod checksum;
mod download;
mod error;
mod installer;
mod process;
mod progress;
mod record;
mod release;
mod runtime;
mod traits;
mod version;

pub use archive::{ArchiveError, ArchiveFormat, extract_archive};
pub use checksum::{parse_expected_checksum, sha256_file, verify_file};
/// `reqwest` downloader with the retry schedule used for every GET.
pub use download::{HttpDownloader, HttpOptions};
/// Error taxonomy and the exit code for each failure class.
pub use error::{ErrorKind, InstallError};
pub use installer::{InstallOutcome, Installer, InstallerConfig};
pub use process::TokioProcessRunner;
pub use progress::InstallProgress;
pub use record::{InstallRecord, RECORD_FILE};
pub use release::{ReleaseManifest, default_release_api_url, fetch_latest_release};
/// Pinned Node.js distribution and the cache-backed ensurer.
pub use runtime::{
    DEFAULT_NODE_MIRROR, DEFAULT_RUNTIME_VERSION, Runtime, RuntimeDistribution, RuntimeEnsurer,
    RuntimeOs, RuntimeTarget,
};
/// Capabilities the installer is driven through.
pub use traits::{Console, Downloader, Invocation, OutputMode, ProcessRunner};
pub use version::{is_newer_version, strip_tag_prefix};
