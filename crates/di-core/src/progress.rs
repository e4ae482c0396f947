use std::fmt;
use std::path::PathBuf;

/// Steps announced to the user while an install runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallProgress {
    Installing { install_dir: PathBuf },
    ExistingInstallation { version: String },
    FetchingRelease,
    SkippingDownload { installed: String, latest: String },
    DownloadingRelease { version: String },
    DetectedVersion { version: String },
    CheckingRuntime,
    DownloadingRuntime { version: String },
    RuntimeReady { version: String },
    InstallingDependencies,
    InstallingPluginDependencies,
    RunningInjection,
    Complete,
}

impl fmt::Display for InstallProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installing { install_dir } => {
                write!(f, "Installing DI to <{}>", install_dir.display())
            }
            Self::ExistingInstallation { version } => write!(
                f,
                "  - detected existing installation (v{version}), updating instead..."
            ),
            Self::FetchingRelease => write!(f, "  - fetching latest version..."),
            Self::SkippingDownload { installed, latest } => write!(
                f,
                "  - remote version v{latest} is not newer than v{installed}, skipping download..."
            ),
            Self::DownloadingRelease { version } => write!(f, "  - downloading DI v{version}"),
            Self::DetectedVersion { version } => write!(f, "    detected DI v{version}"),
            Self::CheckingRuntime => write!(f, "  - checking for node..."),
            Self::DownloadingRuntime { version } => write!(
                f,
                "  - downloading node v{version}, this could take some time, please wait..."
            ),
            Self::RuntimeReady { version } => write!(f, "    found node {version}"),
            Self::InstallingDependencies => write!(
                f,
                "  - installing/updating dependencies, this could take a few minutes..."
            ),
            Self::InstallingPluginDependencies => write!(
                f,
                "  - installing plugin dependencies, this could take a few minutes... \
                 (just rerun this tool to install new plugin dependencies)"
            ),
            Self::RunningInjection => write!(f, "  - running injection script..."),
            Self::Complete => write!(f, "Successfully installed DI :)"),
        }
    }
}
