use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;

/// Coarse failure classes, one per distinct process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Prompt,
    Network,
    Archive,
    InstallRecord,
    Subprocess,
    Filesystem,
    Platform,
    Other,
}

impl ErrorKind {
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Prompt | Self::Other => 1,
            Self::Network => 2,
            Self::Archive => 3,
            Self::InstallRecord => 4,
            Self::Subprocess => 5,
            Self::Filesystem => 6,
            Self::Platform => 7,
        }
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to read install path: {0}")]
    Prompt(String),

    #[error("network error during {operation} ({url}): {details}")]
    Network {
        operation: &'static str,
        url: String,
        details: String,
    },

    #[error("{operation} failed with HTTP {status} for {url}{body_snippet}")]
    HttpStatus {
        operation: &'static str,
        url: String,
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    #[error("invalid release manifest: {0}")]
    InvalidManifest(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("no checksum entry for {file} in {url}")]
    ChecksumMissing { file: String, url: String },

    #[error("runtime executable missing after extraction: {}", .path.display())]
    RuntimeMissing { path: PathBuf },

    #[error("installation record {} is unusable: {details}", .path.display())]
    InstallRecord { path: PathBuf, details: String },

    #[error("`{command}` {}{stderr}", describe_exit(.code))]
    Subprocess {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context} ({}): {source}", .path.display())]
    Filesystem {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("background task failed: {0}")]
    Task(String),
}

#[allow(clippy::ref_option)]
fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

impl InstallError {
    pub fn network<E>(operation: &'static str, url: &str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Network {
            operation,
            url: url.to_string(),
            details: error.to_string(),
        }
    }

    pub fn filesystem(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            context,
            path: path.into(),
            source,
        }
    }

    pub fn install_record(path: impl Into<PathBuf>, details: impl std::fmt::Display) -> Self {
        Self::InstallRecord {
            path: path.into(),
            details: details.to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Prompt(_) => ErrorKind::Prompt,
            Self::Network { .. } | Self::HttpStatus { .. } | Self::InvalidManifest(_) => {
                ErrorKind::Network
            }
            Self::Archive(_)
            | Self::ChecksumMismatch { .. }
            | Self::ChecksumMissing { .. }
            | Self::RuntimeMissing { .. } => ErrorKind::Archive,
            Self::InstallRecord { .. } => ErrorKind::InstallRecord,
            Self::Subprocess { .. } | Self::Spawn { .. } => ErrorKind::Subprocess,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::UnsupportedPlatform { .. } => ErrorKind::Platform,
            Self::Task(_) => ErrorKind::Other,
        }
    }

    /// Transport failures and server-side statuses are worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for InstallError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Task(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{ErrorKind, InstallError};

    #[test]
    fn exit_codes_are_distinct_per_failure_kind() {
        let kinds = [
            ErrorKind::Prompt,
            ErrorKind::Network,
            ErrorKind::Archive,
            ErrorKind::InstallRecord,
            ErrorKind::Subprocess,
            ErrorKind::Filesystem,
            ErrorKind::Platform,
        ];

        let codes: HashSet<u8> = kinds.iter().map(|kind| kind.exit_code()).collect();

        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn subprocess_error_describes_exit_code_and_stderr() {
        let error = InstallError::Subprocess {
            command: "npm install".to_string(),
            code: Some(1),
            stderr: ": ERR! missing script".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "`npm install` exited with code 1: ERR! missing script"
        );
        assert_eq!(error.kind(), ErrorKind::Subprocess);
    }

    #[test]
    fn http_status_retry_policy_targets_server_errors() {
        let status = |status| InstallError::HttpStatus {
            operation: "fetch release manifest",
            url: "https://example.invalid".to_string(),
            status,
            body_snippet: String::new(),
        };

        assert!(status(reqwest::StatusCode::BAD_GATEWAY).is_retryable());
        assert!(status(reqwest::StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!status(reqwest::StatusCode::NOT_FOUND).is_retryable());
        assert!(InstallError::network("download", "https://example.invalid", "reset").is_retryable());
        assert!(!InstallError::InvalidManifest("eof".to_string()).is_retryable());
    }

    #[test]
    fn filesystem_helper_maps_to_filesystem_kind() {
        let error = InstallError::filesystem(
            "failed to create install directory",
            "/root/DI",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert_eq!(error.kind(), ErrorKind::Filesystem);
        assert_eq!(error.kind().exit_code(), 6);
        assert!(error.to_string().contains("/root/DI"));
    }
}
