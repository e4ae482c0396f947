use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// An explicit copy of the executable search path.
///
/// The installer never edits the process-wide `PATH`; directories are
/// appended to a `SearchPath` value which is then handed to child processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    #[must_use]
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Snapshot of the current process `PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var_os("PATH")
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    /// Split a `PATH`-style value using the platform delimiter.
    #[must_use]
    pub fn parse(value: &OsStr) -> Self {
        Self {
            dirs: std::env::split_paths(value)
                .filter(|dir| !dir.as_os_str().is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    #[must_use]
    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.iter().any(|existing| existing == dir)
    }

    /// Returns a copy with `dir` appended, unless it is already present.
    #[must_use]
    pub fn with_appended(&self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut dirs = self.dirs.clone();
        if !self.contains(&dir) {
            dirs.push(dir);
        }
        Self { dirs }
    }

    /// Join back into a value suitable for a child's `PATH`.
    ///
    /// # Errors
    /// Returns an error if a directory contains the platform path delimiter.
    pub fn to_os_string(&self) -> Result<OsString, std::env::JoinPathsError> {
        std::env::join_paths(&self.dirs)
    }
}

/// `.exe` on Windows, nothing elsewhere.
#[must_use]
pub fn executable_extension() -> &'static str {
    if cfg!(windows) { ".exe" } else { "" }
}

/// Find `base` plus the platform executable extension on `search_path`.
///
/// Directories are searched in order and the first hit wins. Returns `None`
/// when no directory holds a matching executable.
#[must_use]
pub fn locate_executable(base: &str, search_path: &SearchPath) -> Option<PathBuf> {
    locate_file(&format!("{base}{}", executable_extension()), search_path)
}

/// Find a file with exactly this name on `search_path`.
#[must_use]
pub fn locate_file(file_name: &str, search_path: &SearchPath) -> Option<PathBuf> {
    if search_path.dirs.is_empty() {
        return None;
    }

    let joined = search_path.to_os_string().ok()?;
    let cwd = std::env::current_dir().ok()?;

    match which::which_in(file_name, Some(joined), cwd) {
        Ok(path) => Some(path),
        Err(error) => {
            log::debug!("{file_name} not found on search path: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{SearchPath, executable_extension, locate_executable};

    fn write_executable(dir: &Path, base: &str) -> PathBuf {
        std::fs::create_dir_all(dir).expect("create bin dir");
        let path = dir.join(format!("{base}{}", executable_extension()));
        std::fs::write(&path, b"#!/bin/sh\n").expect("write executable");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("mark executable");
        }
        path
    }

    #[test]
    fn with_appended_keeps_order_and_skips_duplicates() {
        let path = SearchPath::new(vec![PathBuf::from("/usr/bin")]);

        let appended = path.with_appended("/opt/node/bin");
        let again = appended.with_appended("/usr/bin");

        assert_eq!(
            again.dirs(),
            &[PathBuf::from("/usr/bin"), PathBuf::from("/opt/node/bin")]
        );
        assert_eq!(path.dirs().len(), 1);
    }

    #[test]
    fn parse_round_trips_through_join() {
        let original = SearchPath::new(vec![PathBuf::from("a"), PathBuf::from("b")]);
        let joined = original.to_os_string().expect("join search path");

        assert_eq!(SearchPath::parse(&joined), original);
    }

    #[test]
    fn locate_returns_none_when_missing() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = SearchPath::new(vec![temp.path().join("empty")]);

        assert!(locate_executable("node", &path).is_none());
        assert!(locate_executable("node", &SearchPath::default()).is_none());
    }

    #[test]
    fn locate_returns_first_match_in_path_order() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        write_executable(&second, "node");
        let expected = write_executable(&first, "node");

        let path = SearchPath::new(vec![temp.path().join("none"), first, second]);

        assert_eq!(locate_executable("node", &path), Some(expected));
    }
}
