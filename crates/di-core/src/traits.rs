use std::path::{Path, PathBuf};

use async_trait::async_trait;
use di_platform::SearchPath;

use crate::error::InstallError;
use crate::progress::InstallProgress;

/// Interactive terminal access.
#[async_trait]
pub trait Console: Send + Sync {
    /// Ask one question and return the raw answer, which may be empty.
    async fn ask(&self, question: &str) -> Result<String, InstallError>;

    fn report(&self, progress: &InstallProgress);
}

/// HTTP access for manifests, checksums and archives.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, InstallError>;

    /// Stream `url` into the file at `dest`, returning the byte count.
    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64, InstallError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Child shares the installer's terminal.
    Inherit,
    /// Output is discarded; stderr is kept only to explain a failure.
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub search_path: SearchPath,
    pub output: OutputMode,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
            search_path: SearchPath::default(),
            output: OutputMode::Inherit,
        }
    }

    #[must_use]
    pub fn search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    #[must_use]
    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Program file name plus arguments, for messages.
    #[must_use]
    pub fn display_command(&self) -> String {
        let program = self
            .program
            .file_name()
            .map_or_else(|| self.program.to_string_lossy(), |name| name.to_string_lossy());
        std::iter::once(program.into_owned())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion; a non-zero exit is an error.
    async fn run(&self, invocation: &Invocation) -> Result<(), InstallError>;

    /// Run silently and return trimmed stdout.
    async fn capture(&self, invocation: &Invocation) -> Result<String, InstallError>;
}

#[cfg(test)]
mod tests {
    use super::{Invocation, OutputMode};

    #[test]
    fn invocation_defaults_to_inherited_output() {
        let invocation = Invocation::new("/opt/node/bin/node", ["install", "inject"], "/home/u/DI");

        assert_eq!(invocation.output, OutputMode::Inherit);
        assert_eq!(invocation.display_command(), "node install inject");
    }
}
