use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{context} ({}): {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("unrecognized archive format: {}", .path.display())]
    UnknownFormat { path: PathBuf },
    #[error("archive entry escapes the extraction directory: {}", .path.display())]
    EscapesDestination { path: PathBuf },
}

impl ArchiveError {
    fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Identify an archive by its leading magic bytes.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or is neither a zip nor
    /// a gzip stream.
    pub fn detect(path: &Path) -> Result<Self, ArchiveError> {
        let mut file =
            File::open(path).map_err(|error| ArchiveError::io("failed to open archive", path, error))?;
        let mut magic = [0_u8; 4];
        let read = file
            .read(&mut magic)
            .map_err(|error| ArchiveError::io("failed to read archive header", path, error))?;

        match &magic[..read] {
            [b'P', b'K', 0x03, 0x04] | [b'P', b'K', 0x05, 0x06] => Ok(Self::Zip),
            [0x1f, 0x8b, ..] => Ok(Self::TarGz),
            _ => Err(ArchiveError::UnknownFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Extract `archive` into `dest`, dropping the first `strip_components`
/// path components of every entry.
///
/// Existing files are overwritten in place. Entries that would land outside
/// `dest` are skipped.
///
/// # Errors
/// Returns an error when the archive is unreadable or a file cannot be
/// written.
pub fn extract_archive(
    archive: &Path,
    dest: &Path,
    strip_components: usize,
) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(dest)
        .map_err(|error| ArchiveError::io("failed to create extraction directory", dest, error))?;
    let root = std::fs::canonicalize(dest)
        .map_err(|error| ArchiveError::io("failed to resolve extraction directory", dest, error))?;

    match ArchiveFormat::detect(archive)? {
        ArchiveFormat::Zip => extract_zip(archive, &root, strip_components)?,
        ArchiveFormat::TarGz => extract_tar_gz(archive, &root, strip_components)?,
    }

    debug!("Extraction complete to {}", dest.display());
    Ok(())
}

/// Relative path of an entry after stripping, or `None` when nothing is left
/// or the path tries to escape.
fn strip_entry_path(path: &Path, strip_components: usize) -> Option<PathBuf> {
    let mut remaining = strip_components;
    let mut stripped = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                if remaining > 0 {
                    remaining -= 1;
                } else {
                    stripped.push(part);
                }
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if stripped.as_os_str().is_empty() {
        None
    } else {
        Some(stripped)
    }
}

/// Remove a file or symlink occupying `path` so the entry can replace it.
fn clear_existing(path: &Path) -> Result<(), ArchiveError> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.is_dir() => std::fs::remove_file(path)
            .map_err(|error| ArchiveError::io("failed to replace existing file", path, error)),
        _ => Ok(()),
    }
}

/// Create the parent of `path` and make sure it still resolves inside `root`
/// once links already on disk are followed. `root` must be canonical.
fn create_parent(root: &Path, path: &Path) -> Result<(), ArchiveError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    std::fs::create_dir_all(parent).map_err(|error| {
        ArchiveError::io("failed to create extraction parent directory", parent, error)
    })?;
    let resolved = std::fs::canonicalize(parent).map_err(|error| {
        ArchiveError::io("failed to resolve extraction parent directory", parent, error)
    })?;
    if !resolved.starts_with(root) {
        return Err(ArchiveError::EscapesDestination {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Whether a relative link at `entry` pointing to `target` resolves inside
/// the extraction directory without touching the filesystem.
fn link_stays_inside(entry: &Path, target: &Path) -> bool {
    let mut depth = entry
        .parent()
        .map_or(0, |parent| parent.components().count());

    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    true
}

fn extract_zip(zip_path: &Path, dest: &Path, strip_components: usize) -> Result<(), ArchiveError> {
    let file = File::open(zip_path)
        .map_err(|error| ArchiveError::io("failed to open zip file", zip_path, error))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| ArchiveError::zip("failed to read zip archive", error))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| ArchiveError::zip("failed to read zip entry", error))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping zip entry with unsafe path");
            continue;
        };
        let Some(relative) = strip_entry_path(&name, strip_components) else {
            continue;
        };
        let out_path = dest.join(relative);

        create_parent(dest, &out_path)?;
        clear_existing(&out_path)?;

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                ArchiveError::io("failed to create extraction directory", &out_path, error)
            })?;
            continue;
        }

        let mut outfile = File::create(&out_path).map_err(|error| {
            ArchiveError::io("failed to create extracted file", &out_path, error)
        })?;
        std::io::copy(&mut entry, &mut outfile).map_err(|error| {
            ArchiveError::io("failed to extract archive entry", &out_path, error)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
    }

    Ok(())
}

fn extract_tar_gz(
    tar_path: &Path,
    dest: &Path,
    strip_components: usize,
) -> Result<(), ArchiveError> {
    let file = File::open(tar_path)
        .map_err(|error| ArchiveError::io("failed to open tarball", tar_path, error))?;
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    let entries = archive
        .entries()
        .map_err(|error| ArchiveError::io("failed to read tarball", tar_path, error))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|error| ArchiveError::io("failed to read tar entry", tar_path, error))?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_hard_link() {
            warn!("Skipping hard link entry in {}", tar_path.display());
            continue;
        }

        let path = entry
            .path()
            .map_err(|error| ArchiveError::io("failed to read tar entry path", tar_path, error))?
            .into_owned();
        let Some(relative) = strip_entry_path(&path, strip_components) else {
            if path.components().count() > strip_components {
                warn!("Skipping tar entry with unsafe path: {}", path.display());
            }
            continue;
        };
        let out_path = dest.join(&relative);

        if entry_type.is_symlink() {
            let target = entry
                .link_name()
                .map_err(|error| ArchiveError::io("failed to read link target", &out_path, error))?;
            if !target.is_some_and(|target| link_stays_inside(&relative, &target)) {
                warn!("Skipping symlink pointing outside the archive: {}", path.display());
                continue;
            }
        }

        create_parent(dest, &out_path)?;
        clear_existing(&out_path)?;

        if entry_type.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                ArchiveError::io("failed to create extraction directory", &out_path, error)
            })?;
            continue;
        }

        entry
            .unpack(&out_path)
            .map_err(|error| ArchiveError::io("failed to extract archive entry", &out_path, error))?;
    }

    Ok(())
}
