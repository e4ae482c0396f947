use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::InstallError;

/// Find the digest listed for `file_name` in a `SHASUMS256.txt` body.
#[must_use]
pub fn parse_expected_checksum(checksums: &str, file_name: &str) -> Option<String> {
    checksums.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let hash = parts.next()?;
        let name = parts
            .next()?
            .trim_start_matches('*')
            .trim_start_matches("./");
        (name == file_name).then(|| hash.to_ascii_lowercase())
    })
}

/// Hex SHA-256 of a file on disk.
///
/// # Errors
/// Returns an error when the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String, InstallError> {
    let mut file = std::fs::File::open(path)
        .map_err(|error| InstallError::filesystem("failed to open file for checksum", path, error))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file.read(&mut buffer).map_err(|error| {
            InstallError::filesystem("failed to read file for checksum", path, error)
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare a downloaded file against the digest published for it.
///
/// # Errors
/// Returns an error when no digest is listed or the digests differ.
pub fn verify_file(
    path: &Path,
    file_name: &str,
    checksums: &str,
    checksums_url: &str,
) -> Result<(), InstallError> {
    let expected = parse_expected_checksum(checksums, file_name).ok_or_else(|| {
        InstallError::ChecksumMissing {
            file: file_name.to_string(),
            url: checksums_url.to_string(),
        }
    })?;
    let actual = sha256_file(path)?;

    if actual.eq_ignore_ascii_case(&expected) {
        log::info!("Checksum verified for {file_name}");
        Ok(())
    } else {
        Err(InstallError::ChecksumMismatch {
            file: file_name.to_string(),
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_expected_checksum, sha256_file, verify_file};
    use crate::error::{ErrorKind, InstallError};

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn parse_expected_checksum_matches_file_name() {
        let checksums = "\
aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa  node-v8.4.0-darwin-x64.tar.gz
BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB  node-v8.4.0-linux-x64.tar.gz
";
        let parsed = parse_expected_checksum(checksums, "node-v8.4.0-linux-x64.tar.gz");

        assert_eq!(
            parsed.as_deref(),
            Some("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")
        );
        assert!(parse_expected_checksum(checksums, "node-v8.4.0-win-x64.zip").is_none());
    }

    #[test]
    fn sha256_file_returns_known_digest() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("payload.bin");
        std::fs::write(&path, b"abc").expect("payload file should be written");

        assert_eq!(sha256_file(&path).expect("checksum"), ABC_SHA256);
    }

    #[test]
    fn verify_file_reports_mismatch_and_missing_entries() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("node.tar.gz");
        std::fs::write(&path, b"abc").expect("payload file should be written");
        let url = "https://nodejs.org/dist/v8.4.0/SHASUMS256.txt";

        verify_file(&path, "node.tar.gz", &format!("{ABC_SHA256}  node.tar.gz\n"), url)
            .expect("matching digest should verify");

        let mismatch = verify_file(&path, "node.tar.gz", &format!("{}  node.tar.gz", "0".repeat(64)), url)
            .expect_err("wrong digest should fail");
        assert!(matches!(mismatch, InstallError::ChecksumMismatch { .. }));
        assert_eq!(mismatch.kind(), ErrorKind::Archive);

        let missing = verify_file(&path, "node.tar.gz", "", url).expect_err("no entry should fail");
        assert!(matches!(missing, InstallError::ChecksumMissing { .. }));
    }
}
