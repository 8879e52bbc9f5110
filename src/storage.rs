//! License file storage.
//!
//! Writes go to a temporary file next to the target, are flushed to disk and
//! then renamed over the target, so a reader sees either the old file or the
//! new one. On Unix the file is created with mode `0600`.
//!
//! ## Default location
//!
//! - Windows: `%APPDATA%\warden\license.json`
//! - macOS: `~/Library/Application Support/warden/license.json`
//! - Linux: `~/.local/share/warden/license.json`

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::errors::{LicenseError, LicenseResult};

const APP_DIR: &str = "warden";
const LICENSE_FILE: &str = "license.json";

/// Get the application data directory for warden.
pub fn get_app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(APP_DIR))
}

/// Default license file path inside the app data directory.
pub fn default_license_path() -> LicenseResult<PathBuf> {
    get_app_data_dir()
        .map(|dir| dir.join(LICENSE_FILE))
        .ok_or_else(|| {
            LicenseError::StorageError(std::io::Error::new(
                ErrorKind::NotFound,
                "Could not determine app data directory",
            ))
        })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| LICENSE_FILE.into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Atomically replace `path` with `data`.
pub fn write_file_atomic(path: &Path, data: &[u8]) -> LicenseResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path_for(path);
    let result = write_and_rename(&tmp, path, data);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(tmp: &Path, path: &Path, data: &[u8]) -> LicenseResult<()> {
    // A leftover temp file may carry looser permissions; never reuse it.
    match fs::remove_file(tmp) {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let mut file = open_owner_only(tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(tmp, path)?;
    Ok(())
}

/// Read the whole license file.
pub fn read_file(path: &Path) -> LicenseResult<Vec<u8>> {
    match fs::read(path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(LicenseError::InvalidLicense(
            "No local license file found.".to_string(),
        )),
        Err(e) => Err(LicenseError::StorageError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.json");

        write_file_atomic(&path, b"first").unwrap();
        assert_eq!(read_file(&path).unwrap(), b"first");

        write_file_atomic(&path, b"second").unwrap();
        assert_eq!(read_file(&path).unwrap(), b"second");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("license.json");

        write_file_atomic(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.json");
        write_file_atomic(&path, b"data").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn stale_temp_file_permissions_are_not_inherited() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.json");
        let tmp = temp_path_for(&path);
        fs::write(&tmp, b"stale").unwrap();
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o644)).unwrap();

        write_file_atomic(&path, b"data").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(read_file(&path).unwrap(), b"data");
        assert!(!tmp.exists());
    }

    #[test]
    fn missing_file_is_invalid_license() {
        let dir = tempfile::tempdir().unwrap();
        match read_file(&dir.path().join("nope.json")) {
            Err(LicenseError::InvalidLicense(msg)) => {
                assert!(msg.contains("No local license file found"))
            }
            other => panic!("Expected InvalidLicense error, got: {:?}", other),
        }
    }

    #[test]
    fn failed_write_leaves_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.json");
        write_file_atomic(&path, b"good").unwrap();

        // A directory squatting on the temp name makes the write fail.
        fs::create_dir(temp_path_for(&path)).unwrap();
        assert!(write_file_atomic(&path, b"bad").is_err());
        assert_eq!(read_file(&path).unwrap(), b"good");
    }

    #[test]
    fn temp_path_is_a_sibling() {
        let path = Path::new("/var/lib/app/license.json");
        assert_eq!(
            temp_path_for(path),
            PathBuf::from("/var/lib/app/license.json.tmp")
        );
    }
}
