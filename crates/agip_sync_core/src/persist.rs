//! Whole-file replacement for run artifacts.
//!
//! # Invariants
//! - Target files are replaced by rename, never truncated in place.
//! - Callers serialize runs; there is no locking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes `contents` to a sibling temp file and renames it over `path`.
///
/// Creates missing parent directories.
pub(crate) fn replace_file(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    fs::write(&staging, contents)?;
    if let Err(err) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::replace_file;

    #[test]
    fn replace_file_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        replace_file(&path, "first").unwrap();
        replace_file(&path, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("nested").join("out.json.tmp").exists());
    }
}
