//! # Document Files
//!
//! Reading load path documents and writing them back safely.
//!
//! Saves are atomic: the document is written to `<name>.json.tmp`, synced,
//! then renamed over the target, so an interrupted save never leaves a
//! half-written document behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Temporary path used while saving `path`
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read a document into memory
pub fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Could not read '{}'", path.display()))
}

/// Write a document atomically (temp file, sync, rename)
pub fn save_document(contents: &str, path: &Path) -> Result<()> {
    let tmp_path = tmp_path_for(path);

    let mut tmp_file =
        File::create(&tmp_path).with_context(|| format!("Could not create '{}'", tmp_path.display()))?;
    tmp_file
        .write_all(contents.as_bytes())
        .with_context(|| format!("Could not write '{}'", tmp_path.display()))?;
    tmp_file
        .sync_all()
        .with_context(|| format!("Could not sync '{}'", tmp_path.display()))?;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e).with_context(|| format!("Could not replace '{}'", path.display()));
    }

    log::info!("Saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn temp_document_path(name: &str) -> PathBuf {
        temp_dir().join(format!("rlt_test_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_tmp_path_keeps_extension() {
        assert_eq!(tmp_path_for(Path::new("/data/tower.json")), Path::new("/data/tower.json.tmp"));
    }

    #[test]
    fn test_save_and_read_roundtrip() {
        let path = temp_document_path("roundtrip");
        save_document("{\"nodes\": []}", &path).unwrap();
        assert_eq!(read_document(&path).unwrap(), "{\"nodes\": []}");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_leaves_no_tmp_file() {
        let path = temp_document_path("atomic");
        save_document("first", &path).unwrap();
        save_document("second", &path).unwrap();

        assert!(!tmp_path_for(&path).exists());
        assert_eq!(read_document(&path).unwrap(), "second");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let err = read_document(Path::new("/nonexistent/rlt/graph.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rlt/graph.json"));
    }
}
