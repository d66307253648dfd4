//! Batch file store primitives.
//!
//! A batch file's name is its creation time in decimal epoch milliseconds,
//! so a numeric sort of names is a chronological sort of batches. Metadata
//! sidecars share the batch file's name under a `meta/` subdirectory of the
//! same root.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::META_DIR_NAME;

/// Parse a batch file name into its creation timestamp (epoch millis).
///
/// Returns `None` for anything that is not a plain decimal number, which is
/// how foreign files in the batch root are ignored.
pub fn parse_batch_timestamp(name: &str) -> Option<u64> {
    if name.is_empty() {
        return None;
    }
    name.parse::<u64>().ok()
}

/// List batch files in `root`, sorted chronologically (oldest first).
///
/// Subdirectories (including the metadata sidecar dir) and files whose names
/// do not parse as timestamps are skipped. A missing root yields an empty
/// list.
pub fn list_batch_files(root: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut files: Vec<(u64, PathBuf)> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if !path.is_file() {
                return None;
            }
            let ts = parse_batch_timestamp(path.file_name()?.to_str()?)?;
            Some((ts, path))
        })
        .collect();

    files.sort_by_key(|(ts, _)| *ts);
    files.into_iter().map(|(_, path)| path).collect()
}

/// Size of a file in bytes, treating a failed stat as zero.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Path of the metadata sidecar for a batch file.
pub fn metadata_path(root: &Path, batch: &Path) -> PathBuf {
    let name = batch.file_name().unwrap_or_default();
    root.join(META_DIR_NAME).join(name)
}

/// Append one item to a batch file, writing `separator` first when the file
/// already holds data.
///
/// Separator and item go down in a single write call: a crash mid-append can
/// truncate the final item, but never leaves a separator orphaned from the
/// item it introduces.
pub fn append_item(path: &Path, item: &[u8], separator: &[u8]) -> std::io::Result<()> {
    let needs_separator = !separator.is_empty() && file_size(path) > 0;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_separator {
        let mut joined = Vec::with_capacity(separator.len() + item.len());
        joined.extend_from_slice(separator);
        joined.extend_from_slice(item);
        file.write_all(&joined)
    } else {
        file.write_all(item)
    }
}

/// Delete a batch file and its sidecar, logging failures instead of
/// propagating them. Returns whether the batch file itself is gone.
pub fn delete_batch(root: &Path, batch: &Path) -> bool {
    let meta = metadata_path(root, batch);
    if meta.exists() {
        if let Err(e) = fs::remove_file(&meta) {
            warn!("failed to delete metadata sidecar {}: {}", meta.display(), e);
        }
    }
    match fs::remove_file(batch) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("failed to delete batch file {}: {}", batch.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_batch_timestamp() {
        assert_eq!(parse_batch_timestamp("1726000000000"), Some(1_726_000_000_000));
        assert_eq!(parse_batch_timestamp("0"), Some(0));
        assert_eq!(parse_batch_timestamp(""), None);
        assert_eq!(parse_batch_timestamp("batch.json"), None);
        assert_eq!(parse_batch_timestamp("-42"), None);
    }

    #[test]
    fn test_list_skips_foreign_entries_and_sorts() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("200"), b"b").unwrap();
        fs::write(root.join("100"), b"a").unwrap();
        fs::write(root.join("notes.txt"), b"x").unwrap();
        fs::create_dir(root.join(META_DIR_NAME)).unwrap();
        fs::write(root.join(META_DIR_NAME).join("100"), b"m").unwrap();

        let files = list_batch_files(root);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["100", "200"]);
    }

    #[test]
    fn test_list_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        assert!(list_batch_files(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn test_append_without_separator_is_raw_concatenation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("100");
        append_item(&path, b"aaa", b"").unwrap();
        append_item(&path, b"bbb", b"").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"aaabbb");
        assert_eq!(file_size(&path), 6);
    }

    #[test]
    fn test_append_with_separator_skips_first_item() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("100");
        append_item(&path, b"{}", b",").unwrap();
        append_item(&path, b"{}", b",").unwrap();
        append_item(&path, b"{}", b",").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{},{},{}");
    }

    #[test]
    fn test_delete_batch_removes_sidecar() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let batch = root.join("100");
        fs::write(&batch, b"data").unwrap();
        fs::create_dir(root.join(META_DIR_NAME)).unwrap();
        let meta = metadata_path(root, &batch);
        fs::write(&meta, b"ctx").unwrap();

        assert!(delete_batch(root, &batch));
        assert!(!batch.exists());
        assert!(!meta.exists());
    }

    #[test]
    fn test_delete_missing_batch_is_ok() {
        let dir = tempdir().unwrap();
        assert!(delete_batch(dir.path(), &dir.path().join("100")));
    }
}
