use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A file found under the output root and the key it will be stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub key: String,
    pub source_path: PathBuf,
}

/// Collect every non-directory entry below `root`
///
/// The key is the entry's path with the literal `root` string removed. This is
/// a plain string strip: a root of `public` yields keys like `/index.html`,
/// while `public/` yields `index.html`.
///
/// Entries that cannot be read are logged and skipped, so an unreadable
/// subtree is simply missing from the result. Entries are sorted by name
/// within each directory.
pub fn enumerate(root: &Path) -> Vec<FileRecord> {
    let root_str = root.to_string_lossy();
    let mut records = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let key = {
            let path_str = entry.path().to_string_lossy();
            path_str
                .strip_prefix(&*root_str)
                .unwrap_or(&*path_str)
                .to_string()
        };
        let source_path = entry.into_path();

        debug!("Found {} -> {}", source_path.display(), key);
        records.push(FileRecord { key, source_path });
    }

    records
}
