use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::classify::{Classification, classify};
use super::walk::{FileRecord, enumerate};
use crate::error::SyncError;

/// One object ready to be handed to an uploader
///
/// `body` is `None` when the source file could not be opened. The uploader
/// owns the handle and closes it once the transfer is done.
#[derive(Debug)]
pub struct UploadItem {
    pub bucket: String,
    pub key: String,
    pub source_path: PathBuf,
    pub body: Option<File>,
    pub classification: Classification,
}

/// Pull-based source of upload items consumed by a batch uploader
///
/// Not safe for concurrent consumption: callers that upload in parallel must
/// take items from a single task.
pub trait UploadSource: Send {
    /// Whether another item can be taken
    fn has_next(&self) -> bool;

    /// Take the next item, or `None` once exhausted
    fn next_upload_item(&mut self) -> Option<UploadItem>;

    /// First error hit while preparing an item
    fn err(&self) -> Option<&SyncError>;

    /// Number of items left, when known
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// Iterates over the files of an output directory for upload into a bucket
///
/// The directory is scanned once on construction. Files are opened and
/// classified only when taken. A file that cannot be opened does not stop
/// iteration: the first such error is kept and returned by [`UploadSource::err`].
#[derive(Debug)]
pub struct SyncFolderIter {
    bucket: String,
    files: VecDeque<FileRecord>,
    err: Option<SyncError>,
    failed: usize,
}

impl SyncFolderIter {
    pub fn new(root: &Path, bucket: impl Into<String>) -> Self {
        Self::from_records(enumerate(root), bucket)
    }

    pub fn from_records(records: Vec<FileRecord>, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            files: records.into(),
            err: None,
            failed: 0,
        }
    }

    /// Files not yet taken
    pub fn remaining(&self) -> usize {
        self.files.len()
    }

    /// Number of files that could not be opened so far
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Consume the iterator, returning the first preparation error
    pub fn into_err(self) -> Option<SyncError> {
        self.err
    }
}

impl UploadSource for SyncFolderIter {
    fn has_next(&self) -> bool {
        !self.files.is_empty()
    }

    fn next_upload_item(&mut self) -> Option<UploadItem> {
        let FileRecord { key, source_path } = self.files.pop_front()?;

        let body = match File::open(&source_path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("Cannot open {}: {}", source_path.display(), e);
                self.failed += 1;
                if self.err.is_none() {
                    self.err = Some(SyncError::Preparation {
                        path: source_path.clone(),
                        source: e,
                    });
                }
                None
            }
        };

        let classification = classify(&key);
        debug!(
            "Prepared {} ({}, {})",
            key, classification.content_type, classification.cache_control
        );

        Some(UploadItem {
            bucket: self.bucket.clone(),
            key,
            source_path,
            body,
            classification,
        })
    }

    fn err(&self) -> Option<&SyncError> {
        self.err.as_ref()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.files.len())
    }
}
