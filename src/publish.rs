//! Sync driver and the build-then-sync pipeline.
//!
//! [`sync`] walks an output directory and hands it to a [`BatchUploader`].
//! A run succeeds only if the uploader succeeded AND no file failed to open
//! while items were being prepared; the caller never sees partial success.

use std::path::Path;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::s3::iter::UploadSource;
use crate::s3::{BatchSummary, BatchUploader, SyncFolderIter};
use crate::site::SiteBuilder;

/// Outcome of a successful sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub bucket: String,
    pub objects: usize,
    pub bytes: u64,
}

/// Upload every file below `output_root` into `bucket`
pub async fn sync<U: BatchUploader>(
    output_root: &Path,
    bucket: &str,
    uploader: &U,
) -> Result<SyncReport> {
    if !output_root.is_dir() {
        return Err(SyncError::OutputDirMissing {
            path: output_root.to_path_buf(),
        });
    }

    info!("S3 Sync from {} to {}", output_root.display(), bucket);
    let mut iter = SyncFolderIter::new(output_root, bucket);
    info!("Found {} files to upload", iter.remaining());

    let result = uploader.upload_all(&mut iter).await;

    let summary: BatchSummary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!("unexpected error has occurred: {}", e);
            if let Some(prep) = iter.err() {
                warn!("also failed while walking files: {}", prep);
            }
            return Err(e);
        }
    };

    if let Some(e) = iter.err() {
        error!(
            "unexpected error occurred during file walking ({} file(s) skipped): {}",
            iter.failed(),
            e
        );
        if let Some(e) = iter.into_err() {
            return Err(e);
        }
    }

    info!(
        "Synced {} objects ({} bytes) to {}",
        summary.uploaded, summary.bytes, bucket
    );

    Ok(SyncReport {
        bucket: bucket.to_string(),
        objects: summary.uploaded,
        bytes: summary.bytes,
    })
}

/// Build the site from `config.git_repo` and sync the result to `config.s3_bucket`
pub async fn publish<B, U>(config: &Config, builder: &B, uploader: &U) -> Result<SyncReport>
where
    B: SiteBuilder + ?Sized,
    U: BatchUploader,
{
    let output_dir = builder.build(&config.git_repo).await.inspect_err(|e| {
        error!("Site build failed: {}", e);
    })?;

    sync(&output_dir, &config.s3_bucket, uploader).await
}
