use async_trait::async_trait;
use aws_sdk_s3::{Client, error::DisplayErrorContext, primitives::ByteStream};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::fs::File;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info};

use super::iter::{UploadItem, UploadSource};
use super::multipart::{MULTIPART_THRESHOLD, upload_multipart};
use crate::error::{Result, SyncError};

/// What a batch uploader did with the items it drained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub uploaded: usize,
    /// Items without a readable body
    pub skipped: usize,
    pub bytes: u64,
}

/// Drains an [`UploadSource`] and transfers every item
#[async_trait]
pub trait BatchUploader: Send + Sync {
    async fn upload_all<S: UploadSource>(&self, source: &mut S) -> Result<BatchSummary>;
}

pub(crate) fn transport_error<E: std::error::Error>(item: &UploadItem, e: E) -> SyncError {
    SyncError::from_aws_error(&item.bucket, &item.key, DisplayErrorContext(e))
}

/// Upload one item, returning the bytes sent or `None` if it had no body
pub async fn upload_object(client: &Client, mut item: UploadItem) -> Result<Option<u64>> {
    let Some(file) = item.body.take() else {
        debug!("Skipping {}: no readable body", item.key);
        return Ok(None);
    };

    let file = File::from_std(file);
    let file_size = file.metadata().await?.len();

    if file_size >= MULTIPART_THRESHOLD {
        upload_multipart(client, &item, file, file_size).await?;
        return Ok(Some(file_size));
    }

    let body = ByteStream::read_from()
        .file(file)
        .build()
        .await
        .map_err(|e| SyncError::Preparation {
            path: item.source_path.clone(),
            source: std::io::Error::other(e),
        })?;

    client
        .put_object()
        .bucket(&item.bucket)
        .key(&item.key)
        .body(body)
        .content_length(file_size as i64)
        .content_type(&item.classification.content_type)
        .cache_control(&item.classification.cache_control)
        .send()
        .await
        .map_err(|e| transport_error(&item, e))?;

    info!(
        "Uploaded {} -> s3://{}{} ({}, {})",
        item.source_path.display(),
        item.bucket,
        item.key,
        item.classification.content_type,
        item.classification.cache_control
    );

    Ok(Some(file_size))
}

#[derive(Debug, Default)]
struct Stats {
    uploaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    bytes: AtomicU64,
}

impl Stats {
    fn summary(&self) -> BatchSummary {
        BatchSummary {
            uploaded: self.uploaded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Uploads items to S3 with a fixed number of worker tasks
///
/// Items are taken from the source on the calling task and handed to the
/// workers over a channel. A failed transfer does not stop the batch: the
/// source is always drained, and the first failure is returned once every
/// worker has finished.
pub struct S3BatchUploader {
    client: Client,
    max_concurrent: usize,
    progress: Option<ProgressBar>,
}

impl S3BatchUploader {
    pub fn new(client: Client, max_concurrent: usize) -> Self {
        Self {
            client,
            max_concurrent: max_concurrent.max(1),
            progress: None,
        }
    }

    /// Show an object counter while uploading
    pub fn with_progress(mut self) -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} objects {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.progress = Some(pb);
        self
    }
}

#[async_trait]
impl BatchUploader for S3BatchUploader {
    async fn upload_all<S: UploadSource>(&self, source: &mut S) -> Result<BatchSummary> {
        let (work_tx, work_rx) = mpsc::channel::<UploadItem>(self.max_concurrent * 2);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let stats = Arc::new(Stats::default());
        let first_err: Arc<Mutex<Option<SyncError>>> = Arc::new(Mutex::new(None));

        if let (Some(pb), Some(total)) = (&self.progress, source.size_hint()) {
            pb.set_length(total as u64);
        }

        // Spawn worker tasks
        let mut workers = Vec::with_capacity(self.max_concurrent);
        for _ in 0..self.max_concurrent {
            let work_rx = Arc::clone(&work_rx);
            let client = self.client.clone();
            let stats = Arc::clone(&stats);
            let first_err = Arc::clone(&first_err);
            let pb = self.progress.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    let item = {
                        let mut rx_guard = work_rx.lock().await;
                        rx_guard.recv().await
                    };

                    let Some(item) = item else {
                        break; // Channel closed
                    };

                    let key = item.key.clone();
                    match upload_object(&client, item).await {
                        Ok(Some(bytes)) => {
                            stats.uploaded.fetch_add(1, Ordering::Relaxed);
                            stats.bytes.fetch_add(bytes, Ordering::Relaxed);
                        }
                        Ok(None) => {
                            stats.skipped.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            error!("Upload failed for {}: {}", key, e);
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            let mut slot = first_err.lock().await;
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                        }
                    }

                    if let Some(pb) = &pb {
                        pb.set_message(key);
                        pb.inc(1);
                    }
                }
            }));
        }

        // Producer: items are taken here only, so the source is never shared
        while source.has_next() {
            let Some(item) = source.next_upload_item() else {
                break;
            };
            if work_tx.send(item).await.is_err() {
                break;
            }
        }
        drop(work_tx); // Close channel to signal workers to exit

        let mut panicked = None;
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Upload worker panicked: {}", e);
                panicked.get_or_insert_with(|| e.to_string());
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        if let Some(e) = first_err.lock().await.take() {
            error!(
                "{} upload(s) failed, first error: {}",
                stats.failed.load(Ordering::Relaxed),
                e
            );
            return Err(e);
        }
        if let Some(message) = panicked {
            return Err(SyncError::Worker(message));
        }

        let summary = stats.summary();
        debug!("Batch finished: {:?}", summary);
        Ok(summary)
    }
}

/// Drains the source and reports what would be uploaded, without network access
#[derive(Debug, Default)]
pub struct DryRunUploader;

#[async_trait]
impl BatchUploader for DryRunUploader {
    async fn upload_all<S: UploadSource>(&self, source: &mut S) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        while source.has_next() {
            let Some(item) = source.next_upload_item() else {
                break;
            };

            let Some(file) = &item.body else {
                println!(
                    "  {} {}",
                    style("WOULD SKIP").red().bold(),
                    item.source_path.display()
                );
                summary.skipped += 1;
                continue;
            };

            let size = file.metadata()?.len();
            println!(
                "  {} {} → s3://{}{} ({}, {})",
                style("WOULD UPLOAD").green().bold(),
                item.source_path.display(),
                item.bucket,
                item.key,
                item.classification.content_type,
                style(&item.classification.cache_control).dim()
            );
            summary.uploaded += 1;
            summary.bytes += size;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::iter::SyncFolderIter;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dry_run_drains_source() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<p>hi</p>").unwrap();
        fs::write(dir.path().join("style.css"), "p{}").unwrap();
        fs::write(dir.path().join("gone.png"), "png").unwrap();

        let mut iter = SyncFolderIter::new(dir.path(), "my-site");
        fs::remove_file(dir.path().join("gone.png")).unwrap();

        let summary = DryRunUploader.upload_all(&mut iter).await.unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                uploaded: 2,
                skipped: 1,
                bytes: 12,
            }
        );
        assert!(!iter.has_next());
        assert!(iter.err().is_some());
    }

    /// Client pointed at a closed local port, so every request fails fast
    fn unreachable_client() -> Client {
        use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, retry::RetryConfig};

        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:9")
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .force_path_style(true)
            .build();
        Client::from_conf(conf)
    }

    fn site_with_pages(dir: &TempDir, count: usize) {
        for i in 0..count {
            fs::write(dir.path().join(format!("page{:02}.html", i)), "<p>hi</p>").unwrap();
        }
    }

    #[tokio::test]
    async fn test_s3_upload_failure_still_drains_source() {
        let dir = TempDir::new().unwrap();
        site_with_pages(&dir, 20);

        let mut iter = SyncFolderIter::new(dir.path(), "my-site");
        let uploader = S3BatchUploader::new(unreachable_client(), 1);

        let err = uploader.upload_all(&mut iter).await.unwrap_err();

        assert!(matches!(err, SyncError::Transport { .. }));
        assert!(!iter.has_next());
        assert_eq!(iter.remaining(), 0);
        assert!(iter.err().is_none());
    }

    #[tokio::test]
    async fn test_s3_bodyless_items_are_skipped() {
        let dir = TempDir::new().unwrap();
        site_with_pages(&dir, 5);

        let mut iter = SyncFolderIter::new(dir.path(), "my-site");
        for i in 0..5 {
            fs::remove_file(dir.path().join(format!("page{:02}.html", i))).unwrap();
        }

        // nothing readable, so the client is never used
        let uploader = S3BatchUploader::new(unreachable_client(), 3);
        let summary = uploader.upload_all(&mut iter).await.unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                uploaded: 0,
                skipped: 5,
                bytes: 0,
            }
        );
        assert!(!iter.has_next());
        assert_eq!(iter.failed(), 5);
    }

    #[tokio::test]
    async fn test_s3_many_workers_drain_mixed_source() {
        let dir = TempDir::new().unwrap();
        site_with_pages(&dir, 12);

        let mut iter = SyncFolderIter::new(dir.path(), "my-site");
        for i in [1, 4, 7, 10] {
            fs::remove_file(dir.path().join(format!("page{:02}.html", i))).unwrap();
        }

        let uploader = S3BatchUploader::new(unreachable_client(), 4);
        let err = uploader.upload_all(&mut iter).await.unwrap_err();

        // transport failure is reported, preparation failure stays on the source
        assert!(matches!(err, SyncError::Transport { ref key, .. } if key.ends_with(".html")));
        assert_eq!(iter.remaining(), 0);
        assert_eq!(iter.failed(), 4);
        assert!(iter.err().unwrap().is_preparation());
    }

    #[test]
    fn test_transport_error_keeps_key() {
        let item = UploadItem {
            bucket: "my-site".to_string(),
            key: "/index.html".to_string(),
            source_path: "/tmp/blog/public/index.html".into(),
            body: None,
            classification: crate::s3::classify::classify("/index.html"),
        };
        let err = transport_error(&item, std::io::Error::other("connection reset"));
        assert!(matches!(err, SyncError::Transport { ref key, .. } if key == "/index.html"));
    }
}
