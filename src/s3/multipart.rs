use aws_sdk_s3::{
    Client,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use super::iter::UploadItem;
use super::upload::transport_error;
use crate::error::{Result, SyncError};

// Threshold for using multipart upload (100MB)
pub const MULTIPART_THRESHOLD: u64 = 100 * 1024 * 1024;

// Size of each part (10MB) - AWS minimum is 5MB
const PART_SIZE: usize = 10 * 1024 * 1024;

/// Upload a large file using S3 multipart upload
///
/// Content type and cache policy are set when the upload is created. If any
/// part fails the upload is aborted so no partial object is left behind.
pub async fn upload_multipart(
    client: &Client,
    item: &UploadItem,
    mut file: File,
    file_size: u64,
) -> Result<()> {
    info!(
        "Starting multipart upload for {} ({} bytes, {} parts)",
        item.key,
        file_size,
        (file_size as usize).div_ceil(PART_SIZE)
    );

    let multipart = client
        .create_multipart_upload()
        .bucket(&item.bucket)
        .key(&item.key)
        .content_type(&item.classification.content_type)
        .cache_control(&item.classification.cache_control)
        .send()
        .await
        .map_err(|e| transport_error(item, e))?;

    let upload_id = multipart
        .upload_id()
        .ok_or_else(|| SyncError::Transport {
            key: item.key.clone(),
            message: "no upload ID returned from S3".to_string(),
        })?
        .to_string();

    debug!("Multipart upload initiated with ID: {}", upload_id);

    match upload_parts(client, item, &upload_id, &mut file).await {
        Ok(parts) => {
            let completed = CompletedMultipartUpload::builder()
                .set_parts(Some(parts))
                .build();

            client
                .complete_multipart_upload()
                .bucket(&item.bucket)
                .key(&item.key)
                .upload_id(&upload_id)
                .multipart_upload(completed)
                .send()
                .await
                .map_err(|e| transport_error(item, e))?;

            info!(
                "Completed multipart upload: {} -> s3://{}{}",
                item.source_path.display(),
                item.bucket,
                item.key
            );
            Ok(())
        }
        Err(e) => {
            if let Err(abort_err) = abort_multipart_upload(client, item, &upload_id).await {
                warn!("Failed to abort multipart upload {}: {}", upload_id, abort_err);
            }
            Err(e)
        }
    }
}

async fn upload_parts(
    client: &Client,
    item: &UploadItem,
    upload_id: &str,
    file: &mut File,
) -> Result<Vec<CompletedPart>> {
    let mut parts = Vec::new();
    let mut part_number = 1i32;

    loop {
        let mut buffer = vec![0u8; PART_SIZE];
        let bytes_read = read_full(file, &mut buffer).await?;

        if bytes_read == 0 {
            break; // EOF
        }

        buffer.truncate(bytes_read);

        debug!("Uploading part {} ({} bytes)", part_number, buffer.len());

        let part_result = client
            .upload_part()
            .bucket(&item.bucket)
            .key(&item.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(buffer))
            .send()
            .await
            .map_err(|e| transport_error(item, e))?;

        parts.push(
            CompletedPart::builder()
                .part_number(part_number)
                .e_tag(part_result.e_tag().unwrap_or(""))
                .build(),
        );

        part_number += 1;
    }

    Ok(parts)
}

/// Fill `buf` unless EOF comes first; parts other than the last must be full size
async fn read_full(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Abort a multipart upload (for cleanup on error)
async fn abort_multipart_upload(client: &Client, item: &UploadItem, upload_id: &str) -> Result<()> {
    client
        .abort_multipart_upload()
        .bucket(&item.bucket)
        .key(&item.key)
        .upload_id(upload_id)
        .send()
        .await
        .map_err(|e| transport_error(item, e))?;

    debug!("Aborted multipart upload {}", upload_id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_read_full_fills_buffer_across_reads() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), vec![7u8; 3000]).unwrap();
        let mut file = File::open(tmp.path()).await.unwrap();

        let mut buf = vec![0u8; 1024];
        assert_eq!(read_full(&mut file, &mut buf).await.unwrap(), 1024);
        assert_eq!(read_full(&mut file, &mut buf).await.unwrap(), 1024);
        assert_eq!(read_full(&mut file, &mut buf).await.unwrap(), 952);
        assert_eq!(read_full(&mut file, &mut buf).await.unwrap(), 0);
    }
}
