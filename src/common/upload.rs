use crate::infrastructure::storage::s3::StorageService;
use crate::infrastructure::storage::{ObjectLocation, StorageError, StorageResult};
use axum::{body::Bytes, extract::multipart::Field};
use futures_util::StreamExt;
use tracing::{error, info};

// S3 rejects non-final parts under 5 MiB
const MIN_PART_SIZE: usize = 6 * 1024 * 1024;

/// Buffers a byte stream into S3 multipart upload parts.
pub struct MultipartUploader<'a> {
    storage: &'a StorageService,
    key: String,
    upload_id: String,
    parts: Vec<aws_sdk_s3::types::CompletedPart>,
    part_number: i32,
    buffer: Vec<u8>,
    bytes_written: u64,
}

impl<'a> MultipartUploader<'a> {
    pub async fn new(storage: &'a StorageService, key: String, content_type: &str) -> StorageResult<Self> {
        let upload_id = storage.create_multipart_upload(&key, content_type).await?;

        Ok(Self {
            storage,
            key,
            upload_id,
            parts: Vec::new(),
            part_number: 1,
            buffer: Vec::with_capacity(MIN_PART_SIZE),
            bytes_written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: Bytes) -> StorageResult<()> {
        self.bytes_written += chunk.len() as u64;
        self.buffer.extend_from_slice(&chunk);

        if self.buffer.len() >= MIN_PART_SIZE {
            self.flush_part().await?;
        }

        Ok(())
    }

    async fn flush_part(&mut self) -> StorageResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let body = Bytes::from(std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(MIN_PART_SIZE),
        ));

        let part = self
            .storage
            .upload_part(&self.key, &self.upload_id, self.part_number, body)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("part {}: {}", self.part_number, e)))?;

        self.parts.push(part);
        self.part_number += 1;

        Ok(())
    }

    /// Uploads the remaining buffer as the last part and completes the upload.
    pub async fn finish(mut self) -> StorageResult<(ObjectLocation, u64)> {
        // an empty file still needs one (empty) part
        if !self.buffer.is_empty() || self.parts.is_empty() {
            let body = Bytes::from(std::mem::take(&mut self.buffer));
            let part = self
                .storage
                .upload_part(&self.key, &self.upload_id, self.part_number, body)
                .await?;
            self.parts.push(part);
        }

        let location = self
            .storage
            .complete_multipart_upload(&self.key, &self.upload_id, self.parts)
            .await?;
        Ok((location, self.bytes_written))
    }

    pub async fn abort(&self) -> StorageResult<()> {
        self.storage
            .abort_multipart_upload(&self.key, &self.upload_id)
            .await
    }
}

/// Content type for an uploaded part: the declared one, else a guess from the filename.
pub fn resolve_content_type(declared: Option<&str>, filename: &str) -> String {
    match declared {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// Streams a multipart field straight into S3 without holding the whole file in memory.
pub async fn stream_to_s3(
    storage: &StorageService,
    mut field: Field<'_>,
    key: String,
    filename: &str,
) -> StorageResult<(ObjectLocation, u64)> {
    let content_type = resolve_content_type(field.content_type(), filename);
    info!(key = %key, content_type = %content_type, "Starting multipart upload");

    let mut uploader = MultipartUploader::new(storage, key, &content_type).await?;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "Upload stream interrupted");
                uploader.abort().await?;
                return Err(StorageError::UploadFailed(format!("stream interrupted: {}", e)));
            }
        };

        if let Err(e) = uploader.write_chunk(chunk).await {
            error!(error = %e, "Upload part failed");
            uploader.abort().await?;
            return Err(e);
        }
    }

    uploader.finish().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_content_type_wins() {
        assert_eq!(resolve_content_type(Some("video/mp2t"), "a.bin"), "video/mp2t");
    }

    #[test]
    fn generic_or_missing_type_is_guessed() {
        assert_eq!(resolve_content_type(None, "clip.mp4"), "video/mp4");
        assert_eq!(
            resolve_content_type(Some("application/octet-stream"), "report.pdf"),
            "application/pdf"
        );
        assert_eq!(resolve_content_type(None, "noext"), "application/octet-stream");
    }
}
