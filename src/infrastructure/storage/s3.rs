use super::{
    CopyOptions, ObjectHead, ObjectLocation, ObjectStore, ObjectSummary, StorageError,
    StorageResult,
};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, MetadataDirective};
use aws_sdk_s3::Client;
use chrono::DateTime;
use std::time::Instant;
use tracing::info;

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    /// Bucket used by the upload and streaming endpoints.
    pub bucket: String,
}

impl StorageService {
    pub fn new(sdk_config: &SdkConfig, endpoint: Option<&str>, bucket: &str) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint {
            // MinIO and most S3-compatible stores need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %bucket, endpoint = ?endpoint, "✅ S3 client ready");

        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    pub async fn create_multipart_upload(&self, key: &str, content_type: &str) -> StorageResult<String> {
        let result = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        result
            .upload_id
            .ok_or_else(|| StorageError::UploadFailed(format!("no upload id returned for {}", key)))
    }

    pub async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: bytes::Bytes,
    ) -> StorageResult<CompletedPart> {
        let result = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(aws_sdk_s3::primitives::ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(CompletedPart::builder()
            .set_e_tag(result.e_tag)
            .part_number(part_number)
            .build())
    }

    pub async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> StorageResult<ObjectLocation> {
        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(ObjectLocation::new(&self.bucket, key))
    }

    pub async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    /// Fetches an object from the media bucket, forwarding an HTTP `Range` header verbatim.
    pub async fn get_object(&self, key: &str, range: Option<String>) -> StorageResult<GetObjectOutput> {
        self.client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_range(range)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Backend(DisplayErrorContext(&service_error).to_string())
                }
            })
    }
}

/// CopySource must be URL-encoded, the separators between segments are kept.
fn copy_source(location: &ObjectLocation) -> String {
    let key = location
        .key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", location.bucket, key)
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;

            for object in resp.contents() {
                let Some(key) = object.key() else { continue };
                objects.push(ObjectSummary {
                    key: key.to_string(),
                    size: object.size().unwrap_or_default().max(0) as u64,
                    last_modified: object
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                });
            }

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn head_object(&self, location: &ObjectLocation) -> StorageResult<Option<ObjectHead>> {
        let result = self
            .client
            .head_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await;

        match result {
            Ok(out) => Ok(Some(ObjectHead {
                size: out.content_length().unwrap_or_default().max(0) as u64,
                content_type: out.content_type().map(str::to_string),
                metadata: out.metadata().cloned().unwrap_or_default(),
            })),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(None)
                } else {
                    tracing::error!(
                        error = %DisplayErrorContext(&service_error),
                        bucket = %location.bucket,
                        key = %location.key,
                        "S3 head failed"
                    );
                    Err(StorageError::Backend(DisplayErrorContext(&service_error).to_string()))
                }
            }
        }
    }

    async fn copy_object(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        options: Option<CopyOptions>,
    ) -> StorageResult<()> {
        let start = Instant::now();

        let mut request = self
            .client
            .copy_object()
            .copy_source(copy_source(source))
            .bucket(&destination.bucket)
            .key(&destination.key);

        if let Some(options) = options {
            request = request
                .metadata_directive(MetadataDirective::Replace)
                .set_content_type(options.content_type)
                .set_metadata(Some(options.metadata));
        }

        request.send().await.map_err(|e| {
            tracing::error!(
                error = %DisplayErrorContext(&e),
                from = %source,
                to = %destination,
                "S3 copy failed"
            );
            StorageError::CopyFailed(DisplayErrorContext(&e).to_string())
        })?;

        info!(
            from = %source,
            to = %destination,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(())
    }

    async fn delete_object(&self, location: &ObjectLocation) -> StorageResult<()> {
        let start = Instant::now();

        self.client
            .delete_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %location.bucket,
                    key = %location.key,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(DisplayErrorContext(&e).to_string())
            })?;

        info!(
            bucket = %location.bucket,
            key = %location.key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_source_encodes_segments_but_keeps_separators() {
        let location = ObjectLocation::new("media", "videos/user one/clip+1.mp4");
        assert_eq!(copy_source(&location), "media/videos/user%20one/clip%2B1.mp4");
    }
}
