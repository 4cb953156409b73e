use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::common::sanitizer::{sanitize_filename, sanitize_folder_path};
use crate::common::upload::stream_to_s3;
use crate::infrastructure::storage::{ObjectStore, ObjectSummary, StorageError};
use crate::modules::files::dto::{ListQuery, UploadResponse};
use crate::modules::pipeline::model::AssetKind;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::info;

const FILES_PREFIX: &str = "files/";

/// Object key for an upload. Videos land under the videos root where the
/// conversion pipeline picks them up; everything else under `files/`.
pub fn upload_key(videos_prefix: &str, folder: &str, filename: &str) -> String {
    let name = sanitize_filename(filename);
    let root = match AssetKind::from_key(&name) {
        AssetKind::Video => videos_prefix,
        AssetKind::Other => FILES_PREFIX,
    };
    let folder = sanitize_folder_path(folder);
    if folder.is_empty() {
        format!("{}{}", root, name)
    } else {
        format!("{}{}/{}", root, folder, name)
    }
}

/// Upload a file
/// Multipart form with an optional `folder` text field followed by a `file` field.
/// The body is streamed to S3/MinIO through a native multipart upload.
#[utoipa::path(
    post,
    path = "/api/v1/files",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Upload successful", body = ApiResponse<UploadResponse>),
        (status = 400, description = "No file field"),
        (status = 502, description = "Storage failure")
    ),
    tag = "Files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut folder = String::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return ApiError::from(e).into_response(),
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "folder" => {
                folder = match field.text().await {
                    Ok(text) => text,
                    Err(e) => return ApiError::from(e).into_response(),
                };
            }
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let key = upload_key(&state.config.pipeline.videos_prefix, &folder, &filename);
                info!(original_name = %filename, key = %key, "Receiving upload");

                return match stream_to_s3(&state.storage, field, key.clone(), &filename).await {
                    Ok((location, size_bytes)) => {
                        info!(bucket = %location.bucket, key = %location.key, size_bytes, "✅ Upload complete");
                        let kind = AssetKind::from_key(&location.key);
                        let res = UploadResponse {
                            bucket: location.bucket,
                            key: location.key,
                            size_bytes,
                            kind,
                        };
                        ApiSuccess::created(res, "File uploaded successfully").into_response()
                    }
                    Err(e) => ApiError::bad_gateway(format!("Upload failed: {}", e)).into_response(),
                };
            }
            _ => {}
        }
    }

    ApiError::bad_request("No file field found in multipart request").into_response()
}

/// List files under a prefix
#[utoipa::path(
    get,
    path = "/api/v1/files",
    params(ListQuery),
    responses(
        (status = 200, description = "List Files", body = ApiResponse<Vec<ObjectSummary>>),
        (status = 502, description = "Storage failure")
    ),
    tag = "Files"
)]
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let prefix = query.prefix.unwrap_or_default();
    match state.storage.list_objects(&state.storage.bucket, &prefix).await {
        Ok(objects) => {
            ApiSuccess::ok(objects, "Files retrieved successfully").into_response()
        }
        Err(e) => ApiError::bad_gateway(e.to_string()).into_response(),
    }
}

/// Stream a file with support for Range requests
#[utoipa::path(
    get,
    path = "/api/v1/files/stream/{key}",
    params(
        ("key" = String, Path, description = "Object key, may contain slashes")
    ),
    responses(
        (status = 200, description = "Stream Content"),
        (status = 206, description = "Partial Content"),
        (status = 404, description = "Not Found"),
        (status = 502, description = "Storage failure")
    ),
    tag = "Files"
)]
pub async fn stream_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    let range = headers
        .get(header::RANGE)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let resp = match state.storage.get_object(&key, range).await {
        Ok(r) => r,
        Err(StorageError::NotFound(_)) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(key = %key, error = %e, "S3 error while streaming");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let content_type = resp
        .content_type()
        .map(|ct| ct.to_string())
        .unwrap_or_else(|| mime_guess::from_path(&key).first_or_octet_stream().to_string());

    let mut builder = Response::builder().header(header::CONTENT_TYPE, content_type);

    if let Some(cl) = resp.content_length() {
        builder = builder.header(header::CONTENT_LENGTH, cl);
    }

    if let Some(cr) = resp.content_range() {
        builder = builder
            .header(header::CONTENT_RANGE, cr)
            .status(StatusCode::PARTIAL_CONTENT);
    } else {
        builder = builder
            .header(header::ACCEPT_RANGES, "bytes")
            .status(StatusCode::OK);
    }

    if let Some(et) = resp.e_tag() {
        builder = builder.header(header::ETAG, et);
    }

    let stream = ReaderStream::new(resp.body.into_async_read());

    builder
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn videos_go_under_the_videos_root() {
        assert_eq!(upload_key("videos/", "", "meu vídeo ção.ts"), "videos/meu_video_cao.ts");
        assert_eq!(upload_key("videos/", "Férias/2024", "Clip 1.MOV"), "videos/Ferias/2024/Clip_1.mov");
    }

    #[test]
    fn other_files_go_under_files() {
        assert_eq!(upload_key("videos/", "docs", "Relatório final.pdf"), "files/docs/Relatorio_final.pdf");
        assert_eq!(upload_key("videos/", "", "notes"), "files/notes");
    }

    #[test]
    fn folder_traversal_is_neutralised() {
        assert_eq!(upload_key("videos/", "../../etc", "a.mkv"), "videos/etc/a.mkv");
    }
}
