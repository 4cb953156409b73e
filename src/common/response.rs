use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// JSON envelope shared by every endpoint.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub message: String,
    pub data: Option<T>,
    /// Set on errors raised while handling a pipeline event. `true` means
    /// redelivering the same event may succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: &str) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.to_string(),
            data: Some(data),
            retryable: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: &str, retryable: Option<bool>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.to_string(),
            data: None,
            retryable,
        }
    }
}

pub struct ApiSuccess<T>(pub ApiResponse<T>, pub StatusCode);

impl<T: Serialize> ApiSuccess<T> {
    pub fn ok(data: T, message: &str) -> Self {
        Self(ApiResponse::success(data, message), StatusCode::OK)
    }

    pub fn created(data: T, message: &str) -> Self {
        Self(ApiResponse::success(data, message), StatusCode::CREATED)
    }
}

impl<T> IntoResponse for ApiSuccess<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (self.1, Json(self.0)).into_response()
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status: StatusCode,
    pub retryable: Option<bool>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            retryable: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::error(&self.message, self.retryable);
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn body_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn success_envelope_omits_retryable() {
        let (status, json) = body_json(ApiSuccess::created(vec![1, 2], "made").into_response()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json, json!({"status": "success", "message": "made", "data": [1, 2]}));
    }

    #[tokio::test]
    async fn error_envelope_carries_retry_hint() {
        let err = ApiError::new(StatusCode::NOT_FOUND, "gone").with_retryable(true);
        let (status, json) = body_json(err.into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            json,
            json!({"status": "error", "message": "gone", "data": null, "retryable": true})
        );

        let (_, json) = body_json(ApiError::bad_request("nope").into_response()).await;
        assert!(json.get("retryable").is_none());
    }
}
