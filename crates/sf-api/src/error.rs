use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl ApiError {
    /// Transient failures worth retrying; server rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// Pulls a human-readable message out of an error body. The backend reports
/// failures as `{"detail": ...}`; some proxies use `{"message": ...}`.
pub(crate) fn server_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("request failed ({status})"))
}

/// Maps a non-2xx response to the error taxonomy, consuming the body.
pub(crate) async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }
    let status = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = server_message(status, &body);
    tracing::warn!(status, %message, "request rejected");
    Err(ApiError::Server { status, message })
}
