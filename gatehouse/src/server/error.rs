use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gchat::{ChatError, ChatErrorKind, PUBLIC_AUTH_MESSAGE};
use gprovider::ProviderError;
use tracing::{error, warn};

/// A failure reported before any response bytes were sent.
///
/// Only sanitized text reaches the client: the auth message for 401, the
/// validation message for 400, and an empty body for everything else.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: ChatError,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from(ChatError::invalid_request(message))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error(&self) -> &ChatError {
        &self.error
    }
}

impl From<ChatError> for ApiError {
    fn from(error: ChatError) -> Self {
        let status = match error.kind {
            ChatErrorKind::Configuration => StatusCode::UNAUTHORIZED,
            ChatErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, error }
    }
}

impl From<ProviderError> for ApiError {
    fn from(error: ProviderError) -> Self {
        Self::from(ChatError::from(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                status = self.status.as_u16(),
                kind = ?self.error.kind,
                phase = self.error.phase.as_str(),
                error = %self.error.message,
                "request failed"
            );
        } else {
            warn!(
                status = self.status.as_u16(),
                kind = ?self.error.kind,
                error = %self.error.message,
                "request rejected"
            );
        }

        match self.status {
            StatusCode::UNAUTHORIZED => (self.status, PUBLIC_AUTH_MESSAGE).into_response(),
            StatusCode::BAD_REQUEST => (self.status, self.error.public_message().to_string()).into_response(),
            status => status.into_response(),
        }
    }
}

/// Terminal in-stream error frame: `\n3:"<public message>"\n`.
pub fn error_frame(error: &ChatError) -> Bytes {
    let message = serde_json::Value::String(error.public_message().to_string());
    Bytes::from(format!("\n3:{message}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_error_kinds_map_to_statuses() {
        assert_eq!(
            ApiError::from(ChatError::configuration("missing key")).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::bad_request("empty messages").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ChatError::transport("reset")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(ProviderError::not_found("unknown provider 'x'")).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn error_frame_is_a_json_string_after_the_prefix() {
        let frame = error_frame(&ChatError::provider("upstream said \"no\""));
        assert_eq!(&frame[..], b"\n3:\"An error occurred.\"\n");

        let auth = error_frame(&ChatError::configuration("sk-leaked"));
        assert_eq!(&auth[..], b"\n3:\"Invalid or missing API key\"\n");
    }
}
