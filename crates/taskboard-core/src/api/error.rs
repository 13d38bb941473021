use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

const TIMEOUT_MESSAGE: &str = "Connection timed out. Please try again.";
const UNREACHABLE_MESSAGE: &str = "Unable to connect to server. Check your internet connection.";

/// Error body shape used by the backend: `{"error": "..."}` or `{"message": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the server's message out of a JSON error body, if there is one.
    fn extract_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .error
            .or(parsed.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let message = Self::extract_message(body).unwrap_or_else(|| format!("HTTP {}", code));
        match code {
            400 | 422 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// The message the server attached to a rejection, if any. A bare
    /// "HTTP <code>" placeholder does not count.
    pub fn server_message(&self) -> Option<&str> {
        let message = match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::AccessDenied(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::ServerError(m) => m.as_str(),
            _ => return None,
        };
        let placeholder = message
            .strip_prefix("HTTP ")
            .is_some_and(|code| code.parse::<u16>().is_ok());
        (!placeholder).then_some(message)
    }

    /// A success status with a body that could not be understood.
    pub fn is_unexpected(&self) -> bool {
        match self {
            ApiError::InvalidResponse(_) => true,
            ApiError::NetworkError(e) => e.is_decode(),
            _ => false,
        }
    }

    /// Human-readable text for display, preferring the server's own wording.
    pub fn user_message(&self, fallback: &str) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        match self {
            ApiError::NetworkError(e) if e.is_timeout() => TIMEOUT_MESSAGE.to_string(),
            ApiError::NetworkError(e) if e.is_decode() => {
                format!("{}: unexpected response from server", fallback)
            }
            ApiError::NetworkError(_) => UNREACHABLE_MESSAGE.to_string(),
            ApiError::RateLimited => self.to_string(),
            _ => format!("{}: {}", fallback, self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_uses_error_field() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"error": "invalid credentials"}"#);
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(err.to_string(), "invalid credentials");
        assert_eq!(err.server_message(), Some("invalid credentials"));
    }

    #[test]
    fn test_from_status_falls_back_to_message_field() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message": "title is required"}"#);
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.user_message("Request failed"), "title is required");
    }

    #[test]
    fn test_from_status_without_body_uses_http_code() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "");
        assert_eq!(err.to_string(), "Resource not found: HTTP 404");
        assert_eq!(err.server_message(), None);

        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(matches!(err, ApiError::ServerError(_)));
        assert_eq!(err.user_message("Request failed"), "Request failed: Server error: HTTP 502");
    }

    #[test]
    fn test_from_status_rate_limited() {
        let err = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, ApiError::RateLimited));
        assert!(!err.is_unexpected());
    }

    #[test]
    fn test_unknown_status_is_unexpected_and_truncated() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(StatusCode::PERMANENT_REDIRECT, &body);
        assert!(err.is_unexpected());
        let text = err.to_string();
        assert!(text.contains("truncated, 2000 total bytes"));
        assert!(text.len() < 700);
    }

    #[test]
    fn test_transport_error_message() {
        let err = ApiError::NetworkError(
            reqwest::Client::new().get("::not a url::").build().unwrap_err(),
        );
        assert!(!err.is_unexpected());
        assert_eq!(err.user_message("Login failed"), UNREACHABLE_MESSAGE);
    }

    #[test]
    fn test_blank_server_message_is_ignored() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"error": "  "}"#);
        assert_eq!(err.to_string(), "HTTP 400");
        assert_eq!(err.server_message(), None);
    }
}
