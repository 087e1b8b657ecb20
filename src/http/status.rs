//! Human-readable descriptions for unsuccessful HTTP responses.

use reqwest::StatusCode;

/// Describes a non-2xx status for an operator.
pub fn describe_status(status: StatusCode) -> String {
    match status {
        StatusCode::NOT_FOUND => {
            "HTTP 404 Not Found (check that the version exists and publishes this platform)"
                .to_string()
        }
        StatusCode::UNAUTHORIZED => "HTTP 401 Unauthorized".to_string(),
        StatusCode::FORBIDDEN => "HTTP 403 Forbidden (access denied or rate limited)".to_string(),
        StatusCode::TOO_MANY_REQUESTS => "HTTP 429 Too Many Requests".to_string(),
        s if s.is_server_error() => {
            format!("HTTP {} server error (the release host may be unavailable)", s.as_u16())
        }
        s => format!("HTTP {}", s.as_u16()),
    }
}
