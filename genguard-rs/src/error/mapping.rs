//! Error mapping for generation service replies
//!
//! Converts HTTP status codes and error bodies returned by the generation
//! service into the normalized [`GenGuardError`] type.

use reqwest::StatusCode;
use serde_json::Value;

use super::GenGuardError;

/// Map a status code and message to a GenGuardError
pub fn map_status(status: StatusCode, message: &str) -> GenGuardError {
    let message = format!("{} ({})", message, status.as_u16());

    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            GenGuardError::invalid_input(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenGuardError::authentication(message),
        StatusCode::REQUEST_TIMEOUT => GenGuardError::timeout(message),
        StatusCode::TOO_MANY_REQUESTS => GenGuardError::rate_limit(message),
        _ => GenGuardError::service(message),
    }
}

/// Map an HTTP error reply to a GenGuardError
///
/// The body is inspected for an `error` or `message` field; plain-text bodies
/// are used as the message directly.
pub fn map_http_error(status: StatusCode, body: &str) -> GenGuardError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| extract_message(&json))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                crate::util::preview(trimmed, 200)
            }
        });

    map_status(status, &message)
}

fn extract_message(json: &Value) -> Option<String> {
    json.get("error")
        .and_then(|error| error.as_str().or_else(|| error.get("message").and_then(Value::as_str)))
        .or_else(|| json.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_status(StatusCode::BAD_REQUEST, "x"), GenGuardError::InvalidInput(_)));
        assert!(matches!(map_status(StatusCode::FORBIDDEN, "x"), GenGuardError::Authentication(_)));
        assert!(matches!(map_status(StatusCode::REQUEST_TIMEOUT, "x"), GenGuardError::Timeout(_)));
        assert!(matches!(map_status(StatusCode::TOO_MANY_REQUESTS, "x"), GenGuardError::RateLimit(_)));
        assert!(matches!(map_status(StatusCode::BAD_GATEWAY, "x"), GenGuardError::Service(_)));
    }

    #[test]
    fn test_error_body_message() {
        let err = map_http_error(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"model overloaded"}"#);
        assert!(err.to_string().contains("model overloaded"));

        let err = map_http_error(StatusCode::BAD_REQUEST, r#"{"error":{"message":"prompt too long"}}"#);
        assert!(err.to_string().contains("prompt too long"));

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn test_top_level_message_field() {
        let err = map_http_error(StatusCode::BAD_REQUEST, r#"{"message":"missing field"}"#);
        assert!(matches!(err, GenGuardError::InvalidInput(ref m) if m.contains("missing field")));

        let err = map_http_error(StatusCode::BAD_GATEWAY, r#"{"error":{"code":502},"message":"upstream down"}"#);
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(map_status(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(map_status(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(!map_status(StatusCode::UNAUTHORIZED, "").is_retryable());
        assert!(!map_status(StatusCode::UNPROCESSABLE_ENTITY, "").is_retryable());
    }
}
