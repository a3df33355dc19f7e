use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("ResourceNotFoundException: {message}")]
    NotFound { message: String },

    #[error("AccessDeniedException: {message}")]
    AccessDenied { message: String },

    #[error("ValidationException: {message}")]
    Validation { message: String },

    #[error("ConflictException: {message}")]
    Conflict { message: String },

    #[error("ThrottlingException: {message}")]
    Throttling { message: String },

    #[error("ServiceQuotaExceededException: {message}")]
    ServiceQuotaExceeded { message: String },

    #[error("{code} (HTTP {status}): {message}")]
    Service {
        code: String,
        status: u16,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Failed to resolve AWS credentials: {0}")]
    Credentials(String),

    #[error("Failed to sign request: {0}")]
    Signing(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(alias = "Message")]
    message: Option<String>,
    #[serde(rename = "__type")]
    error_type: Option<String>,
}

impl ApiError {
    /// Classifies an error response from the `x-amzn-ErrorType` header or the
    /// body's `__type`, falling back to the status code
    pub fn from_response(status: u16, error_type_header: Option<&str>, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let code = error_type_header
            .map(str::to_string)
            .or(parsed.error_type)
            .map(|raw| normalize_error_code(&raw));
        let message = parsed.message.unwrap_or_else(|| body.trim().to_string());

        match code.as_deref() {
            Some("ResourceNotFoundException") => ApiError::NotFound { message },
            Some("AccessDeniedException") => ApiError::AccessDenied { message },
            Some("ValidationException") => ApiError::Validation { message },
            Some("ConflictException") => ApiError::Conflict { message },
            Some("ThrottlingException") => ApiError::Throttling { message },
            Some("ServiceQuotaExceededException") => ApiError::ServiceQuotaExceeded { message },
            None if status == 404 => ApiError::NotFound { message },
            other => ApiError::Service {
                code: other.unwrap_or("UnknownError").to_string(),
                status,
                message,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// The service-supplied message, or the rendered error for local failures
    pub fn message(&self) -> String {
        match self {
            ApiError::NotFound { message }
            | ApiError::AccessDenied { message }
            | ApiError::Validation { message }
            | ApiError::Conflict { message }
            | ApiError::Throttling { message }
            | ApiError::ServiceQuotaExceeded { message }
            | ApiError::Service { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// "ResourceNotFoundException:http://..." and
/// "com.amazonaws.bedrockagentcore#ResourceNotFoundException" both become
/// "ResourceNotFoundException"
fn normalize_error_code(raw: &str) -> String {
    let code = raw.split(':').next().unwrap_or(raw);
    code.rsplit('#').next().unwrap_or(code).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_code_wins() {
        let err = ApiError::from_response(
            404,
            Some("ResourceNotFoundException:http://internal.amazon.com/coral/"),
            r#"{"message":"Gateway gw-1 not found"}"#,
        );
        assert!(err.is_not_found());
        assert_eq!(err.message(), "Gateway gw-1 not found");
    }

    #[test]
    fn body_type_used_without_header() {
        let err = ApiError::from_response(
            400,
            None,
            r#"{"__type":"com.amazonaws.bedrockagentcorecontrol#ValidationException","Message":"Role validation failed"}"#,
        );
        assert!(matches!(err, ApiError::Validation { ref message } if message == "Role validation failed"));
    }

    #[test]
    fn bare_404_is_not_found() {
        let err = ApiError::from_response(404, None, "");
        assert!(err.is_not_found());
    }

    #[test]
    fn unknown_codes_keep_status() {
        let err = ApiError::from_response(500, Some("InternalServerException"), "{}");
        let rendered = err.to_string();
        assert!(rendered.contains("InternalServerException"));
        assert!(rendered.contains("HTTP 500"));
    }
}
