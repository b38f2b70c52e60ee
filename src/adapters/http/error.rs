//! Error response body shared by all endpoints.

use serde::Serialize;

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_code_and_message() {
        let json = serde_json::to_value(ErrorResponse::new("INVALID_SIGNATURE", "nope")).unwrap();
        assert_eq!(json["error_code"], "INVALID_SIGNATURE");
        assert_eq!(json["message"], "nope");
    }
}
