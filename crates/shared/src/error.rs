use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

/// Structured error body the deployment API returns on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_snake_case_on_the_wire() {
        let err = ApiError::new(ErrorCode::RateLimited, "too many deployments");
        let json = serde_json::to_value(&err).expect("serialize");
        assert_eq!(json["code"], "rate_limited");
        assert_eq!(json["message"], "too many deployments");
    }
}
