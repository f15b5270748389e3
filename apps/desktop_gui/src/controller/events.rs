//! UI/backend events and error modeling for the desktop GUI controller.

use shared::{domain::ProjectSlug, protocol::LogMessage};

pub enum UiEvent {
    Info(String),
    DeploymentAccepted {
        slug: ProjectSlug,
        preview_url: String,
    },
    Log(LogMessage),
    LogStreamClosed,
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Api,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Deploy,
    LogStream,
}

/// Turns a raw deploy failure into a status line a user can act on.
pub fn classify_deploy_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("backend worker startup failure") {
        "Backend worker startup failure; verify local app environment and retry.".to_string()
    } else if lower.contains("failed to reach")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Deployment API unreachable; check the API URL/network and retry.".to_string()
    } else {
        format!("Deploy error: {message}")
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("rejected")
            || message_lower.contains("rate_limited")
            || message_lower.contains("429")
            || message_lower.contains("500")
        {
            UiErrorCategory::Api
        } else if message_lower.contains("invalid")
            || message_lower.contains("malformed")
            || message_lower.contains("must start with")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("connect")
            || message_lower.contains("network")
            || message_lower.contains("unreachable")
            || message_lower.contains("receive failed")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Api => "Deployment API",
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rejected_responses_as_api_errors() {
        let err = UiError::from_message(
            UiErrorContext::Deploy,
            "deployment request rejected (429 Too Many Requests): too many deployments",
        );
        assert_eq!(err.category(), UiErrorCategory::Api);
        assert_eq!(err.context(), UiErrorContext::Deploy);
    }

    #[test]
    fn classifies_unreachable_api_as_transport() {
        let err = UiError::from_message(
            UiErrorContext::Deploy,
            "failed to reach deployment API at http://127.0.0.1:9000: connection refused",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
    }

    #[test]
    fn classifies_bad_log_frames_as_validation() {
        let err = UiError::from_message(
            UiErrorContext::LogStream,
            "invalid log frame: expected value at line 1 column 1",
        );
        assert_eq!(err.category(), UiErrorCategory::Validation);
    }

    #[test]
    fn deploy_failure_status_points_at_the_api_when_unreachable() {
        let status =
            classify_deploy_failure("failed to reach deployment API at http://127.0.0.1:9000");
        assert!(status.contains("unreachable"), "{status}");
    }
}
