use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ProjectSlug;

/// Body of `POST /project`. Field names follow the deployment API's wire
/// format, which is camelCase with an all-caps URL suffix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeploymentRequest {
    #[serde(rename = "gitURL")]
    pub git_url: String,
    /// Slug from an earlier acceptance; `None` lets the server pick one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<ProjectSlug>,
}

/// Envelope the deployment API wraps successful responses in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentResponse {
    pub data: DeploymentData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentData {
    pub project_slug: ProjectSlug,
    /// Preview URL where the deployed project will be served.
    pub url: String,
}

/// Frames the client sends on the log stream socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LogStreamRequest {
    Subscribe { channel: String },
}

/// A single pushed log frame: `{"log": "..."}`, with an optional server
/// timestamp some backends attach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessage {
    pub log: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_request_uses_api_field_names() {
        let request = CreateDeploymentRequest {
            git_url: "https://github.com/rust-lang/cargo".to_string(),
            slug: None,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"gitURL": "https://github.com/rust-lang/cargo"})
        );
    }

    #[test]
    fn deployment_request_includes_slug_on_redeploy() {
        let request = CreateDeploymentRequest {
            git_url: "https://github.com/rust-lang/cargo".to_string(),
            slug: Some(ProjectSlug("misty-meadow-42".to_string())),
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["slug"], "misty-meadow-42");
    }

    #[test]
    fn deployment_response_envelope_parses() {
        let response: DeploymentResponse = serde_json::from_str(
            r#"{"data": {"projectSlug": "misty-meadow-42", "url": "http://misty-meadow-42.localhost:8000"}}"#,
        )
        .expect("parse");
        assert_eq!(response.data.project_slug.0, "misty-meadow-42");
        assert_eq!(response.data.url, "http://misty-meadow-42.localhost:8000");
    }

    #[test]
    fn subscribe_frame_is_tagged_with_channel_payload() {
        let frame = LogStreamRequest::Subscribe {
            channel: ProjectSlug("misty-meadow-42".to_string()).log_channel(),
        };
        let json = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "type": "subscribe",
                "payload": {"channel": "logs:misty-meadow-42"},
            })
        );
    }

    #[test]
    fn log_message_timestamp_is_optional() {
        let bare: LogMessage = serde_json::from_str(r#"{"log": "Cloning repository..."}"#)
            .expect("parse bare frame");
        assert_eq!(bare.log, "Cloning repository...");
        assert!(bare.timestamp.is_none());

        let stamped: LogMessage = serde_json::from_str(
            r#"{"log": "Build complete", "timestamp": "2024-01-01T00:00:00Z"}"#,
        )
        .expect("parse stamped frame");
        assert!(stamped.timestamp.is_some());
    }
}
