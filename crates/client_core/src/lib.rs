use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use shared::{
    domain::{GitRepoUrl, ProjectSlug},
    error::ApiError,
    protocol::{CreateDeploymentRequest, DeploymentData, DeploymentResponse, LogMessage, LogStreamRequest},
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

/// Events fanned out to every subscriber of [`DeployClient::subscribe_events`].
#[derive(Debug, Clone)]
pub enum ClientEvent {
    DeploymentAccepted {
        slug: ProjectSlug,
        preview_url: String,
    },
    Log(LogMessage),
    LogStreamClosed,
    Error(String),
}

#[derive(Debug, Error)]
pub enum LogStreamError {
    #[error("api_url must start with http:// or https://, got {0}")]
    UnsupportedScheme(String),
}

/// Derives the websocket endpoint for the log stream from the API base URL.
fn log_stream_url(api_url: &str) -> Result<String, LogStreamError> {
    let ws_base = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(LogStreamError::UnsupportedScheme(api_url.to_string()));
    };
    Ok(format!("{}/logs", ws_base.trim_end_matches('/')))
}

struct ActiveLogStream {
    channel: String,
    reader_task: JoinHandle<()>,
}

#[derive(Default)]
struct DeployClientState {
    project_slug: Option<ProjectSlug>,
    preview_url: Option<String>,
}

/// Thin client for the deployment-trigger API: one HTTP POST to start a
/// build, one websocket subscription to follow its logs. Owns no deployment
/// logic; the server does all the work.
pub struct DeployClient {
    http: Client,
    api_url: String,
    inner: Mutex<DeployClientState>,
    log_stream: Mutex<Option<ActiveLogStream>>,
    events: broadcast::Sender<ClientEvent>,
}

impl DeployClient {
    pub fn new(api_url: impl Into<String>) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            http: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            inner: Mutex::new(DeployClientState::default()),
            log_stream: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Slug and preview URL from the most recent acceptance, if any.
    pub async fn current_project(&self) -> Option<(ProjectSlug, String)> {
        let guard = self.inner.lock().await;
        match (&guard.project_slug, &guard.preview_url) {
            (Some(slug), Some(url)) => Some((slug.clone(), url.clone())),
            _ => None,
        }
    }

    /// POSTs the repository to `/project`. A slug from an earlier acceptance
    /// in this session is passed back so the server redeploys the same
    /// project instead of minting a new one.
    pub async fn trigger_deployment(&self, repo: &GitRepoUrl) -> Result<DeploymentData> {
        let slug = { self.inner.lock().await.project_slug.clone() };
        let request = CreateDeploymentRequest {
            git_url: repo.as_str().to_string(),
            slug,
        };

        let response = self
            .http
            .post(format!("{}/project", self.api_url))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to reach deployment API at {}", self.api_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiError>(&body)
                .map(|err| err.to_string())
                .unwrap_or(body);
            return Err(anyhow!("deployment request rejected ({status}): {detail}"));
        }

        let accepted: DeploymentResponse = response
            .json()
            .await
            .context("deployment API returned a malformed acceptance body")?;
        let data = accepted.data;

        {
            let mut guard = self.inner.lock().await;
            guard.project_slug = Some(data.project_slug.clone());
            guard.preview_url = Some(data.url.clone());
        }

        info!(
            slug = %data.project_slug,
            preview_url = %data.url,
            repo = repo.as_str(),
            "deployment accepted"
        );
        let _ = self.events.send(ClientEvent::DeploymentAccepted {
            slug: data.project_slug.clone(),
            preview_url: data.url.clone(),
        });

        Ok(data)
    }

    /// Connects the log stream socket, emits one subscribe frame for
    /// `logs:<slug>`, and spawns a reader task that forwards pushed frames as
    /// [`ClientEvent::Log`]. A frame that fails to parse is dropped with an
    /// error event; the stream stays up. Subscribing again replaces the
    /// previous reader.
    pub async fn subscribe_logs(self: &Arc<Self>, slug: &ProjectSlug) -> Result<()> {
        let channel = slug.log_channel();
        let ws_url = log_stream_url(&self.api_url)?;
        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .with_context(|| format!("failed to connect log stream: {ws_url}"))?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let subscribe = serde_json::to_string(&LogStreamRequest::Subscribe {
            channel: channel.clone(),
        })?;
        ws_writer
            .send(Message::Text(subscribe))
            .await
            .context("failed to send log subscribe frame")?;
        info!(channel = %channel, "subscribed to log stream");

        let client = Arc::clone(self);
        let reader_channel = channel.clone();
        let reader_task = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<LogMessage>(&text) {
                        Ok(log) => {
                            let _ = client.events.send(ClientEvent::Log(log));
                        }
                        Err(err) => {
                            warn!(channel = %reader_channel, "dropping unparseable log frame: {err}");
                            let _ = client
                                .events
                                .send(ClientEvent::Error(format!("invalid log frame: {err}")));
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        let _ = client
                            .events
                            .send(ClientEvent::Error(format!("log stream receive failed: {err}")));
                        break;
                    }
                }
            }
            let _ = client.events.send(ClientEvent::LogStreamClosed);
        });

        let previous = {
            let mut guard = self.log_stream.lock().await;
            guard.replace(ActiveLogStream {
                channel,
                reader_task,
            })
        };
        if let Some(stream) = previous {
            info!(channel = %stream.channel, "replacing previous log subscription");
            stream.reader_task.abort();
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
