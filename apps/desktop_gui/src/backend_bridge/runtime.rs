//! Backend worker: an OS thread running a tokio runtime that owns the
//! `DeployClient` and services the UI command queue.

use std::thread;

use client_core::{ClientEvent, DeployClient};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(api_url: String, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = DeployClient::new(api_url);

            let mut events = client.subscribe_events();
            let ui_tx_events = ui_tx.clone();
            let event_task = tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let evt = match event {
                        ClientEvent::DeploymentAccepted { slug, preview_url } => {
                            UiEvent::DeploymentAccepted { slug, preview_url }
                        }
                        ClientEvent::Log(log) => UiEvent::Log(log),
                        ClientEvent::LogStreamClosed => UiEvent::LogStreamClosed,
                        ClientEvent::Error(err) => {
                            UiEvent::Error(UiError::from_message(UiErrorContext::LogStream, err))
                        }
                    };
                    let _ = ui_tx_events.try_send(evt);
                }
            });

            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Deploy { repo } => {
                        tracing::info!(repo = repo.as_str(), "backend: deploy");
                        match client.trigger_deployment(&repo).await {
                            Ok(accepted) => {
                                if let Err(err) =
                                    client.subscribe_logs(&accepted.project_slug).await
                                {
                                    tracing::error!(
                                        slug = %accepted.project_slug,
                                        "backend: log subscription failed: {err}"
                                    );
                                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                        UiErrorContext::LogStream,
                                        err.to_string(),
                                    )));
                                }
                            }
                            Err(err) => {
                                tracing::error!("backend: deploy failed: {err}");
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                    UiErrorContext::Deploy,
                                    err.to_string(),
                                )));
                            }
                        }
                    }
                }
            }

            event_task.abort();
        });
    });
}
