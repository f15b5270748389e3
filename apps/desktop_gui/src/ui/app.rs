//! Single-page deployment UI: repo URL form, deploy action, countdown to the
//! preview URL, and the streamed build log view.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{GitRepoUrl, ProjectSlug, RepoUrlError},
    protocol::LogMessage,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{
    classify_deploy_failure, err_label, UiError, UiErrorContext, UiEvent,
};
use crate::controller::orchestration::dispatch_backend_command;

pub const SETTINGS_STORAGE_KEY: &str = "deploydeck_settings";

/// Delay between a deployment being accepted and the preview URL being shown.
/// Purely presentational; the URL is already in state.
const PREVIEW_COUNTDOWN: Duration = Duration::from_secs(60);

const LOG_GREEN: egui::Color32 = egui::Color32::from_rgb(74, 222, 128);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSettings {
    pub last_repo_url: String,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            last_repo_url: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct StatusBanner {
    message: String,
}

fn remaining_countdown_seconds(deadline: Instant, now: Instant) -> u64 {
    let left = deadline.saturating_duration_since(now);
    left.as_secs_f64().ceil() as u64
}

pub struct DeploydeckApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    api_url: String,
    repo_url_input: String,
    loading: bool,
    slug: Option<ProjectSlug>,
    preview_url: Option<String>,
    countdown_deadline: Option<Instant>,
    stream_active: bool,
    logs: Vec<LogMessage>,

    status: String,
    status_banner: Option<StatusBanner>,
}

impl DeploydeckApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        api_url: String,
        persisted: Option<PersistedSettings>,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            api_url,
            repo_url_input: persisted.unwrap_or_default().last_repo_url,
            loading: false,
            slug: None,
            preview_url: None,
            countdown_deadline: None,
            stream_active: false,
            logs: Vec::new(),
            status: "Idle".to_string(),
            status_banner: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::DeploymentAccepted { slug, preview_url } => {
                    self.loading = false;
                    self.stream_active = true;
                    self.countdown_deadline = Some(Instant::now() + PREVIEW_COUNTDOWN);
                    self.status = format!("Deployment accepted: {slug}");
                    self.slug = Some(slug);
                    self.preview_url = Some(preview_url);
                    self.status_banner = None;
                }
                UiEvent::Log(log) => {
                    self.logs.push(log);
                }
                UiEvent::LogStreamClosed => {
                    self.stream_active = false;
                    self.status = "Log stream closed by server".to_string();
                }
                UiEvent::Error(err) => {
                    match err.context() {
                        UiErrorContext::Deploy | UiErrorContext::BackendStartup => {
                            self.loading = false;
                            self.status = classify_deploy_failure(err.message());
                            self.status_banner = Some(StatusBanner {
                                message: self.status.clone(),
                            });
                        }
                        UiErrorContext::LogStream => {
                            self.status =
                                format!("{} error: {}", err_label(err.category()), err.message());
                        }
                    }
                    tracing::warn!("ui: {}", err.message());
                }
            }
        }
    }

    fn try_deploy(&mut self, repo: GitRepoUrl) {
        self.loading = true;
        self.status_banner = None;
        self.status = format!("Deploying {}...", repo.as_str());
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Deploy { repo },
            &mut self.status,
        );
    }

    /// Countdown still running means the preview URL stays hidden.
    fn countdown_remaining(&self, now: Instant) -> Option<u64> {
        let deadline = self.countdown_deadline?;
        let left = remaining_countdown_seconds(deadline, now);
        (left > 0).then_some(left)
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            egui::Frame::group(ui.style())
                .fill(egui::Color32::from_rgb(111, 53, 53))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
            ui.add_space(6.0);
        }
    }

    fn show_deploy_form(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let parsed = GitRepoUrl::parse(&self.repo_url_input);

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("🐙").size(22.0));
            let edit = egui::TextEdit::singleline(&mut self.repo_url_input)
                .hint_text("Github URL")
                .desired_width(f32::INFINITY);
            let response = ui.add_enabled(!self.loading, edit);

            if response.has_focus() && ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
                if let Ok(repo) = &parsed {
                    if !self.loading {
                        self.try_deploy(repo.clone());
                    }
                }
            }
        });

        if parsed == Err(RepoUrlError::Invalid) {
            ui.colored_label(
                egui::Color32::LIGHT_RED,
                RepoUrlError::Invalid.to_string(),
            );
        }

        ui.add_space(4.0);
        let deploy_label = if self.loading { "In Progress" } else { "Deploy" };
        let button = egui::Button::new(egui::RichText::new(deploy_label).strong())
            .min_size(egui::vec2(ui.available_width(), 34.0));
        let can_deploy = parsed.is_ok() && !self.loading;
        if ui.add_enabled(can_deploy, button).clicked() {
            if let Ok(repo) = parsed {
                self.try_deploy(repo);
            }
        }
    }

    fn show_preview_section(&mut self, ui: &mut egui::Ui, now: Instant) {
        if let Some(seconds) = self.countdown_remaining(now) {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.label(format!(
                    "Deploying... Showing preview URL in {seconds} seconds..."
                ));
            });
            return;
        }

        if let Some(url) = self.preview_url.clone() {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label("Preview URL");
                    ui.hyperlink_to(egui::RichText::new(&url).strong(), &url);
                });
            });
        }
    }

    fn show_log_view(&self, ui: &mut egui::Ui) {
        if self.logs.is_empty() {
            return;
        }

        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Build logs").strong());
                if let Some(slug) = &self.slug {
                    ui.weak(slug.log_channel());
                }
            });
            ui.separator();
            egui::ScrollArea::vertical()
                .max_height(300.0)
                .auto_shrink([false, true])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for log in &self.logs {
                        let line = match log.timestamp {
                            Some(ts) => format!("[{}] > {}", ts.format("%H:%M:%S"), log.log),
                            None => format!("> {}", log.log),
                        };
                        ui.label(egui::RichText::new(line).monospace().color(LOG_GREEN));
                    }
                });
        });
    }
}

impl eframe::App for DeploydeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        // Keep painting while anything can still change without user input.
        let now = Instant::now();
        if self.loading || self.stream_active || self.countdown_remaining(now).is_some() {
            ctx.request_repaint_after(Duration::from_millis(200));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.set_width(ui.available_width().clamp(420.0, 600.0));
                ui.add_space((ui.available_height() * 0.08).clamp(10.0, 60.0));

                ui.heading("Deploydeck");
                ui.weak("Deploy any public GitHub repository.");
                ui.add_space(10.0);

                self.show_status_banner(ui);
                self.show_deploy_form(ctx, ui);
                ui.add_space(8.0);
                self.show_preview_section(ui, now);
                ui.add_space(8.0);
                self.show_log_view(ui);

                ui.add_space(10.0);
                ui.horizontal_wrapped(|ui| {
                    ui.small("Status:");
                    ui.small(egui::RichText::new(&self.status).weak());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.small(egui::RichText::new(&self.api_url).weak());
                    });
                });
            });
        });
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            last_repo_url: self.repo_url_input.clone(),
        };
        if let Ok(text) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    fn test_app() -> (DeploydeckApp, Sender<UiEvent>) {
        let (cmd_tx, _cmd_rx) = bounded::<BackendCommand>(8);
        let (ui_tx, ui_rx) = bounded::<UiEvent>(64);
        let app = DeploydeckApp::new(
            cmd_tx,
            ui_rx,
            "http://127.0.0.1:9000".to_string(),
            None,
        );
        (app, ui_tx)
    }

    fn log(text: &str) -> LogMessage {
        LogMessage {
            log: text.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn acceptance_clears_loading_and_starts_countdown() {
        let (mut app, ui_tx) = test_app();
        app.loading = true;

        ui_tx
            .send(UiEvent::DeploymentAccepted {
                slug: ProjectSlug("misty-meadow-42".to_string()),
                preview_url: "http://misty-meadow-42.localhost:8000".to_string(),
            })
            .expect("send");
        app.process_ui_events();

        assert!(!app.loading);
        assert!(app.stream_active);
        assert_eq!(app.slug.as_ref().map(|s| s.0.as_str()), Some("misty-meadow-42"));
        assert_eq!(
            app.preview_url.as_deref(),
            Some("http://misty-meadow-42.localhost:8000")
        );
        // Countdown just started, so the preview URL is still hidden.
        assert!(app.countdown_remaining(Instant::now()).is_some());
    }

    #[test]
    fn log_lines_render_in_arrival_order() {
        let (mut app, ui_tx) = test_app();

        for line in ["Cloning repository...", "Installing deps", "Build complete"] {
            ui_tx.send(UiEvent::Log(log(line))).expect("send");
        }
        app.process_ui_events();

        let lines: Vec<&str> = app.logs.iter().map(|l| l.log.as_str()).collect();
        assert_eq!(
            lines,
            ["Cloning repository...", "Installing deps", "Build complete"]
        );
    }

    #[test]
    fn deploy_error_clears_loading_and_raises_banner() {
        let (mut app, ui_tx) = test_app();
        app.loading = true;

        ui_tx
            .send(UiEvent::Error(UiError::from_message(
                UiErrorContext::Deploy,
                "failed to reach deployment API at http://127.0.0.1:9000",
            )))
            .expect("send");
        app.process_ui_events();

        assert!(!app.loading);
        assert!(app.status_banner.is_some());
        assert!(app.status.contains("unreachable"), "{}", app.status);
    }

    #[test]
    fn log_stream_errors_keep_the_stream_state() {
        let (mut app, ui_tx) = test_app();
        app.stream_active = true;

        ui_tx
            .send(UiEvent::Error(UiError::from_message(
                UiErrorContext::LogStream,
                "invalid log frame: expected value at line 1 column 1",
            )))
            .expect("send");
        app.process_ui_events();

        assert!(app.stream_active);
        assert!(app.status_banner.is_none());
    }

    #[test]
    fn stream_close_flips_activity_flag() {
        let (mut app, ui_tx) = test_app();
        app.stream_active = true;

        ui_tx.send(UiEvent::LogStreamClosed).expect("send");
        app.process_ui_events();

        assert!(!app.stream_active);
    }

    #[test]
    fn countdown_seconds_round_up_and_saturate() {
        let now = Instant::now();
        assert_eq!(
            remaining_countdown_seconds(now + Duration::from_millis(1500), now),
            2
        );
        assert_eq!(
            remaining_countdown_seconds(now + Duration::from_secs(60), now),
            60
        );
        // A deadline in the past never underflows.
        assert_eq!(remaining_countdown_seconds(now, now + Duration::from_secs(5)), 0);
    }
}
