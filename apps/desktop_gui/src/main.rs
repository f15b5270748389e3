mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::app::{DeploydeckApp, PersistedSettings, SETTINGS_STORAGE_KEY};

/// Desktop front-end for the deployment-trigger API.
#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the deployment API, e.g. http://127.0.0.1:9000
    #[arg(long, default_value = "http://127.0.0.1:9000")]
    api_url: String,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(args.api_url.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Deploydeck")
            .with_inner_size([720.0, 640.0])
            .with_min_inner_size([520.0, 420.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Deploydeck",
        options,
        Box::new(move |cc| {
            let persisted = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedSettings>(&text).ok())
            });
            Ok(Box::new(DeploydeckApp::new(
                cmd_tx,
                ui_rx,
                args.api_url,
                persisted,
            )))
        }),
    )
}
