use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use surface_core::{load_config, SurfaceConfig};
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::ThreadReaderApp;

#[derive(Parser, Debug)]
#[command(about = "Desktop control window for the thread voice reader")]
struct Args {
    /// Configuration file; `thread_reader.toml` in the working directory when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides `backend_url` from the configuration.
    #[arg(long, env = "THREAD_READER_BACKEND_URL")]
    backend_url: Option<String>,
}

fn resolve_config(args: &Args) -> anyhow::Result<SurfaceConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(url) = &args.backend_url {
        config.backend_url = url.clone();
        config.validate()?;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let boundary = config.build_boundary()?;
    tracing::info!(backend_url = %config.backend_url, "starting reader control window");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(1024);
    backend_bridge::runtime::launch(boundary, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Thread Voice Reader")
            .with_inner_size([560.0, 480.0])
            .with_min_inner_size([420.0, 360.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Thread Voice Reader",
        options,
        Box::new(|_cc| Ok(Box::new(ThreadReaderApp::new(cmd_tx, ui_rx)))),
    )
    .map_err(|err| anyhow::anyhow!("control window failed: {err}"))
}
