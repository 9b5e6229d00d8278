use std::{fmt::Write as _, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::domain::SettingsField;
use surface_core::{
    load_config, CatalogStatus, CommandBoundary, ControlSurface, Outcome, StartupReport,
    SurfaceConfig, SurfaceSnapshot,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Headless control surface for the thread voice reader")]
struct Args {
    /// Configuration file; `thread_reader.toml` in the working directory when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides `backend_url` from the configuration.
    #[arg(long, global = true, env = "THREAD_READER_BACKEND_URL")]
    backend_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print stored settings, playback devices and reader state.
    Show,
    /// List playback devices in backend order.
    Devices,
    /// Edit settings and save them, e.g. `set threadUrl https://... speakerStyleId 3`.
    Set {
        #[arg(required = true, num_args = 2.., value_names = ["FIELD", "VALUE"])]
        assignments: Vec<String>,
    },
    /// Start reading to a playback device; Ctrl-C stops the reader.
    Run {
        #[arg(long)]
        device: String,
    },
    /// Stop a reader started by another process.
    Stop,
}

fn resolve_config(args: &Args) -> Result<SurfaceConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(url) = &args.backend_url {
        config.backend_url = url.clone();
        config.validate()?;
    }
    Ok(config)
}

fn parse_assignments(raw: &[String]) -> Result<Vec<(SettingsField, String)>> {
    if raw.len() % 2 != 0 {
        bail!("expected FIELD VALUE pairs, got {} arguments", raw.len());
    }
    raw.chunks_exact(2)
        .map(|pair| {
            let field = pair[0]
                .parse::<SettingsField>()
                .with_context(|| format!("cannot set '{}'", pair[0]))?;
            Ok((field, pair[1].clone()))
        })
        .collect()
}

fn render_snapshot(snapshot: &SurfaceSnapshot) -> String {
    let mut out = String::new();
    for field in SettingsField::ALL {
        let value = snapshot.draft.get(field);
        let shown = if value.is_empty() {
            "(empty)"
        } else if field == SettingsField::SlackToken {
            "(set)"
        } else {
            value
        };
        let _ = writeln!(out, "{:<18}{shown}", field.label());
    }
    let _ = writeln!(out);
    out.push_str(&render_devices(snapshot));
    let _ = writeln!(out);
    let _ = write!(out, "reader: {}", snapshot.run_state);
    out
}

fn render_devices(snapshot: &SurfaceSnapshot) -> String {
    match snapshot.catalog_status {
        CatalogStatus::Ready if snapshot.devices.is_empty() => {
            "no playback devices reported".to_string()
        }
        CatalogStatus::Ready => {
            let mut out = String::from("playback devices:");
            for device in &snapshot.devices {
                let marker = if snapshot.selected_device.as_deref() == Some(device.as_str()) {
                    '*'
                } else {
                    ' '
                };
                let _ = write!(out, "\n {marker} {device}");
            }
            out
        }
        _ => "playback devices unavailable".to_string(),
    }
}

fn warn_partial_startup(report: &StartupReport) {
    if let Err(err) = &report.settings {
        eprintln!("warning: {err}");
    }
    if let Err(err) = &report.devices {
        eprintln!("warning: {err}");
    }
}

async fn execute(
    boundary: &dyn CommandBoundary,
    surface: &ControlSurface,
    command: Command,
) -> Result<()> {
    // A fresh surface is always idle, so a reader owned by another process
    // is stopped at the backend directly.
    if command == Command::Stop {
        boundary.stop_voice_reader().await?;
        println!("reader stopped");
        return Ok(());
    }

    let report = surface.on_startup().await;
    match command {
        Command::Show => {
            if report.settings.is_err() && report.devices.is_err() {
                warn_partial_startup(&report);
                bail!("reader backend unavailable");
            }
            warn_partial_startup(&report);
            println!("{}", render_snapshot(&surface.snapshot().await));
        }
        Command::Devices => {
            report.devices?;
            println!("{}", render_devices(&surface.snapshot().await));
        }
        Command::Set { assignments } => {
            let edits = parse_assignments(&assignments)?;
            // Saving over a failed load would blank every untouched field.
            report
                .settings
                .context("stored settings could not be loaded; nothing was saved")?;
            for (field, value) in edits {
                surface.on_field_edit(field, value).await;
            }
            match surface.on_submit().await? {
                Outcome::Applied => println!("settings saved"),
                Outcome::Skipped(reason) => println!("settings not saved: {reason}"),
            }
        }
        Command::Run { device } => {
            warn_partial_startup(&report);
            surface.on_device_select(device.as_str()).await;
            surface.on_run().await?;
            println!("reading to '{device}'; press Ctrl-C to stop");

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            match surface.on_stop().await? {
                Outcome::Applied => println!("reader stopped"),
                Outcome::Skipped(reason) => println!("stop skipped: {reason}"),
            }
        }
        Command::Stop => {}
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let boundary = config.build_boundary()?;
    tracing::debug!(backend_url = %config.backend_url, command = ?args.command, "running");
    let surface = ControlSurface::new(Arc::clone(&boundary));
    execute(boundary.as_ref(), &surface, args.command).await
}
