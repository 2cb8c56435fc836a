use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use eframe::{egui, NativeOptions};
use studentd::config::{load_settings, AppPaths};
use studentd::logging::{init_logging, Verbosity};

mod app;
mod form;

const WINDOW_TITLE: &str = "Student Management System";

/// Desktop window for browsing and editing student records.
#[derive(Debug, Parser)]
#[command(name = "studentui", version, about, long_about = None)]
struct Cli {
    /// Data directory holding the database and settings
    #[arg(long, value_name = "DIR", env = "STUDENTD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.quiet, cli.verbose));

    let paths = AppPaths::resolve(cli.data_dir);
    let conn = studentd::db::open_db(&paths.data_dir).with_context(|| {
        format!("failed to open database in {}", paths.data_dir.display())
    })?;
    let settings = load_settings(&paths.settings_path());
    tracing::info!(dir = %paths.data_dir.display(), theme = %settings.theme, "starting");

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(settings.window_size())
            .with_min_inner_size([640.0, 360.0])
            .with_maximized(settings.zoomed),
        ..Default::default()
    };

    let app = app::StudentsApp::new(conn, paths, settings);
    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("window failed: {e}"))
}
