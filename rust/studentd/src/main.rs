use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use studentd::ipc;
use studentd::logging::{init_logging, Verbosity};

/// Student records sidecar: reads one JSON request per stdin line and writes
/// one JSON reply per stdout line.
#[derive(Debug, Parser)]
#[command(name = "studentd", version, about, long_about = None)]
struct Cli {
    /// Open this data directory at startup instead of waiting for `workspace.select`
    #[arg(long, value_name = "DIR", env = "STUDENTD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.quiet, cli.verbose));

    let mut state = ipc::AppState::default();
    if let Some(dir) = cli.data_dir.as_deref() {
        if let Err(e) = ipc::open_workspace(&mut state, dir) {
            tracing::error!(dir = %dir.display(), error = %format!("{e:#}"), "cannot open data directory");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "malformed request line");
                let reply = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{reply}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    tracing::debug!("stdin closed, exiting");
}
