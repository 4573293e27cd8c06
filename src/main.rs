mod catalog;
mod config;
mod db;
mod engine;
mod error;
mod fetch;
mod ipc;
mod logging;
mod pipeline;
mod report;
mod scope;
#[cfg(test)]
mod testutil;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "coursestatsd")]
#[command(about = "Read-only course analytics over a JSON-lines stdin/stdout channel")]
#[command(version)]
struct Args {
    /// Config file (default: $COURSESTATSD_CONFIG or ~/.config/coursestatsd/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store directory to open at startup; overrides `store.path`
    #[arg(long)]
    store: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::Config::load(args.config.as_deref())?;
    let _log_guard = logging::init(&config.logging)?;

    let store = args.store.clone().or_else(|| config.store.path.clone());
    let mut state = ipc::AppState::new(config);
    if let Some(dir) = store {
        ipc::open_store(&mut state, &dir)?;
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

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                // No id to echo back.
                tracing::warn!(error = %e, "unparseable request");
                let mut v = ipc::err("", "bad_json", e.to_string(), None);
                if let Some(obj) = v.as_object_mut() {
                    obj.remove("id");
                }
                v
            }
        };
        writeln!(stdout, "{resp}")?;
        stdout.flush()?;
    }
    tracing::info!("stdin closed, exiting");
    Ok(())
}
