use clap::Parser;
use log::{info, LevelFilter};
use netjs_debugger::{dap, Result};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Debug adapter bridging DAP clients to a NetJS engine over WebSocket")]
struct Args {
    /// Append adapter diagnostics to this file instead of stderr.
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set.
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    info!(target: "dap", "netjs-debug {} started", env!("CARGO_PKG_VERSION"));
    dap::run_dap_mode()
}

// stdout carries the DAP stream, so logs go to stderr or a file.
// Without RUST_LOG the backend accepts everything and the global max level
// does the filtering, so a launch with `trace: true` can raise it later.
fn init_logging(args: &Args) -> Result<()> {
    let from_env = std::env::var_os("RUST_LOG").is_some();
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Trace).parse_default_env();

    if let Some(path) = &args.log_file {
        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else {
        builder.target(env_logger::Target::Stderr);
    }

    builder.init();
    if !from_env {
        log::set_max_level(args.log_level);
    }
    Ok(())
}
