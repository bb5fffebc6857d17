use anyhow::{Context, Result};
use argh::FromArgs;
use minish::{Interpreter, ShellConfig};
use simplelog::{LevelFilter, WriteLogger};
use std::fs::OpenOptions;
use std::path::PathBuf;

#[derive(FromArgs)]
/// A small interactive shell.
struct Args {
    #[argh(option)]
    /// append diagnostics to this file; nothing is logged without it.
    log_file: Option<PathBuf>,

    #[argh(option, default = "LevelFilter::Info")]
    /// log verbosity: off, error, warn, info, debug or trace.
    log_level: LevelFilter,

    #[argh(option, default = "ShellConfig::DEFAULT_HISTORY_SIZE")]
    /// number of lines kept in the in-memory history.
    history_size: usize,
}

fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    WriteLogger::init(args.log_level, simplelog::Config::default(), file)
        .context("cannot install logger")?;
    Ok(())
}

fn run(args: Args) -> Result<()> {
    init_logging(&args)?;
    let config = ShellConfig {
        history_size: args.history_size,
        ..ShellConfig::default()
    };
    Interpreter::default().with_config(config).repl()
}

fn main() {
    let args: Args = argh::from_env();
    if let Err(e) = run(args) {
        eprintln!("minish: {e:#}");
        std::process::exit(1);
    }
}
