use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod dispatch;
mod render;

use dispatch::run_cli;

#[derive(Parser, Debug)]
#[command(name = "jdict")]
#[command(about = "Japanese dictionary installer", long_about = None)]
struct Cli {
    /// Install prefix; defaults to $JDICT_PREFIX or ~/.jdict.
    #[arg(long)]
    prefix: Option<PathBuf>,
    /// TOML file with extra dictionary presets.
    #[arg(long)]
    presets: Option<PathBuf>,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    List,
    Status,
    Install(InstallArgs),
    SetSource { name: String, uri: String },
    Doctor,
}

#[derive(Args, Debug, Default, Clone)]
struct InstallArgs {
    /// Preset filename, or the filename of a new dictionary.
    name: String,
    /// Source location(s), `;`-separated.
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    engine: Option<String>,
    #[arg(long)]
    encoding: Option<String>,
    #[arg(long)]
    compression: Option<String>,
    #[arg(long)]
    split: bool,
    #[arg(long)]
    merge: bool,
    /// Replacement for `gunzip -cd`, as one whitespace-separated command.
    #[arg(long)]
    gunzip: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run_cli(cli)
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests;
