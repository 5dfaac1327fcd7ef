mod app;
mod auth;
mod cache;
mod commands;
mod config;
mod items;
mod logging;
mod query;
mod remote;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "itemlog")]
#[command(about = "Track how often you use the things you own")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./itemlog.yaml, then $XDG_CONFIG_HOME/itemlog/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Mirror logs to stderr
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let data_dir = config::Config::data_dir()?;
  let _log_guard = logging::init(&config.log, &data_dir, args.verbose)?;

  app::App::new(config, data_dir).run(args.command).await
}
