mod app;
mod cache;
mod config;
mod connectivity;
mod error;
mod list;
mod logging;
mod users;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "randomusers")]
#[command(about = "Browse random users, with an offline cache of the first page")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/randomusers/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Number of pages to load
  #[arg(short, long, default_value_t = 1)]
  pages: u32,

  /// Only show users whose name or email contains this text
  #[arg(short, long)]
  search: Option<String>,

  /// Pretend the network is down (serves the cached first page)
  #[arg(long)]
  offline: bool,

  /// Neither read nor write the local cache
  #[arg(long)]
  no_cache: bool,

  /// Print contact, address and date details for each user
  #[arg(short, long)]
  details: bool,

  /// Also write logs to stderr
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.verbose)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let options = app::RunOptions {
    pages: args.pages,
    search: args.search,
    offline: args.offline,
    no_cache: args.no_cache,
    details: args.details,
  };

  app::run(config, options).await
}
