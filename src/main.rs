mod api;
mod app;
mod config;
mod error;
mod net;
mod queue;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "wmsterm")]
#[command(about = "Offline-tolerant warehouse inventory terminal")]
#[command(version)]
struct Args {
  /// Base path for settings, caches, and the commit queue
  /// (default: platform data dir, e.g. ~/.local/share/wmsterm)
  #[arg(short, long)]
  base_path: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Write the settings file for this device
  Init {
    #[arg(long)]
    api_url: String,
    #[arg(long)]
    api_key: String,
    /// Device identifier stamped on every commit
    #[arg(long, default_value = "TOUGHPAD01")]
    device_id: String,
  },
  /// Verify the configured URL and key against the service
  Check,
  /// List items (served from cache when the network is down)
  Items,
  /// List locations (served from cache when the network is down)
  Locations,
  /// Queue an inventory delta for an item at a location
  Commit {
    #[arg(short, long)]
    location: String,
    #[arg(short, long)]
    item: i64,
    #[arg(short, long, allow_hyphen_values = true)]
    delta: i64,
  },
  /// Show commits still waiting to be delivered
  Pending,
  /// Run the background sync worker until interrupted
  Run,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let base_path = match args.base_path {
    Some(p) => p,
    None => config::default_base_path()?,
  };
  std::fs::create_dir_all(&base_path)?;

  let _log_guard = init_logging(&base_path);

  // `init` must work before any settings exist.
  if let Command::Init {
    api_url,
    api_key,
    device_id,
  } = &args.command
  {
    let settings = config::Settings {
      api_url: api_url.clone(),
      api_key: api_key.clone(),
      device_id: device_id.clone(),
    };
    let path = base_path.join(config::SETTINGS_FILE);
    settings.save(&path)?;
    println!("Settings written to {}", path.display());
    return Ok(());
  }

  // First run: write an empty settings file so the operator has something
  // to fill in, then fail with guidance from AppContext::new.
  let settings_path = base_path.join(config::SETTINGS_FILE);
  let settings = if settings_path.exists() {
    config::Settings::load(&settings_path)?
  } else {
    config::Settings::create_default(&settings_path)?
  };

  let mut ctx = app::AppContext::new(settings, base_path)?;

  match args.command {
    Command::Init { .. } => unreachable!(),
    Command::Check => ctx.check().await,
    Command::Items => ctx.list_items().await,
    Command::Locations => ctx.list_locations().await,
    Command::Commit {
      location,
      item,
      delta,
    } => ctx.submit_commit(location, item, delta).await,
    Command::Pending => ctx.show_pending().await,
    Command::Run => ctx.run().await,
  }
}

/// Log to a file under the base path; the terminal itself is the operator
/// surface. Verbosity is controlled with RUST_LOG.
fn init_logging(base_path: &Path) -> tracing_appender::non_blocking::WorkerGuard {
  let file = tracing_appender::rolling::never(base_path, "wmsterm.log");
  let (writer, guard) = tracing_appender::non_blocking(file);

  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(writer)
    .with_ansi(false)
    .init();

  guard
}
