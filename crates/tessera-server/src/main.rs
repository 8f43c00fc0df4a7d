//! tessera server binary.
//!
//! Reads `tessera.toml` (or the path given with `--config`) layered under
//! `TESSERA_*` environment variables, opens the SQLite store and serves the
//! JSON API under `/api`.
//!
//! ```
//! cargo run -p tessera-server -- --reset-db --sample-data
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tessera_server::{ServerConfig, seed};
use tessera_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tessera content server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tessera.toml")]
  config: PathBuf,

  /// Delete the database file before opening it.
  #[arg(long)]
  reset_db: bool,

  /// Insert sample content when the store is empty.
  #[arg(long)]
  sample_data: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TESSERA"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);

  if cli.reset_db {
    reset_store(&store_path)?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if cli.sample_data {
    if store.is_empty().await.context("failed to inspect store")? {
      seed::seed_sample_data(&store)
        .await
        .context("failed to seed sample data")?;
    } else {
      tracing::info!("store already contains data, skipping sample data");
    }
  }

  let app = tessera_server::app(Arc::new(store));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}/api");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Remove the database file and its WAL side files, if present.
fn reset_store(path: &Path) -> anyhow::Result<()> {
  let mut removed = false;
  for suffix in ["", "-wal", "-shm"] {
    let mut file = path.as_os_str().to_owned();
    file.push(suffix);
    match std::fs::remove_file(&file) {
      Ok(()) => removed = true,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => {
        return Err(e).with_context(|| format!("failed to remove {file:?}"));
      }
    }
  }
  tracing::info!(path = %path.display(), removed, "database reset");
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
