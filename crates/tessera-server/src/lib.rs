//! Tessera HTTP server: configuration, sample data and the application
//! router. The binary in `main.rs` only wires these together.

pub mod seed;

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use tessera_core::store::ContentRepository;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `tessera.toml` and
/// `TESSERA_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("tessera.db") }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       default_host(),
      port:       default_port(),
      store_path: default_store_path(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The JSON API under `/api`, with request tracing.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: ContentRepository + 'static,
{
  Router::new()
    .nest("/api", tessera_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tessera_core::store::{CompositionIndex, ContentFacade, TaggingIndex};
  use tessera_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  #[test]
  fn config_defaults_apply_without_sources() {
    let cfg: ServerConfig = config::Config::builder()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg, ServerConfig::default());
    assert_eq!(cfg.address(), "127.0.0.1:8080");
  }

  #[test]
  fn config_values_override_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .set_override("port", 9000)
      .unwrap()
      .set_override("store_path", "/tmp/t.db")
      .unwrap()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/t.db"));
  }

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let req = Request::builder().uri("/api/pieces").body(Body::empty()).unwrap();
    let resp = app(store.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder().uri("/pieces").body(Body::empty()).unwrap();
    let resp = app(store).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn seed_builds_the_sample_piece() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    assert!(store.is_empty().await.unwrap());

    let piece = seed::seed_sample_data(&store).await.unwrap();
    assert!(!store.is_empty().await.unwrap());

    let detail = store.get_full_piece(piece).await.unwrap();
    assert_eq!(detail.piece.title, "About This System");
    let ordered = store.list_ordered(piece).await.unwrap();
    let keys: Vec<i64> = ordered.iter().map(|p| p.sort_key).collect();
    assert_eq!(keys, vec![100, 200]);
    let tags = store.tags_of(piece).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].value, "Go");
  }
}
