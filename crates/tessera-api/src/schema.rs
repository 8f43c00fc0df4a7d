//! Handlers for `/schema` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/schema` | Every table with its columns |
//! | `GET`  | `/schema/types` | Semantic type labels for pickers |
//! | `POST` | `/schema/{table}` | Body: array of column changes; returns the applied plan |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use tessera_core::{
  schema::{AlterPlan, ColumnChange, SemanticType, TableSchema},
  store::SchemaEvolution,
};

use crate::error::ApiError;

/// `GET /schema`
pub async fn details<S: SchemaEvolution>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<TableSchema>>, ApiError> {
  Ok(Json(store.schema_details().await?))
}

/// `GET /schema/types`
pub async fn semantic_types() -> Json<Vec<&'static str>> {
  Json(SemanticType::labels())
}

/// `POST /schema/{table}`
///
/// An empty array is a no-op and returns an empty plan.
pub async fn apply<S: SchemaEvolution>(
  State(store): State<Arc<S>>,
  Path(table): Path<String>,
  Json(changes): Json<Vec<ColumnChange>>,
) -> Result<Json<AlterPlan>, ApiError> {
  Ok(Json(store.apply_schema_change(table, changes).await?))
}
