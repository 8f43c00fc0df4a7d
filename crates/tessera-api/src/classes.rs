//! Generic access to class tables, including columns added at runtime.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/classes/{class}` | Body: JSON object of column values; returns `{"id":..}` |
//! | `GET`  | `/classes/{class}/{id}` | Row as a JSON object in column order |
//! | `PUT`  | `/classes/{class}/{id}` | Sets only the given columns |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde_json::json;
use tessera_core::{
  EntityId,
  store::{ClassRecord, ClassTableStore},
};

use crate::error::ApiError;

/// `POST /classes/{class}`
pub async fn create<S: ClassTableStore>(
  State(store): State<Arc<S>>,
  Path(class): Path<String>,
  Json(fields): Json<ClassRecord>,
) -> Result<impl IntoResponse, ApiError> {
  let id = store.create_record(class, fields).await?;
  Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// `GET /classes/{class}/{id}`
pub async fn read<S: ClassTableStore>(
  State(store): State<Arc<S>>,
  Path((class, id)): Path<(String, EntityId)>,
) -> Result<Json<ClassRecord>, ApiError> {
  Ok(Json(store.read_record(class, id).await?))
}

/// `PUT /classes/{class}/{id}`
pub async fn update<S: ClassTableStore>(
  State(store): State<Arc<S>>,
  Path((class, id)): Path<(String, EntityId)>,
  Json(fields): Json<ClassRecord>,
) -> Result<StatusCode, ApiError> {
  store.update_record(class, id, fields).await?;
  Ok(StatusCode::NO_CONTENT)
}
