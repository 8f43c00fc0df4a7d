//! Handlers for `/contlets` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/contlets` | Variant and preview text, most recent first |
//! | `POST`   | `/contlets` | Body: `{"variant":"heading","text":"...","level":1}` |
//! | `GET`    | `/contlets/{id}` | 404 if the id is not a contlet |
//! | `PUT`    | `/contlets/{id}` | May switch variant |
//! | `DELETE` | `/contlets/{id}` | 409 while attached to a piece |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tessera_core::{
  EntityId,
  content::{Contlet, ContletBody, ContletSummary},
  store::ContentFacade,
};

use crate::error::ApiError;

/// `GET /contlets`
pub async fn list<S: ContentFacade>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<ContletSummary>>, ApiError> {
  Ok(Json(store.list_contlets().await?))
}

/// `POST /contlets`
pub async fn create<S: ContentFacade>(
  State(store): State<Arc<S>>,
  Json(body): Json<ContletBody>,
) -> Result<impl IntoResponse, ApiError> {
  let contlet = store.create_contlet(body).await?;
  Ok((StatusCode::CREATED, Json(contlet)))
}

/// `GET /contlets/{id}`
pub async fn get<S: ContentFacade>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<Json<Contlet>, ApiError> {
  Ok(Json(store.get_contlet(id).await?))
}

/// `PUT /contlets/{id}`
pub async fn update<S: ContentFacade>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Json(body): Json<ContletBody>,
) -> Result<Json<Contlet>, ApiError> {
  Ok(Json(store.update_contlet(id, body).await?))
}

/// `DELETE /contlets/{id}`
pub async fn delete<S: ContentFacade>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<StatusCode, ApiError> {
  store.delete_contlet(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
