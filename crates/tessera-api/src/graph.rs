//! Handlers for link classes, relationships and entity lifecycle.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/link-classes` | |
//! | `POST`   | `/link-classes` | Body: `{"name":"parent_of","symmetric_link":"child_of"}` |
//! | `POST`   | `/relationships` | 409 if the triple already exists |
//! | `DELETE` | `/relationships` | Body: `{"subject":1,"link_type":"related_to","object":2}` |
//! | `GET`    | `/entities/{id}/neighbors` | `?direction=outgoing\|incoming\|both&link_type=` |
//! | `DELETE` | `/entities/{id}` | Cascades to class rows, tags and edges |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tessera_core::{
  EntityId,
  graph::{Direction, LinkClass, Neighbor, NewLink},
  store::{EntityRegistry, RelationshipGraph},
};

use crate::error::ApiError;

// ─── Link classes ─────────────────────────────────────────────────────────────

/// `GET /link-classes`
pub async fn list_link_classes<S: RelationshipGraph>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<LinkClass>>, ApiError> {
  Ok(Json(store.list_link_classes().await?))
}

/// `POST /link-classes`
pub async fn define_link_class<S: RelationshipGraph>(
  State(store): State<Arc<S>>,
  Json(body): Json<LinkClass>,
) -> Result<impl IntoResponse, ApiError> {
  let class = store.define_link_class(body).await?;
  Ok((StatusCode::CREATED, Json(class)))
}

// ─── Relationships ────────────────────────────────────────────────────────────

/// `POST /relationships`
pub async fn link<S: RelationshipGraph>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewLink>,
) -> Result<impl IntoResponse, ApiError> {
  let id = store.link(body).await?;
  Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[derive(Debug, Deserialize)]
pub struct UnlinkBody {
  pub subject:   EntityId,
  pub link_type: String,
  pub object:    EntityId,
}

/// `DELETE /relationships`
pub async fn unlink<S: RelationshipGraph>(
  State(store): State<Arc<S>>,
  Json(body): Json<UnlinkBody>,
) -> Result<StatusCode, ApiError> {
  store.unlink(body.subject, body.link_type, body.object).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct NeighborParams {
  #[serde(default)]
  pub direction: Direction,
  pub link_type: Option<String>,
}

/// `GET /entities/{id}/neighbors[?direction=&link_type=]`
pub async fn neighbors<S: RelationshipGraph>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Query(params): Query<NeighborParams>,
) -> Result<Json<Vec<Neighbor>>, ApiError> {
  let link_type = params.link_type.filter(|t| !t.is_empty());
  Ok(Json(store.neighbors(id, params.direction, link_type).await?))
}

// ─── Entities ─────────────────────────────────────────────────────────────────

/// `DELETE /entities/{id}`
pub async fn release<S: EntityRegistry>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<StatusCode, ApiError> {
  store.release(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
