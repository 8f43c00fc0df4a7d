//! Handlers for `/pieces` endpoints, including composition.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/pieces` | Most recent first |
//! | `POST`   | `/pieces` | Body: `{"class":"blog_post","title":"..."}` |
//! | `GET`    | `/pieces/{id}` | Piece with ordered contlets and tags |
//! | `PUT`    | `/pieces/{id}` | Replaces class, title and status |
//! | `DELETE` | `/pieces/{id}` | Detaches its contlets, never deletes them |
//! | `GET`    | `/pieces/{id}/contlets` | Flat records with sort keys |
//! | `POST`   | `/pieces/{id}/contlets` | Body: `{"contlet_id":7,"placement":{"mode":"at","sort_key":150}}` |
//! | `DELETE` | `/pieces/{id}/contlets/{contlet_id}` | 404 if not attached |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tessera_core::{
  EntityId,
  composition::Placement,
  content::{ContentPiece, ContletRecord, NewContentPiece, PieceDetail, PieceUpdate},
  store::{CompositionIndex, ContentFacade},
};

use crate::error::ApiError;

// ─── Pieces ───────────────────────────────────────────────────────────────────

/// `GET /pieces`
pub async fn list<S: ContentFacade>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<ContentPiece>>, ApiError> {
  Ok(Json(store.list_pieces().await?))
}

/// `POST /pieces`
pub async fn create<S: ContentFacade>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewContentPiece>,
) -> Result<impl IntoResponse, ApiError> {
  let piece = store.create_piece(body).await?;
  Ok((StatusCode::CREATED, Json(piece)))
}

/// `GET /pieces/{id}`
pub async fn get<S: ContentFacade>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<Json<PieceDetail>, ApiError> {
  Ok(Json(store.get_full_piece(id).await?))
}

/// `PUT /pieces/{id}`
pub async fn update<S: ContentFacade>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Json(body): Json<PieceUpdate>,
) -> Result<Json<ContentPiece>, ApiError> {
  Ok(Json(store.update_piece(id, body).await?))
}

/// `DELETE /pieces/{id}`
pub async fn delete<S: ContentFacade>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<StatusCode, ApiError> {
  store.delete_piece(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Composition ──────────────────────────────────────────────────────────────

/// A flat contlet record at its position in a piece.
#[derive(Debug, Serialize)]
pub struct OrderedRecord {
  pub sort_key: i64,
  #[serde(flatten)]
  pub record:   ContletRecord,
}

/// `GET /pieces/{id}/contlets`
pub async fn contlets<S: CompositionIndex>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<Json<Vec<OrderedRecord>>, ApiError> {
  let placed = store.list_ordered(id).await?;
  let records = placed
    .iter()
    .map(|p| OrderedRecord {
      sort_key: p.sort_key,
      record:   ContletRecord::from(&p.contlet),
    })
    .collect();
  Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct AttachBody {
  pub contlet_id: EntityId,
  #[serde(default)]
  pub placement:  Placement,
}

/// `POST /pieces/{id}/contlets`
pub async fn attach<S: CompositionIndex>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Json(body): Json<AttachBody>,
) -> Result<impl IntoResponse, ApiError> {
  let sort_key = store.attach(id, body.contlet_id, body.placement).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "contlet_id": body.contlet_id, "sort_key": sort_key })),
  ))
}

/// `DELETE /pieces/{id}/contlets/{contlet_id}`
pub async fn detach<S: CompositionIndex>(
  State(store): State<Arc<S>>,
  Path((id, contlet_id)): Path<(EntityId, EntityId)>,
) -> Result<StatusCode, ApiError> {
  store.detach(id, contlet_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
