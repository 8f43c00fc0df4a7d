//! Handlers for taxonomies, tags and entity tagging.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/taxonomies` | |
//! | `POST`   | `/taxonomies` | Body: `{"name":"Technology"}` |
//! | `GET`    | `/tags` | Every tag with its taxonomy name |
//! | `POST`   | `/tags` | Body: `{"taxonomy_id":1,"value":"Go"}` |
//! | `GET`    | `/tags/{id}/entities` | Ids of entities carrying the tag |
//! | `GET`    | `/entities/{id}/tags` | |
//! | `POST`   | `/entities/{id}/tags` | Body: `{"tag_id":2}`; idempotent |
//! | `DELETE` | `/entities/{id}/tags/{tag_id}` | Reports whether a tag was removed |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tessera_core::{
  EntityId,
  store::TaggingIndex,
  taxonomy::{Tag, TagListing, Taxonomy},
};

use crate::error::ApiError;

// ─── Taxonomies ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TaxonomyBody {
  pub name:        String,
  pub description: Option<String>,
}

/// `GET /taxonomies`
pub async fn list_taxonomies<S: TaggingIndex>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Taxonomy>>, ApiError> {
  Ok(Json(store.list_taxonomies().await?))
}

/// `POST /taxonomies`
pub async fn create_taxonomy<S: TaggingIndex>(
  State(store): State<Arc<S>>,
  Json(body): Json<TaxonomyBody>,
) -> Result<impl IntoResponse, ApiError> {
  let taxonomy = store.create_taxonomy(body.name, body.description).await?;
  Ok((StatusCode::CREATED, Json(taxonomy)))
}

// ─── Tags ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TagBody {
  pub taxonomy_id: EntityId,
  pub value:       String,
}

/// `GET /tags`
pub async fn list_tags<S: TaggingIndex>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<TagListing>>, ApiError> {
  Ok(Json(store.list_all_tags().await?))
}

/// `POST /tags`
pub async fn create_tag<S: TaggingIndex>(
  State(store): State<Arc<S>>,
  Json(body): Json<TagBody>,
) -> Result<impl IntoResponse, ApiError> {
  let tag = store.create_tag(body.taxonomy_id, body.value).await?;
  Ok((StatusCode::CREATED, Json(tag)))
}

/// `GET /tags/{id}/entities`
pub async fn tagged_with<S: TaggingIndex>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<Json<Vec<EntityId>>, ApiError> {
  Ok(Json(store.tagged_with(id).await?))
}

// ─── Entity tagging ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ApplyBody {
  pub tag_id: EntityId,
}

/// `GET /entities/{id}/tags`
pub async fn tags_of<S: TaggingIndex>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<Json<Vec<Tag>>, ApiError> {
  Ok(Json(store.tags_of(id).await?))
}

/// `POST /entities/{id}/tags`
pub async fn tag<S: TaggingIndex>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Json(body): Json<ApplyBody>,
) -> Result<StatusCode, ApiError> {
  store.tag(id, body.tag_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /entities/{id}/tags/{tag_id}`
pub async fn untag<S: TaggingIndex>(
  State(store): State<Arc<S>>,
  Path((id, tag_id)): Path<(EntityId, EntityId)>,
) -> Result<Json<Value>, ApiError> {
  let removed = store.untag(id, tag_id).await?;
  Ok(Json(json!({ "removed": removed })))
}
