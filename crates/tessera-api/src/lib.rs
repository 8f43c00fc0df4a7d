//! JSON REST API for Tessera.
//!
//! Exposes an axum [`Router`] backed by any
//! [`tessera_core::store::ContentRepository`]. Auth, TLS and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tessera_api::api_router(store.clone()))
//! ```

pub mod classes;
pub mod contlets;
pub mod error;
pub mod graph;
pub mod pieces;
pub mod schema;
pub mod tags;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use tessera_core::store::ContentRepository;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ContentRepository + 'static,
{
  Router::new()
    // Pieces and composition
    .route("/pieces", get(pieces::list::<S>).post(pieces::create::<S>))
    .route(
      "/pieces/{id}",
      get(pieces::get::<S>)
        .put(pieces::update::<S>)
        .delete(pieces::delete::<S>),
    )
    .route(
      "/pieces/{id}/contlets",
      get(pieces::contlets::<S>).post(pieces::attach::<S>),
    )
    .route("/pieces/{id}/contlets/{contlet_id}", delete(pieces::detach::<S>))
    // Contlets
    .route("/contlets", get(contlets::list::<S>).post(contlets::create::<S>))
    .route(
      "/contlets/{id}",
      get(contlets::get::<S>)
        .put(contlets::update::<S>)
        .delete(contlets::delete::<S>),
    )
    // Taxonomies and tags
    .route(
      "/taxonomies",
      get(tags::list_taxonomies::<S>).post(tags::create_taxonomy::<S>),
    )
    .route("/tags", get(tags::list_tags::<S>).post(tags::create_tag::<S>))
    .route("/tags/{id}/entities", get(tags::tagged_with::<S>))
    .route("/entities/{id}/tags", get(tags::tags_of::<S>).post(tags::tag::<S>))
    .route("/entities/{id}/tags/{tag_id}", delete(tags::untag::<S>))
    // Graph and entities
    .route("/entities/{id}", delete(graph::release::<S>))
    .route("/entities/{id}/neighbors", get(graph::neighbors::<S>))
    .route(
      "/link-classes",
      get(graph::list_link_classes::<S>).post(graph::define_link_class::<S>),
    )
    .route(
      "/relationships",
      post(graph::link::<S>).delete(graph::unlink::<S>),
    )
    // Schema
    .route("/schema", get(schema::details::<S>))
    .route("/schema/types", get(schema::semantic_types))
    .route("/schema/{table}", post(schema::apply::<S>))
    // Generic class records
    .route("/classes/{class}", post(classes::create::<S>))
    .route(
      "/classes/{class}/{id}",
      get(classes::read::<S>).put(classes::update::<S>),
    )
    .with_state(store)
}

#[cfg(test)]
mod tests;
