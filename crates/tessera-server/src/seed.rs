//! Sample content for a fresh store.
//!
//! Builds the "About This System" piece through the ordinary store
//! operations, so it exercises the same validation as API writes.

use tessera_core::{
  EntityId, Result,
  composition::Placement,
  content::{ContletBody, NewContentPiece},
  graph::LinkClass,
  store::ContentRepository,
};
use tracing::info;

/// Insert the sample taxonomy, tag, piece and contlets. Returns the piece id.
///
/// The caller decides whether the store is empty enough to seed.
pub async fn seed_sample_data<S: ContentRepository>(store: &S) -> Result<EntityId> {
  let technology = store
    .create_taxonomy(
      "Technology".to_owned(),
      Some("Programming languages, frameworks, and other tech.".to_owned()),
    )
    .await?;
  let go = store.create_tag(technology.id, "Go".to_owned()).await?;

  store
    .define_link_class(LinkClass {
      name:           "related_to".to_owned(),
      description:    Some("Loosely related content".to_owned()),
      symmetric_link: Some("related_to".to_owned()),
    })
    .await?;

  let piece = store
    .create_piece(NewContentPiece::new("blog_post", "About This System"))
    .await?;
  store.tag(piece.id, go.id).await?;

  let heading = store
    .create_contlet(ContletBody::Heading { text: "Core Philosophy".to_owned(), level: 1 })
    .await?;
  store.attach(piece.id, heading.id, Placement::At(100)).await?;

  let paragraph = store
    .create_contlet(ContletBody::Paragraph {
      text: "This system is built on SQLite and Rust, following a pragmatic design."
        .to_owned(),
    })
    .await?;
  store.attach(piece.id, paragraph.id, Placement::At(200)).await?;

  info!(piece = %piece.id, "sample data seeded");
  Ok(piece.id)
}
