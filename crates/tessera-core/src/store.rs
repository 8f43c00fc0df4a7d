//! Store traits, one per component of the content model.
//!
//! Backends (e.g. `tessera-store-sqlite`) implement every trait; higher
//! layers (`tessera-api`) depend only on these abstractions and receive the
//! backend by injection. [`ContentRepository`] bundles them for convenience.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use serde_json::{Map, Value};

use crate::{
  Result,
  composition::Placement,
  content::{
    ContentPiece, Contlet, ContletBody, ContletSummary, NewContentPiece,
    PieceDetail, PieceUpdate, PlacedContlet,
  },
  entity::EntityId,
  graph::{Direction, LinkClass, Neighbor, NewLink},
  schema::{AlterPlan, ColumnChange, TableSchema},
  taxonomy::{Tag, TagListing, Taxonomy},
};

/// A generic class-table row: column name to JSON value.
pub type ClassRecord = Map<String, Value>;

// ─── Entity registry ─────────────────────────────────────────────────────────

pub trait EntityRegistry: Send + Sync {
  /// Allocate a fresh identifier and nothing else.
  fn allocate(&self) -> impl Future<Output = Result<EntityId>> + Send + '_;

  /// Delete an entity, cascading to every row that depends on it.
  ///
  /// Fails with `NotFound` if the id does not exist and with
  /// `RestrictedDelete` if a restrict-on-delete edge still references it.
  fn release(&self, id: EntityId) -> impl Future<Output = Result<()>> + Send + '_;

  fn exists(&self, id: EntityId) -> impl Future<Output = Result<bool>> + Send + '_;
}

// ─── Class table store ───────────────────────────────────────────────────────

/// Untyped access to any class table, including columns added at runtime.
pub trait ClassTableStore: Send + Sync {
  /// Allocate an entity and insert one row into `class` in one transaction.
  fn create_record(
    &self,
    class: String,
    fields: ClassRecord,
  ) -> impl Future<Output = Result<EntityId>> + Send + '_;

  fn read_record(
    &self,
    class: String,
    id: EntityId,
  ) -> impl Future<Output = Result<ClassRecord>> + Send + '_;

  fn update_record(
    &self,
    class: String,
    id: EntityId,
    fields: ClassRecord,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}

// ─── Content façade ──────────────────────────────────────────────────────────

/// Typed reads and writes for content pieces and contlets.
pub trait ContentFacade: Send + Sync {
  fn create_piece(
    &self,
    input: NewContentPiece,
  ) -> impl Future<Output = Result<ContentPiece>> + Send + '_;

  fn get_piece(
    &self,
    id: EntityId,
  ) -> impl Future<Output = Result<ContentPiece>> + Send + '_;

  fn update_piece(
    &self,
    id: EntityId,
    update: PieceUpdate,
  ) -> impl Future<Output = Result<ContentPiece>> + Send + '_;

  fn delete_piece(&self, id: EntityId) -> impl Future<Output = Result<()>> + Send + '_;

  /// All pieces, most recent first.
  fn list_pieces(&self) -> impl Future<Output = Result<Vec<ContentPiece>>> + Send + '_;

  /// A piece with its ordered contlets and its tags.
  fn get_full_piece(
    &self,
    id: EntityId,
  ) -> impl Future<Output = Result<PieceDetail>> + Send + '_;

  fn create_contlet(
    &self,
    body: ContletBody,
  ) -> impl Future<Output = Result<Contlet>> + Send + '_;

  fn get_contlet(
    &self,
    id: EntityId,
  ) -> impl Future<Output = Result<Contlet>> + Send + '_;

  /// Replace a contlet's payload. A different variant moves the row to the
  /// other variant table within the same transaction.
  fn update_contlet(
    &self,
    id: EntityId,
    body: ContletBody,
  ) -> impl Future<Output = Result<Contlet>> + Send + '_;

  /// Fails with `RestrictedDelete` while the contlet is attached to a piece.
  fn delete_contlet(&self, id: EntityId) -> impl Future<Output = Result<()>> + Send + '_;

  /// All contlets, most recent first.
  fn list_contlets(
    &self,
  ) -> impl Future<Output = Result<Vec<ContletSummary>>> + Send + '_;
}

// ─── Composition index ───────────────────────────────────────────────────────

pub trait CompositionIndex: Send + Sync {
  /// Attach (or move) a contlet within a piece and return its sort key.
  fn attach(
    &self,
    piece: EntityId,
    contlet: EntityId,
    placement: Placement,
  ) -> impl Future<Output = Result<i64>> + Send + '_;

  fn detach(
    &self,
    piece: EntityId,
    contlet: EntityId,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// The piece's contlets in ascending sort-key order.
  fn list_ordered(
    &self,
    piece: EntityId,
  ) -> impl Future<Output = Result<Vec<PlacedContlet>>> + Send + '_;
}

// ─── Tagging index ───────────────────────────────────────────────────────────

pub trait TaggingIndex: Send + Sync {
  fn create_taxonomy(
    &self,
    name: String,
    description: Option<String>,
  ) -> impl Future<Output = Result<Taxonomy>> + Send + '_;

  fn list_taxonomies(&self) -> impl Future<Output = Result<Vec<Taxonomy>>> + Send + '_;

  fn create_tag(
    &self,
    taxonomy: EntityId,
    value: String,
  ) -> impl Future<Output = Result<Tag>> + Send + '_;

  /// Associate a tag with an entity. Repeating the call is a no-op.
  fn tag(
    &self,
    entity: EntityId,
    tag: EntityId,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Remove an association; returns whether one existed.
  fn untag(
    &self,
    entity: EntityId,
    tag: EntityId,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  fn tags_of(
    &self,
    entity: EntityId,
  ) -> impl Future<Output = Result<Vec<Tag>>> + Send + '_;

  /// Every tag, ordered by taxonomy name then value.
  fn list_all_tags(&self) -> impl Future<Output = Result<Vec<TagListing>>> + Send + '_;

  fn tagged_with(
    &self,
    tag: EntityId,
  ) -> impl Future<Output = Result<Vec<EntityId>>> + Send + '_;
}

// ─── Relationship graph ──────────────────────────────────────────────────────

pub trait RelationshipGraph: Send + Sync {
  fn define_link_class(
    &self,
    class: LinkClass,
  ) -> impl Future<Output = Result<LinkClass>> + Send + '_;

  fn list_link_classes(
    &self,
  ) -> impl Future<Output = Result<Vec<LinkClass>>> + Send + '_;

  /// Record an edge. Fails with `Conflict` if the triple already exists;
  /// metadata changes require `unlink` followed by `link`.
  fn link(&self, link: NewLink) -> impl Future<Output = Result<i64>> + Send + '_;

  fn unlink(
    &self,
    subject: EntityId,
    link_type: String,
    object: EntityId,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Edges touching `entity`, ordered by edge id. With [`Direction::Both`]
  /// a self-loop is reported once, as outgoing.
  fn neighbors(
    &self,
    entity: EntityId,
    direction: Direction,
    link_type: Option<String>,
  ) -> impl Future<Output = Result<Vec<Neighbor>>> + Send + '_;
}

// ─── Schema evolution ────────────────────────────────────────────────────────

pub trait SchemaEvolution: Send + Sync {
  /// Every table with its columns, tables in name order.
  fn schema_details(&self) -> impl Future<Output = Result<Vec<TableSchema>>> + Send + '_;

  /// Validate, translate, compose and apply a set of column changes to one
  /// class table, all or nothing. Returns the applied plan.
  fn apply_schema_change(
    &self,
    table: String,
    changes: Vec<ColumnChange>,
  ) -> impl Future<Output = Result<AlterPlan>> + Send + '_;
}

// ─── Bundle ──────────────────────────────────────────────────────────────────

/// Everything the presentation layer needs from a backend.
pub trait ContentRepository:
  EntityRegistry
  + ClassTableStore
  + ContentFacade
  + CompositionIndex
  + TaggingIndex
  + RelationshipGraph
  + SchemaEvolution
{
}

impl<T> ContentRepository for T where
  T: EntityRegistry
    + ClassTableStore
    + ContentFacade
    + CompositionIndex
    + TaggingIndex
    + RelationshipGraph
    + SchemaEvolution
{
}
