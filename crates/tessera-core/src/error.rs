//! Error taxonomy shared by every Tessera crate.
//!
//! Store backends translate their native failures into these variants so the
//! presentation layer can map each kind to a status without knowing which
//! backend produced it.

use serde::Serialize;
use thiserror::Error;

use crate::entity::EntityId;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// A referenced entity, class row, tag, edge, table or column is absent.
  #[error("not found: {0}")]
  NotFound(String),

  /// A uniqueness constraint would be violated.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// A table or column name failed the identifier grammar.
  #[error("invalid identifier: {0:?}")]
  InvalidIdentifier(String),

  /// A raw physical column type contained forbidden characters.
  #[error("invalid column type: {0:?}")]
  InvalidColumnType(String),

  #[error("unknown semantic type: {0:?}")]
  UnknownSemanticType(String),

  /// Stored data breaks an invariant the write path is supposed to uphold.
  #[error("integrity violation: {0}")]
  IntegrityViolation(String),

  /// The entity is still referenced by a restrict-on-delete edge.
  #[error("entity {0} is still referenced and cannot be deleted")]
  RestrictedDelete(EntityId),

  /// The composed alteration was rejected by the store at execution time.
  #[error("failed to alter table {table}: {source}. Statement: {statement}")]
  AlterFailed {
    table:     String,
    statement: String,
    #[source]
    source:    BoxError,
  },

  /// Any other failure reported by the underlying store.
  #[error("store error during {op}: {source}")]
  Store {
    op:     String,
    #[source]
    source: BoxError,
  },
}

/// Flat discriminant of [`Error`], convenient for status mapping and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  Conflict,
  InvalidArgument,
  InvalidIdentifier,
  InvalidColumnType,
  UnknownSemanticType,
  IntegrityViolation,
  RestrictedDelete,
  AlterFailed,
  Store,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
      Self::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
      Self::InvalidColumnType(_) => ErrorKind::InvalidColumnType,
      Self::UnknownSemanticType(_) => ErrorKind::UnknownSemanticType,
      Self::IntegrityViolation(_) => ErrorKind::IntegrityViolation,
      Self::RestrictedDelete(_) => ErrorKind::RestrictedDelete,
      Self::AlterFailed { .. } => ErrorKind::AlterFailed,
      Self::Store { .. } => ErrorKind::Store,
    }
  }

  pub fn store(
    op: impl Into<String>,
    source: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Store { op: op.into(), source: Box::new(source) }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
