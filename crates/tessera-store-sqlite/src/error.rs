//! Translation of SQLite failures into the shared [`tessera_core::Error`]
//! taxonomy.
//!
//! Constraint failures are classified at the call site, where it is known
//! whether a foreign key failed on insert (missing referent) or on delete
//! (restricted). Domain errors raised inside a connection closure travel as
//! [`tokio_rusqlite::Error::Other`] and are unwrapped again by [`Context`].

use std::ffi::c_int;

use rusqlite::{ErrorCode, ffi};
use tessera_core::{EntityId, Error, Result};

/// Carry a domain error out of a connection closure.
pub(crate) fn reject(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

/// The extended result code of a constraint failure, if `e` is one.
fn constraint_code(e: &rusqlite::Error) -> Option<c_int> {
  match e {
    rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation => {
      Some(f.extended_code)
    }
    _ => None,
  }
}

/// Classify a failed insert or update of `what`.
pub(crate) fn on_write(e: rusqlite::Error, what: &str) -> tokio_rusqlite::Error {
  match constraint_code(&e) {
    Some(ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
      reject(Error::Conflict(format!("{what} already exists")))
    }
    Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
      reject(Error::NotFound(format!("{what} references a missing row")))
    }
    Some(ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL) => reject(
      Error::InvalidArgument(format!("{what} violates a column constraint: {e}")),
    ),
    _ => e.into(),
  }
}

/// Classify a failed delete of entity `id`.
///
/// SQLite reports an `ON DELETE RESTRICT` action with the trigger code and a
/// deferred or plain reference failure with the foreign key code.
pub(crate) fn on_delete(e: rusqlite::Error, id: EntityId) -> tokio_rusqlite::Error {
  match constraint_code(&e) {
    Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY | ffi::SQLITE_CONSTRAINT_TRIGGER) => {
      reject(Error::RestrictedDelete(id))
    }
    _ => e.into(),
  }
}

/// Attach an operation name to a connection result and restore domain errors.
pub(crate) trait Context<T> {
  fn context(self, op: impl Into<String>) -> Result<T>;
}

impl<T> Context<T> for std::result::Result<T, tokio_rusqlite::Error> {
  fn context(self, op: impl Into<String>) -> Result<T> {
    self.map_err(|e| match e {
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
        Ok(domain) => *domain,
        Err(other) => Error::Store { op: op.into(), source: other },
      },
      other => Error::store(op, other),
    })
  }
}
