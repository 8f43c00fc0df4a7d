//! SQLite backend for the Tessera content model.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every store operation is one closure on
//! that thread; writes spanning several tables use a transaction inside it.

mod composition;
mod encode;
mod error;
mod evolve;
mod graph;
mod rebuild;
mod records;
mod schema;
mod store;
mod tagging;

pub use store::SqliteStore;
