//! Core types and trait definitions for the Tessera content model.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

pub mod composition;
pub mod content;
pub mod entity;
pub mod error;
pub mod graph;
pub mod schema;
pub mod store;
pub mod taxonomy;

pub use entity::EntityId;
pub use error::{Error, ErrorKind, Result};
