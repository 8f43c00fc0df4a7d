//! Controlled vocabulary: taxonomies and the tags grouped under them.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// A named grouping of tags. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
  pub id:          EntityId,
  pub name:        String,
  pub description: Option<String>,
}

/// A value scoped to exactly one taxonomy; `(taxonomy_id, value)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
  pub id:          EntityId,
  pub taxonomy_id: EntityId,
  pub value:       String,
}

/// A tag joined with the name of its taxonomy, for browse and filter views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagListing {
  #[serde(flatten)]
  pub tag:           Tag,
  pub taxonomy_name: String,
}
