//! Typed, directed relationships between entities.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, entity::EntityId};

/// A relationship-type vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkClass {
  pub name:           String,
  pub description:    Option<String>,
  /// The type of the reverse edge, e.g. `child_of` for `parent_of`, or the
  /// class itself for symmetric types such as `related_to`.
  pub symmetric_link: Option<String>,
}

/// Input to [`crate::store::RelationshipGraph::link`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewLink {
  pub subject:    EntityId,
  pub link_type:  String,
  pub object:     EntityId,
  /// Provenance, e.g. the importer or person who asserted the edge.
  pub source:     Option<String>,
  /// Between 0.0 and 1.0 inclusive.
  pub confidence: Option<f64>,
}

impl NewLink {
  pub fn new(
    subject: EntityId,
    link_type: impl Into<String>,
    object: EntityId,
  ) -> Self {
    Self {
      subject,
      link_type: link_type.into(),
      object,
      source: None,
      confidence: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if let Some(c) = self.confidence
      && !(0.0..=1.0).contains(&c)
    {
      return Err(Error::InvalidArgument(format!(
        "confidence must be within [0.0, 1.0], got {c}"
      )));
    }
    if self.link_type.is_empty() {
      return Err(Error::InvalidArgument("link type must not be empty".into()));
    }
    Ok(())
  }
}

/// Which edges to follow from the queried entity.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
  /// Edges where the entity is the subject.
  Outgoing,
  /// Edges where the entity is the object.
  Incoming,
  #[default]
  Both,
}

/// One edge seen from the queried entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
  pub relationship_id: i64,
  pub other:           EntityId,
  pub link_type:       String,
  /// `Outgoing` or `Incoming`, relative to the queried entity.
  pub direction:       Direction,
  /// The link class's declared counterpart, if any.
  pub counterpart:     Option<String>,
  pub source:          Option<String>,
  pub confidence:      Option<f64>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  #[test]
  fn confidence_bounds_are_inclusive() {
    let mut link = NewLink::new(EntityId(1), "related_to", EntityId(2));
    link.confidence = Some(1.0);
    assert!(link.validate().is_ok());
    link.confidence = Some(0.0);
    assert!(link.validate().is_ok());
  }

  #[test]
  fn confidence_out_of_range_or_nan_is_rejected() {
    let mut link = NewLink::new(EntityId(1), "related_to", EntityId(2));
    for bad in [1.5, -0.1, f64::NAN] {
      link.confidence = Some(bad);
      assert_eq!(link.validate().unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
  }
}
