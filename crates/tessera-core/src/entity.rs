//! Entity identity: the single namespace every object shares.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Globally unique, strictly increasing object identifier.
///
/// Ids are allocated by the store together with the object's class row and
/// are never reused, even after the entity is released.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
  pub fn get(self) -> i64 { self.0 }
}

impl fmt::Display for EntityId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<i64> for EntityId {
  fn from(id: i64) -> Self { Self(id) }
}

impl FromStr for EntityId {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { s.parse().map(Self) }
}
