//! Sparse sort-key arithmetic for ordering contlets inside a content piece.
//!
//! Keys are spaced by [`SORT_KEY_STEP`] so a contlet can be slotted between
//! two neighbours without renumbering siblings. When two neighbours are
//! adjacent integers there is no room left; that is reported, never compacted
//! behind the caller's back.

use serde::Deserialize;

use crate::{Error, Result};

/// Gap between consecutive keys assigned by [`Placement::Append`].
pub const SORT_KEY_STEP: i64 = 100;

/// Where to put a contlet when attaching it to a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "mode", content = "sort_key", rename_all = "snake_case")]
pub enum Placement {
  /// After the current last contlet.
  #[default]
  Append,
  /// At an explicit key; fails if the key is already taken.
  At(i64),
  /// Halfway between the given key and the next larger one.
  After(i64),
}

impl Placement {
  /// Compute the concrete key given the piece's current keys in ascending
  /// order. The caller excludes the key of the contlet being moved, if any.
  pub fn resolve(self, keys: &[i64]) -> Result<i64> {
    match self {
      Placement::Append => match keys.last() {
        Some(max) => step_after(*max),
        None => Ok(SORT_KEY_STEP),
      },
      Placement::At(key) => {
        if keys.binary_search(&key).is_ok() {
          Err(Error::Conflict(format!("sort key {key} is already taken")))
        } else {
          Ok(key)
        }
      }
      Placement::After(key) => match keys.iter().find(|k| **k > key) {
        None => step_after(key),
        Some(&next) => {
          // Widened so extreme keys cannot overflow the subtraction.
          let gap = i128::from(next) - i128::from(key);
          if gap < 2 {
            return Err(Error::InvalidArgument(format!(
              "no room between sort keys {key} and {next}"
            )));
          }
          let mid = i128::from(key) + gap / 2;
          i64::try_from(mid).map_err(|_| {
            Error::InvalidArgument(format!("sort key overflow after {key}"))
          })
        }
      },
    }
  }
}

fn step_after(key: i64) -> Result<i64> {
  key.checked_add(SORT_KEY_STEP).ok_or_else(|| {
    Error::InvalidArgument(format!("sort key overflow after {key}"))
  })
}
