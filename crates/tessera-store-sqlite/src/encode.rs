//! Encoding and decoding helpers between Rust domain types and the values
//! stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and statuses as their snake_case
//! names. Contlet variant probing lives here and nowhere else: one row of
//! [`CONTLET_COLUMNS`] carries every variant table's columns side by side and
//! [`RawContletRow::resolve`] turns it into the [`Contlet`] sum type.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use tessera_core::{
  EntityId, Error, Result,
  content::{ContentPiece, Contlet, ContletBody, PieceStatus},
};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::IntegrityViolation(format!("bad timestamp {s:?}: {e}")))
}

// ─── PieceStatus ─────────────────────────────────────────────────────────────

pub fn encode_status(s: PieceStatus) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<PieceStatus> {
  s.parse()
    .map_err(|_| Error::IntegrityViolation(format!("unknown piece status {s:?}")))
}

// ─── Content pieces ──────────────────────────────────────────────────────────

pub const PIECE_COLUMNS: &str = "id, class, title, created_at, status";

/// Raw row from `content_piece` before decoding.
pub struct RawPiece {
  pub id:         i64,
  pub class:      String,
  pub title:      String,
  pub created_at: String,
  pub status:     String,
}

impl RawPiece {
  /// Read the columns of [`PIECE_COLUMNS`].
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      class:      row.get(1)?,
      title:      row.get(2)?,
      created_at: row.get(3)?,
      status:     row.get(4)?,
    })
  }

  pub fn into_piece(self) -> Result<ContentPiece> {
    Ok(ContentPiece {
      id:         EntityId(self.id),
      class:      self.class,
      title:      self.title,
      created_at: decode_dt(&self.created_at)?,
      status:     decode_status(&self.status)?,
    })
  }
}

// ─── Contlets ────────────────────────────────────────────────────────────────

/// Every variant table's columns, in the order [`RawContletRow::read`]
/// expects them. Use with [`contlet_joins`].
pub const CONTLET_COLUMNS: &str = "cp.id, cp.text_content, \
   ci.id, ci.src, ci.alt_text, ci.width, ci.height, \
   ch.id, ch.text_content, ch.level";

/// LEFT JOIN every variant table on `key`, an id expression of the outer query.
pub fn contlet_joins(key: &str) -> String {
  format!(
    "LEFT JOIN contlet_paragraph cp ON cp.id = {key} \
     LEFT JOIN contlet_image ci ON ci.id = {key} \
     LEFT JOIN contlet_heading ch ON ch.id = {key}"
  )
}

/// Condition matching rows where at least one variant joined.
pub const ANY_VARIANT: &str =
  "(cp.id IS NOT NULL OR ci.id IS NOT NULL OR ch.id IS NOT NULL)";

/// One probe row: each variant is present when its table joined.
pub struct RawContletRow {
  paragraph: Option<ContletBody>,
  image:     Option<ContletBody>,
  heading:   Option<ContletBody>,
}

impl RawContletRow {
  /// Read the [`CONTLET_COLUMNS`] starting at column `offset`.
  pub fn read(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    let at = |i: usize| offset + i;

    let paragraph = match row.get::<_, Option<i64>>(at(0))? {
      Some(_) => Some(ContletBody::Paragraph { text: row.get(at(1))? }),
      None => None,
    };
    let image = match row.get::<_, Option<i64>>(at(2))? {
      Some(_) => Some(ContletBody::Image {
        src:      row.get(at(3))?,
        alt_text: row.get(at(4))?,
        width:    row.get(at(5))?,
        height:   row.get(at(6))?,
      }),
      None => None,
    };
    let heading = match row.get::<_, Option<i64>>(at(7))? {
      Some(_) => Some(ContletBody::Heading {
        text:  row.get(at(8))?,
        level: row.get(at(9))?,
      }),
      None => None,
    };

    Ok(Self { paragraph, image, heading })
  }

  /// `None` when no variant table holds `id`; an integrity violation when
  /// more than one does.
  pub fn resolve(self, id: EntityId) -> Result<Option<Contlet>> {
    let mut bodies = [self.paragraph, self.image, self.heading]
      .into_iter()
      .flatten();
    let Some(body) = bodies.next() else {
      return Ok(None);
    };
    if bodies.next().is_some() {
      tracing::warn!(%id, "contlet has rows in more than one variant table");
      return Err(Error::IntegrityViolation(format!(
        "contlet {id} has rows in more than one variant table"
      )));
    }
    Ok(Some(Contlet { id, body }))
  }

  /// Like [`resolve`](Self::resolve) for an id that must be a contlet.
  pub fn require(self, id: EntityId) -> Result<Contlet> {
    self.resolve(id)?.ok_or_else(|| {
      tracing::warn!(%id, "composed contlet has no variant row");
      Error::IntegrityViolation(format!("contlet {id} has no variant row"))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_round_trip_through_rfc3339() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
    assert!(decode_dt("yesterday").is_err());
  }

  #[test]
  fn statuses_use_snake_case_names() {
    assert_eq!(encode_status(PieceStatus::Published), "published");
    assert_eq!(decode_status("archived").unwrap(), PieceStatus::Archived);
    assert!(decode_status("gone").is_err());
  }

  #[test]
  fn resolve_rejects_overlapping_variants() {
    let raw = RawContletRow {
      paragraph: Some(ContletBody::Paragraph { text: "p".into() }),
      image:     None,
      heading:   Some(ContletBody::Heading { text: "h".into(), level: 2 }),
    };
    assert!(raw.resolve(EntityId(1)).is_err());

    let empty = RawContletRow { paragraph: None, image: None, heading: None };
    assert!(empty.resolve(EntityId(1)).unwrap().is_none());
  }
}
