//! [`CompositionIndex`] for [`SqliteStore`]: ordered contlets inside pieces.

use tracing::debug;

use tessera_core::{
  EntityId, Error, Result,
  composition::Placement,
  content::PlacedContlet,
  store::CompositionIndex,
};

use crate::{
  SqliteStore,
  encode::{CONTLET_COLUMNS, RawContletRow, contlet_joins},
  error::{Context as _, on_write, reject},
  store::{contlet_in, row_exists},
};

/// One composition edge with its probed contlet, not yet resolved.
pub(crate) type OrderedRow = (i64, EntityId, RawContletRow);

/// The edges of `piece` in ascending sort-key order.
pub(crate) fn ordered_in(
  conn: &rusqlite::Connection,
  piece: EntityId,
) -> rusqlite::Result<Vec<OrderedRow>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT pc.sort_order, pc.contlet_id, {CONTLET_COLUMNS}
     FROM content_piece_contlets pc {}
     WHERE pc.content_piece_id = ?1
     ORDER BY pc.sort_order",
    contlet_joins("pc.contlet_id"),
  ))?;
  let rows = stmt
    .query_map([piece.get()], |r| {
      Ok((r.get(0)?, EntityId(r.get(1)?), RawContletRow::read(r, 2)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Resolve every edge; a composed id without exactly one variant is an
/// integrity violation.
pub(crate) fn place(rows: Vec<OrderedRow>) -> Result<Vec<PlacedContlet>> {
  rows
    .into_iter()
    .map(|(sort_key, id, raw)| Ok(PlacedContlet { sort_key, contlet: raw.require(id)? }))
    .collect()
}

impl CompositionIndex for SqliteStore {
  async fn attach(
    &self,
    piece: EntityId,
    contlet: EntityId,
    placement: Placement,
  ) -> Result<i64> {
    let key = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, "content_piece", piece)? {
          return Err(reject(Error::NotFound(format!("content piece {piece}"))));
        }
        contlet_in(&tx, contlet)?;

        // Keys of every other contlet; a re-attached contlet gives up its own.
        let keys = {
          let mut stmt = tx.prepare(
            "SELECT sort_order FROM content_piece_contlets
             WHERE content_piece_id = ?1 AND contlet_id != ?2
             ORDER BY sort_order",
          )?;
          stmt
            .query_map([piece.get(), contlet.get()], |r| r.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let key = placement.resolve(&keys).map_err(reject)?;

        tx.execute(
          "DELETE FROM content_piece_contlets
           WHERE content_piece_id = ?1 AND contlet_id = ?2",
          [piece.get(), contlet.get()],
        )?;
        tx.execute(
          "INSERT INTO content_piece_contlets (content_piece_id, contlet_id, sort_order)
           VALUES (?1, ?2, ?3)",
          [piece.get(), contlet.get(), key],
        )
        .map_err(|e| on_write(e, "composition edge"))?;
        tx.commit()?;
        Ok(key)
      })
      .await
      .context(format!("attach contlet {contlet} to piece {piece}"))?;

    debug!(%piece, %contlet, key, "attached contlet");
    Ok(key)
  }

  async fn detach(&self, piece: EntityId, contlet: EntityId) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM content_piece_contlets
           WHERE content_piece_id = ?1 AND contlet_id = ?2",
          [piece.get(), contlet.get()],
        )?;
        if n == 0 {
          return Err(reject(Error::NotFound(format!(
            "contlet {contlet} is not attached to piece {piece}"
          ))));
        }
        Ok(())
      })
      .await
      .context(format!("detach contlet {contlet} from piece {piece}"))?;

    debug!(%piece, %contlet, "detached contlet");
    Ok(())
  }

  async fn list_ordered(&self, piece: EntityId) -> Result<Vec<PlacedContlet>> {
    let rows = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "content_piece", piece)? {
          return Err(reject(Error::NotFound(format!("content piece {piece}"))));
        }
        Ok(ordered_in(conn, piece)?)
      })
      .await
      .context(format!("list contlets of piece {piece}"))?;

    place(rows)
  }
}
