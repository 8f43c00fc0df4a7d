//! [`SqliteStore`] and the content façade: entities, pieces and contlets.
//!
//! The other store traits are implemented in sibling modules on the same
//! type. Connection-level helpers shared by those modules live at the bottom
//! of this file and take a plain `&rusqlite::Connection` so they can run
//! inside any closure or transaction.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;

use tessera_core::{
  EntityId, Error, Result,
  content::{
    ContentPiece, Contlet, ContletBody, ContletSummary, NewContentPiece,
    PieceDetail, PieceUpdate,
  },
  store::{ContentFacade, EntityRegistry},
};

use crate::{
  composition::{ordered_in, place},
  encode::{
    ANY_VARIANT, CONTLET_COLUMNS, PIECE_COLUMNS, RawContletRow, RawPiece,
    contlet_joins, encode_dt, encode_status,
  },
  error::{Context as _, on_delete, on_write, reject},
  schema::SCHEMA,
  tagging::tags_in,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tessera content store backed by a single SQLite file.
///
/// Clones share the same background connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .context("open store")?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .context("open in-memory store")?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .context("init schema")
  }

  /// Whether the store holds no entities at all.
  pub async fn is_empty(&self) -> Result<bool> {
    self
      .conn
      .call(|conn| {
        let any: bool =
          conn.query_row("SELECT EXISTS (SELECT 1 FROM entity)", [], |r| r.get(0))?;
        Ok(!any)
      })
      .await
      .context("check empty")
  }
}

// ─── EntityRegistry impl ─────────────────────────────────────────────────────

impl EntityRegistry for SqliteStore {
  async fn allocate(&self) -> Result<EntityId> {
    self
      .conn
      .call(|conn| Ok(allocate_in(conn)?))
      .await
      .context("allocate entity")
  }

  async fn release(&self, id: EntityId) -> Result<()> {
    self
      .conn
      .call(move |conn| release_in(conn, id))
      .await
      .context(format!("release entity {id}"))?;
    debug!(%id, "released entity");
    Ok(())
  }

  async fn exists(&self, id: EntityId) -> Result<bool> {
    self
      .conn
      .call(move |conn| Ok(row_exists(conn, "entity", id)?))
      .await
      .context(format!("check entity {id}"))
  }
}

// ─── ContentFacade impl ──────────────────────────────────────────────────────

impl ContentFacade for SqliteStore {
  // ── Content pieces ────────────────────────────────────────────────────────

  async fn create_piece(&self, input: NewContentPiece) -> Result<ContentPiece> {
    let created_at = Utc::now();
    let at_str     = encode_dt(created_at);
    let status_str = encode_status(input.status);
    let class      = input.class.clone();
    let title      = input.title.clone();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = allocate_in(&tx)?;
        tx.execute(
          "INSERT INTO content_piece (id, class, title, created_at, status)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id.get(), class, title, at_str, status_str],
        )
        .map_err(|e| on_write(e, "content piece"))?;
        tx.commit()?;
        Ok(id)
      })
      .await
      .context("create piece")?;

    debug!(%id, "created content piece");
    Ok(ContentPiece {
      id,
      class: input.class,
      title: input.title,
      created_at,
      status: input.status,
    })
  }

  async fn get_piece(&self, id: EntityId) -> Result<ContentPiece> {
    self
      .conn
      .call(move |conn| piece_in(conn, id))
      .await
      .context(format!("get piece {id}"))?
      .into_piece()
  }

  async fn update_piece(
    &self,
    id: EntityId,
    update: PieceUpdate,
  ) -> Result<ContentPiece> {
    let status_str = encode_status(update.status);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx
          .execute(
            "UPDATE content_piece SET class = ?2, title = ?3, status = ?4
             WHERE id = ?1",
            rusqlite::params![id.get(), update.class, update.title, status_str],
          )
          .map_err(|e| on_write(e, "content piece"))?;
        if n == 0 {
          return Err(reject(Error::NotFound(format!("content piece {id}"))));
        }
        let raw = piece_in(&tx, id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await
      .context(format!("update piece {id}"))?;

    debug!(%id, "updated content piece");
    raw.into_piece()
  }

  async fn delete_piece(&self, id: EntityId) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "content_piece", id)? {
          return Err(reject(Error::NotFound(format!("content piece {id}"))));
        }
        release_in(conn, id)
      })
      .await
      .context(format!("delete piece {id}"))?;
    debug!(%id, "deleted content piece");
    Ok(())
  }

  async fn list_pieces(&self) -> Result<Vec<ContentPiece>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PIECE_COLUMNS} FROM content_piece ORDER BY id DESC"
        ))?;
        let rows = stmt
          .query_map([], RawPiece::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context("list pieces")?;

    raws.into_iter().map(RawPiece::into_piece).collect()
  }

  async fn get_full_piece(&self, id: EntityId) -> Result<PieceDetail> {
    let (raw, ordered, tags) = self
      .conn
      .call(move |conn| {
        let raw = piece_in(conn, id)?;
        let ordered = ordered_in(conn, id)?;
        let tags = tags_in(conn, id)?;
        Ok((raw, ordered, tags))
      })
      .await
      .context(format!("get full piece {id}"))?;

    Ok(PieceDetail {
      piece: raw.into_piece()?,
      contlets: place(ordered)?,
      tags,
    })
  }

  // ── Contlets ──────────────────────────────────────────────────────────────

  async fn create_contlet(&self, body: ContletBody) -> Result<Contlet> {
    body.validate()?;
    let stored = body.clone();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = allocate_in(&tx)?;
        insert_variant(&tx, id, &stored)?;
        tx.commit()?;
        Ok(id)
      })
      .await
      .context("create contlet")?;

    debug!(%id, variant = %body.variant(), "created contlet");
    Ok(Contlet { id, body })
  }

  async fn get_contlet(&self, id: EntityId) -> Result<Contlet> {
    self
      .conn
      .call(move |conn| contlet_in(conn, id))
      .await
      .context(format!("get contlet {id}"))
  }

  async fn update_contlet(&self, id: EntityId, body: ContletBody) -> Result<Contlet> {
    body.validate()?;
    let stored = body.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current = contlet_in(&tx, id)?;
        if current.body.variant() == stored.variant() {
          update_variant(&tx, id, &stored)?;
        } else {
          tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", current.body.variant().table()),
            [id.get()],
          )?;
          insert_variant(&tx, id, &stored)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .context(format!("update contlet {id}"))?;

    debug!(%id, variant = %body.variant(), "updated contlet");
    Ok(Contlet { id, body })
  }

  async fn delete_contlet(&self, id: EntityId) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        contlet_in(conn, id)?;
        release_in(conn, id)
      })
      .await
      .context(format!("delete contlet {id}"))?;
    debug!(%id, "deleted contlet");
    Ok(())
  }

  async fn list_contlets(&self) -> Result<Vec<ContletSummary>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT e.id, {CONTLET_COLUMNS} FROM entity e {}
           WHERE {ANY_VARIANT} ORDER BY e.id DESC",
          contlet_joins("e.id"),
        ))?;
        let rows = stmt
          .query_map([], |r| Ok((EntityId(r.get(0)?), RawContletRow::read(r, 1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context("list contlets")?;

    rows
      .into_iter()
      .map(|(id, raw)| {
        let contlet = raw.require(id)?;
        Ok(ContletSummary {
          id,
          variant: contlet.body.variant(),
          preview: contlet.body.preview().to_owned(),
        })
      })
      .collect()
  }
}

// ─── Connection helpers ──────────────────────────────────────────────────────

/// Insert a bare entity row and return its id.
pub(crate) fn allocate_in(conn: &rusqlite::Connection) -> rusqlite::Result<EntityId> {
  conn.execute("INSERT INTO entity DEFAULT VALUES", [])?;
  Ok(EntityId(conn.last_insert_rowid()))
}

pub(crate) fn release_in(
  conn: &rusqlite::Connection,
  id: EntityId,
) -> tokio_rusqlite::Result<()> {
  let n = conn
    .execute("DELETE FROM entity WHERE id = ?1", [id.get()])
    .map_err(|e| on_delete(e, id))?;
  if n == 0 {
    return Err(reject(Error::NotFound(format!("entity {id}"))));
  }
  Ok(())
}

/// Whether `table` holds a row keyed by `id`. `table` is always a literal.
pub(crate) fn row_exists(
  conn: &rusqlite::Connection,
  table: &'static str,
  id: EntityId,
) -> rusqlite::Result<bool> {
  conn.query_row(
    &format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = ?1)"),
    [id.get()],
    |r| r.get(0),
  )
}

fn piece_in(conn: &rusqlite::Connection, id: EntityId) -> tokio_rusqlite::Result<RawPiece> {
  conn
    .query_row(
      &format!("SELECT {PIECE_COLUMNS} FROM content_piece WHERE id = ?1"),
      [id.get()],
      RawPiece::read,
    )
    .optional()?
    .ok_or_else(|| reject(Error::NotFound(format!("content piece {id}"))))
}

/// Probe every variant table for `id`. `None` if the entity does not exist.
pub(crate) fn probe_contlet(
  conn: &rusqlite::Connection,
  id: EntityId,
) -> rusqlite::Result<Option<RawContletRow>> {
  conn
    .query_row(
      &format!(
        "SELECT {CONTLET_COLUMNS} FROM entity e {} WHERE e.id = ?1",
        contlet_joins("e.id"),
      ),
      [id.get()],
      |r| RawContletRow::read(r, 0),
    )
    .optional()
}

/// Resolve `id` to a contlet or fail with `NotFound`.
pub(crate) fn contlet_in(
  conn: &rusqlite::Connection,
  id: EntityId,
) -> tokio_rusqlite::Result<Contlet> {
  let resolved = match probe_contlet(conn, id)? {
    Some(raw) => raw.resolve(id).map_err(reject)?,
    None => None,
  };
  resolved.ok_or_else(|| reject(Error::NotFound(format!("contlet {id}"))))
}

fn insert_variant(
  conn: &rusqlite::Connection,
  id: EntityId,
  body: &ContletBody,
) -> tokio_rusqlite::Result<()> {
  let written = match body {
    ContletBody::Paragraph { text } => conn.execute(
      "INSERT INTO contlet_paragraph (id, text_content) VALUES (?1, ?2)",
      rusqlite::params![id.get(), text],
    ),
    ContletBody::Image { src, alt_text, width, height } => conn.execute(
      "INSERT INTO contlet_image (id, src, alt_text, width, height)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![id.get(), src, alt_text, width, height],
    ),
    ContletBody::Heading { text, level } => conn.execute(
      "INSERT INTO contlet_heading (id, text_content, level) VALUES (?1, ?2, ?3)",
      rusqlite::params![id.get(), text, level],
    ),
  };
  written.map_err(|e| on_write(e, "contlet"))?;
  Ok(())
}

fn update_variant(
  conn: &rusqlite::Connection,
  id: EntityId,
  body: &ContletBody,
) -> tokio_rusqlite::Result<()> {
  let written = match body {
    ContletBody::Paragraph { text } => conn.execute(
      "UPDATE contlet_paragraph SET text_content = ?2 WHERE id = ?1",
      rusqlite::params![id.get(), text],
    ),
    ContletBody::Image { src, alt_text, width, height } => conn.execute(
      "UPDATE contlet_image SET src = ?2, alt_text = ?3, width = ?4, height = ?5
       WHERE id = ?1",
      rusqlite::params![id.get(), src, alt_text, width, height],
    ),
    ContletBody::Heading { text, level } => conn.execute(
      "UPDATE contlet_heading SET text_content = ?2, level = ?3 WHERE id = ?1",
      rusqlite::params![id.get(), text, level],
    ),
  };
  written.map_err(|e| on_write(e, "contlet"))?;
  Ok(())
}
