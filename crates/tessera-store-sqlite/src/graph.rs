//! [`RelationshipGraph`] for [`SqliteStore`]: link classes and typed edges.

use rusqlite::OptionalExtension as _;
use tracing::debug;

use tessera_core::{
  EntityId, Error, Result,
  graph::{Direction, LinkClass, Neighbor, NewLink},
  store::RelationshipGraph,
};

use crate::{
  SqliteStore,
  error::{Context as _, on_write, reject},
  store::row_exists,
};

const OUTGOING: &str = "
  SELECT r.id, r.object_id, r.link_type, 'outgoing', lc.symmetric_link, r.source, r.confidence
  FROM entity_relationships r JOIN link_class lc ON lc.name = r.link_type
  WHERE r.subject_id = ?1 AND (?2 IS NULL OR r.link_type = ?2)";

const INCOMING: &str = "
  SELECT r.id, r.subject_id, r.link_type, 'incoming', lc.symmetric_link, r.source, r.confidence
  FROM entity_relationships r JOIN link_class lc ON lc.name = r.link_type
  WHERE r.object_id = ?1 AND (?2 IS NULL OR r.link_type = ?2)";

impl RelationshipGraph for SqliteStore {
  async fn define_link_class(&self, class: LinkClass) -> Result<LinkClass> {
    if class.name.is_empty() {
      return Err(Error::InvalidArgument("link class name must not be empty".into()));
    }
    let stored = class.clone();

    self
      .conn
      .call(move |conn| {
        if let Some(counterpart) = &stored.symmetric_link
          && *counterpart != stored.name
        {
          let known = conn
            .query_row(
              "SELECT 1 FROM link_class WHERE name = ?1",
              [counterpart],
              |_| Ok(()),
            )
            .optional()?;
          if known.is_none() {
            return Err(reject(Error::NotFound(format!(
              "link class {counterpart:?}"
            ))));
          }
        }
        conn
          .execute(
            "INSERT INTO link_class (name, description, symmetric_link)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![stored.name, stored.description, stored.symmetric_link],
          )
          .map_err(|e| on_write(e, &format!("link class {:?}", stored.name)))?;
        Ok(())
      })
      .await
      .context("define link class")?;

    debug!(name = %class.name, "defined link class");
    Ok(class)
  }

  async fn list_link_classes(&self) -> Result<Vec<LinkClass>> {
    self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT name, description, symmetric_link FROM link_class ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(LinkClass {
              name:           r.get(0)?,
              description:    r.get(1)?,
              symmetric_link: r.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context("list link classes")
  }

  async fn link(&self, link: NewLink) -> Result<i64> {
    link.validate()?;
    let NewLink { subject, link_type, object, source, confidence } = link;

    let id = self
      .conn
      .call(move |conn| {
        conn
          .execute(
            "INSERT INTO entity_relationships
               (subject_id, link_type, object_id, source, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![subject.get(), link_type, object.get(), source, confidence],
          )
          .map_err(|e| {
            on_write(e, &format!("relationship {subject} {link_type} {object}"))
          })?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .context("link entities")?;

    debug!(id, %subject, %object, "linked entities");
    Ok(id)
  }

  async fn unlink(
    &self,
    subject: EntityId,
    link_type: String,
    object: EntityId,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM entity_relationships
           WHERE subject_id = ?1 AND link_type = ?2 AND object_id = ?3",
          rusqlite::params![subject.get(), link_type, object.get()],
        )?;
        if n == 0 {
          return Err(reject(Error::NotFound(format!(
            "relationship {subject} {link_type} {object}"
          ))));
        }
        Ok(())
      })
      .await
      .context("unlink entities")?;

    debug!(%subject, %object, "unlinked entities");
    Ok(())
  }

  async fn neighbors(
    &self,
    entity: EntityId,
    direction: Direction,
    link_type: Option<String>,
  ) -> Result<Vec<Neighbor>> {
    let sql = match direction {
      Direction::Outgoing => format!("{OUTGOING} ORDER BY 1"),
      Direction::Incoming => format!("{INCOMING} ORDER BY 1"),
      // A self-loop is already in the outgoing half.
      Direction::Both => {
        format!("{OUTGOING} UNION ALL {INCOMING} AND r.subject_id != r.object_id ORDER BY 1")
      }
    };

    let rows = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "entity", entity)? {
          return Err(reject(Error::NotFound(format!("entity {entity}"))));
        }
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![entity.get(), link_type], |r| {
            Ok((
              r.get::<_, i64>(0)?,
              EntityId(r.get(1)?),
              r.get::<_, String>(2)?,
              r.get::<_, String>(3)?,
              r.get::<_, Option<String>>(4)?,
              r.get::<_, Option<String>>(5)?,
              r.get::<_, Option<f64>>(6)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context(format!("neighbors of entity {entity}"))?;

    rows
      .into_iter()
      .map(|(relationship_id, other, link_type, dir, counterpart, source, confidence)| {
        let direction = dir.parse().map_err(|_| {
          Error::IntegrityViolation(format!("unexpected direction {dir:?}"))
        })?;
        Ok(Neighbor {
          relationship_id,
          other,
          link_type,
          direction,
          counterpart,
          source,
          confidence,
        })
      })
      .collect()
  }
}
