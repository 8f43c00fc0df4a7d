//! [`TaggingIndex`] for [`SqliteStore`]: taxonomies, tags and associations.

use tracing::debug;

use tessera_core::{
  EntityId, Error, Result,
  store::TaggingIndex,
  taxonomy::{Tag, TagListing, Taxonomy},
};

use crate::{
  SqliteStore,
  error::{Context as _, on_write, reject},
  store::{allocate_in, row_exists},
};

fn read_tag(r: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
  Ok(Tag {
    id:          EntityId(r.get(0)?),
    taxonomy_id: EntityId(r.get(1)?),
    value:       r.get(2)?,
  })
}

/// Tags attached to `entity`, ordered by taxonomy name then value.
pub(crate) fn tags_in(
  conn: &rusqlite::Connection,
  entity: EntityId,
) -> rusqlite::Result<Vec<Tag>> {
  let mut stmt = conn.prepare(
    "SELECT t.id, t.taxonomy_id, t.value
     FROM entity_tags et
     JOIN tag t      ON t.id = et.tag_id
     JOIN taxonomy x ON x.id = t.taxonomy_id
     WHERE et.entity_id = ?1
     ORDER BY x.name, t.value",
  )?;
  let tags = stmt
    .query_map([entity.get()], read_tag)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(tags)
}

impl TaggingIndex for SqliteStore {
  async fn create_taxonomy(
    &self,
    name: String,
    description: Option<String>,
  ) -> Result<Taxonomy> {
    let (n, d) = (name.clone(), description.clone());
    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id = allocate_in(&tx)?;
        tx.execute(
          "INSERT INTO taxonomy (id, name, description) VALUES (?1, ?2, ?3)",
          rusqlite::params![id.get(), n, d],
        )
        .map_err(|e| on_write(e, &format!("taxonomy {n:?}")))?;
        tx.commit()?;
        Ok(id)
      })
      .await
      .context("create taxonomy")?;

    debug!(%id, %name, "created taxonomy");
    Ok(Taxonomy { id, name, description })
  }

  async fn list_taxonomies(&self) -> Result<Vec<Taxonomy>> {
    self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, name, description FROM taxonomy ORDER BY name")?;
        let rows = stmt
          .query_map([], |r| {
            Ok(Taxonomy {
              id:          EntityId(r.get(0)?),
              name:        r.get(1)?,
              description: r.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context("list taxonomies")
  }

  async fn create_tag(&self, taxonomy: EntityId, value: String) -> Result<Tag> {
    let v = value.clone();
    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, "taxonomy", taxonomy)? {
          return Err(reject(Error::NotFound(format!("taxonomy {taxonomy}"))));
        }
        let id = allocate_in(&tx)?;
        tx.execute(
          "INSERT INTO tag (id, taxonomy_id, value) VALUES (?1, ?2, ?3)",
          rusqlite::params![id.get(), taxonomy.get(), v],
        )
        .map_err(|e| on_write(e, &format!("tag {v:?} in taxonomy {taxonomy}")))?;
        tx.commit()?;
        Ok(id)
      })
      .await
      .context("create tag")?;

    debug!(%id, %taxonomy, %value, "created tag");
    Ok(Tag { id, taxonomy_id: taxonomy, value })
  }

  async fn tag(&self, entity: EntityId, tag: EntityId) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "tag", tag)? {
          return Err(reject(Error::NotFound(format!("tag {tag}"))));
        }
        conn
          .execute(
            "INSERT OR IGNORE INTO entity_tags (entity_id, tag_id) VALUES (?1, ?2)",
            [entity.get(), tag.get()],
          )
          .map_err(|e| on_write(e, &format!("tag of entity {entity}")))?;
        Ok(())
      })
      .await
      .context(format!("tag entity {entity}"))?;

    debug!(%entity, %tag, "tagged entity");
    Ok(())
  }

  async fn untag(&self, entity: EntityId, tag: EntityId) -> Result<bool> {
    self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM entity_tags WHERE entity_id = ?1 AND tag_id = ?2",
          [entity.get(), tag.get()],
        )?;
        Ok(n > 0)
      })
      .await
      .context(format!("untag entity {entity}"))
  }

  async fn tags_of(&self, entity: EntityId) -> Result<Vec<Tag>> {
    self
      .conn
      .call(move |conn| Ok(tags_in(conn, entity)?))
      .await
      .context(format!("tags of entity {entity}"))
  }

  async fn list_all_tags(&self) -> Result<Vec<TagListing>> {
    self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT t.id, t.taxonomy_id, t.value, x.name
           FROM tag t JOIN taxonomy x ON x.id = t.taxonomy_id
           ORDER BY x.name, t.value",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(TagListing { tag: read_tag(r)?, taxonomy_name: r.get(3)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context("list tags")
  }

  async fn tagged_with(&self, tag: EntityId) -> Result<Vec<EntityId>> {
    self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "tag", tag)? {
          return Err(reject(Error::NotFound(format!("tag {tag}"))));
        }
        let mut stmt = conn.prepare(
          "SELECT entity_id FROM entity_tags WHERE tag_id = ?1 ORDER BY entity_id",
        )?;
        let ids = stmt
          .query_map([tag.get()], |r| Ok(EntityId(r.get(0)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
      })
      .await
      .context(format!("entities tagged with {tag}"))
  }
}
