//! [`SchemaEvolution`] for [`SqliteStore`]: schema introspection and the
//! Execute stage of a column change.
//!
//! Validate and Translate run before the connection is touched. Compose runs
//! on the connection so default literals are quoted by SQLite itself. Execute
//! rebuilds the table (see [`crate::rebuild`]) in one transaction with foreign
//! key enforcement suspended, then verifies every reference before committing.

use std::collections::HashMap;

use tracing::{info, warn};

use tessera_core::{
  Error, Result,
  schema::{
    self, AlterPlan, ColumnChange, ColumnDetail, KeyRole, LiteralQuoter, TableSchema,
  },
  store::SchemaEvolution,
};

use crate::{
  SqliteStore,
  error::{Context as _, reject},
  rebuild::rebuild_script,
  records::class_table_in,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Quotes literals with SQLite's own `quote()` function.
struct ConnQuoter<'c>(&'c rusqlite::Connection);

impl LiteralQuoter for ConnQuoter<'_> {
  fn quote_literal(&self, value: &str) -> Result<String> {
    self
      .0
      .query_row("SELECT quote(?1)", [value], |r| r.get(0))
      .map_err(|e| Error::store("quote literal", e))
  }
}

// ─── Introspection ───────────────────────────────────────────────────────────

struct RawColumn {
  name:     String,
  declared: String,
  not_null: bool,
  default:  Option<String>,
  pk:       i64,
}

/// Columns of `table` with their key roles.
fn describe_table(
  conn: &rusqlite::Connection,
  table: &str,
  sql: &str,
) -> rusqlite::Result<Vec<ColumnDetail>> {
  let columns = {
    let mut stmt = conn.prepare(
      "SELECT name, type, \"notnull\", dflt_value, pk
       FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    stmt
      .query_map([table], |r| {
        Ok(RawColumn {
          name:     r.get(0)?,
          declared: r.get(1)?,
          not_null: r.get(2)?,
          default:  r.get(3)?,
          pk:       r.get(4)?,
        })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  // Roles from indexes: sole column of a unique index is UNI, leading column
  // of any other index is MUL.
  let mut roles: HashMap<String, KeyRole> = HashMap::new();
  let indexes = {
    let mut stmt =
      conn.prepare("SELECT name, \"unique\" FROM pragma_index_list(?1) ORDER BY seq")?;
    stmt
      .query_map([table], |r| Ok((r.get::<_, String>(0)?, r.get::<_, bool>(1)?)))?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };
  for (index, unique) in indexes {
    let mut stmt =
      conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
    let cols = stmt
      .query_map([&index], |r| r.get::<_, Option<String>>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    let Some(Some(first)) = cols.first() else { continue };
    let role = if unique && cols.len() == 1 { KeyRole::Unique } else { KeyRole::Multiple };
    let entry = roles.entry(first.to_ascii_lowercase()).or_insert(role);
    if role == KeyRole::Unique {
      *entry = KeyRole::Unique;
    }
  }
  let mut stmt = conn.prepare("SELECT \"from\" FROM pragma_foreign_key_list(?1)")?;
  let fk_columns = stmt
    .query_map([table], |r| r.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  for column in fk_columns {
    roles.entry(column.to_ascii_lowercase()).or_insert(KeyRole::Multiple);
  }

  let autoincrement = sql.to_ascii_uppercase().contains("AUTOINCREMENT");
  Ok(
    columns
      .into_iter()
      .map(|c| {
        let key = if c.pk > 0 {
          KeyRole::Primary
        } else {
          roles.get(&c.name.to_ascii_lowercase()).copied().unwrap_or(KeyRole::None)
        };
        let extra = if c.pk > 0 && autoincrement { "AUTOINCREMENT" } else { "" };
        ColumnDetail {
          nullable: !c.not_null && c.pk == 0,
          field: c.name,
          column_type: c.declared,
          key,
          default: c.default,
          extra: extra.to_owned(),
        }
      })
      .collect(),
  )
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// Run `script` in one transaction and check references before committing.
fn run_rebuild(conn: &mut rusqlite::Connection, script: &str) -> Result<(), BoxError> {
  let tx = conn.transaction()?;
  tx.execute_batch(script)?;
  let violations: i64 =
    tx.query_row("SELECT count(*) FROM pragma_foreign_key_check", [], |r| r.get(0))?;
  if violations > 0 {
    return Err(format!("{violations} foreign key violation(s) after rebuild").into());
  }
  tx.commit()?;
  Ok(())
}

impl SchemaEvolution for SqliteStore {
  async fn schema_details(&self) -> Result<Vec<TableSchema>> {
    self
      .conn
      .call(|conn| {
        let tables = {
          let mut stmt = conn.prepare(
            "SELECT name, sql FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
             ORDER BY name",
          )?;
          stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let mut schemas = Vec::with_capacity(tables.len());
        for (table, sql) in tables {
          let columns = describe_table(conn, &table, &sql)?;
          schemas.push(TableSchema { table, columns });
        }
        Ok(schemas)
      })
      .await
      .context("schema details")
  }

  async fn apply_schema_change(
    &self,
    table: String,
    changes: Vec<ColumnChange>,
  ) -> Result<AlterPlan> {
    let translated = schema::translate(schema::validate(&table, &changes)?)?;
    if translated.is_empty() {
      return Ok(AlterPlan { table, clauses: Vec::new() });
    }

    let plan = self
      .conn
      .call(move |conn| {
        let canonical = class_table_in(conn, &table)?;
        let plan = schema::compose(&canonical, translated, &ConnQuoter(conn))
          .map_err(reject)?;

        let create_sql: String = conn.query_row(
          "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
          [&canonical],
          |r| r.get(0),
        )?;
        let dependents = {
          let mut stmt = conn.prepare(
            "SELECT sql FROM sqlite_master
             WHERE tbl_name = ?1 AND type IN ('index', 'trigger') AND sql IS NOT NULL
             ORDER BY rowid",
          )?;
          stmt
            .query_map([&canonical], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let script = rebuild_script(&create_sql, &plan, &dependents).map_err(reject)?;

        info!(table = %canonical, columns = plan.clauses.len(), "rebuilding table");
        conn.execute_batch("PRAGMA foreign_keys = OFF")?;
        let outcome = run_rebuild(conn, &script);
        conn.execute_batch("PRAGMA foreign_keys = ON")?;

        if let Err(source) = outcome {
          warn!(table = %canonical, error = %source, "schema change failed");
          return Err(reject(Error::AlterFailed {
            table: canonical,
            statement: script,
            source,
          }));
        }
        Ok(plan)
      })
      .await
      .context("apply schema change")?;

    info!(table = %plan.table, "schema change applied");
    Ok(plan)
  }
}
