//! [`ClassTableStore`] for [`SqliteStore`]: untyped rows of any class table.
//!
//! Table and column names are checked against the identifier grammar and
//! against the live schema before they are spliced into SQL; values are
//! always bound.

use rusqlite::{
  OptionalExtension as _,
  types::{Value as SqlValue, ValueRef},
};
use serde_json::{Map, Number, Value};
use tracing::debug;

use tessera_core::{
  EntityId, Error, Result,
  schema::{quote_identifier, validate_identifier},
  store::{ClassRecord, ClassTableStore},
};

use crate::{
  SqliteStore,
  error::{Context as _, on_write, reject},
  store::allocate_in,
};

// ─── Value mapping ───────────────────────────────────────────────────────────

fn to_sql(column: &str, value: Value) -> Result<SqlValue> {
  Ok(match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().ok_or_else(|| {
        Error::InvalidArgument(format!("column {column:?}: number out of range"))
      })?),
    },
    Value::String(s) => SqlValue::Text(s),
    Value::Array(_) | Value::Object(_) => {
      return Err(Error::InvalidArgument(format!(
        "column {column:?}: nested values cannot be stored"
      )));
    }
  })
}

fn to_json(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::from(i),
    ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
    ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    ValueRef::Blob(b) => Value::from(b.to_vec()),
  }
}

/// Validate every key of `fields` and convert the values, keeping order.
fn prepare_fields(fields: ClassRecord) -> Result<Vec<(String, SqlValue)>> {
  fields
    .into_iter()
    .map(|(column, value)| {
      validate_identifier(&column)?;
      if column.eq_ignore_ascii_case("id") {
        return Err(Error::InvalidArgument("the id column is assigned by the store".into()));
      }
      let value = to_sql(&column, value)?;
      Ok((column, value))
    })
    .collect()
}

// ─── Schema lookups ──────────────────────────────────────────────────────────

/// The stored name of `table`, matched case-insensitively.
pub(crate) fn canonical_table(
  conn: &rusqlite::Connection,
  table: &str,
) -> tokio_rusqlite::Result<String> {
  conn
    .query_row(
      "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
      [table],
      |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| reject(Error::NotFound(format!("table {table}"))))
}

/// Resolve `table` to a class table: one whose `id` references `entity`.
pub(crate) fn class_table_in(
  conn: &rusqlite::Connection,
  table: &str,
) -> tokio_rusqlite::Result<String> {
  let name = canonical_table(conn, table)?;
  let is_class: bool = conn.query_row(
    "SELECT EXISTS (
       SELECT 1 FROM pragma_foreign_key_list(?1)
       WHERE \"table\" = 'entity' COLLATE NOCASE AND \"from\" = 'id' COLLATE NOCASE
     )",
    [&name],
    |r| r.get(0),
  )?;
  if !is_class {
    return Err(reject(Error::InvalidArgument(format!(
      "{name} is not a class table"
    ))));
  }
  Ok(name)
}

/// Column names of `table` in declared order.
pub(crate) fn columns_in(
  conn: &rusqlite::Connection,
  table: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
  let names = stmt
    .query_map([table], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(names)
}

fn check_columns(
  table: &str,
  known: &[String],
  fields: &[(String, SqlValue)],
) -> tokio_rusqlite::Result<()> {
  for (column, _) in fields {
    if !known.iter().any(|k| k.eq_ignore_ascii_case(column)) {
      return Err(reject(Error::InvalidArgument(format!(
        "{table} has no column {column:?}"
      ))));
    }
  }
  Ok(())
}

// ─── ClassTableStore impl ────────────────────────────────────────────────────

impl ClassTableStore for SqliteStore {
  async fn create_record(&self, class: String, fields: ClassRecord) -> Result<EntityId> {
    validate_identifier(&class)?;
    let fields = prepare_fields(fields)?;

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let table = class_table_in(&tx, &class)?;
        check_columns(&table, &columns_in(&tx, &table)?, &fields)?;
        let id = allocate_in(&tx)?;

        let mut columns = vec!["\"id\"".to_owned()];
        let mut values = vec![SqlValue::Integer(id.get())];
        for (column, value) in fields {
          columns.push(quote_identifier(&column).map_err(reject)?);
          values.push(value);
        }
        let placeholders = (1..=values.len())
          .map(|i| format!("?{i}"))
          .collect::<Vec<_>>()
          .join(", ");
        let sql = format!(
          "INSERT INTO \"{table}\" ({}) VALUES ({placeholders})",
          columns.join(", "),
        );
        tx.execute(&sql, rusqlite::params_from_iter(values))
          .map_err(|e| on_write(e, &format!("{table} row")))?;
        tx.commit()?;
        Ok(id)
      })
      .await
      .context("create record")?;

    debug!(%id, "created class record");
    Ok(id)
  }

  async fn read_record(&self, class: String, id: EntityId) -> Result<ClassRecord> {
    validate_identifier(&class)?;

    self
      .conn
      .call(move |conn| {
        let table = class_table_in(conn, &class)?;
        let mut stmt = conn.prepare(&format!("SELECT * FROM \"{table}\" WHERE id = ?1"))?;
        let names: Vec<String> =
          stmt.column_names().into_iter().map(str::to_owned).collect();
        let record = stmt
          .query_row([id.get()], |r| {
            let mut record = Map::new();
            for (i, name) in names.iter().enumerate() {
              record.insert(name.clone(), to_json(r.get_ref(i)?));
            }
            Ok(record)
          })
          .optional()?;
        record.ok_or_else(|| reject(Error::NotFound(format!("{table} row {id}"))))
      })
      .await
      .context(format!("read record {id}"))
  }

  async fn update_record(
    &self,
    class: String,
    id: EntityId,
    fields: ClassRecord,
  ) -> Result<()> {
    validate_identifier(&class)?;
    let fields = prepare_fields(fields)?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let table = class_table_in(&tx, &class)?;
        check_columns(&table, &columns_in(&tx, &table)?, &fields)?;

        let mut assignments = Vec::with_capacity(fields.len());
        let mut values = vec![SqlValue::Integer(id.get())];
        for (column, value) in fields {
          assignments.push(format!(
            "{} = ?{}",
            quote_identifier(&column).map_err(reject)?,
            values.len() + 1
          ));
          values.push(value);
        }
        // An empty update still reports a missing row.
        let sql = if assignments.is_empty() {
          format!("UPDATE \"{table}\" SET id = id WHERE id = ?1")
        } else {
          format!("UPDATE \"{table}\" SET {} WHERE id = ?1", assignments.join(", "))
        };
        let n = tx
          .execute(&sql, rusqlite::params_from_iter(values))
          .map_err(|e| on_write(e, &format!("{table} row {id}")))?;
        if n == 0 {
          return Err(reject(Error::NotFound(format!("{table} row {id}"))));
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .context(format!("update record {id}"))?;

    debug!(%id, "updated class record");
    Ok(())
  }
}
