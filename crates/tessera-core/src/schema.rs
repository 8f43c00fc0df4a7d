//! Schema evolution: turning administrator-submitted column descriptions into
//! structural clauses that are safe to splice into DDL.
//!
//! Every change passes through four stages:
//!
//! 1. **Validate**: identifiers match [`IDENTIFIER_PATTERN`], raw physical
//!    types are scanned, extras are parsed from a closed allowlist.
//! 2. **Translate**: semantic type names map to exactly one physical type via
//!    the closed [`SemanticType`] enum.
//! 3. **Compose**: each column becomes one clause; default values are quoted
//!    by the store's own [`LiteralQuoter`].
//! 4. **Execute**: backend specific; see the store crate.
//!
//! Stages 1–3 are pure and live here. A failure in any of them aborts the whole
//! submission, so nothing reaches the store unless every column is clean.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{
  AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr,
};

use crate::{Error, Result};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// The only shape a table or column name may take.
pub const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static IDENTIFIER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(IDENTIFIER_PATTERN).unwrap());

/// A type name, optionally followed by more words and a size or precision.
static PHYSICAL_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[A-Za-z][A-Za-z0-9_]*( [A-Za-z][A-Za-z0-9_]*)* ?(\(\d+( ?, ?\d+)?\))?$")
    .unwrap()
});

/// Characters and sequences that never belong in a column type.
const FORBIDDEN_IN_TYPE: &[&str] = &[";", "'", "\"", "`", "--", "/*", "*/"];

/// Check `name` against [`IDENTIFIER_PATTERN`].
pub fn validate_identifier(name: &str) -> Result<&str> {
  if IDENTIFIER_RE.is_match(name) {
    Ok(name)
  } else {
    Err(Error::InvalidIdentifier(name.to_owned()))
  }
}

/// Validate `name` and wrap it in double quotes for use in SQL text.
pub fn quote_identifier(name: &str) -> Result<String> {
  validate_identifier(name).map(|n| format!("\"{n}\""))
}

/// Scan a raw physical type supplied without going through [`SemanticType`].
pub fn validate_physical_type(raw: &str) -> Result<&str> {
  let trimmed = raw.trim();
  if FORBIDDEN_IN_TYPE.iter().any(|bad| trimmed.contains(bad))
    || !PHYSICAL_TYPE_RE.is_match(trimmed)
  {
    return Err(Error::InvalidColumnType(raw.to_owned()));
  }
  Ok(trimmed)
}

// ─── Semantic types ──────────────────────────────────────────────────────────

/// Administrator-facing field types. The set is closed; there is no way to
/// register a new one at runtime.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
pub enum SemanticType {
  #[strum(serialize = "Single Line of Text")]
  #[serde(rename = "Single Line of Text")]
  SingleLineOfText,
  #[strum(serialize = "Paragraph")]
  #[serde(rename = "Paragraph")]
  Paragraph,
  #[strum(serialize = "Number")]
  #[serde(rename = "Number")]
  Number,
  #[strum(serialize = "Decimal Number")]
  #[serde(rename = "Decimal Number")]
  DecimalNumber,
  #[strum(serialize = "True or False")]
  #[serde(rename = "True or False")]
  TrueOrFalse,
  #[strum(serialize = "Date")]
  #[serde(rename = "Date")]
  Date,
  #[strum(serialize = "Date and Time")]
  #[serde(rename = "Date and Time")]
  DateAndTime,
  #[strum(serialize = "Web Address")]
  #[serde(rename = "Web Address")]
  WebAddress,
}

impl SemanticType {
  /// The one physical column type backing this semantic type.
  pub fn physical_type(self) -> &'static str {
    match self {
      Self::SingleLineOfText => "VARCHAR(255)",
      Self::Paragraph => "TEXT",
      Self::Number => "INTEGER",
      Self::DecimalNumber => "REAL",
      Self::TrueOrFalse => "BOOLEAN",
      Self::Date => "DATE",
      Self::DateAndTime => "DATETIME",
      Self::WebAddress => "VARCHAR(2048)",
    }
  }

  /// Parse an administrator-submitted label.
  pub fn from_label(label: &str) -> Result<Self> {
    label
      .parse()
      .map_err(|_| Error::UnknownSemanticType(label.to_owned()))
  }

  /// Every label, in declaration order, for building pickers.
  pub fn labels() -> Vec<&'static str> {
    Self::iter().map(<&'static str>::from).collect()
  }
}

// ─── Column descriptors ──────────────────────────────────────────────────────

/// How a column's type is specified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ColumnType {
  /// One of the [`SemanticType`] labels. The administrator UI only submits
  /// these.
  Semantic(String),
  /// A raw physical type for trusted tooling; scanned before use.
  Physical(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAction {
  Add,
  Modify,
}

/// Extra column attributes a change may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ColumnExtra {
  #[strum(serialize = "UNIQUE")]
  Unique,
  #[strum(serialize = "COLLATE NOCASE")]
  CollateNocase,
  #[strum(serialize = "COLLATE BINARY")]
  CollateBinary,
}

impl ColumnExtra {
  pub fn as_sql(self) -> &'static str {
    match self {
      Self::Unique => "UNIQUE",
      Self::CollateNocase => "COLLATE NOCASE",
      Self::CollateBinary => "COLLATE BINARY",
    }
  }
}

/// One column of a submitted schema change, exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnChange {
  pub action:      ColumnAction,
  pub field:       String,
  pub column_type: ColumnType,
  #[serde(default = "default_nullable")]
  pub nullable:    bool,
  /// Raw default value; quoted by the store, never spliced.
  #[serde(default)]
  pub default:     Option<String>,
  /// Must name a [`ColumnExtra`] when present.
  #[serde(default)]
  pub extra:       Option<String>,
}

fn default_nullable() -> bool { true }

impl ColumnChange {
  /// A nullable column with no default or extra.
  pub fn semantic(
    action: ColumnAction,
    field: impl Into<String>,
    label: impl Into<String>,
  ) -> Self {
    Self {
      action,
      field: field.into(),
      column_type: ColumnType::Semantic(label.into()),
      nullable: true,
      default: None,
      extra: None,
    }
  }
}

// ─── Pipeline stages ─────────────────────────────────────────────────────────

/// Output of the Validate stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedColumn {
  pub action:      ColumnAction,
  pub field:       String,
  pub column_type: ColumnType,
  pub nullable:    bool,
  pub default:     Option<String>,
  pub extra:       Option<ColumnExtra>,
}

/// Output of the Translate stage: the type is now physical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedColumn {
  pub action:   ColumnAction,
  pub field:    String,
  pub physical: String,
  pub nullable: bool,
  pub default:  Option<String>,
  pub extra:    Option<ColumnExtra>,
}

/// Output of the Compose stage for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnClause {
  pub action:     ColumnAction,
  pub field:      String,
  /// Full column definition, e.g. `"title" VARCHAR(255) NOT NULL DEFAULT 'x'`.
  pub definition: String,
}

/// All composed clauses for one table, in submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlterPlan {
  pub table:   String,
  pub clauses: Vec<ColumnClause>,
}

impl AlterPlan {
  pub fn is_empty(&self) -> bool { self.clauses.is_empty() }
}

/// The store's own escaping primitive for literal values.
pub trait LiteralQuoter {
  /// Render `value` as a SQL string literal.
  fn quote_literal(&self, value: &str) -> Result<String>;
}

/// Validate the table name and every column of a submission.
pub fn validate(
  table: &str,
  changes: &[ColumnChange],
) -> Result<Vec<ValidatedColumn>> {
  validate_identifier(table)?;
  if table.to_ascii_lowercase().starts_with("sqlite_") {
    return Err(Error::InvalidIdentifier(table.to_owned()));
  }

  let mut seen = HashSet::new();
  changes
    .iter()
    .map(|change| {
      validate_identifier(&change.field)?;
      if change.field.eq_ignore_ascii_case("id") {
        return Err(Error::InvalidArgument(
          "the id key column cannot be altered".to_owned(),
        ));
      }
      if !seen.insert(change.field.to_ascii_lowercase()) {
        return Err(Error::InvalidArgument(format!(
          "column {:?} appears more than once",
          change.field
        )));
      }
      if let ColumnType::Physical(raw) = &change.column_type {
        validate_physical_type(raw)?;
      }
      let extra = change
        .extra
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|e| {
          e.parse::<ColumnExtra>().map_err(|_| {
            Error::InvalidArgument(format!("unsupported column extra {e:?}"))
          })
        })
        .transpose()?;

      Ok(ValidatedColumn {
        action: change.action,
        field: change.field.clone(),
        column_type: change.column_type.clone(),
        nullable: change.nullable,
        default: change.default.clone(),
        extra,
      })
    })
    .collect()
}

/// Map every column's type to its physical form.
pub fn translate(columns: Vec<ValidatedColumn>) -> Result<Vec<TranslatedColumn>> {
  columns
    .into_iter()
    .map(|c| {
      let physical = match &c.column_type {
        ColumnType::Semantic(label) => {
          SemanticType::from_label(label)?.physical_type().to_owned()
        }
        ColumnType::Physical(raw) => validate_physical_type(raw)?.to_owned(),
      };
      Ok(TranslatedColumn {
        action: c.action,
        field: c.field,
        physical,
        nullable: c.nullable,
        default: c.default,
        extra: c.extra,
      })
    })
    .collect()
}

/// Build one clause per column.
pub fn compose(
  table: &str,
  columns: Vec<TranslatedColumn>,
  quoter: &impl LiteralQuoter,
) -> Result<AlterPlan> {
  let clauses = columns
    .into_iter()
    .map(|c| {
      let mut definition =
        format!("{} {}", quote_identifier(&c.field)?, c.physical);
      definition.push_str(if c.nullable { " NULL" } else { " NOT NULL" });
      if let Some(value) = c.default.as_deref().filter(|v| !v.is_empty()) {
        definition.push_str(" DEFAULT ");
        definition.push_str(&quoter.quote_literal(value)?);
      }
      if let Some(extra) = c.extra {
        definition.push(' ');
        definition.push_str(extra.as_sql());
      }
      Ok(ColumnClause { action: c.action, field: c.field, definition })
    })
    .collect::<Result<Vec<_>>>()?;

  Ok(AlterPlan { table: table.to_owned(), clauses })
}

/// Run Validate, Translate and Compose in order.
pub fn plan(
  table: &str,
  changes: &[ColumnChange],
  quoter: &impl LiteralQuoter,
) -> Result<AlterPlan> {
  let validated = validate(table, changes)?;
  let translated = translate(validated)?;
  compose(table, translated, quoter)
}

// ─── Introspection ───────────────────────────────────────────────────────────

/// The role a column plays in keys and indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyRole {
  #[serde(rename = "PRI")]
  Primary,
  #[serde(rename = "UNI")]
  Unique,
  /// Leading column of a non-unique index or a foreign key.
  #[serde(rename = "MUL")]
  Multiple,
  #[serde(rename = "")]
  None,
}

/// Description of one existing column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDetail {
  pub field:       String,
  /// Declared type as stored in the schema.
  pub column_type: String,
  pub nullable:    bool,
  pub key:         KeyRole,
  /// Default expression as written in the DDL.
  pub default:     Option<String>,
  pub extra:       String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
  pub table:   String,
  pub columns: Vec<ColumnDetail>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  /// Standard single-quote doubling, enough to exercise composition.
  struct Doubling;

  impl LiteralQuoter for Doubling {
    fn quote_literal(&self, value: &str) -> Result<String> {
      Ok(format!("'{}'", value.replace('\'', "''")))
    }
  }

  fn add(field: &str, label: &str) -> ColumnChange {
    ColumnChange::semantic(ColumnAction::Add, field, label)
  }

  #[test]
  fn identifiers_follow_the_grammar() {
    for ok in ["title", "_x", "A1_b2"] {
      assert!(validate_identifier(ok).is_ok(), "{ok}");
    }
    for bad in ["", "1abc", "na me", "name;", "a-b", "ünï", "x\"y"] {
      assert_eq!(
        validate_identifier(bad).unwrap_err().kind(),
        ErrorKind::InvalidIdentifier,
        "{bad}"
      );
    }
  }

  #[test]
  fn injection_in_column_name_fails_closed() {
    let err = plan(
      "content_piece",
      &[add("name; DROP TABLE x", "Single Line of Text")],
      &Doubling,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidIdentifier);
  }

  #[test]
  fn injection_in_table_name_fails_closed() {
    let err = plan("t; DROP TABLE entity", &[], &Doubling).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidIdentifier);
  }

  #[test]
  fn internal_tables_are_refused() {
    let err = plan("sqlite_master", &[], &Doubling).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidIdentifier);
  }

  #[test]
  fn semantic_label_translates_to_physical_type() {
    let plan = plan(
      "content_piece",
      &[add("subtitle", "Single Line of Text")],
      &Doubling,
    )
    .unwrap();
    let def = &plan.clauses[0].definition;
    assert_eq!(def, "\"subtitle\" VARCHAR(255) NULL");
    assert!(!def.contains("Single Line of Text"));
  }

  #[test]
  fn unknown_semantic_type_is_rejected() {
    let err = plan("content_piece", &[add("x", "Blob of Doom")], &Doubling)
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSemanticType);
  }

  #[test]
  fn every_label_round_trips() {
    for label in SemanticType::labels() {
      assert!(SemanticType::from_label(label).is_ok(), "{label}");
    }
  }

  #[test]
  fn raw_physical_type_is_scanned() {
    for bad in [
      "TEXT; DROP TABLE entity",
      "TEXT DEFAULT 'x'",
      "INT -- comment",
      "VARCHAR(255))",
      "TEXT \"x\"",
    ] {
      let mut change = add("body", "Paragraph");
      change.column_type = ColumnType::Physical(bad.to_owned());
      assert_eq!(
        plan("contlet_paragraph", &[change], &Doubling)
          .unwrap_err()
          .kind(),
        ErrorKind::InvalidColumnType,
        "{bad}"
      );
    }

    let mut change = add("price", "Number");
    change.column_type = ColumnType::Physical("DECIMAL(10, 2)".into());
    let plan = plan("content_piece", &[change], &Doubling).unwrap();
    assert_eq!(plan.clauses[0].definition, "\"price\" DECIMAL(10, 2) NULL");
  }

  #[test]
  fn default_is_quoted_and_extra_allowlisted() {
    let mut change = add("slug", "Single Line of Text");
    change.nullable = false;
    change.default = Some("it's'; DROP TABLE entity; --".into());
    change.extra = Some("unique".into());
    let plan = plan("content_piece", &[change], &Doubling).unwrap();
    assert_eq!(
      plan.clauses[0].definition,
      "\"slug\" VARCHAR(255) NOT NULL DEFAULT 'it''s''; DROP TABLE entity; --' UNIQUE"
    );
  }

  #[test]
  fn arbitrary_extra_is_rejected() {
    let mut change = add("slug", "Single Line of Text");
    change.extra = Some("AUTOINCREMENT; DROP TABLE entity".into());
    let err = plan("content_piece", &[change], &Doubling).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
  }

  #[test]
  fn one_bad_column_rejects_the_whole_submission() {
    let err = plan(
      "content_piece",
      &[add("good", "Paragraph"), add("bad", "Nope")],
      &Doubling,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSemanticType);
  }

  #[test]
  fn submitted_order_is_preserved() {
    let plan = plan(
      "content_piece",
      &[add("b", "Number"), add("a", "Date"), add("c", "Paragraph")],
      &Doubling,
    )
    .unwrap();
    let fields: Vec<_> = plan.clauses.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, ["b", "a", "c"]);
  }

  #[test]
  fn empty_submission_is_an_empty_plan() {
    assert!(plan("content_piece", &[], &Doubling).unwrap().is_empty());
  }

  #[test]
  fn id_column_and_duplicates_are_refused() {
    let err = plan("content_piece", &[add("ID", "Number")], &Doubling)
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = plan(
      "content_piece",
      &[add("x", "Number"), add("X", "Date")],
      &Doubling,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
  }
}
