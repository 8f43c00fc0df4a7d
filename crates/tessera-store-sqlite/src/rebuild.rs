//! Rewriting a stored `CREATE TABLE` statement for a table rebuild.
//!
//! SQLite cannot change a column definition in place. Instead the stored
//! definition is split into its column and constraint items, the composed
//! clauses are applied to it, and a script recreates the table under a
//! temporary name, copies the rows across and swaps the tables.

use tessera_core::{
  Error, Result,
  schema::{AlterPlan, ColumnAction},
};

/// Prefix of the temporary table a rebuild copies rows into.
pub const REBUILD_PREFIX: &str = "tessera_rebuild_";

const CONSTRAINT_KEYWORDS: &[&str] = &["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

// ─── Lexing ──────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Token {
  Open,
  Close,
  Comma,
  /// Anything else, quoted literals kept verbatim and comments dropped.
  Text(String),
}

fn unterminated(what: &str) -> Error {
  Error::IntegrityViolation(format!("stored table definition has an unterminated {what}"))
}

fn lex(sql: &str) -> Result<Vec<Token>> {
  let mut tokens = Vec::new();
  let mut text = String::new();
  let mut chars = sql.chars().peekable();

  let flush = |text: &mut String, tokens: &mut Vec<Token>| {
    if !text.is_empty() {
      tokens.push(Token::Text(std::mem::take(text)));
    }
  };

  while let Some(c) = chars.next() {
    match c {
      '\'' | '"' | '`' | '[' => {
        let close = if c == '[' { ']' } else { c };
        text.push(c);
        loop {
          let next = chars.next().ok_or_else(|| unterminated("quote"))?;
          text.push(next);
          if next == close {
            break;
          }
        }
      }
      '-' if chars.peek() == Some(&'-') => {
        for next in chars.by_ref() {
          if next == '\n' {
            break;
          }
        }
        text.push(' ');
      }
      '/' if chars.peek() == Some(&'*') => {
        chars.next();
        let mut prev = '\0';
        loop {
          let next = chars.next().ok_or_else(|| unterminated("comment"))?;
          if prev == '*' && next == '/' {
            break;
          }
          prev = next;
        }
        text.push(' ');
      }
      '(' | ')' | ',' => {
        flush(&mut text, &mut tokens);
        tokens.push(match c {
          '(' => Token::Open,
          ')' => Token::Close,
          _ => Token::Comma,
        });
      }
      _ => text.push(c),
    }
  }
  flush(&mut text, &mut tokens);
  Ok(tokens)
}

fn render<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> String {
  let mut out = String::new();
  for token in tokens {
    match token {
      Token::Open => out.push('('),
      Token::Close => out.push(')'),
      Token::Comma => out.push(','),
      Token::Text(t) => out.push_str(t),
    }
  }
  out.trim().to_owned()
}

// ─── Table definition ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Item {
  Column { name: String, definition: String },
  Constraint(String),
}

/// The items and trailing options of a `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
  items:   Vec<Item>,
  options: String,
}

/// Strip one level of identifier quoting.
fn unquote(word: &str) -> String {
  match (word.chars().next(), word.chars().last()) {
    (Some(open @ ('"' | '`')), Some(close)) if open == close && word.len() >= 2 => {
      let inner = &word[1..word.len() - 1];
      inner.replace(&format!("{open}{open}"), &open.to_string())
    }
    (Some('['), Some(']')) => word[1..word.len() - 1].to_owned(),
    _ => word.to_owned(),
  }
}

fn leading_word(item: &str) -> &str {
  let item = item.trim_start();
  let quote = item.chars().next().and_then(|c| match c {
    '"' | '`' => Some(c),
    '[' => Some(']'),
    _ => None,
  });
  match quote {
    Some(close) => match item[1..].find(close) {
      Some(end) => &item[..end + 2],
      None => item,
    },
    None => item.split_whitespace().next().unwrap_or(""),
  }
}

fn classify(text: String) -> Item {
  let word = leading_word(&text);
  let bare = !word.starts_with(['"', '`', '[']);
  if bare && CONSTRAINT_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word)) {
    Item::Constraint(text)
  } else {
    Item::Column { name: unquote(word), definition: text }
  }
}

impl TableDefinition {
  /// Parse the `sql` column of a `sqlite_master` table row.
  pub fn parse(sql: &str) -> Result<Self> {
    let tokens = lex(sql)?;
    let open = tokens
      .iter()
      .position(|t| *t == Token::Open)
      .ok_or_else(|| Error::IntegrityViolation("stored table definition has no body".into()))?;

    let mut items = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    let mut close = None;
    for (i, token) in tokens.iter().enumerate().skip(open + 1) {
      match token {
        Token::Close if depth == 0 => {
          close = Some(i);
          break;
        }
        Token::Comma if depth == 0 => {
          items.push(classify(render(current.drain(..))));
          continue;
        }
        Token::Open => depth += 1,
        Token::Close => depth -= 1,
        _ => {}
      }
      current.push(token);
    }
    let close = close.ok_or_else(|| unterminated("column list"))?;
    if !current.is_empty() {
      items.push(classify(render(current)));
    }

    Ok(Self { items, options: render(&tokens[close + 1..]) })
  }

  /// Column names in declared order.
  pub fn column_names(&self) -> Vec<String> {
    self
      .items
      .iter()
      .filter_map(|item| match item {
        Item::Column { name, .. } => Some(name.clone()),
        Item::Constraint(_) => None,
      })
      .collect()
  }

  fn find_column(&self, field: &str) -> Option<usize> {
    self.items.iter().position(|item| {
      matches!(item, Item::Column { name, .. } if name.eq_ignore_ascii_case(field))
    })
  }

  /// Apply every clause of `plan`. Added columns go after the last existing
  /// column, in submitted order.
  pub fn apply(&mut self, plan: &AlterPlan) -> Result<()> {
    for clause in &plan.clauses {
      let existing = self.find_column(&clause.field);
      match (clause.action, existing) {
        (ColumnAction::Modify, Some(i)) => {
          self.items[i] = Item::Column {
            name:       clause.field.clone(),
            definition: clause.definition.clone(),
          };
        }
        (ColumnAction::Modify, None) => {
          return Err(Error::NotFound(format!(
            "column {:?} in table {}",
            clause.field, plan.table
          )));
        }
        (ColumnAction::Add, Some(_)) => {
          return Err(Error::Conflict(format!(
            "column {:?} already exists in table {}",
            clause.field, plan.table
          )));
        }
        (ColumnAction::Add, None) => {
          let after = self
            .items
            .iter()
            .rposition(|item| matches!(item, Item::Column { .. }))
            .map_or(0, |i| i + 1);
          self.items.insert(after, Item::Column {
            name:       clause.field.clone(),
            definition: clause.definition.clone(),
          });
        }
      }
    }
    Ok(())
  }

  /// Render as a `CREATE TABLE` statement under `name`.
  pub fn to_create(&self, name: &str) -> String {
    let body = self
      .items
      .iter()
      .map(|item| match item {
        Item::Column { definition, .. } => definition.as_str(),
        Item::Constraint(text) => text.as_str(),
      })
      .collect::<Vec<_>>()
      .join(",\n    ");
    let options = if self.options.is_empty() {
      String::new()
    } else {
      format!(" {}", self.options)
    };
    format!("CREATE TABLE {} (\n    {body}\n){options}", quote(name))
  }
}

/// Double-quote a name taken from the stored schema.
fn quote(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

/// Build the full rebuild script for `plan` against the stored definition
/// `create_sql`. `dependents` are the stored index and trigger statements to
/// recreate afterwards.
pub fn rebuild_script(
  create_sql: &str,
  plan: &AlterPlan,
  dependents: &[String],
) -> Result<String> {
  let mut definition = TableDefinition::parse(create_sql)?;
  let copied = definition
    .column_names()
    .iter()
    .map(|c| quote(c))
    .collect::<Vec<_>>()
    .join(", ");
  definition.apply(plan)?;

  let table = quote(&plan.table);
  let temp = quote(&format!("{REBUILD_PREFIX}{}", plan.table));
  let mut statements = vec![
    definition.to_create(&format!("{REBUILD_PREFIX}{}", plan.table)),
    format!("INSERT INTO {temp} ({copied}) SELECT {copied} FROM {table}"),
    format!("DROP TABLE {table}"),
    format!("ALTER TABLE {temp} RENAME TO {table}"),
  ];
  statements.extend(dependents.iter().cloned());

  Ok(statements.join(";\n") + ";")
}

#[cfg(test)]
mod tests {
  use tessera_core::{ErrorKind, schema::ColumnClause};

  use super::*;

  const PIECE: &str = "CREATE TABLE content_piece (
    id         INTEGER NOT NULL,
    class      VARCHAR(255) NOT NULL, -- free-form, e.g. blog_post
    title      VARCHAR(255) NOT NULL,
    status     VARCHAR(16) NOT NULL DEFAULT 'draft, or (not)',
    PRIMARY KEY (id),
    FOREIGN KEY (id) REFERENCES entity(id) ON DELETE CASCADE,
    CHECK (status IN ('draft', 'published'))
  )";

  fn plan(clauses: &[(ColumnAction, &str, &str)]) -> AlterPlan {
    AlterPlan {
      table:   "content_piece".into(),
      clauses: clauses
        .iter()
        .map(|(action, field, definition)| ColumnClause {
          action:     *action,
          field:      (*field).into(),
          definition: (*definition).into(),
        })
        .collect(),
    }
  }

  #[test]
  fn parse_splits_columns_from_constraints() {
    let def = TableDefinition::parse(PIECE).unwrap();
    assert_eq!(def.column_names(), ["id", "class", "title", "status"]);
    assert_eq!(def.items.len(), 7);
    assert!(matches!(&def.items[3], Item::Column { definition, .. }
      if definition == "status     VARCHAR(16) NOT NULL DEFAULT 'draft, or (not)'"));
    assert!(def.options.is_empty());
  }

  #[test]
  fn quoted_names_are_unquoted() {
    let def = TableDefinition::parse(
      "CREATE TABLE t (\"my col\" TEXT, [other] INT, `x\"\"` REAL) WITHOUT ROWID",
    )
    .unwrap();
    assert_eq!(def.column_names(), ["my col", "other", "x\"\""]);
    assert_eq!(def.options, "WITHOUT ROWID");
  }

  #[test]
  fn added_columns_follow_the_last_column_in_order() {
    let mut def = TableDefinition::parse(PIECE).unwrap();
    def
      .apply(&plan(&[
        (ColumnAction::Add, "subtitle", "\"subtitle\" VARCHAR(255) NULL"),
        (ColumnAction::Add, "rank", "\"rank\" INTEGER NULL"),
      ]))
      .unwrap();
    assert_eq!(
      def.column_names(),
      ["id", "class", "title", "status", "subtitle", "rank"]
    );
    assert!(matches!(&def.items[6], Item::Constraint(c) if c.starts_with("PRIMARY KEY")));
  }

  #[test]
  fn modify_replaces_the_definition_in_place() {
    let mut def = TableDefinition::parse(PIECE).unwrap();
    def
      .apply(&plan(&[(ColumnAction::Modify, "TITLE", "\"TITLE\" TEXT NULL")]))
      .unwrap();
    let sql = def.to_create("content_piece");
    assert!(sql.contains("\"TITLE\" TEXT NULL,"));
    assert!(!sql.contains("title      VARCHAR"));
    assert!(sql.contains("FOREIGN KEY (id) REFERENCES entity(id) ON DELETE CASCADE"));
  }

  #[test]
  fn missing_and_existing_columns_are_reported() {
    let mut def = TableDefinition::parse(PIECE).unwrap();
    let err = def
      .apply(&plan(&[(ColumnAction::Modify, "nope", "\"nope\" TEXT NULL")]))
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = def
      .apply(&plan(&[(ColumnAction::Add, "Class", "\"Class\" TEXT NULL")]))
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
  }

  #[test]
  fn script_copies_old_columns_and_swaps_tables() {
    let script = rebuild_script(
      PIECE,
      &plan(&[(ColumnAction::Add, "subtitle", "\"subtitle\" VARCHAR(255) NULL")]),
      &["CREATE INDEX piece_title_idx ON content_piece(title)".to_owned()],
    )
    .unwrap();
    let statements: Vec<_> = script.split(";\n").collect();
    assert!(statements[0].starts_with("CREATE TABLE \"tessera_rebuild_content_piece\" ("));
    assert_eq!(
      statements[1],
      "INSERT INTO \"tessera_rebuild_content_piece\" (\"id\", \"class\", \"title\", \"status\") \
       SELECT \"id\", \"class\", \"title\", \"status\" FROM \"content_piece\""
    );
    assert_eq!(statements[2], "DROP TABLE \"content_piece\"");
    assert_eq!(
      statements[3],
      "ALTER TABLE \"tessera_rebuild_content_piece\" RENAME TO \"content_piece\""
    );
    assert_eq!(statements[4], "CREATE INDEX piece_title_idx ON content_piece(title);");
  }

  #[test]
  fn unterminated_quote_is_an_error() {
    assert!(TableDefinition::parse("CREATE TABLE t (a TEXT DEFAULT 'x)").is_err());
  }
}
