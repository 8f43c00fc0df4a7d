//! SQL schema for the Tessera SQLite store.
//!
//! Executed once at connection startup. Class tables keep every key,
//! reference and check as a table constraint; column definitions carry only
//! type, nullability and default so the schema evolution rebuild can replace a
//! column definition without losing constraints.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS entity (
    id INTEGER PRIMARY KEY AUTOINCREMENT
);

CREATE TABLE IF NOT EXISTS content_piece (
    id         INTEGER NOT NULL,
    class      VARCHAR(255) NOT NULL,
    title      VARCHAR(255) NOT NULL,
    created_at TEXT NOT NULL,
    status     VARCHAR(16) NOT NULL DEFAULT 'draft',
    PRIMARY KEY (id),
    FOREIGN KEY (id) REFERENCES entity(id) ON DELETE CASCADE,
    CHECK (status IN ('draft', 'published', 'archived'))
);

CREATE TABLE IF NOT EXISTS contlet_paragraph (
    id           INTEGER NOT NULL,
    text_content TEXT NOT NULL,
    PRIMARY KEY (id),
    FOREIGN KEY (id) REFERENCES entity(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS contlet_image (
    id       INTEGER NOT NULL,
    src      VARCHAR(2048) NOT NULL,
    alt_text VARCHAR(255),
    width    INTEGER,
    height   INTEGER,
    PRIMARY KEY (id),
    CHECK (width IS NULL OR width >= 0),
    CHECK (height IS NULL OR height >= 0),
    FOREIGN KEY (id) REFERENCES entity(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS contlet_heading (
    id           INTEGER NOT NULL,
    text_content VARCHAR(255) NOT NULL,
    level        INTEGER NOT NULL,
    PRIMARY KEY (id),
    FOREIGN KEY (id) REFERENCES entity(id) ON DELETE CASCADE,
    CHECK (level BETWEEN 1 AND 6)
);

-- A contlet may not be deleted while a piece still references it.
CREATE TABLE IF NOT EXISTS content_piece_contlets (
    content_piece_id INTEGER NOT NULL,
    contlet_id       INTEGER NOT NULL,
    sort_order       INTEGER NOT NULL,
    PRIMARY KEY (content_piece_id, sort_order),
    UNIQUE (content_piece_id, contlet_id),
    FOREIGN KEY (content_piece_id) REFERENCES content_piece(id) ON DELETE CASCADE,
    FOREIGN KEY (contlet_id) REFERENCES entity(id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS taxonomy (
    id          INTEGER NOT NULL,
    name        VARCHAR(255) NOT NULL,
    description TEXT,
    PRIMARY KEY (id),
    UNIQUE (name),
    FOREIGN KEY (id) REFERENCES entity(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS tag (
    id          INTEGER NOT NULL,
    taxonomy_id INTEGER NOT NULL,
    value       VARCHAR(255) NOT NULL,
    PRIMARY KEY (id),
    UNIQUE (taxonomy_id, value),
    FOREIGN KEY (id) REFERENCES entity(id) ON DELETE CASCADE,
    FOREIGN KEY (taxonomy_id) REFERENCES taxonomy(id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS entity_tags (
    entity_id INTEGER NOT NULL REFERENCES entity(id) ON DELETE CASCADE,
    tag_id    INTEGER NOT NULL REFERENCES tag(id) ON DELETE CASCADE,
    PRIMARY KEY (entity_id, tag_id)
);

CREATE TABLE IF NOT EXISTS link_class (
    name           VARCHAR(64) NOT NULL PRIMARY KEY,
    description    TEXT,
    symmetric_link VARCHAR(64) REFERENCES link_class(name) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS entity_relationships (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id INTEGER NOT NULL REFERENCES entity(id) ON DELETE CASCADE,
    link_type  VARCHAR(64) NOT NULL REFERENCES link_class(name) ON DELETE RESTRICT,
    object_id  INTEGER NOT NULL REFERENCES entity(id) ON DELETE CASCADE,
    source     VARCHAR(255),
    confidence REAL CHECK (confidence IS NULL OR (confidence >= 0.0 AND confidence <= 1.0)),
    UNIQUE (subject_id, link_type, object_id)
);

CREATE INDEX IF NOT EXISTS content_piece_contlets_contlet_idx ON content_piece_contlets(contlet_id);
CREATE INDEX IF NOT EXISTS entity_tags_tag_idx                ON entity_tags(tag_id);
CREATE INDEX IF NOT EXISTS entity_relationships_object_idx    ON entity_relationships(object_id);

PRAGMA user_version = 1;
";
