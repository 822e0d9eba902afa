//! Database schema and migrations for sharebox.
//!
//! Migrations are applied in order; `schema_version` records which ran.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: user directory
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,
    designation TEXT,
    branch      TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: file records
    r#"
-- uploaded_by_id is not a foreign key: users are owned by the directory,
-- which may live elsewhere.
CREATE TABLE files (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name           TEXT NOT NULL UNIQUE,
    original_file_name  TEXT NOT NULL,
    file_size           INTEGER NOT NULL,
    content_type        TEXT NOT NULL,
    storage_path        TEXT NOT NULL UNIQUE,
    uploaded_by_id      INTEGER NOT NULL,
    uploaded_at         TEXT NOT NULL
);

CREATE INDEX idx_files_uploaded_by ON files(uploaded_by_id, uploaded_at);
"#,
    // v3: share grants
    r#"
-- No ON DELETE CASCADE: grants are removed explicitly before their file.
CREATE TABLE shared_files (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id         INTEGER NOT NULL REFERENCES files(id),
    shared_by_id    INTEGER NOT NULL,
    shared_with_id  INTEGER NOT NULL,
    shared_at       TEXT NOT NULL,
    UNIQUE (file_id, shared_by_id, shared_with_id),
    CHECK (shared_by_id <> shared_with_id)
);

CREATE INDEX idx_shared_files_shared_with ON shared_files(shared_with_id, shared_at);
"#,
];
