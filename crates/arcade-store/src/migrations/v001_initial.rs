//! v001 -- Initial schema creation.
//!
//! Every collection shares one `records` table keyed by
//! `(collection, id)`; the record itself is the JSON `body`.  Owner lookups
//! go through the `record_owners` index, and auto-increment collections
//! draw ids from `sequences`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Records (all collections)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,             -- collection name, e.g. 'saves'
    id         TEXT NOT NULL,             -- value of the declared key field
    body       TEXT NOT NULL,             -- JSON record, stored verbatim

    PRIMARY KEY (collection, id)
);

-- ----------------------------------------------------------------
-- Owner index (account code -> record)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS record_owners (
    collection TEXT NOT NULL,
    record_id  TEXT NOT NULL,
    owner      TEXT NOT NULL,             -- account code

    PRIMARY KEY (collection, record_id, owner),
    FOREIGN KEY (collection, record_id)
        REFERENCES records(collection, id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_record_owners_owner
    ON record_owners(collection, owner);

-- ----------------------------------------------------------------
-- Sequences (auto-increment collections)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sequences (
    collection TEXT PRIMARY KEY NOT NULL,
    next_id    INTEGER NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
