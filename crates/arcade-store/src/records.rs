//! Generic collection operations: upsert, get, delete, list.
//!
//! A record is a JSON object carrying its collection's key field.  Writes
//! run inside a transaction so the record, its owner-index rows and the
//! collection sequence change together or not at all.

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::collections::{self, CollectionDef};
use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Untyped
    // ------------------------------------------------------------------

    /// Insert or overwrite `record` in `collection`.  Returns its key.
    pub fn put(&self, collection: &str, record: &Value) -> Result<String> {
        let def = collections::lookup(collection)?;
        let tx = self.conn().unchecked_transaction()?;
        let key = put_in(&tx, def, record)?;
        tx.commit()?;
        Ok(key)
    }

    /// Allocate the next integer key of an auto-increment collection,
    /// store it in the record's key field and insert the record.
    pub fn insert_auto(&self, collection: &str, mut record: Map<String, Value>) -> Result<i64> {
        let def = collections::lookup(collection)?;
        if !def.auto_increment {
            return Err(StoreError::Validation(format!(
                "collection `{}` does not allocate keys",
                def.name
            )));
        }

        let tx = self.conn().unchecked_transaction()?;
        let next: i64 = tx
            .query_row(
                "SELECT next_id FROM sequences WHERE collection = ?1",
                params![def.name],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(1);

        record.insert(def.key_field.to_string(), Value::from(next));
        put_in(&tx, def, &Value::Object(record))?;
        tx.commit()?;
        Ok(next)
    }

    /// Fetch one record; `None` when absent.
    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let def = collections::lookup(collection)?;
        let body: Option<String> = self
            .conn()
            .query_row(
                "SELECT body FROM records WHERE collection = ?1 AND id = ?2",
                params![def.name, key],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    /// Delete one record.  Returns `true` if a record was removed.
    pub fn delete(&self, collection: &str, key: &str) -> Result<bool> {
        let def = collections::lookup(collection)?;
        // owner rows go with it (ON DELETE CASCADE)
        let affected = self.conn().execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![def.name, key],
        )?;
        Ok(affected > 0)
    }

    /// Every record in the collection.  Ordered by key only so exports are
    /// stable; callers must not depend on it.
    pub fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let def = collections::lookup(collection)?;
        let mut stmt = self
            .conn()
            .prepare("SELECT body FROM records WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![def.name], |row| row.get::<_, String>(0))?;
        parse_bodies(rows)
    }

    /// Records whose owner fields contain `owner`.
    ///
    /// Same result as `list` filtered on the owner fields, served from the
    /// owner index.
    pub fn list_owned(&self, collection: &str, owner: &str) -> Result<Vec<Value>> {
        let def = collections::lookup(collection)?;
        let mut stmt = self.conn().prepare(
            "SELECT body FROM records
             WHERE collection = ?1
               AND id IN (SELECT record_id FROM record_owners
                          WHERE collection = ?1 AND owner = ?2)
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![def.name, owner], |row| row.get::<_, String>(0))?;
        parse_bodies(rows)
    }

    // ------------------------------------------------------------------
    // Typed
    // ------------------------------------------------------------------

    pub fn put_record<T: Serialize>(&self, def: &CollectionDef, record: &T) -> Result<String> {
        self.put(def.name, &serde_json::to_value(record)?)
    }

    pub fn get_record<T: DeserializeOwned>(
        &self,
        def: &CollectionDef,
        key: &str,
    ) -> Result<Option<T>> {
        self.get(def.name, key)?
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .transpose()
    }

    pub fn list_records<T: DeserializeOwned>(&self, def: &CollectionDef) -> Result<Vec<T>> {
        from_values(self.list(def.name)?)
    }

    pub fn list_owned_records<T: DeserializeOwned>(
        &self,
        def: &CollectionDef,
        owner: &str,
    ) -> Result<Vec<T>> {
        from_values(self.list_owned(def.name, owner)?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Upsert inside an open transaction.
pub(crate) fn put_in(conn: &Connection, def: &CollectionDef, record: &Value) -> Result<String> {
    let obj = record.as_object().ok_or_else(|| {
        StoreError::Validation(format!("record in `{}` is not an object", def.name))
    })?;
    let key = key_of(def, obj)?;
    let body = serde_json::to_string(record)?;

    conn.execute(
        "INSERT INTO records (collection, id, body) VALUES (?1, ?2, ?3)
         ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
        params![def.name, key, body],
    )?;

    conn.execute(
        "DELETE FROM record_owners WHERE collection = ?1 AND record_id = ?2",
        params![def.name, key],
    )?;
    for field in def.owner_fields {
        if let Some(owner) = obj.get(*field).and_then(Value::as_str) {
            conn.execute(
                "INSERT OR IGNORE INTO record_owners (collection, record_id, owner)
                 VALUES (?1, ?2, ?3)",
                params![def.name, key, owner],
            )?;
        }
    }

    // Explicit ids (e.g. from a restored backup) push the sequence past
    // them so allocated ids are never reused.
    if def.auto_increment {
        if let Some(id) = obj.get(def.key_field).and_then(Value::as_i64) {
            conn.execute(
                "INSERT INTO sequences (collection, next_id) VALUES (?1, ?2)
                 ON CONFLICT(collection) DO UPDATE
                 SET next_id = MAX(next_id, excluded.next_id)",
                params![def.name, id.saturating_add(1)],
            )?;
        }
    }

    Ok(key)
}

/// Primary key of a record: its key field as text.
fn key_of(def: &CollectionDef, obj: &Map<String, Value>) -> Result<String> {
    let missing = || StoreError::MissingKey {
        collection: def.name,
        field: def.key_field,
    };
    match obj.get(def.key_field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(missing()),
    }
}

fn parse_bodies<I>(rows: I) -> Result<Vec<Value>>
where
    I: Iterator<Item = rusqlite::Result<String>>,
{
    let mut out = Vec::new();
    for row in rows {
        out.push(serde_json::from_str(&row?)?);
    }
    Ok(out)
}

fn from_values<T: DeserializeOwned>(values: Vec<Value>) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(StoreError::from))
        .collect()
}
