//! Full-store export and overwrite-by-key import.
//!
//! A [`Snapshot`] maps collection names to arrays of records exactly as
//! stored, so encrypted fields stay encrypted.  Exports cover every account
//! on the device, not just the one logged in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collections::{self, CollectionDef, ACCOUNTS};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{self, AccountRecord};
use crate::records::put_in;

/// Portable backup: `{ "<collection>": [record, ...], ... }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub BTreeMap<String, Value>);

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Records of one collection (empty if absent or not an array).
    pub fn records(&self, collection: &str) -> &[Value] {
        self.0
            .get(collection)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
}

impl Database {
    /// Export every exported collection, across all accounts.
    pub fn export_all(&self) -> Result<Snapshot> {
        let mut out = BTreeMap::new();
        for def in collections::ALL.iter().filter(|c| c.exported) {
            let records = self.list(def.name)?;
            out.insert(def.name.to_string(), Value::Array(records));
        }
        Ok(Snapshot(out))
    }

    /// Merge a snapshot into the store, overwriting records with the same
    /// key.  Nothing is deleted.  Unknown collections, non-array values and
    /// records that do not match their collection's record type are
    /// skipped, never fatal.  An account whose code already exists under a
    /// different key is skipped too: keys are never rotated.
    pub fn import_all(&self, snapshot: &Snapshot) -> Result<ImportStats> {
        let mut stats = ImportStats::default();
        let tx = self.conn().unchecked_transaction()?;

        for (name, value) in &snapshot.0 {
            let def: &CollectionDef = match collections::lookup(name) {
                Ok(def) if def.exported => def,
                _ => {
                    tracing::warn!(collection = %name, "skipping unknown collection in backup");
                    continue;
                }
            };
            let Some(items) = value.as_array() else {
                tracing::warn!(collection = %name, "skipping non-array collection in backup");
                continue;
            };

            for item in items {
                if let Err(e) = models::check_shape(def.name, item) {
                    tracing::warn!(collection = %name, error = %e, "skipping malformed record");
                    stats.skipped += 1;
                    continue;
                }
                if def.name == ACCOUNTS.name && self.rotates_account_key(item)? {
                    tracing::warn!("skipping backup account that would replace an existing key");
                    stats.skipped += 1;
                    continue;
                }

                // SQLite errors abort the import; record-shape problems skip.
                match put_in(&tx, def, item) {
                    Ok(_) => stats.imported += 1,
                    Err(StoreError::Sqlite(e)) => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(collection = %name, error = %e, "skipping malformed record");
                        stats.skipped += 1;
                    }
                }
            }
        }

        tx.commit()?;
        tracing::info!(
            imported = stats.imported,
            skipped = stats.skipped,
            "backup imported"
        );
        Ok(stats)
    }

    fn rotates_account_key(&self, item: &Value) -> Result<bool> {
        let incoming = AccountRecord::deserialize(item)?;
        Ok(self
            .get_account(&incoming.code)?
            .is_some_and(|existing| existing.key != incoming.key))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::favorites::FavoriteMeta;
    use crate::test_support::{account, open_temp};

    fn populate(db: &Database) {
        let a = account("AB3D-7X9Q");
        let b = account("ZZZZ-2222");
        db.save_state(&a, "mario", 0, b"a-save", 1).unwrap();
        db.save_state(&b, "zelda", 2, b"b-save", 1).unwrap();
        db.set_favorite(&a.code, "pacman", true, FavoriteMeta::default(), 1)
            .unwrap();
        db.add_friend(&a.code, &b.code).unwrap();
        db.send_message(&a.code, &b.code, "hi", 1).unwrap();
        db.save_site_core_options("dkong", &json!({"x": 1}), 1).unwrap();
        db.set_login_attempts(vec![1]).unwrap();
    }

    fn sorted(snapshot: &Snapshot) -> BTreeMap<String, Vec<String>> {
        snapshot
            .0
            .iter()
            .map(|(k, v)| {
                let mut rows: Vec<String> = v
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|r| r.to_string())
                    .collect();
                rows.sort();
                (k.clone(), rows)
            })
            .collect()
    }

    #[test]
    fn export_covers_all_accounts_but_not_meta() {
        let (_dir, db) = open_temp();
        populate(&db);

        let snap = db.export_all().unwrap();
        assert_eq!(snap.records("saves").len(), 2);
        assert!(!snap.0.contains_key("meta"));
        assert!(snap.0.contains_key("accounts"));
        assert!(snap.0.contains_key("core_options"));
    }

    #[test]
    fn export_import_reproduces_store() {
        let (_dir, src) = open_temp();
        populate(&src);
        let snap = src.export_all().unwrap();

        let (_dir2, dst) = open_temp();
        let stats = dst.import_all(&snap).unwrap();
        assert_eq!(stats.skipped, 0);
        assert_eq!(sorted(&dst.export_all().unwrap()), sorted(&snap));

        // encrypted saves survive the trip and still decrypt
        let a = account("AB3D-7X9Q");
        assert_eq!(
            dst.load_state(&a, "mario", 0).unwrap().unwrap(),
            b"a-save".to_vec()
        );
    }

    #[test]
    fn json_roundtrip() {
        let (_dir, db) = open_temp();
        populate(&db);
        let snap = db.export_all().unwrap();
        let parsed = Snapshot::from_json(&snap.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, snap);
    }

    #[test]
    fn import_overwrites_but_never_deletes() {
        let (_dir, db) = open_temp();
        db.put("core_options_site", &json!({"game": "keep", "payload": 1, "timestamp": 1}))
            .unwrap();
        db.put("core_options_site", &json!({"game": "dkong", "payload": 1, "timestamp": 1}))
            .unwrap();

        let snap = Snapshot::from_json(
            r#"{"core_options_site": [{"game": "dkong", "payload": 2, "timestamp": 2}]}"#,
        )
        .unwrap();
        db.import_all(&snap).unwrap();

        assert_eq!(db.get("core_options_site", "dkong").unwrap().unwrap()["payload"], 2);
        assert!(db.get("core_options_site", "keep").unwrap().is_some());
    }

    #[test]
    fn import_skips_garbage() {
        let (_dir, db) = open_temp();
        let snap = Snapshot::from_json(
            r#"{
                "unknown": [{"id": "x"}],
                "meta": [{"key": "login_attempts", "attempts": []}],
                "favorites": "not-an-array",
                "saves": [42, {"no_id": true}],
                "messages": [{"id": 7, "from": "AB3D-7X9Q", "to": "ZZZZ-2222", "text": "x", "timestamp": 1}]
            }"#,
        )
        .unwrap();

        let stats = db.import_all(&snap).unwrap();
        assert_eq!(stats, ImportStats { imported: 1, skipped: 2 });
        assert!(db.get("meta", "login_attempts").unwrap().is_none());

        // imported message ids are never handed out again
        let next = db
            .insert_auto("messages", serde_json::Map::new())
            .unwrap();
        assert_eq!(next, 8);
    }

    #[test]
    fn import_skips_records_that_do_not_match_their_type() {
        let (_dir, db) = open_temp();
        let a = account("AB3D-7X9Q");
        db.save_state(&a, "mario", 0, b"kept", 1).unwrap();

        let snap = Snapshot::from_json(
            r#"{
                "saves": [{"id": "AB3D-7X9Q|g|0", "account_code": "AB3D-7X9Q"}],
                "messages": [{"id": "7", "from": "AB3D-7X9Q"}]
            }"#,
        )
        .unwrap();

        let stats = db.import_all(&snap).unwrap();
        assert_eq!(stats, ImportStats { imported: 0, skipped: 2 });
        assert!(db.get("saves", "AB3D-7X9Q|g|0").unwrap().is_none());

        let saves = db.list_saves(&a.code, None).unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(db.load_state(&a, "mario", 0).unwrap().unwrap(), b"kept".to_vec());
        assert!(db.list_messages(&a.code).unwrap().is_empty());
    }

    #[test]
    fn import_never_replaces_an_account_key() {
        let (_dir, db) = open_temp();
        let a = account("AB3D-7X9Q");
        db.insert_account(&AccountRecord {
            code: a.code.clone(),
            created_at: 1,
            key: a.key.clone(),
        })
        .unwrap();
        db.save_state(&a, "mario", 0, b"mine", 1).unwrap();

        let foreign = json!({"code": "AB3D-7X9Q", "created_at": 2, "key": "ab".repeat(32)});
        let same = json!({"code": "AB3D-7X9Q", "created_at": 1, "key": a.key.to_hex()});
        let mut snap = Snapshot::default();
        snap.0.insert("accounts".into(), json!([foreign, same]));

        let stats = db.import_all(&snap).unwrap();
        assert_eq!(stats, ImportStats { imported: 1, skipped: 1 });
        assert_eq!(db.get_account(&a.code).unwrap().unwrap().key, a.key);
        assert_eq!(db.load_state(&a, "mario", 0).unwrap().unwrap(), b"mine".to_vec());
    }
}
