//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.
//!
//! Note: SQLCipher (encrypted SQLite) requires OpenSSL at build time and is
//! behind the `sqlcipher` feature. The default build uses plain SQLite and
//! relies on application-layer encryption of the sensitive collections via
//! XChaCha20-Poly1305.

use std::path::{Path, PathBuf};

use arcade_shared::constants::APP_NAME;
use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/arcade/arcade.db`
    /// - macOS:   `~/Library/Application Support/com.arcade.Arcade/arcade.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\arcade\Arcade\data\arcade.db`
    pub fn new(db_key: &[u8; 32]) -> Result<Self> {
        Self::open_at(&default_path()?, db_key)
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// Opening an existing file keeps every record; a new file starts with
    /// every collection present and empty.
    pub fn open_at(path: &Path, db_key: &[u8; 32]) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;
        apply_key(&conn, db_key)?;

        // Recommended SQLite settings.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        // Run schema migrations.
        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    ///
    /// Callers should prefer the collection helpers; direct access is for
    /// transactions spanning several collections.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

/// Platform data-directory location of `arcade.db`.
pub fn default_path() -> Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("com", "arcade", APP_NAME).ok_or(StoreError::NoDataDir)?;
    Ok(project_dirs.data_dir().join("arcade.db"))
}

#[cfg(feature = "sqlcipher")]
fn apply_key(conn: &Connection, db_key: &[u8; 32]) -> Result<()> {
    conn.pragma_update(None, "key", format!("x'{}'", hex::encode(db_key)))?;
    Ok(())
}

#[cfg(not(feature = "sqlcipher"))]
fn apply_key(_conn: &Connection, _db_key: &[u8; 32]) -> Result<()> {
    Ok(())
}
