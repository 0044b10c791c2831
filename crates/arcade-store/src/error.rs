use arcade_shared::CryptoError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite / SQLCipher error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// The collection name is not part of the schema.
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// A record handed to `put` lacks its declared key field.
    #[error("Record in `{collection}` is missing key field `{field}`")]
    MissingKey {
        collection: &'static str,
        field: &'static str,
    },

    /// JSON (de)serialization of a record body.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Envelope encryption / authentication failure.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A caller-supplied field is empty or malformed.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
