//! Record structs persisted in the collection store.
//!
//! Each struct serializes to the JSON object stored for its collection, so
//! the same shape appears in backups.  Encrypted fields hold an
//! [`Envelope`]; everything else is plaintext.

use std::collections::{BTreeMap, BTreeSet};

use arcade_shared::{AccountCode, AccountKey, Envelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Input-mapping table: emulator action -> key or button name.
pub type ControllerMapping = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Keyed by `code`.  The key is generated once and never rotated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    pub code: AccountCode,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub key: AccountKey,
}

// ---------------------------------------------------------------------------
// Encrypted, account-scoped
// ---------------------------------------------------------------------------

/// Emulator save state; key `code|game|slot`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveRecord {
    pub id: String,
    pub account_code: AccountCode,
    pub game: String,
    pub slot: u32,
    pub payload: Envelope,
    pub timestamp: i64,
}

/// Named input-mapping profile; key `code|name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControllerProfileRecord {
    pub id: String,
    pub account_code: AccountCode,
    pub name: String,
    pub mapping: Envelope,
    pub timestamp: i64,
}

/// Per-game input mapping; key `code|game`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameControllerRecord {
    pub id: String,
    pub account_code: AccountCode,
    pub game: String,
    pub mapping: Envelope,
    pub timestamp: i64,
}

/// Per-game emulator core options; key `code|game`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoreOptionsRecord {
    pub id: String,
    pub account_code: AccountCode,
    pub game: String,
    pub payload: Envelope,
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Plaintext
// ---------------------------------------------------------------------------

/// Key `code|game`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteRecord {
    pub id: String,
    pub account_code: AccountCode,
    pub game: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub rating: Option<u8>,
    pub timestamp: i64,
}

/// One per account, keyed by `account_code`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendListRecord {
    pub account_code: AccountCode,
    #[serde(default)]
    pub list: BTreeSet<AccountCode>,
}

/// Direct message.  `id` is allocated by the store and never reused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: i64,
    pub from: AccountCode,
    pub to: AccountCode,
    pub text: String,
    pub timestamp: i64,
}

/// Public-facing profile, keyed by `account_code`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRecord {
    pub account_code: AccountCode,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub timestamp: i64,
}

/// Fields a caller may set on their profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub status_message: Option<String>,
    pub avatar_url: Option<String>,
}

/// Site-wide core options, keyed by `game`; not account-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteCoreOptionsRecord {
    pub game: String,
    pub payload: serde_json::Value,
    pub timestamp: i64,
}

/// Persisted login-throttle window, stored in `meta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginAttemptsRecord {
    pub key: String,
    #[serde(default)]
    pub attempts: Vec<i64>,
}

// ---------------------------------------------------------------------------
// Shape check
// ---------------------------------------------------------------------------

/// Check that `record` deserializes as the record struct of `collection`.
///
/// Untyped writes accept any object with a key field; restored backups go
/// through this first so a hand-edited entry cannot break typed reads.
pub fn check_shape(collection: &str, record: &Value) -> Result<()> {
    fn shape<'a, T: Deserialize<'a>>(collection: &str, record: &'a Value) -> Result<()> {
        T::deserialize(record)
            .map(drop)
            .map_err(|e| StoreError::Validation(format!("malformed `{collection}` record: {e}")))
    }

    match collection {
        "accounts" => shape::<AccountRecord>(collection, record),
        "saves" => shape::<SaveRecord>(collection, record),
        "controllers" => shape::<ControllerProfileRecord>(collection, record),
        "controllers_game" => shape::<GameControllerRecord>(collection, record),
        "favorites" => shape::<FavoriteRecord>(collection, record),
        "friends" => shape::<FriendListRecord>(collection, record),
        "messages" => shape::<MessageRecord>(collection, record),
        "profiles" => shape::<ProfileRecord>(collection, record),
        "core_options" => shape::<CoreOptionsRecord>(collection, record),
        "core_options_site" => shape::<SiteCoreOptionsRecord>(collection, record),
        "meta" => shape::<LoginAttemptsRecord>(collection, record),
        other => Err(StoreError::UnknownCollection(other.to_string())),
    }
}
