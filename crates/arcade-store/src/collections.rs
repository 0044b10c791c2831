//! Static schema: every collection, its key field and its owner fields.

use crate::error::{Result, StoreError};

/// Declaration of one named collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDef {
    pub name: &'static str,
    /// Field every record must carry; its value is the primary key.
    pub key_field: &'static str,
    /// Fields holding account codes that own the record (indexed).
    pub owner_fields: &'static [&'static str],
    /// Keys are integers allocated by the store.
    pub auto_increment: bool,
    /// Included in full-store exports.
    pub exported: bool,
}

const fn def(
    name: &'static str,
    key_field: &'static str,
    owner_fields: &'static [&'static str],
) -> CollectionDef {
    CollectionDef {
        name,
        key_field,
        owner_fields,
        auto_increment: false,
        exported: true,
    }
}

pub const ACCOUNTS: CollectionDef = def("accounts", "code", &[]);
pub const SAVES: CollectionDef = def("saves", "id", &["account_code"]);
pub const CONTROLLERS: CollectionDef = def("controllers", "id", &["account_code"]);
pub const CONTROLLERS_GAME: CollectionDef = def("controllers_game", "id", &["account_code"]);
pub const FAVORITES: CollectionDef = def("favorites", "id", &["account_code"]);
pub const FRIENDS: CollectionDef = def("friends", "account_code", &["account_code"]);
pub const MESSAGES: CollectionDef = CollectionDef {
    auto_increment: true,
    ..def("messages", "id", &["from", "to"])
};
pub const PROFILES: CollectionDef = def("profiles", "account_code", &["account_code"]);
pub const CORE_OPTIONS: CollectionDef = def("core_options", "id", &["account_code"]);
pub const CORE_OPTIONS_SITE: CollectionDef = def("core_options_site", "game", &[]);
// Device-local bookkeeping (login throttle); never exported.
pub const META: CollectionDef = CollectionDef {
    exported: false,
    ..def("meta", "key", &[])
};

pub const ALL: &[CollectionDef] = &[
    ACCOUNTS,
    SAVES,
    CONTROLLERS,
    CONTROLLERS_GAME,
    FAVORITES,
    FRIENDS,
    MESSAGES,
    PROFILES,
    CORE_OPTIONS,
    CORE_OPTIONS_SITE,
    META,
];

/// Look up a collection by name.
pub fn lookup(name: &str) -> Result<&'static CollectionDef> {
    ALL.iter()
        .find(|c| c.name == name)
        .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
}
