//! # arcade-store
//!
//! Local persistent storage for the arcade account system, backed by SQLite.
//!
//! Records live in named collections, each with a declared key field.  The
//! crate exposes a synchronous `Database` handle with generic collection
//! operations and typed helpers for every domain record.  Save states,
//! controller mappings and core options are sealed with the owning
//! account's key before they reach the database.

pub mod accounts;
pub mod backup;
pub mod collections;
pub mod controllers;
pub mod core_options;
pub mod database;
pub mod favorites;
pub mod friends;
pub mod keys;
pub mod messages;
pub mod meta;
pub mod migrations;
pub mod models;
pub mod profiles;
pub mod records;
pub mod saves;

mod error;
mod sealed;

pub use backup::{ImportStats, Snapshot};
pub use collections::CollectionDef;
pub use database::Database;
pub use error::StoreError;
pub use favorites::FavoriteMeta;
pub use models::*;
