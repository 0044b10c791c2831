//! Favorite games with tags, a note and an optional rating.

use arcade_shared::AccountCode;

use crate::collections::FAVORITES;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::keys;
use crate::models::FavoriteRecord;

/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// Optional metadata attached to a favorite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteMeta {
    pub tags: Vec<String>,
    pub note: String,
    pub rating: Option<u8>,
}

impl Database {
    /// Mark or unmark `game` as a favorite.
    ///
    /// Unmarking deletes the record and returns `None`; marking upserts it
    /// with `meta` and returns the stored record.
    pub fn set_favorite(
        &self,
        code: &AccountCode,
        game: &str,
        is_favorite: bool,
        meta: FavoriteMeta,
        now: i64,
    ) -> Result<Option<FavoriteRecord>> {
        keys::require("game", game)?;
        let id = keys::compose(code, &[game]);

        if !is_favorite {
            self.delete(FAVORITES.name, &id)?;
            return Ok(None);
        }

        if let Some(rating) = meta.rating {
            if rating > MAX_RATING {
                return Err(StoreError::Validation(format!(
                    "rating must be between 0 and {MAX_RATING}, got {rating}"
                )));
            }
        }

        let record = FavoriteRecord {
            id,
            account_code: code.clone(),
            game: game.to_string(),
            tags: meta.tags,
            note: meta.note,
            rating: meta.rating,
            timestamp: now,
        };
        self.put_record(&FAVORITES, &record)?;
        Ok(Some(record))
    }

    pub fn list_favorites(&self, code: &AccountCode) -> Result<Vec<FavoriteRecord>> {
        self.list_owned_records(&FAVORITES, code.as_str())
    }
}
