//! Encrypted emulator save states.

use arcade_shared::{Account, AccountCode};

use crate::collections::SAVES;
use crate::database::Database;
use crate::error::Result;
use crate::keys;
use crate::models::SaveRecord;
use crate::sealed;

impl Database {
    /// Encrypt and store a save state, replacing any earlier one in the
    /// same slot.
    pub fn save_state(
        &self,
        account: &Account,
        game: &str,
        slot: u32,
        bytes: &[u8],
        now: i64,
    ) -> Result<SaveRecord> {
        keys::require("game", game)?;
        let record = SaveRecord {
            id: keys::compose(&account.code, &[game, &slot.to_string()]),
            account_code: account.code.clone(),
            game: game.to_string(),
            slot,
            payload: sealed::seal_bytes(&account.key, bytes)?,
            timestamp: now,
        };
        self.put_record(&SAVES, &record)?;
        tracing::debug!(game, slot, size = bytes.len(), "save state stored");
        Ok(record)
    }

    /// `None` if the slot was never saved; `Crypto(Integrity)` if it was
    /// saved but can no longer be authenticated.
    pub fn load_state(&self, account: &Account, game: &str, slot: u32) -> Result<Option<Vec<u8>>> {
        let id = keys::compose(&account.code, &[game, &slot.to_string()]);
        match self.get_record::<SaveRecord>(&SAVES, &id)? {
            Some(rec) => Ok(Some(sealed::open_bytes(&account.key, &rec.payload)?)),
            None => Ok(None),
        }
    }

    pub fn list_saves(&self, code: &AccountCode, game: Option<&str>) -> Result<Vec<SaveRecord>> {
        let saves: Vec<SaveRecord> = self.list_owned_records(&SAVES, code.as_str())?;
        Ok(saves
            .into_iter()
            .filter(|s| game.map_or(true, |g| s.game == g))
            .collect())
    }
}
