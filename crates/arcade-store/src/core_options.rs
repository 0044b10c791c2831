//! Emulator core options: encrypted per account, plus a plaintext
//! site-wide default per game.

use arcade_shared::Account;
use serde_json::Value;

use crate::collections::{CORE_OPTIONS, CORE_OPTIONS_SITE};
use crate::database::Database;
use crate::error::Result;
use crate::keys;
use crate::models::{CoreOptionsRecord, SiteCoreOptionsRecord};
use crate::sealed;

impl Database {
    pub fn save_core_options(
        &self,
        account: &Account,
        game: &str,
        payload: &Value,
        now: i64,
    ) -> Result<CoreOptionsRecord> {
        let game = keys::normalize_game(game);
        keys::require("game", &game)?;
        let record = CoreOptionsRecord {
            id: keys::compose(&account.code, &[&game]),
            account_code: account.code.clone(),
            game,
            payload: sealed::seal_json(&account.key, payload)?,
            timestamp: now,
        };
        self.put_record(&CORE_OPTIONS, &record)?;
        Ok(record)
    }

    pub fn load_core_options(&self, account: &Account, game: &str) -> Result<Option<Value>> {
        let id = keys::compose(&account.code, &[&keys::normalize_game(game)]);
        self.get_record::<CoreOptionsRecord>(&CORE_OPTIONS, &id)?
            .map(|rec| sealed::open_json(&account.key, &rec.payload))
            .transpose()
    }

    pub fn save_site_core_options(
        &self,
        game: &str,
        payload: &Value,
        now: i64,
    ) -> Result<SiteCoreOptionsRecord> {
        let game = keys::normalize_game(game);
        keys::require("game", &game)?;
        let record = SiteCoreOptionsRecord {
            game,
            payload: payload.clone(),
            timestamp: now,
        };
        self.put_record(&CORE_OPTIONS_SITE, &record)?;
        Ok(record)
    }

    pub fn load_site_core_options(&self, game: &str) -> Result<Option<Value>> {
        Ok(self
            .get_record::<SiteCoreOptionsRecord>(&CORE_OPTIONS_SITE, &keys::normalize_game(game))?
            .map(|rec| rec.payload))
    }
}
