//! Encrypted input-mapping profiles and per-game controller mappings.

use arcade_shared::{Account, AccountCode};

use crate::collections::{CONTROLLERS, CONTROLLERS_GAME};
use crate::database::Database;
use crate::error::Result;
use crate::keys;
use crate::models::{ControllerMapping, ControllerProfileRecord, GameControllerRecord};
use crate::sealed;

impl Database {
    // ------------------------------------------------------------------
    // Named profiles
    // ------------------------------------------------------------------

    pub fn save_profile(
        &self,
        account: &Account,
        name: &str,
        mapping: &ControllerMapping,
        now: i64,
    ) -> Result<ControllerProfileRecord> {
        keys::require("profile name", name)?;
        let record = ControllerProfileRecord {
            id: keys::compose(&account.code, &[name]),
            account_code: account.code.clone(),
            name: name.to_string(),
            mapping: sealed::seal_json(&account.key, mapping)?,
            timestamp: now,
        };
        self.put_record(&CONTROLLERS, &record)?;
        Ok(record)
    }

    pub fn load_profile_mapping(
        &self,
        account: &Account,
        name: &str,
    ) -> Result<Option<ControllerMapping>> {
        let id = keys::compose(&account.code, &[name]);
        self.get_record::<ControllerProfileRecord>(&CONTROLLERS, &id)?
            .map(|rec| sealed::open_json(&account.key, &rec.mapping))
            .transpose()
    }

    pub fn list_profiles(&self, code: &AccountCode) -> Result<Vec<ControllerProfileRecord>> {
        self.list_owned_records(&CONTROLLERS, code.as_str())
    }

    // ------------------------------------------------------------------
    // Per-game mappings
    // ------------------------------------------------------------------

    /// `game` is normalized (`"Pacman.zip"` and `"pacman"` share a mapping).
    pub fn save_game_controller(
        &self,
        account: &Account,
        game: &str,
        mapping: &ControllerMapping,
        now: i64,
    ) -> Result<GameControllerRecord> {
        let game = keys::normalize_game(game);
        keys::require("game", &game)?;
        let record = GameControllerRecord {
            id: keys::compose(&account.code, &[&game]),
            account_code: account.code.clone(),
            game,
            mapping: sealed::seal_json(&account.key, mapping)?,
            timestamp: now,
        };
        self.put_record(&CONTROLLERS_GAME, &record)?;
        Ok(record)
    }

    pub fn get_game_controller(
        &self,
        account: &Account,
        game: &str,
    ) -> Result<Option<ControllerMapping>> {
        let id = keys::compose(&account.code, &[&keys::normalize_game(game)]);
        self.get_record::<GameControllerRecord>(&CONTROLLERS_GAME, &id)?
            .map(|rec| sealed::open_json(&account.key, &rec.mapping))
            .transpose()
    }

    pub fn list_game_controllers(&self, code: &AccountCode) -> Result<Vec<GameControllerRecord>> {
        self.list_owned_records(&CONTROLLERS_GAME, code.as_str())
    }
}
