//! Account directory: code -> key.

use arcade_shared::{Account, AccountCode};

use crate::collections::ACCOUNTS;
use crate::database::Database;
use crate::error::Result;
use crate::models::AccountRecord;

impl Database {
    /// Persist a new account.  Returns `false` (and writes nothing) if the
    /// code is already taken; codes are immutable once created.
    pub fn insert_account(&self, record: &AccountRecord) -> Result<bool> {
        if self.account_exists(&record.code)? {
            return Ok(false);
        }
        self.put_record(&ACCOUNTS, record)?;
        Ok(true)
    }

    pub fn account_exists(&self, code: &AccountCode) -> Result<bool> {
        Ok(self.get(ACCOUNTS.name, code.as_str())?.is_some())
    }

    pub fn get_account(&self, code: &AccountCode) -> Result<Option<AccountRecord>> {
        self.get_record(&ACCOUNTS, code.as_str())
    }

    /// Code + key pair for a stored account, if any.
    pub fn load_account(&self, code: &AccountCode) -> Result<Option<Account>> {
        Ok(self.get_account(code)?.map(|rec| Account {
            code: rec.code,
            key: rec.key,
        }))
    }
}
