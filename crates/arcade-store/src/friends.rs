//! Friend list: one record per account, treated as a set of codes.

use std::collections::BTreeSet;

use arcade_shared::AccountCode;

use crate::collections::FRIENDS;
use crate::database::Database;
use crate::error::Result;
use crate::models::FriendListRecord;

impl Database {
    fn friend_list(&self, code: &AccountCode) -> Result<FriendListRecord> {
        Ok(self
            .get_record(&FRIENDS, code.as_str())?
            .unwrap_or_else(|| FriendListRecord {
                account_code: code.clone(),
                list: BTreeSet::new(),
            }))
    }

    /// Returns `true` if `friend` was not already in the list.
    pub fn add_friend(&self, code: &AccountCode, friend: &AccountCode) -> Result<bool> {
        let mut rec = self.friend_list(code)?;
        let added = rec.list.insert(friend.clone());
        self.put_record(&FRIENDS, &rec)?;
        Ok(added)
    }

    /// Returns `true` if `friend` was present.  Removing an absent code is
    /// a no-op.
    pub fn remove_friend(&self, code: &AccountCode, friend: &AccountCode) -> Result<bool> {
        let mut rec = self.friend_list(code)?;
        let removed = rec.list.remove(friend);
        self.put_record(&FRIENDS, &rec)?;
        Ok(removed)
    }

    pub fn list_friends(&self, code: &AccountCode) -> Result<Vec<AccountCode>> {
        Ok(self.friend_list(code)?.list.into_iter().collect())
    }
}
