use arcade_shared::AccountCode;

use crate::collections::PROFILES;
use crate::database::Database;
use crate::error::Result;
use crate::models::{ProfileRecord, ProfileUpdate};

impl Database {
    /// Replace the profile for `code`.  Blank strings are stored as `None`.
    pub fn update_profile(
        &self,
        code: &AccountCode,
        update: ProfileUpdate,
        now: i64,
    ) -> Result<ProfileRecord> {
        let record = ProfileRecord {
            account_code: code.clone(),
            display_name: non_blank(update.display_name),
            status_message: non_blank(update.status_message),
            avatar_url: non_blank(update.avatar_url),
            timestamp: now,
        };
        self.put_record(&PROFILES, &record)?;
        Ok(record)
    }

    pub fn get_profile(&self, code: &AccountCode) -> Result<Option<ProfileRecord>> {
        self.get_record(&PROFILES, code.as_str())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
