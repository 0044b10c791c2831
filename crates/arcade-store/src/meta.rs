//! Device-local bookkeeping kept in the `meta` collection.

use crate::collections::META;
use crate::database::Database;
use crate::error::Result;
use crate::models::LoginAttemptsRecord;

const LOGIN_ATTEMPTS_KEY: &str = "login_attempts";

impl Database {
    /// Recorded login attempt timestamps (ms), unpruned.
    pub fn login_attempts(&self) -> Result<Vec<i64>> {
        Ok(self
            .get_record::<LoginAttemptsRecord>(&META, LOGIN_ATTEMPTS_KEY)?
            .map(|r| r.attempts)
            .unwrap_or_default())
    }

    pub fn set_login_attempts(&self, attempts: Vec<i64>) -> Result<()> {
        self.put_record(
            &META,
            &LoginAttemptsRecord {
                key: LOGIN_ATTEMPTS_KEY.to_string(),
                attempts,
            },
        )?;
        Ok(())
    }
}
