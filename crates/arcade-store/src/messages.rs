use arcade_shared::AccountCode;
use serde_json::{Map, Value};

use crate::collections::MESSAGES;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::MessageRecord;

impl Database {
    pub fn send_message(
        &self,
        from: &AccountCode,
        to: &AccountCode,
        text: &str,
        now: i64,
    ) -> Result<MessageRecord> {
        if text.trim().is_empty() {
            return Err(StoreError::Validation("message text must not be empty".into()));
        }

        let mut fields = Map::new();
        fields.insert("from".into(), Value::from(from.as_str()));
        fields.insert("to".into(), Value::from(to.as_str()));
        fields.insert("text".into(), Value::from(text));
        fields.insert("timestamp".into(), Value::from(now));

        let id = self.insert_auto(MESSAGES.name, fields)?;
        Ok(MessageRecord {
            id,
            from: from.clone(),
            to: to.clone(),
            text: text.to_string(),
            timestamp: now,
        })
    }

    /// Messages sent or received by `code`, oldest first.
    pub fn list_messages(&self, code: &AccountCode) -> Result<Vec<MessageRecord>> {
        let mut messages: Vec<MessageRecord> = self.list_owned_records(&MESSAGES, code.as_str())?;
        messages.sort_by_key(|m| m.id);
        Ok(messages)
    }
}
