//! Composite key construction and input validation.

use arcade_shared::constants::KEY_SEPARATOR;
use arcade_shared::AccountCode;

use crate::error::{Result, StoreError};

/// Reject empty values and values containing the key separator, so two
/// different component lists can never join to the same key.
pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(StoreError::Validation(format!(
            "{field} must not contain '{KEY_SEPARATOR}'"
        )));
    }
    Ok(())
}

/// `code|part|part...`
pub fn compose(code: &AccountCode, parts: &[&str]) -> String {
    let mut key = code.as_str().to_string();
    for part in parts {
        key.push(KEY_SEPARATOR);
        key.push_str(part);
    }
    key
}

/// ROM file name to game id: extension stripped, lowercased.
/// `"Pac-Man.zip"` -> `"pac-man"`.
pub fn normalize_game(game: &str) -> String {
    let trimmed = game.trim();
    let stem = match trimmed.rfind('.') {
        Some(dot) if dot > 0 => &trimmed[..dot],
        _ => trimmed,
    };
    stem.to_lowercase()
}
