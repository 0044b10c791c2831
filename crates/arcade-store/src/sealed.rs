//! Envelope helpers for the encrypted collections.

use arcade_shared::{crypto, AccountKey, Envelope};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub(crate) fn seal_bytes(key: &AccountKey, bytes: &[u8]) -> Result<Envelope> {
    Ok(crypto::encrypt(key, bytes)?)
}

pub(crate) fn open_bytes(key: &AccountKey, envelope: &Envelope) -> Result<Vec<u8>> {
    Ok(crypto::decrypt(key, envelope)?)
}

pub(crate) fn seal_json<T: Serialize>(key: &AccountKey, value: &T) -> Result<Envelope> {
    seal_bytes(key, &serde_json::to_vec(value)?)
}

pub(crate) fn open_json<T: DeserializeOwned>(key: &AccountKey, envelope: &Envelope) -> Result<T> {
    Ok(serde_json::from_slice(&open_bytes(key, envelope)?)?)
}
