use std::sync::PoisonError;

use arcade_shared::{CryptoError, IdentityError};
use arcade_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the vault to its callers.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The login code is malformed or names no account.
    #[error("Account not found")]
    NotFound,

    #[error("Too many login attempts, try again shortly")]
    RateLimited,

    /// Stored ciphertext was tampered with or sealed under another key.
    #[error("Stored data failed its integrity check")]
    Integrity,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No account is logged in")]
    NoSession,

    /// The idle timer needs a tokio runtime to run on.
    #[error("No tokio runtime available")]
    NoRuntime,

    #[error("Could not allocate a unique account code")]
    CodeCollision,

    #[error("Internal lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for VaultError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Crypto(CryptoError::Integrity) => Self::Integrity,
            StoreError::Validation(msg) => Self::Validation(msg),
            other => Self::Store(other),
        }
    }
}

impl From<IdentityError> for VaultError {
    fn from(e: IdentityError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl<T> From<PoisonError<T>> for VaultError {
    fn from(_: PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
