use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Authentication failed: the ciphertext or nonce was altered, or the
    /// key does not belong to the record's owner.
    #[error("Integrity check failed: tampered ciphertext or wrong key")]
    Integrity,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid account code: {0}")]
    InvalidCode(String),

    #[error("Invalid key bytes")]
    InvalidKeyBytes,
}
