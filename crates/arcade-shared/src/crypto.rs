use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::NONCE_SIZE;
use crate::error::CryptoError;
use crate::identity::AccountKey;

/// Nonce + ciphertext pair produced by one encryption.
///
/// Stored inside records as `{ "nonce": "<hex>", "ciphertext": "<hex>" }` and
/// exported verbatim by backups; nothing outside this module ever sees the
/// plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(with = "hex::serde")]
    pub nonce: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

// Fresh OS randomness on every call; nonces are never derived or counted.
pub fn encrypt(key: &AccountKey, plaintext: &[u8]) -> Result<Envelope, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(Envelope {
        nonce: nonce_bytes.to_vec(),
        ciphertext,
    })
}

pub fn decrypt(key: &AccountKey, envelope: &Envelope) -> Result<Vec<u8>, CryptoError> {
    if envelope.nonce.len() != NONCE_SIZE {
        return Err(CryptoError::Integrity);
    }

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = XNonce::from_slice(&envelope.nonce);

    cipher
        .decrypt(nonce, envelope.ciphertext.as_slice())
        .map_err(|_| CryptoError::Integrity)
}

pub fn derive_key_from_passphrase(passphrase: &[u8], context: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(passphrase);
    let hash = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&hash.as_bytes()[..32]);
    key
}
