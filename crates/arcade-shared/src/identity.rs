use std::fmt;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{ACCOUNT_KEY_SIZE, CODE_ALPHABET, CODE_GROUP_LEN, CODE_SEPARATOR};
use crate::error::IdentityError;

/// A short human-typable account code such as `AB3D-7X9Q`.
///
/// Possession of the code is the only login factor. Eight symbols from a
/// 32-symbol alphabet give about 40 bits, which the login throttle has to
/// make up for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AccountCode(String);

impl AccountCode {
    /// Draw a fresh code from a cryptographically secure source.
    ///
    /// Each symbol is the low five bits of one random byte; 256 is a
    /// multiple of 32 so every symbol is equally likely.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; CODE_GROUP_LEN * 2];
        rng.fill_bytes(&mut bytes);

        let mut code = String::with_capacity(CODE_GROUP_LEN * 2 + 1);
        for (i, b) in bytes.iter().enumerate() {
            if i == CODE_GROUP_LEN {
                code.push(CODE_SEPARATOR);
            }
            code.push(CODE_ALPHABET[(*b & 0x1f) as usize] as char);
        }
        Self(code)
    }

    /// Normalize user input (uppercase, whitespace stripped) and validate it.
    pub fn parse(input: &str) -> Result<Self, IdentityError> {
        let normalized: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        if !is_well_formed(&normalized) {
            return Err(IdentityError::InvalidCode(normalized));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe form: first group only (`AB3D-****`).
    pub fn masked(&self) -> String {
        let head: String = self.0.chars().take(CODE_GROUP_LEN).collect();
        format!("{head}{CODE_SEPARATOR}****")
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Stored codes are already normalized, so deserialization only validates.
impl<'de> Deserialize<'de> for AccountCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if !is_well_formed(&s) {
            return Err(serde::de::Error::custom(IdentityError::InvalidCode(s)));
        }
        Ok(Self(s))
    }
}

fn is_well_formed(code: &str) -> bool {
    let bytes = code.as_bytes();
    if bytes.len() != CODE_GROUP_LEN * 2 + 1 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| {
        if i == CODE_GROUP_LEN {
            *b == CODE_SEPARATOR as u8
        } else {
            CODE_ALPHABET.contains(b)
        }
    })
}

/// 256-bit per-account symmetric key. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccountKey([u8; ACCOUNT_KEY_SIZE]);

impl AccountKey {
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut key = [0u8; ACCOUNT_KEY_SIZE];
        rng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; ACCOUNT_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(s).map_err(|_| IdentityError::InvalidKeyBytes)?;
        let arr: [u8; ACCOUNT_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidKeyBytes)?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// Never print key material, not even in debug builds.
impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountKey(<redacted>)")
    }
}

impl Serialize for AccountKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The logged-in identity: the code plus the key that encrypts its records.
#[derive(Debug, Clone)]
pub struct Account {
    pub code: AccountCode,
    pub key: AccountKey,
}
