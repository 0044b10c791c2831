//! # arcade-shared
//!
//! Primitives shared by the arcade account store: the authenticated
//! encryption envelope, account codes and keys, and the error types they
//! produce. Nothing in this crate touches storage.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod identity;

pub use crypto::Envelope;
pub use error::{CryptoError, IdentityError};
pub use identity::{Account, AccountCode, AccountKey};
