/// Application name
pub const APP_NAME: &str = "Arcade";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Account key size in bytes (for XChaCha20-Poly1305)
pub const ACCOUNT_KEY_SIZE: usize = 32;

/// Human-typable code alphabet: 32 symbols, no `0`/`O` or `1`/`I`.
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Symbols per code group; a code is two groups joined by [`CODE_SEPARATOR`].
pub const CODE_GROUP_LEN: usize = 4;

/// Separator between the two code groups (`AB3D-7X9Q`).
pub const CODE_SEPARATOR: char = '-';

/// Separator used when joining composite record keys.
pub const KEY_SEPARATOR: char = '|';

/// Login throttle: attempts allowed per window.
pub const LOGIN_MAX_ATTEMPTS: usize = 5;

/// Login throttle: sliding window length in seconds.
pub const LOGIN_WINDOW_SECS: u64 = 60;

/// Session idle timeout in seconds (15 minutes).
pub const SESSION_IDLE_SECS: u64 = 15 * 60;

/// Key derivation contexts (BLAKE3)
pub const KDF_CONTEXT_DB_KEY: &str = "arcade-db-key-v1";
pub const KDF_CONTEXT_BOOTSTRAP: &str = "arcade-bootstrap-db-open-v1";
