//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the vault can open with zero
//! configuration.

use std::path::PathBuf;
use std::time::Duration;

use arcade_shared::constants::{
    KDF_CONTEXT_BOOTSTRAP, KDF_CONTEXT_DB_KEY, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW_SECS,
    SESSION_IDLE_SECS,
};
use arcade_shared::crypto::derive_key_from_passphrase;

/// Vault configuration.
#[derive(Clone)]
pub struct VaultConfig {
    /// Database file location.
    /// Env: `ARCADE_DB_PATH`
    /// Default: platform data directory (`.../arcade/arcade.db`).
    pub db_path: Option<PathBuf>,

    /// Idle time after which the session is logged out.
    /// Env: `ARCADE_IDLE_TIMEOUT_SECS`
    /// Default: 15 minutes.
    pub idle_timeout: Duration,

    /// Login attempts allowed per window.
    /// Env: `ARCADE_LOGIN_MAX_ATTEMPTS`
    /// Default: `5`
    pub login_max_attempts: usize,

    /// Sliding window for the login throttle.
    /// Env: `ARCADE_LOGIN_WINDOW_SECS`
    /// Default: 60 seconds.
    pub login_window: Duration,

    /// Whether encrypted writes without a session create and log into a
    /// fresh account instead of failing.
    /// Env: `ARCADE_AUTO_PROVISION` (true/false)
    /// Default: `true`
    pub auto_provision: bool,

    /// Secret the database key is derived from (SQLCipher builds only).
    /// Env: `ARCADE_DEVICE_PASSPHRASE`
    /// Default: none (fixed bootstrap key).
    pub device_passphrase: Option<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            idle_timeout: Duration::from_secs(SESSION_IDLE_SECS),
            login_max_attempts: LOGIN_MAX_ATTEMPTS,
            login_window: Duration::from_secs(LOGIN_WINDOW_SECS),
            auto_provision: true,
            device_passphrase: None,
        }
    }
}

// Hand-written so the passphrase never reaches a log line.
impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("db_path", &self.db_path)
            .field("idle_timeout", &self.idle_timeout)
            .field("login_max_attempts", &self.login_max_attempts)
            .field("login_window", &self.login_window)
            .field("auto_provision", &self.auto_provision)
            .field(
                "device_passphrase",
                &self.device_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl VaultConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("ARCADE_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(val) = std::env::var("ARCADE_IDLE_TIMEOUT_SECS") {
            match parse_secs(&val) {
                Some(d) => config.idle_timeout = d,
                None => tracing::warn!(value = %val, "Invalid ARCADE_IDLE_TIMEOUT_SECS, using default"),
            }
        }

        if let Ok(val) = std::env::var("ARCADE_LOGIN_MAX_ATTEMPTS") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.login_max_attempts = n,
                _ => tracing::warn!(value = %val, "Invalid ARCADE_LOGIN_MAX_ATTEMPTS, using default"),
            }
        }

        if let Ok(val) = std::env::var("ARCADE_LOGIN_WINDOW_SECS") {
            match parse_secs(&val) {
                Some(d) => config.login_window = d,
                None => tracing::warn!(value = %val, "Invalid ARCADE_LOGIN_WINDOW_SECS, using default"),
            }
        }

        if let Ok(val) = std::env::var("ARCADE_AUTO_PROVISION") {
            config.auto_provision = parse_flag(&val);
        }

        if let Ok(pass) = std::env::var("ARCADE_DEVICE_PASSPHRASE") {
            if !pass.is_empty() {
                config.device_passphrase = Some(pass);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// 32-byte database key derived from the device passphrase.
    pub fn store_key(&self) -> [u8; 32] {
        let secret = self
            .device_passphrase
            .as_deref()
            .unwrap_or(KDF_CONTEXT_BOOTSTRAP);
        derive_key_from_passphrase(secret.as_bytes(), KDF_CONTEXT_DB_KEY)
    }
}

/// Positive whole seconds.
fn parse_secs(val: &str) -> Option<Duration> {
    match val.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(Duration::from_secs(n)),
        _ => None,
    }
}

fn parse_flag(val: &str) -> bool {
    let val = val.trim();
    val != "false" && val != "0"
}
