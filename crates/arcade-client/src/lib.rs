//! # arcade-client
//!
//! The application-facing vault: account creation and login, the idle
//! session timer, the login throttle and every per-account repository,
//! on top of `arcade-store`.
//!
//! All vault operations are synchronous.  The only async piece is the idle
//! timer, which runs on the tokio runtime the vault was built on.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod rate_limit;
pub mod session;
pub mod vault;

pub use arcade_shared::{Account, AccountCode};
pub use arcade_store::{
    ControllerMapping, FavoriteMeta, FavoriteRecord, ImportStats, MessageRecord, ProfileRecord,
    ProfileUpdate, SaveRecord, Snapshot,
};
pub use clock::{Clock, SystemClock};
pub use config::VaultConfig;
pub use error::VaultError;
pub use events::{RefreshCallback, VaultEvent};
pub use rate_limit::LoginRateLimiter;
pub use session::{ActivityHandle, SessionState};
pub use vault::{SecureRng, SharedDatabase, Vault, VaultBuilder};

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.  `RUST_LOG` overrides the
/// default filter.  Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arcade_client=debug,arcade_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
