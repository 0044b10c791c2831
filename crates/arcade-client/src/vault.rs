//! The vault: the single entry point the application talks to.
//!
//! A [`Vault`] owns a session context and an idle timer, and shares a
//! [`Database`] handle that may also back other vaults (one per simulated
//! user).  Every repository call resolves the current account from the
//! session, so callers never pass codes or keys around.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use arcade_shared::{Account, AccountCode, AccountKey};
use arcade_store::collections::{
    CONTROLLERS, CONTROLLERS_GAME, CORE_OPTIONS, CORE_OPTIONS_SITE, FAVORITES, FRIENDS, MESSAGES,
    PROFILES, SAVES,
};
use arcade_store::{
    AccountRecord, ControllerMapping, ControllerProfileRecord, Database, FavoriteMeta,
    FavoriteRecord, GameControllerRecord, ImportStats, MessageRecord, ProfileRecord,
    ProfileUpdate, SaveRecord, Snapshot, StoreError,
};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::clock::{Clock, SystemClock};
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::events::{emit_event, RefreshCallback, VaultEvent};
use crate::rate_limit::LoginRateLimiter;
use crate::session::{ActivityHandle, SessionContext, SessionManager, SessionState};

/// Regeneration attempts before giving up on a fresh account code.
const MAX_CODE_ATTEMPTS: usize = 16;

/// Cryptographically secure randomness for codes and keys.
pub trait SecureRng: RngCore + CryptoRng + Send {}

impl<T: RngCore + CryptoRng + Send> SecureRng for T {}

/// Database handle shared between vaults.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Configures collaborators before the vault is opened.
pub struct VaultBuilder {
    config: VaultConfig,
    database: Option<SharedDatabase>,
    clock: Option<Arc<dyn Clock>>,
    rng: Option<Box<dyn SecureRng>>,
    on_refresh: Option<RefreshCallback>,
}

impl VaultBuilder {
    pub fn new(config: VaultConfig) -> Self {
        Self {
            config,
            database: None,
            clock: None,
            rng: None,
            on_refresh: None,
        }
    }

    /// Use an already-open database instead of opening `config.db_path`.
    pub fn shared_database(mut self, db: SharedDatabase) -> Self {
        self.database = Some(db);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn rng(mut self, rng: impl SecureRng + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    pub fn on_refresh(mut self, callback: impl Fn(VaultEvent) + Send + Sync + 'static) -> Self {
        self.on_refresh = Some(Arc::new(callback));
        self
    }

    /// Open the vault.  Must be called from within a tokio runtime, which
    /// the idle timer will run on.
    pub fn build(self) -> Result<Vault> {
        let runtime = Handle::try_current().map_err(|_| VaultError::NoRuntime)?;

        let db = match self.database {
            Some(db) => db,
            None => {
                let key = self.config.store_key();
                let db = match &self.config.db_path {
                    Some(path) => Database::open_at(path, &key)?,
                    None => Database::new(&key)?,
                };
                Arc::new(Mutex::new(db))
            }
        };

        tracing::debug!(config = ?self.config, "vault opened");

        Ok(Vault {
            db,
            session: SessionContext::default(),
            timer: SessionManager::new(self.config.idle_timeout, runtime),
            limiter: LoginRateLimiter::new(
                self.config.login_max_attempts,
                self.config.login_window,
            ),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            rng: Mutex::new(self.rng.unwrap_or_else(|| Box::new(OsRng))),
            auto_provision: self.config.auto_provision,
            on_refresh: self.on_refresh,
        })
    }
}

pub struct Vault {
    db: SharedDatabase,
    session: SessionContext,
    timer: SessionManager,
    limiter: LoginRateLimiter,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn SecureRng>>,
    auto_provision: bool,
    on_refresh: Option<RefreshCallback>,
}

impl Vault {
    pub fn builder(config: VaultConfig) -> VaultBuilder {
        VaultBuilder::new(config)
    }

    /// Open with default collaborators.
    pub fn open(config: VaultConfig) -> Result<Self> {
        VaultBuilder::new(config).build()
    }

    pub fn database(&self) -> SharedDatabase {
        self.db.clone()
    }

    // ------------------------------------------------------------------
    // Identity and session
    // ------------------------------------------------------------------

    /// Create an account and return its code.  Does not log in.
    pub fn create_account(&self) -> Result<AccountCode> {
        let account = self.provision()?;
        self.emit(VaultEvent::AccountCreated);
        Ok(account.code)
    }

    /// Log in with a typed code.
    ///
    /// Every call consumes throttle quota, including malformed codes and
    /// codes that name no account.
    pub fn login(&self, code: &str) -> Result<bool> {
        let account = {
            let db = self.db()?;
            if !self.limiter.can_attempt(&db, self.now())? {
                return Err(VaultError::RateLimited);
            }

            let Ok(code) = AccountCode::parse(code) else {
                tracing::debug!("login with malformed code");
                return Err(VaultError::NotFound);
            };
            match db.load_account(&code)? {
                Some(account) => account,
                None => {
                    tracing::info!(code = %code.masked(), "login failed: unknown code");
                    return Err(VaultError::NotFound);
                }
            }
        };

        self.begin_session(account)?;
        self.emit(VaultEvent::LoggedIn);
        Ok(true)
    }

    pub fn logout(&self) -> Result<()> {
        self.timer.stop()?;
        if let Some(account) = self.session.clear()? {
            tracing::info!(code = %account.code.masked(), "logged out");
        }
        self.emit(VaultEvent::LoggedOut);
        Ok(())
    }

    pub fn current_code(&self) -> Result<Option<AccountCode>> {
        Ok(self.session.current()?.map(|a| a.code))
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.session.current(), Ok(Some(_)))
    }

    pub fn session_state(&self) -> SessionState {
        self.timer.state()
    }

    /// Pointer, key or touch input occurred.
    pub fn record_activity(&self) {
        self.timer.touch();
    }

    pub fn activity_handle(&self) -> ActivityHandle {
        self.timer.activity_handle()
    }

    /// Remaining login attempts in the current throttle window.
    pub fn login_attempts_remaining(&self) -> Result<usize> {
        let db = self.db()?;
        Ok(self.limiter.remaining(&db, self.now())?)
    }

    // ------------------------------------------------------------------
    // Save states (encrypted)
    // ------------------------------------------------------------------

    pub fn save_state(&self, game: &str, slot: u32, bytes: &[u8]) -> Result<()> {
        let account = self.writer()?;
        self.db()?.save_state(&account, game, slot, bytes, self.now())?;
        self.emit(VaultEvent::DataChanged { collection: SAVES.name });
        Ok(())
    }

    pub fn load_state(&self, game: &str, slot: u32) -> Result<Option<Vec<u8>>> {
        let Some(account) = self.session.current()? else {
            return Ok(None);
        };
        Ok(self.db()?.load_state(&account, game, slot)?)
    }

    pub fn list_saves(&self, game: Option<&str>) -> Result<Vec<SaveRecord>> {
        let Some(account) = self.session.current()? else {
            return Ok(Vec::new());
        };
        Ok(self.db()?.list_saves(&account.code, game)?)
    }

    // ------------------------------------------------------------------
    // Controller mappings (encrypted)
    // ------------------------------------------------------------------

    pub fn save_profile(&self, name: &str, mapping: &ControllerMapping) -> Result<()> {
        let account = self.writer()?;
        self.db()?.save_profile(&account, name, mapping, self.now())?;
        self.emit(VaultEvent::DataChanged { collection: CONTROLLERS.name });
        Ok(())
    }

    pub fn load_profile_mapping(&self, name: &str) -> Result<Option<ControllerMapping>> {
        let Some(account) = self.session.current()? else {
            return Ok(None);
        };
        Ok(self.db()?.load_profile_mapping(&account, name)?)
    }

    pub fn list_profiles(&self) -> Result<Vec<ControllerProfileRecord>> {
        let Some(account) = self.session.current()? else {
            return Ok(Vec::new());
        };
        Ok(self.db()?.list_profiles(&account.code)?)
    }

    pub fn save_game_controller(&self, game: &str, mapping: &ControllerMapping) -> Result<()> {
        let account = self.writer()?;
        self.db()?
            .save_game_controller(&account, game, mapping, self.now())?;
        self.emit(VaultEvent::DataChanged {
            collection: CONTROLLERS_GAME.name,
        });
        Ok(())
    }

    pub fn get_game_controller(&self, game: &str) -> Result<Option<ControllerMapping>> {
        let Some(account) = self.session.current()? else {
            return Ok(None);
        };
        Ok(self.db()?.get_game_controller(&account, game)?)
    }

    pub fn list_game_controllers(&self) -> Result<Vec<GameControllerRecord>> {
        let Some(account) = self.session.current()? else {
            return Ok(Vec::new());
        };
        Ok(self.db()?.list_game_controllers(&account.code)?)
    }

    // ------------------------------------------------------------------
    // Core options
    // ------------------------------------------------------------------

    pub fn save_core_options(&self, game: &str, options: &Value) -> Result<()> {
        let account = self.writer()?;
        self.db()?
            .save_core_options(&account, game, options, self.now())?;
        self.emit(VaultEvent::DataChanged {
            collection: CORE_OPTIONS.name,
        });
        Ok(())
    }

    pub fn load_core_options(&self, game: &str) -> Result<Option<Value>> {
        let Some(account) = self.session.current()? else {
            return Ok(None);
        };
        Ok(self.db()?.load_core_options(&account, game)?)
    }

    /// Device-wide defaults for `game`; no session needed.
    pub fn save_site_core_options(&self, game: &str, options: &Value) -> Result<()> {
        self.db()?
            .save_site_core_options(game, options, self.now())?;
        self.emit(VaultEvent::DataChanged {
            collection: CORE_OPTIONS_SITE.name,
        });
        Ok(())
    }

    pub fn load_site_core_options(&self, game: &str) -> Result<Option<Value>> {
        Ok(self.db()?.load_site_core_options(game)?)
    }

    // ------------------------------------------------------------------
    // Favorites, friends, messages, profile (plaintext)
    // ------------------------------------------------------------------

    pub fn set_favorite(
        &self,
        game: &str,
        is_favorite: bool,
        meta: FavoriteMeta,
    ) -> Result<Option<FavoriteRecord>> {
        let account = self.require_session()?;
        let record = self
            .db()?
            .set_favorite(&account.code, game, is_favorite, meta, self.now())?;
        self.emit(VaultEvent::DataChanged { collection: FAVORITES.name });
        Ok(record)
    }

    pub fn list_favorites(&self) -> Result<Vec<FavoriteRecord>> {
        let Some(account) = self.session.current()? else {
            return Ok(Vec::new());
        };
        Ok(self.db()?.list_favorites(&account.code)?)
    }

    /// Returns whether the code was newly added.
    pub fn add_friend(&self, code: &str) -> Result<bool> {
        let account = self.require_session()?;
        let friend = AccountCode::parse(code)?;
        let added = self.db()?.add_friend(&account.code, &friend)?;
        self.emit(VaultEvent::DataChanged { collection: FRIENDS.name });
        Ok(added)
    }

    pub fn remove_friend(&self, code: &str) -> Result<bool> {
        let account = self.require_session()?;
        let friend = AccountCode::parse(code)?;
        let removed = self.db()?.remove_friend(&account.code, &friend)?;
        self.emit(VaultEvent::DataChanged { collection: FRIENDS.name });
        Ok(removed)
    }

    pub fn list_friends(&self) -> Result<Vec<AccountCode>> {
        let Some(account) = self.session.current()? else {
            return Ok(Vec::new());
        };
        Ok(self.db()?.list_friends(&account.code)?)
    }

    pub fn send_message(&self, to: &str, text: &str) -> Result<MessageRecord> {
        let account = self.require_session()?;
        let to = AccountCode::parse(to)?;
        let message = self
            .db()?
            .send_message(&account.code, &to, text, self.now())?;
        self.emit(VaultEvent::DataChanged { collection: MESSAGES.name });
        Ok(message)
    }

    /// Messages sent or received by the current account, oldest first.
    pub fn list_messages(&self) -> Result<Vec<MessageRecord>> {
        let Some(account) = self.session.current()? else {
            return Ok(Vec::new());
        };
        Ok(self.db()?.list_messages(&account.code)?)
    }

    pub fn update_profile(&self, update: ProfileUpdate) -> Result<ProfileRecord> {
        let account = self.require_session()?;
        let profile = self
            .db()?
            .update_profile(&account.code, update, self.now())?;
        self.emit(VaultEvent::DataChanged { collection: PROFILES.name });
        Ok(profile)
    }

    pub fn get_profile(&self) -> Result<Option<ProfileRecord>> {
        let Some(account) = self.session.current()? else {
            return Ok(None);
        };
        Ok(self.db()?.get_profile(&account.code)?)
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Snapshot of every account on this device, not just the current one.
    pub fn export_all(&self) -> Result<Snapshot> {
        Ok(self.db()?.export_all()?)
    }

    pub fn import_all(&self, snapshot: &Snapshot) -> Result<ImportStats> {
        let stats = self.db()?.import_all(snapshot)?;
        self.emit(VaultEvent::Restored);
        Ok(stats)
    }

    pub fn export_to_path(&self, path: &Path) -> Result<()> {
        let json = self.export_all()?.to_json_pretty()?;
        std::fs::write(path, json).map_err(StoreError::Io)?;
        tracing::info!(path = %path.display(), "backup written");
        Ok(())
    }

    pub fn import_from_path(&self, path: &Path) -> Result<ImportStats> {
        let json = std::fs::read_to_string(path).map_err(StoreError::Io)?;
        let snapshot = Snapshot::from_json(&json)
            .map_err(|e| VaultError::Validation(format!("malformed backup file: {e}")))?;
        self.import_all(&snapshot)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    fn emit(&self, event: VaultEvent) {
        emit_event(self.on_refresh.as_ref(), event);
    }

    fn require_session(&self) -> Result<Account> {
        self.session.current()?.ok_or(VaultError::NoSession)
    }

    /// Current account for an encrypted write, provisioning one if allowed.
    fn writer(&self) -> Result<Account> {
        if let Some(account) = self.session.current()? {
            return Ok(account);
        }
        if !self.auto_provision {
            return Err(VaultError::NoSession);
        }

        let account = self.provision()?;
        tracing::info!(code = %account.code.masked(), "auto-provisioned account for write");
        self.emit(VaultEvent::AccountCreated);
        self.begin_session(account.clone())?;
        self.emit(VaultEvent::LoggedIn);
        Ok(account)
    }

    fn provision(&self) -> Result<Account> {
        let now = self.now();
        let db = self.db()?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let record = {
                let mut rng = self.rng.lock()?;
                AccountRecord {
                    code: AccountCode::generate(&mut **rng),
                    created_at: now,
                    key: AccountKey::generate(&mut **rng),
                }
            };
            if db.insert_account(&record)? {
                tracing::info!(code = %record.code.masked(), "account created");
                return Ok(Account {
                    code: record.code,
                    key: record.key,
                });
            }
            tracing::warn!("account code collision, regenerating");
        }

        Err(VaultError::CodeCollision)
    }

    fn begin_session(&self, account: Account) -> Result<()> {
        tracing::info!(code = %account.code.masked(), "session started");
        let epoch = self.session.set(account)?;
        self.timer.start(expiry_hook(
            self.session.clone(),
            epoch,
            self.on_refresh.clone(),
        ))
    }
}

/// Logs out the login identified by `epoch` and notifies the UI.  Does
/// nothing if that login has already been replaced or ended.
fn expiry_hook(
    session: SessionContext,
    epoch: u64,
    on_refresh: Option<RefreshCallback>,
) -> impl FnOnce() + Send + 'static {
    move || match session.clear_if_current(epoch) {
        Ok(Some(account)) => {
            tracing::info!(code = %account.code.masked(), "logged out after inactivity");
            emit_event(on_refresh.as_ref(), VaultEvent::SessionExpired);
        }
        Ok(None) => tracing::debug!("stale session timer ignored"),
        Err(e) => tracing::error!(error = %e, "failed to expire session"),
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        let _ = self.timer.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::sleep;

    use super::*;
    use crate::clock::ManualClock;

    /// Yields scripted bytes first, then falls back to the OS source.
    struct ScriptedRng {
        script: VecDeque<u8>,
    }

    impl ScriptedRng {
        fn new(bytes: &[u8]) -> Self {
            Self {
                script: bytes.iter().copied().collect(),
            }
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            let mut buf = [0u8; 4];
            self.fill_bytes(&mut buf);
            u32::from_le_bytes(buf)
        }

        fn next_u64(&mut self) -> u64 {
            let mut buf = [0u8; 8];
            self.fill_bytes(&mut buf);
            u64::from_le_bytes(buf)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for byte in dest.iter_mut() {
                *byte = match self.script.pop_front() {
                    Some(b) => b,
                    None => OsRng.next_u32() as u8,
                };
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for ScriptedRng {}

    struct Harness {
        _dir: tempfile::TempDir,
        clock: Arc<ManualClock>,
        events: Arc<Mutex<Vec<VaultEvent>>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                _dir: tempfile::tempdir().unwrap(),
                clock: Arc::new(ManualClock::new(1_700_000_000_000)),
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn config(&self) -> VaultConfig {
            VaultConfig {
                db_path: Some(self._dir.path().join("vault.db")),
                ..VaultConfig::default()
            }
        }

        fn builder(&self, config: VaultConfig) -> VaultBuilder {
            let events = self.events.clone();
            Vault::builder(config)
                .clock(self.clock.clone())
                .on_refresh(move |e| events.lock().unwrap().push(e))
        }

        fn vault(&self) -> Vault {
            self.builder(self.config()).build().unwrap()
        }

        fn events(&self) -> Vec<VaultEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    fn logged_in(h: &Harness) -> Vault {
        let vault = h.vault();
        let code = vault.create_account().unwrap();
        vault.login(code.as_str()).unwrap();
        vault
    }

    #[test]
    fn build_outside_runtime_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = VaultConfig {
            db_path: Some(dir.path().join("vault.db")),
            ..VaultConfig::default()
        };
        assert!(matches!(Vault::open(config), Err(VaultError::NoRuntime)));
    }

    #[tokio::test]
    async fn create_login_save_load() {
        let h = Harness::new();
        let vault = h
            .builder(h.config())
            .rng(ScriptedRng::new(&[0, 1, 25, 3, 29, 21, 31, 14]))
            .build()
            .unwrap();

        let code = vault.create_account().unwrap();
        assert_eq!(code.as_str(), "AB3D-7X9Q");
        assert!(!vault.is_logged_in());

        assert!(vault.login("AB3D-7X9Q").unwrap());
        assert_eq!(vault.current_code().unwrap(), Some(code));
        assert_eq!(vault.session_state(), SessionState::Active);

        let bytes = vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01];
        vault.save_state("mario", 0, &bytes).unwrap();

        let saves = vault.list_saves(Some("mario")).unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].slot, 0);
        assert_eq!(vault.load_state("mario", 0).unwrap(), Some(bytes));

        assert_eq!(
            h.events(),
            vec![
                VaultEvent::AccountCreated,
                VaultEvent::LoggedIn,
                VaultEvent::DataChanged { collection: "saves" },
            ]
        );
    }

    #[tokio::test]
    async fn login_accepts_lowercase_code() {
        let h = Harness::new();
        let vault = h.vault();
        let code = vault.create_account().unwrap();
        vault.login(&code.as_str().to_lowercase()).unwrap();
        assert_eq!(vault.current_code().unwrap(), Some(code));
    }

    #[tokio::test]
    async fn unknown_and_malformed_codes_are_not_found() {
        let h = Harness::new();
        let vault = h.vault();
        assert!(matches!(vault.login("ZZZZ-2222"), Err(VaultError::NotFound)));
        assert!(matches!(vault.login("not a code"), Err(VaultError::NotFound)));
        assert!(!vault.is_logged_in());
    }

    #[tokio::test]
    async fn sixth_attempt_in_window_is_rate_limited() {
        let h = Harness::new();
        let vault = h.vault();
        let code = vault.create_account().unwrap();

        for _ in 0..5 {
            assert!(matches!(vault.login("ZZZZ-2222"), Err(VaultError::NotFound)));
            h.clock.advance(Duration::from_secs(1));
        }
        assert_eq!(vault.login_attempts_remaining().unwrap(), 0);

        // Even the right code is refused while throttled.
        assert!(matches!(
            vault.login(code.as_str()),
            Err(VaultError::RateLimited)
        ));

        h.clock.advance(Duration::from_secs(57));
        assert!(vault.login(code.as_str()).unwrap());
    }

    #[tokio::test]
    async fn throttle_is_shared_through_the_database() {
        let h = Harness::new();
        let first = h.vault();
        let second = h.builder(h.config()).shared_database(first.database()).build().unwrap();

        for _ in 0..5 {
            let _ = first.login("ZZZZ-2222");
        }
        assert!(matches!(
            second.login("ZZZZ-2222"),
            Err(VaultError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let h = Harness::new();
        let vault = logged_in(&h);
        vault.save_state("mario", 1, b"progress").unwrap();

        vault.logout().unwrap();
        assert!(!vault.is_logged_in());
        assert_eq!(vault.session_state(), SessionState::Inactive);
        assert_eq!(vault.load_state("mario", 1).unwrap(), None);
        assert!(vault.list_saves(None).unwrap().is_empty());
        assert_eq!(h.events().last(), Some(&VaultEvent::LoggedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_expires_and_notifies() {
        let h = Harness::new();
        let vault = logged_in(&h);

        sleep(Duration::from_secs(10 * 60)).await;
        vault.record_activity();
        sleep(Duration::from_secs(10 * 60)).await;
        assert!(vault.is_logged_in());

        sleep(Duration::from_secs(6 * 60)).await;
        assert!(!vault.is_logged_in());
        assert_eq!(vault.session_state(), SessionState::Inactive);
        assert_eq!(h.events().last(), Some(&VaultEvent::SessionExpired));
    }

    #[tokio::test(start_paused = true)]
    async fn logout_before_expiry_suppresses_callback() {
        let h = Harness::new();
        let vault = logged_in(&h);
        vault.logout().unwrap();

        sleep(Duration::from_secs(30 * 60)).await;
        assert!(!h.events().contains(&VaultEvent::SessionExpired));
    }

    #[tokio::test(start_paused = true)]
    async fn relogin_does_not_leak_timer() {
        let h = Harness::new();
        let vault = h.vault();
        let code = vault.create_account().unwrap();
        vault.login(code.as_str()).unwrap();
        sleep(Duration::from_secs(10 * 60)).await;
        vault.login(code.as_str()).unwrap();

        sleep(Duration::from_secs(10 * 60)).await;
        assert!(vault.is_logged_in());

        sleep(Duration::from_secs(6 * 60)).await;
        let expired = h
            .events()
            .iter()
            .filter(|e| **e == VaultEvent::SessionExpired)
            .count();
        assert_eq!(expired, 1);
    }

    #[tokio::test]
    async fn expiry_from_a_replaced_login_keeps_the_new_session() {
        let h = Harness::new();
        let vault = h.vault();
        let first = vault.create_account().unwrap();
        let second = vault.create_account().unwrap();

        vault.login(first.as_str()).unwrap();
        // Re-installing the same account hands back the live epoch.
        let stale_epoch = vault.session.set(vault.session.current().unwrap().unwrap()).unwrap();
        let stale = expiry_hook(vault.session.clone(), stale_epoch, vault.on_refresh.clone());

        // The timer for the first login fires only after the second login.
        vault.login(second.as_str()).unwrap();
        stale();

        assert_eq!(vault.current_code().unwrap(), Some(second));
        assert_eq!(vault.session_state(), SessionState::Active);
        assert!(!h.events().contains(&VaultEvent::SessionExpired));
    }

    #[tokio::test]
    async fn expiry_for_the_current_login_logs_out() {
        let h = Harness::new();
        let vault = logged_in(&h);
        let epoch = vault.session.set(vault.session.current().unwrap().unwrap()).unwrap();

        expiry_hook(vault.session.clone(), epoch, vault.on_refresh.clone())();

        assert!(!vault.is_logged_in());
        assert_eq!(h.events().last(), Some(&VaultEvent::SessionExpired));
    }

    #[tokio::test]
    async fn overwriting_a_slot_keeps_latest() {
        let h = Harness::new();
        let vault = logged_in(&h);
        vault.save_state("zelda", 2, b"first").unwrap();
        vault.save_state("zelda", 2, b"second").unwrap();

        assert_eq!(vault.list_saves(Some("zelda")).unwrap().len(), 1);
        assert_eq!(
            vault.load_state("zelda", 2).unwrap(),
            Some(b"second".to_vec())
        );
    }

    #[tokio::test]
    async fn write_without_session_provisions_account() {
        let h = Harness::new();
        let vault = h.vault();
        assert!(!vault.is_logged_in());

        vault.save_state("tetris", 0, b"lines").unwrap();
        assert!(vault.is_logged_in());
        assert_eq!(
            vault.load_state("tetris", 0).unwrap(),
            Some(b"lines".to_vec())
        );
        assert_eq!(
            &h.events()[..2],
            &[VaultEvent::AccountCreated, VaultEvent::LoggedIn]
        );
    }

    #[tokio::test]
    async fn write_without_session_fails_when_provisioning_disabled() {
        let h = Harness::new();
        let config = VaultConfig {
            auto_provision: false,
            ..h.config()
        };
        let vault = h.builder(config).build().unwrap();

        assert!(matches!(
            vault.save_state("tetris", 0, b"lines"),
            Err(VaultError::NoSession)
        ));
        assert!(matches!(
            vault.set_favorite("tetris", true, FavoriteMeta::default()),
            Err(VaultError::NoSession)
        ));
        let exported = vault.export_all().unwrap();
        assert!(exported.records("accounts").is_empty());
    }

    #[tokio::test]
    async fn favorites_round_trip() {
        let h = Harness::new();
        let vault = logged_in(&h);

        vault
            .set_favorite(
                "pacman",
                true,
                FavoriteMeta {
                    tags: vec!["classic".into()],
                    note: "great".into(),
                    rating: Some(5),
                },
            )
            .unwrap();
        let favorites = vault.list_favorites().unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].game, "pacman");
        assert_eq!(favorites[0].tags, vec!["classic".to_string()]);
        assert_eq!(favorites[0].note, "great");
        assert_eq!(favorites[0].rating, Some(5));

        vault
            .set_favorite("pacman", false, FavoriteMeta::default())
            .unwrap();
        assert!(vault.list_favorites().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rating_out_of_range_is_rejected() {
        let h = Harness::new();
        let vault = logged_in(&h);
        let meta = FavoriteMeta {
            rating: Some(6),
            ..FavoriteMeta::default()
        };
        assert!(matches!(
            vault.set_favorite("pacman", true, meta),
            Err(VaultError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn accounts_are_isolated() {
        let h = Harness::new();
        let alice = logged_in(&h);
        let bob = h
            .builder(h.config())
            .shared_database(alice.database())
            .build()
            .unwrap();
        let bob_code = bob.create_account().unwrap();
        bob.login(bob_code.as_str()).unwrap();

        alice.save_state("mario", 0, b"alice").unwrap();
        bob.save_state("mario", 0, b"bob").unwrap();

        assert_eq!(alice.load_state("mario", 0).unwrap(), Some(b"alice".to_vec()));
        assert_eq!(bob.load_state("mario", 0).unwrap(), Some(b"bob".to_vec()));
        assert_eq!(alice.list_saves(None).unwrap().len(), 1);
        assert_eq!(bob.list_saves(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tampered_save_surfaces_integrity_error() {
        let h = Harness::new();
        let vault = logged_in(&h);
        vault.save_state("mario", 0, b"precious").unwrap();

        let db = vault.database();
        {
            let db = db.lock().unwrap();
            let mut record = db.list("saves").unwrap().remove(0);
            let ct = record["payload"]["ciphertext"].as_str().unwrap().to_string();
            let flipped = if ct.starts_with('0') { "1" } else { "0" };
            record["payload"]["ciphertext"] = json!(format!("{flipped}{}", &ct[1..]));
            db.put("saves", &record).unwrap();
        }

        assert!(matches!(
            vault.load_state("mario", 0),
            Err(VaultError::Integrity)
        ));
        assert_eq!(vault.list_saves(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn controller_mappings_and_core_options() {
        let h = Harness::new();
        let vault = logged_in(&h);

        let mut mapping = ControllerMapping::new();
        mapping.insert("A".into(), "KeyZ".into());
        mapping.insert("START".into(), "Enter".into());

        vault.save_profile("arcade stick", &mapping).unwrap();
        assert_eq!(
            vault.load_profile_mapping("arcade stick").unwrap(),
            Some(mapping.clone())
        );
        assert_eq!(vault.load_profile_mapping("missing").unwrap(), None);
        assert_eq!(vault.list_profiles().unwrap().len(), 1);

        vault.save_game_controller("Super Mario", &mapping).unwrap();
        assert_eq!(
            vault.get_game_controller("super mario").unwrap(),
            Some(mapping)
        );
        assert_eq!(vault.list_game_controllers().unwrap().len(), 1);

        let options = json!({ "frameskip": 1, "region": "ntsc" });
        vault.save_core_options("mario", &options).unwrap();
        assert_eq!(vault.load_core_options("mario").unwrap(), Some(options));

        let site = json!({ "shader": "crt" });
        vault.save_site_core_options("mario", &site).unwrap();
        vault.logout().unwrap();
        assert_eq!(vault.load_site_core_options("mario").unwrap(), Some(site));
    }

    #[tokio::test]
    async fn friends_messages_and_profile() {
        let h = Harness::new();
        let alice = logged_in(&h);
        let bob = h
            .builder(h.config())
            .shared_database(alice.database())
            .build()
            .unwrap();
        let bob_code = bob.create_account().unwrap();
        bob.login(bob_code.as_str()).unwrap();

        assert!(alice.add_friend(bob_code.as_str()).unwrap());
        assert!(!alice.add_friend(bob_code.as_str()).unwrap());
        assert_eq!(alice.list_friends().unwrap(), vec![bob_code.clone()]);
        assert!(matches!(
            alice.add_friend("bogus"),
            Err(VaultError::Validation(_))
        ));

        let sent = alice.send_message(bob_code.as_str(), "hi bob").unwrap();
        let reply = bob
            .send_message(alice.current_code().unwrap().unwrap().as_str(), "hey")
            .unwrap();
        assert!(reply.id > sent.id);
        let inbox: Vec<_> = bob.list_messages().unwrap().into_iter().map(|m| m.text).collect();
        assert_eq!(inbox, vec!["hi bob".to_string(), "hey".to_string()]);

        assert!(alice.remove_friend(bob_code.as_str()).unwrap());
        assert!(!alice.remove_friend(bob_code.as_str()).unwrap());
        assert!(alice.list_friends().unwrap().is_empty());

        assert_eq!(alice.get_profile().unwrap(), None);
        let profile = alice
            .update_profile(ProfileUpdate {
                display_name: Some("Alice".into()),
                ..ProfileUpdate::default()
            })
            .unwrap();
        assert_eq!(alice.get_profile().unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn export_then_import_into_empty_store() {
        let h = Harness::new();
        let source = logged_in(&h);
        source.save_state("mario", 0, b"state").unwrap();
        source
            .set_favorite("pacman", true, FavoriteMeta::default())
            .unwrap();
        source.send_message("AB3D-7X9Q", "note to self").unwrap();
        source.save_site_core_options("mario", &json!({ "a": 1 })).unwrap();
        let code = source.current_code().unwrap().unwrap();
        let snapshot = source.export_all().unwrap();

        let other = Harness::new();
        let target = other.vault();
        let stats = target.import_all(&snapshot).unwrap();
        assert_eq!(stats.skipped, 0);
        assert_eq!(target.export_all().unwrap(), snapshot);
        assert_eq!(other.events().last(), Some(&VaultEvent::Restored));

        // Keys travel with the backup, so the restored account decrypts.
        target.login(code.as_str()).unwrap();
        assert_eq!(
            target.load_state("mario", 0).unwrap(),
            Some(b"state".to_vec())
        );
    }

    #[tokio::test]
    async fn backup_file_round_trip() {
        let h = Harness::new();
        let vault = logged_in(&h);
        vault.save_state("mario", 3, b"file").unwrap();

        let path = h._dir.path().join("backup.json");
        vault.export_to_path(&path).unwrap();

        let other = Harness::new();
        let restored = other.vault();
        let stats = restored.import_from_path(&path).unwrap();
        assert!(stats.imported >= 2);
        assert_eq!(restored.export_all().unwrap(), vault.export_all().unwrap());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            restored.import_from_path(&path),
            Err(VaultError::Validation(_))
        ));
    }
}
