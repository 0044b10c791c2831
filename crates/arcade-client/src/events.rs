use std::sync::Arc;

pub const EVENT_ACCOUNT_CREATED: &str = "account-created";
pub const EVENT_LOGGED_IN: &str = "logged-in";
pub const EVENT_LOGGED_OUT: &str = "logged-out";
pub const EVENT_SESSION_EXPIRED: &str = "session-expired";
pub const EVENT_DATA_CHANGED: &str = "data-changed";
pub const EVENT_RESTORED: &str = "restored";

/// State changes the UI should re-render after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    AccountCreated,
    LoggedIn,
    LoggedOut,
    SessionExpired,
    DataChanged { collection: &'static str },
    Restored,
}

impl VaultEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AccountCreated => EVENT_ACCOUNT_CREATED,
            Self::LoggedIn => EVENT_LOGGED_IN,
            Self::LoggedOut => EVENT_LOGGED_OUT,
            Self::SessionExpired => EVENT_SESSION_EXPIRED,
            Self::DataChanged { .. } => EVENT_DATA_CHANGED,
            Self::Restored => EVENT_RESTORED,
        }
    }
}

/// UI refresh hook.  Invoked synchronously on the thread that caused the
/// change; session expiry fires it from the timer task.
pub type RefreshCallback = Arc<dyn Fn(VaultEvent) + Send + Sync>;

pub fn emit_event(callback: Option<&RefreshCallback>, event: VaultEvent) {
    tracing::trace!(event = event.name(), "refresh");
    if let Some(cb) = callback {
        cb(event);
    }
}
