//! Login session state and the idle-timeout timer.
//!
//! [`SessionContext`] holds the logged-in account.  [`SessionManager`] runs
//! one tokio task per session that sleeps for the idle timeout and is
//! pushed back by every activity signal.  When the sleep completes the
//! session goes [`SessionState::Inactive`] and the expiry callback fires.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use arcade_shared::Account;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::Result;

/// The account currently logged in, shared with the expiry callback.
///
/// Every `set` and `clear` bumps an epoch.  The expiry callback clears
/// through [`SessionContext::clear_if_current`] with the epoch it was armed
/// for, so a timer that lost a race with a fresh login leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct SessionContext(Arc<Mutex<Slot>>);

#[derive(Debug, Default)]
struct Slot {
    epoch: u64,
    account: Option<Account>,
}

impl SessionContext {
    pub fn current(&self) -> Result<Option<Account>> {
        Ok(self.0.lock()?.account.clone())
    }

    /// Install `account` and return the epoch that identifies this login.
    pub fn set(&self, account: Account) -> Result<u64> {
        let mut slot = self.0.lock()?;
        slot.epoch += 1;
        slot.account = Some(account);
        Ok(slot.epoch)
    }

    pub fn clear(&self) -> Result<Option<Account>> {
        let mut slot = self.0.lock()?;
        slot.epoch += 1;
        Ok(slot.account.take())
    }

    /// Clear only if no login or logout happened since `epoch` was issued.
    pub fn clear_if_current(&self, epoch: u64) -> Result<Option<Account>> {
        let mut slot = self.0.lock()?;
        if slot.epoch != epoch {
            return Ok(None);
        }
        slot.epoch += 1;
        Ok(slot.account.take())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    Active,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    /// Bumped on every start/stop so a superseded timer cannot expire a
    /// newer session.
    generation: u64,
    activity: Option<mpsc::UnboundedSender<()>>,
    timer: Option<JoinHandle<()>>,
}

/// Idle-timeout state machine for the current session.
#[derive(Debug, Clone)]
pub struct SessionManager {
    inner: Arc<Mutex<Inner>>,
    idle_timeout: Duration,
    runtime: Handle,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Inactive,
                generation: 0,
                activity: None,
                timer: None,
            })),
            idle_timeout,
            runtime,
        }
    }

    /// Begin (or restart) a session.  Any previous timer is cancelled.
    pub fn start<F>(&self, on_expire: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock()?;

        if let Some(old) = inner.timer.take() {
            old.abort();
        }
        inner.generation += 1;

        let timer = self.runtime.spawn(run_timer(
            Arc::downgrade(&self.inner),
            inner.generation,
            self.idle_timeout,
            rx,
            on_expire,
        ));

        inner.state = SessionState::Active;
        inner.activity = Some(tx);
        inner.timer = Some(timer);
        tracing::debug!(idle_secs = self.idle_timeout.as_secs(), "session timer started");
        Ok(())
    }

    /// End the session without firing the expiry callback.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.generation += 1;
        inner.activity = None;
        inner.state = SessionState::Inactive;
        Ok(())
    }

    /// Report user activity, pushing the idle deadline back.
    pub fn touch(&self) {
        self.activity_handle().signal();
    }

    pub fn state(&self) -> SessionState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(SessionState::Inactive)
    }

    /// A cheap handle for input listeners.  Signals sent while no session
    /// is active are dropped.
    pub fn activity_handle(&self) -> ActivityHandle {
        ActivityHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Forwards activity signals to whichever session timer is current.
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    inner: Weak<Mutex<Inner>>,
}

impl ActivityHandle {
    pub fn signal(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let Ok(inner) = inner.lock() else {
            return;
        };
        if let Some(tx) = &inner.activity {
            let _ = tx.send(());
        }
    }
}

async fn run_timer<F>(
    inner: Weak<Mutex<Inner>>,
    generation: u64,
    idle: Duration,
    mut activity: mpsc::UnboundedReceiver<()>,
    on_expire: F,
) where
    F: FnOnce() + Send + 'static,
{
    let deadline = tokio::time::sleep(idle);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            signal = activity.recv() => match signal {
                Some(()) => deadline.as_mut().reset(Instant::now() + idle),
                // Sender dropped: the session was stopped or restarted.
                None => return,
            },
            () = &mut deadline => break,
        }
    }

    let Some(inner) = inner.upgrade() else {
        return;
    };
    let expired = match inner.lock() {
        Ok(mut guard) if guard.generation == generation => {
            guard.state = SessionState::Inactive;
            guard.activity = None;
            guard.timer = None;
            true
        }
        _ => false,
    };

    if expired {
        tracing::info!("session expired after inactivity");
        on_expire();
    }
}
