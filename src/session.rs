//! Session collaborator and the guard that collapses concurrent
//! authentication recoveries into one.

use std::{
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::Result;

/// Delay after which a finished recovery stops suppressing new ones.
pub const DEFAULT_GUARD_RESET: Duration = Duration::from_millis(2_000);

/// Client-side session management the client delegates to.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    /// Current access token, sent as `Authorization: Bearer <token>`.
    fn access_token(&self) -> Option<String> {
        None
    }

    /// Current navigation location, used to avoid clearing the session
    /// while already on a sign-in or sign-out page. Either a path
    /// (`/sign-in?next=/home`) or a full URL (`https://app/sign-in`).
    fn current_location(&self) -> Option<String> {
        None
    }

    /// Clears all persisted session state and redirects to sign-in.
    ///
    /// Whatever this returns, the triggering request fails with `Unauthorized`.
    async fn clear_session(&self) -> Result<()>;
}

#[derive(Debug)]
enum GuardState {
    Idle,
    Recovering,
    CoolingDown { until: Instant },
}

/// Suppresses duplicate session-clearing side effects.
///
/// The guard is active from the moment a recovery begins until
/// `reset_after` has elapsed since it ended.
#[derive(Debug)]
pub struct SessionGuard {
    state: Mutex<GuardState>,
    reset_after: Duration,
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_GUARD_RESET)
    }
}

impl SessionGuard {
    /// Creates an idle guard that stays active for `reset_after` once a
    /// recovery ends.
    pub fn new(reset_after: Duration) -> Self {
        Self {
            state: Mutex::new(GuardState::Idle),
            reset_after,
        }
    }

    /// The process-wide guard shared by every client that has not been
    /// given its own.
    pub fn global() -> Arc<SessionGuard> {
        static GLOBAL: OnceLock<Arc<SessionGuard>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(SessionGuard::default())).clone()
    }

    /// `true` while a recovery runs or its cool-down has not elapsed.
    pub fn is_active(&self) -> bool {
        let mut state = self.lock();
        Self::expire(&mut state);
        !matches!(*state, GuardState::Idle)
    }

    /// Marks a recovery as started, unless one is already active.
    ///
    /// The returned ticket ends the recovery when dropped.
    pub fn try_begin_recovery(self: &Arc<Self>) -> Option<RecoveryTicket> {
        let mut state = self.lock();
        Self::expire(&mut state);
        if !matches!(*state, GuardState::Idle) {
            return None;
        }
        *state = GuardState::Recovering;
        Some(RecoveryTicket {
            guard: Arc::clone(self),
        })
    }

    /// Ends the current recovery; the guard stays active for `reset_after`.
    pub fn end_recovery(&self) {
        let mut state = self.lock();
        *state = GuardState::CoolingDown {
            until: Instant::now() + self.reset_after,
        };
    }

    /// Returns the guard to idle immediately.
    pub fn reset(&self) {
        *self.lock() = GuardState::Idle;
    }

    fn expire(state: &mut GuardState) {
        if let GuardState::CoolingDown { until } = *state {
            if Instant::now() >= until {
                *state = GuardState::Idle;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that the holder owns the active recovery.
#[derive(Debug)]
pub struct RecoveryTicket {
    guard: Arc<SessionGuard>,
}

impl Drop for RecoveryTicket {
    fn drop(&mut self) {
        self.guard.end_recovery();
    }
}
