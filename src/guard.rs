//! Single-flight guard for listing-changing requests.
//!
//! At most one guarded request is in flight. After its response arrives the
//! guard stays closed for a cool-down period so that duplicate signals (a
//! second drop event, a double click) are swallowed. A token whose response
//! never arrives is released after a timeout.

use crate::config::GuardConfig;
use crate::error::DispatchError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Proof of holding the guard, handed back on completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlightToken(u64);

impl FlightToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
enum FlightState {
    Idle,
    InFlight { id: u64, release: CancellationToken },
    Cooling { id: u64, release: CancellationToken },
}

#[derive(Debug)]
struct Inner {
    state: Mutex<FlightState>,
    idle: Notify,
    next_id: AtomicU64,
    cooldown: Duration,
    timeout: Duration,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, FlightState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_idle(&self, state: &mut FlightState) {
        *state = FlightState::Idle;
        self.idle.notify_waiters();
    }
}

#[derive(Debug, Clone)]
pub struct SingleFlight {
    inner: Arc<Inner>,
}

impl SingleFlight {
    pub fn new(cooldown: Duration, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(FlightState::Idle),
                idle: Notify::new(),
                next_id: AtomicU64::new(1),
                cooldown,
                timeout,
            }),
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(config.cooldown(), config.flight_timeout())
    }

    /// Take the guard or fail with `Busy`.
    ///
    /// Must be called from within a Tokio runtime; the timeout release runs
    /// as a spawned task.
    pub fn try_acquire(&self) -> Result<FlightToken, DispatchError> {
        let mut state = self.inner.lock();
        if !matches!(*state, FlightState::Idle) {
            log::warn!("🚧 SingleFlight: busy, request suppressed");
            return Err(DispatchError::Busy);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let release = CancellationToken::new();
        *state = FlightState::InFlight {
            id,
            release: release.clone(),
        };
        drop(state);

        let inner = Arc::clone(&self.inner);
        let timeout = self.inner.timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = release.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    let mut state = inner.lock();
                    if matches!(*state, FlightState::InFlight { id: current, .. } if current == id) {
                        log::warn!("⏰ SingleFlight: no response for request {} after {:?}, releasing", id, timeout);
                        inner.set_idle(&mut state);
                    }
                }
            }
        });

        log::debug!("SingleFlight: acquired token {}", id);
        Ok(FlightToken(id))
    }

    /// Report the response for `token` and start the cool-down.
    ///
    /// Returns false for a token that no longer holds the guard, e.g. one
    /// that already timed out.
    pub fn complete(&self, token: FlightToken) -> bool {
        let mut state = self.inner.lock();
        match &*state {
            FlightState::InFlight { id, release } if *id == token.0 => release.cancel(),
            _ => {
                log::debug!("SingleFlight: stale completion for token {}", token.0);
                return false;
            }
        }

        if self.inner.cooldown.is_zero() {
            self.inner.set_idle(&mut state);
            return true;
        }

        let release = CancellationToken::new();
        *state = FlightState::Cooling {
            id: token.0,
            release: release.clone(),
        };
        drop(state);

        let inner = Arc::clone(&self.inner);
        let cooldown = self.inner.cooldown;
        let id = token.0;
        tokio::spawn(async move {
            tokio::select! {
                _ = release.cancelled() => {}
                _ = tokio::time::sleep(cooldown) => {
                    let mut state = inner.lock();
                    if matches!(*state, FlightState::Cooling { id: current, .. } if current == id) {
                        inner.set_idle(&mut state);
                    }
                }
            }
        });
        true
    }

    /// Open the guard at once, dropping any flight or cool-down
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        match &*state {
            FlightState::InFlight { release, .. } | FlightState::Cooling { release, .. } => release.cancel(),
            FlightState::Idle => return,
        }
        self.inner.set_idle(&mut state);
    }

    pub fn is_idle(&self) -> bool {
        matches!(*self.inner.lock(), FlightState::Idle)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(*self.inner.lock(), FlightState::InFlight { .. })
    }

    /// Resolve once the guard is open again
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}
