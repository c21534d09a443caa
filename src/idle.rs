//! IDLE wait primitive
//!
//! An [`IdleGate`] lets one caller at a time block until the folder it
//! watches reports a change. Other callers either wake it (a change
//! happened) or abort it (they need the folder for something else).

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const RUNNING: u8 = 0;
const WAITING: u8 = 1;
const ABORTING: u8 = 2;

/// Why [`IdleGate::idle`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleExit {
    /// Another caller was already waiting; this one was not admitted.
    Busy,
    /// Woken by a change (only with `once`).
    Woken,
    /// Released by [`IdleGate::abort`].
    Aborted,
    /// The watched folder was closed or deleted.
    Closed,
    /// The cancellation token fired.
    Cancelled,
}

/// Three-state wait gate: RUNNING, WAITING, ABORTING.
#[derive(Debug)]
pub struct IdleGate {
    phase: AtomicU8,
    signal: Semaphore,
    /// Held while adding permits and while draining them, so a permit
    /// is never added after the waiter it was meant for has left.
    signal_lock: Mutex<()>,
}

impl Default for IdleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleGate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(RUNNING),
            signal: Semaphore::const_new(0),
            signal_lock: parking_lot::const_mutex(()),
        }
    }

    /// Whether a caller is currently blocked in [`idle`](Self::idle).
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.phase.load(Ordering::Acquire) == WAITING
    }

    /// Block until a change arrives.
    ///
    /// With `once` the first wake ends the wait. Otherwise the wait
    /// continues until [`abort`](Self::abort) is called, `cancel`
    /// fires, or `keep_going` reports that the folder went away.
    /// Dropping the returned future also ends the wait; in every case
    /// the gate is RUNNING again afterwards.
    pub async fn idle(
        &self,
        once: bool,
        cancel: &CancellationToken,
        keep_going: impl Fn() -> bool,
    ) -> IdleExit {
        if self
            .phase
            .compare_exchange(RUNNING, WAITING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Idle already in progress, not admitted");
            return IdleExit::Busy;
        }
        let _reset = ResetOnDrop(self);
        trace!("Idle waiting (once: {})", once);

        loop {
            if self.phase.load(Ordering::Acquire) == ABORTING {
                return IdleExit::Aborted;
            }
            if !keep_going() {
                return IdleExit::Closed;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Idle cancelled");
                    return IdleExit::Cancelled;
                }
                permit = self.signal.acquire() => match permit {
                    Ok(permit) => permit.forget(),
                    Err(_) => return IdleExit::Closed,
                },
            }

            trace!("Idle woken");
            if self.phase.load(Ordering::Acquire) == ABORTING {
                return IdleExit::Aborted;
            }
            if once {
                return IdleExit::Woken;
            }
        }
    }

    /// Release a waiting caller and make it return. No effect unless a
    /// caller is waiting.
    pub fn abort(&self) {
        let _guard = self.signal_lock.lock();
        if self
            .phase
            .compare_exchange(WAITING, ABORTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("Aborting idle");
            self.signal.add_permits(1);
        }
    }

    /// Signal a change to a waiting caller. Changes that happen while
    /// nobody waits are not remembered.
    pub fn wake(&self) {
        let _guard = self.signal_lock.lock();
        if self.phase.load(Ordering::Acquire) != RUNNING {
            self.signal.add_permits(1);
        }
    }

    fn reset(&self) {
        let _guard = self.signal_lock.lock();
        while let Ok(permit) = self.signal.try_acquire() {
            permit.forget();
        }
        self.phase.store(RUNNING, Ordering::Release);
    }
}

struct ResetOnDrop<'a>(&'a IdleGate);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}
