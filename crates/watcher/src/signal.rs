//! Cooperative stop signal for the monitor loop

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cloneable handle used to stop a running monitor
///
/// The loop checks it at the top of every pass and between directory
/// entries, and sleeps on it between passes so `stop()` wakes it at once.
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    stopped: Mutex<bool>,
    wakeup: Condvar,
}

impl StopSignal {
    /// Create a signal in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake any waiter
    pub fn stop(&self) {
        let mut stopped = self.inner.stopped.lock();
        *stopped = true;
        self.inner.wakeup.notify_all();
    }

    /// Check whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        *self.inner.stopped.lock()
    }

    /// Sleep for up to `timeout`, returning early on stop
    ///
    /// Returns `true` if the signal is stopped when the wait ends
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut stopped = self.inner.stopped.lock();
        if *stopped || timeout.is_zero() {
            return *stopped;
        }

        let deadline = Instant::now() + timeout;
        while !*stopped {
            if self.inner.wakeup.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
