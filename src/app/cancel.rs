//! One-shot cancellation token.
//!
//! A boolean behind a mutex plus a condition variable.  The worker blocks
//! in [`CancelToken::wait_timeout`]; any other thread calls
//! [`CancelToken::cancel`] to wake it early.  Cancelling twice is a no-op.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

/// Cloneable handle to a shared one-shot flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned flag is still a valid bool.
    fn flag(&self) -> MutexGuard<'_, bool> {
        self.inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Trip the token and wake every waiter.  Returns `true` on the first call.
    pub fn cancel(&self) -> bool {
        let mut flag = self.flag();
        if *flag {
            return false;
        }
        *flag = true;
        self.inner.cond.notify_all();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag()
    }

    /// Block for up to `timeout`.  Returns `true` if the token was (or
    /// already had been) cancelled, `false` if the full timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut flag = self.flag();
        while !*flag {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            flag = self
                .inner
                .cond
                .wait_timeout(flag, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}
