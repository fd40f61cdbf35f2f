//! Countdown latch used to wait for a batch of jobs.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Blocks waiters until `count_down` has been called as many times as the
/// latch was created with.
///
/// Safe to share between any number of decrementing workers and waiters.
#[derive(Debug)]
pub struct CountDownLatch {
    count: Mutex<usize>,
    reached_zero: Condvar,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            reached_zero: Condvar::new(),
        }
    }

    /// Remaining count.
    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Decrement the count, waking every waiter when it reaches zero.
    ///
    /// Calling this on a latch that is already open has no effect.
    pub fn count_down(&self) {
        let mut count = self.count.lock();
        match *count {
            0 => tracing::warn!("count_down called on an open latch"),
            1 => {
                *count = 0;
                self.reached_zero.notify_all();
            }
            _ => *count -= 1,
        }
    }

    /// Block until the count reaches zero. Returns at once if it already has.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.reached_zero.wait(&mut count);
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    ///
    /// Returns true if the latch opened in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count > 0 {
            if self.reached_zero.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }
}
