// Token bucket with capacity one, refilled at 1/delay tokens per second.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

// Upper bound on how long a wait goes without looking at the cancel flag.
const CANCEL_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_token: Option<Instant>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            interval: delay,
            last_token: None,
        }
    }

    pub fn wait_time(&self) -> Duration {
        match self.last_token {
            Some(taken) => self.interval.saturating_sub(taken.elapsed()),
            None => Duration::ZERO,
        }
    }

    pub fn acquire(&mut self) {
        self.acquire_unless(&AtomicBool::new(false));
    }

    /// Waits for a token and takes it. Returns false without taking one if
    /// `cancel` is raised first.
    pub fn acquire_unless(&mut self, cancel: &AtomicBool) -> bool {
        if !sleep_unless(self.wait_time(), cancel) {
            return false;
        }
        if !self.interval.is_zero() {
            // Idle time does not bank extra requests.
            self.last_token = Some(Instant::now());
        }
        true
    }
}

/// Sleeps for `duration` in short slices. Returns false as soon as `cancel`
/// is raised, including when it already was.
pub fn sleep_unless(duration: Duration, cancel: &AtomicBool) -> bool {
    let start = Instant::now();
    loop {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        let left = duration.saturating_sub(start.elapsed());
        if left.is_zero() {
            return true;
        }
        thread::sleep(left.min(CANCEL_POLL));
    }
}
