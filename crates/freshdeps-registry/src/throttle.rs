use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::Semaphore;

use crate::error::ThrottlerError;

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Caps how many submitted tasks run at once. Waiting tasks are admitted in
/// submission order; completion order is whatever the tasks produce.
#[derive(Debug)]
pub struct Throttler {
    ceiling: usize,
    permits: Semaphore,
    in_flight: AtomicUsize,
    dispatched: AtomicU64,
}

impl Throttler {
    pub fn new(ceiling: usize) -> Result<Self, ThrottlerError> {
        if ceiling == 0 {
            return Err(ThrottlerError::ZeroCeiling);
        }
        let ceiling = ceiling.min(Semaphore::MAX_PERMITS);
        Ok(Self {
            ceiling,
            permits: Semaphore::new(ceiling),
            in_flight: AtomicUsize::new(0),
            dispatched: AtomicU64::new(0),
        })
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Total number of tasks that have been started.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Waits for a free slot, then runs `task`. The slot is released when the
    /// task settles, whatever its output, so a failing task never holds up the
    /// queue behind it.
    pub async fn submit<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        // The semaphore is never closed, so acquiring cannot fail.
        let _permit = self.permits.acquire().await.ok();
        let _slot = InFlightSlot::enter(&self.in_flight);
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        task().await
    }
}

impl Default for Throttler {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CONCURRENCY,
            permits: Semaphore::new(DEFAULT_CONCURRENCY),
            in_flight: AtomicUsize::new(0),
            dispatched: AtomicU64::new(0),
        }
    }
}

struct InFlightSlot<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightSlot<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
