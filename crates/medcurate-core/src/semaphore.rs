//! Counting semaphore used as the worker pool's backpressure.
//!
//! `Mutex + Condvar` from std. Poisoned locks are recovered.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A counting semaphore bounding how many jobs may be in flight.
#[derive(Debug)]
pub struct Semaphore {
    permits: Mutex<usize>,
    cond: Condvar,
}

/// RAII permit; releases its slot on drop. `Send`, so it can travel into the
/// worker thread that owns the job.
#[derive(Debug)]
pub struct Permit<'a>(&'a Semaphore);

impl Semaphore {
    /// Create a semaphore with `permits` free slots.
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a slot is free, then take it.
    pub fn acquire(&self) -> Permit<'_> {
        let mut free = self.lock();
        while *free == 0 {
            free = self.cond.wait(free).unwrap_or_else(PoisonError::into_inner);
        }
        *free -= 1;
        Permit(self)
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut free = self.lock();
        if *free == 0 {
            return None;
        }
        *free -= 1;
        Some(Permit(self))
    }

    /// Currently free slots.
    pub fn available(&self) -> usize {
        *self.lock()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut free = self.0.lock();
        *free += 1;
        self.0.cond.notify_one();
    }
}
