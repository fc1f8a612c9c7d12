use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Single-permit gate serializing device open/close transitions.
///
/// Releasing an already open gate leaves exactly one permit.
#[derive(Debug)]
pub struct Gate {
    available: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            available: Mutex::new(true),
            cv: Condvar::new(),
        }
    }

    /// Take the permit, waiting at most `timeout`. Returns false on timeout.
    pub fn try_acquire(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *available {
                *available = false;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cv
                .wait_timeout(available, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            available = guard;
        }
    }

    pub fn release(&self) {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        *available = true;
        self.cv.notify_one();
    }

    pub fn is_available(&self) -> bool {
        *self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_acquire_release() {
        let gate = Gate::new();
        assert!(gate.try_acquire(Duration::ZERO));
        assert!(!gate.is_available());
        assert!(!gate.try_acquire(Duration::from_millis(20)));
        gate.release();
        assert!(gate.try_acquire(Duration::ZERO));
    }

    #[test]
    fn test_release_saturates_at_one_permit() {
        let gate = Gate::new();
        gate.release();
        gate.release();
        assert!(gate.try_acquire(Duration::ZERO));
        assert!(!gate.try_acquire(Duration::ZERO));
    }

    #[test]
    fn test_waiter_wakes_on_release() {
        let gate = Arc::new(Gate::new());
        assert!(gate.try_acquire(Duration::ZERO));

        let releaser = {
            let gate = gate.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                gate.release();
            })
        };

        assert!(gate.try_acquire(Duration::from_secs(2)));
        releaser.join().unwrap();
    }
}
