//! The two synchronization primitives used for every cross-thread handoff.
//!
//! Incoming data is always published as "deliver, then signal": a
//! transport thread stores the payload and then opens a [`Gate`] (or
//! bumps a [`CountingBarrier`]); the consuming thread waits on the same
//! primitive before reading. Both are reusable through `reset()`.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Gate ────────────────────────────────────────────────────────

/// A resettable single-flag signal.
///
/// Starts closed. [`signal`](Gate::signal) opens it and wakes every
/// waiter; [`wait`](Gate::wait) blocks until it is open;
/// [`reset`](Gate::reset) closes it again for the next cycle.
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    /// Create a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate and wake all waiters.
    pub fn signal(&self) {
        let mut open = lock(&self.open);
        *open = true;
        self.cond.notify_all();
    }

    /// Block until the gate is open. Returns immediately if it already is.
    pub fn wait(&self) {
        let mut open = lock(&self.open);
        while !*open {
            open = self
                .cond
                .wait(open)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Close the gate.
    pub fn reset(&self) {
        *lock(&self.open) = false;
    }

    /// Whether the gate is currently open.
    pub fn is_open(&self) -> bool {
        *lock(&self.open)
    }
}

// ── CountingBarrier ─────────────────────────────────────────────

/// A resettable N-way join.
///
/// [`increment`](CountingBarrier::increment) raises the count, saturating
/// at the target; [`wait`](CountingBarrier::wait) blocks until the count
/// reaches the target; [`reset`](CountingBarrier::reset) zeroes it.
#[derive(Debug)]
pub struct CountingBarrier {
    target: usize,
    count: Mutex<usize>,
    cond: Condvar,
}

impl CountingBarrier {
    /// Create a barrier that opens after `target` increments.
    pub fn new(target: usize) -> Self {
        Self {
            target,
            count: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    /// The number of increments needed to open the barrier.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Raise the count by one, waking waiters once the target is reached.
    pub fn increment(&self) {
        let mut count = lock(&self.count);
        if *count < self.target {
            *count += 1;
        }
        if *count == self.target {
            self.cond.notify_all();
        }
    }

    /// Block until the count equals the target.
    pub fn wait(&self) {
        let mut count = lock(&self.count);
        while *count < self.target {
            count = self
                .cond
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Current count.
    pub fn count(&self) -> usize {
        *lock(&self.count)
    }

    /// Zero the count.
    pub fn reset(&self) {
        *lock(&self.count) = 0;
    }
}

// Compile-time assertion: both primitives are shared across threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Gate>();
    assert::<CountingBarrier>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    // ── Gate tests ──────────────────────────────────────────────

    #[test]
    fn gate_starts_closed() {
        let g = Gate::new();
        assert!(!g.is_open());
    }

    #[test]
    fn gate_wait_returns_after_signal_from_other_thread() {
        let g = Arc::new(Gate::new());
        let g2 = Arc::clone(&g);
        let h = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            g2.signal();
        });
        g.wait();
        assert!(g.is_open());
        h.join().unwrap();
    }

    #[test]
    fn gate_reset_permits_exactly_one_more_cycle() {
        let g = Arc::new(Gate::new());
        g.signal();
        g.wait();
        g.reset();
        assert!(!g.is_open());

        // The previous signal must not leak into the next cycle.
        let g2 = Arc::clone(&g);
        let waiter = thread::spawn(move || {
            g2.wait();
        });
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        g.signal();
        waiter.join().unwrap();
    }

    #[test]
    fn gate_signal_wakes_every_waiter() {
        let g = Arc::new(Gate::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let g = Arc::clone(&g);
                thread::spawn(move || g.wait())
            })
            .collect();
        thread::sleep(Duration::from_millis(10));
        g.signal();
        for h in handles {
            h.join().unwrap();
        }
    }

    // ── CountingBarrier tests ───────────────────────────────────

    #[test]
    fn barrier_opens_at_target() {
        let b = Arc::new(CountingBarrier::new(3));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let b = Arc::clone(&b);
                thread::spawn(move || b.increment())
            })
            .collect();
        b.wait();
        assert_eq!(b.count(), 3);
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn barrier_count_saturates_at_target() {
        let b = CountingBarrier::new(2);
        for _ in 0..5 {
            b.increment();
        }
        assert_eq!(b.count(), 2);
        b.wait();
    }

    #[test]
    fn barrier_reset_permits_exactly_one_more_cycle() {
        let b = Arc::new(CountingBarrier::new(2));
        b.increment();
        b.increment();
        b.wait();
        b.reset();
        assert_eq!(b.count(), 0);

        b.increment();
        let b2 = Arc::clone(&b);
        let waiter = thread::spawn(move || b2.wait());
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        b.increment();
        waiter.join().unwrap();
    }

    #[test]
    fn zero_target_barrier_never_blocks() {
        let b = CountingBarrier::new(0);
        b.wait();
        b.increment();
        assert_eq!(b.count(), 0);
    }
}
