//! Bounded pool of automation-session slots
//!
//! Caps how many headless pages are alive at once. Waiters are served strictly
//! in arrival order because `tokio::sync::Semaphore` is fair. A [`Lease`] gives
//! its slot back when dropped, so every exit path (error, timeout, a cancelled
//! future) releases it.

use crate::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Counting pool handing out [`Lease`]s
#[derive(Debug)]
pub struct ResourcePool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    waiting: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

/// Exclusive right to run one automation session
#[derive(Debug)]
pub struct Lease {
    id: u64,
    acquired_at: Instant,
    _permit: OwnedSemaphorePermit,
}

/// Decrements the waiter count even if the acquiring future is dropped
struct WaitingGuard(Arc<AtomicUsize>);

impl Drop for WaitingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ResourcePool {
    /// Create a pool with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            waiting: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Wait for a free slot. Callers queue in FIFO order.
    pub async fn acquire(&self) -> Result<Lease> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let _waiting = WaitingGuard(self.waiting.clone());

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;

        let lease = Lease {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            acquired_at: Instant::now(),
            _permit: permit,
        };
        tracing::debug!(
            lease = lease.id,
            in_use = self.in_use(),
            capacity = self.capacity,
            "Session lease acquired"
        );
        Ok(lease)
    }

    /// Take a slot only if one is free right now
    pub fn try_acquire(&self) -> Option<Lease> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        Some(Lease {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            acquired_at: Instant::now(),
            _permit: permit,
        })
    }

    /// Give a lease back. Equivalent to dropping it.
    pub fn release(&self, lease: Lease) {
        drop(lease);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Leases currently held
    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Callers currently blocked in [`ResourcePool::acquire`]
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Stop handing out leases. Pending and future `acquire` calls fail with
    /// [`Error::PoolClosed`]; outstanding leases stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
        tracing::info!("Session pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

impl Lease {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// How long this lease has been held
    pub fn held_for(&self) -> std::time::Duration {
        self.acquired_at.elapsed()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        tracing::debug!(
            lease = self.id,
            held_ms = self.held_for().as_millis() as u64,
            "Session lease released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn wait_for_waiters(pool: &ResourcePool, count: usize) {
        while pool.waiting() < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_capacity_is_never_exceeded() {
        let pool = Arc::new(ResourcePool::new(3));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut tasks = Vec::new();

        for _ in 0..12 {
            let pool = pool.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let lease = pool.acquire().await.unwrap();
                peak.fetch_max(pool.in_use(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                pool.release(lease);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(pool.in_use(), 0);
    }

    #[tokio::test]
    async fn test_waiters_are_served_fifo() {
        let pool = Arc::new(ResourcePool::new(1));
        let held = pool.acquire().await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut tasks = Vec::new();
        for i in 0..4 {
            let task_pool = pool.clone();
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                let lease = task_pool.acquire().await.unwrap();
                tx.send(i).unwrap();
                drop(lease);
            }));
            // Make sure waiter i is queued before waiter i + 1 starts
            wait_for_waiters(&pool, i + 1).await;
        }
        drop(tx);

        drop(held);
        for task in tasks {
            task.await.unwrap();
        }

        let mut order = Vec::new();
        while let Some(i) = rx.recv().await {
            order.push(i);
        }
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_lease_released_when_task_panics() {
        let pool = Arc::new(ResourcePool::new(1));
        let task_pool = pool.clone();

        let result = tokio::spawn(async move {
            let _lease = task_pool.acquire().await.unwrap();
            panic!("session blew up");
        })
        .await;

        assert!(result.is_err());
        assert_eq!(pool.in_use(), 0);
        assert!(pool.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_acquire_does_not_leak() {
        let pool = ResourcePool::new(1);
        let held = pool.acquire().await.unwrap();

        let timed_out = tokio::time::timeout(Duration::from_secs(1), pool.acquire()).await;
        assert!(timed_out.is_err());
        assert_eq!(pool.waiting(), 0);

        drop(held);
        assert!(pool.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_close_fails_pending_acquire() {
        let pool = Arc::new(ResourcePool::new(1));
        let _held = pool.acquire().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await })
        };
        wait_for_waiters(&pool, 1).await;
        pool.close();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(Error::PoolClosed)));
        assert!(pool.is_closed());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let pool = ResourcePool::new(0);
        assert_eq!(pool.capacity(), 1);
    }
}
