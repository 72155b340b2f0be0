//! Token-bucket rate limiting for outbound requests
//!
//! The bucket starts full, so the first `capacity` requests go out
//! immediately. After that a background replenisher adds one permit per
//! interval, capping the sustained rate. Refills that arrive while the
//! bucket is full are dropped rather than banked.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Errors raised when a permit cannot be granted
#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("requested {requested} permits from a bucket of capacity {capacity}")]
    ExceedsCapacity { requested: u32, capacity: u32 },

    #[error("permit store is closed")]
    Closed,
}

/// A bounded counting permit store
///
/// One permit authorizes one outbound request.
pub trait PermitStore: Send + Sync {
    /// Waits until `n` permits are available and consumes them
    ///
    /// Waiters are served in the order they started waiting.
    fn acquire(&self, n: u32) -> impl Future<Output = Result<(), LimiterError>> + Send;

    /// Adds up to `n` permits without exceeding capacity
    ///
    /// Returns how many permits were actually added.
    fn replenish(&self, n: u32) -> u32;
}

/// Token bucket backed by a fair semaphore
pub struct TokenBucket {
    semaphore: Semaphore,
    capacity: u32,
    // Serializes refills so the check-then-add in `replenish` cannot overfill
    refill: Mutex<()>,
}

impl TokenBucket {
    /// Creates a bucket pre-seeded to capacity
    pub fn full(capacity: u32) -> Self {
        Self::with_permits(capacity, capacity)
    }

    /// Creates a bucket holding no permits
    pub fn empty(capacity: u32) -> Self {
        Self::with_permits(capacity, 0)
    }

    fn with_permits(capacity: u32, permits: u32) -> Self {
        Self {
            semaphore: Semaphore::new(permits.min(capacity) as usize),
            capacity,
            refill: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Permits currently available without waiting
    pub fn available(&self) -> u32 {
        self.semaphore.available_permits() as u32
    }
}

impl PermitStore for TokenBucket {
    fn acquire(&self, n: u32) -> impl Future<Output = Result<(), LimiterError>> + Send {
        async move {
            if n > self.capacity {
                return Err(LimiterError::ExceedsCapacity {
                    requested: n,
                    capacity: self.capacity,
                });
            }

            let permits = self
                .semaphore
                .acquire_many(n)
                .await
                .map_err(|_| LimiterError::Closed)?;

            // Consumed permits come back only through `replenish`
            permits.forget();
            Ok(())
        }
    }

    fn replenish(&self, n: u32) -> u32 {
        let _guard = self.refill.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let room = self.capacity.saturating_sub(self.available());
        let added = n.min(room);
        if added > 0 {
            self.semaphore.add_permits(added as usize);
        }
        added
    }
}

/// Background task adding one permit per interval
///
/// The task stops when the replenisher is stopped or dropped.
pub struct Replenisher {
    handle: JoinHandle<()>,
}

impl Replenisher {
    /// Starts the ticker; the first refill happens one interval from now
    pub fn spawn<P>(store: Arc<P>, interval: Duration) -> Self
    where
        P: PermitStore + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if store.replenish(1) == 0 {
                    tracing::trace!("Bucket full, refill dropped");
                }
            }
        });

        Self { handle }
    }

    /// Stops the ticker
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Replenisher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
