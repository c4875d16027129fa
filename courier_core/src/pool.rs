use crate::{CourierError, CourierResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared byte budget backing all live message payloads.
///
/// The pool bounds the daemon's message memory: a reservation debits the
/// budget, dropping the returned [`Lease`] credits it back. Handles are
/// cheap to clone and share one budget.
#[derive(Debug, Clone)]
pub struct Pool(Arc<PoolCore>);

#[derive(Debug)]
struct PoolCore {
    capacity: usize,
    in_use: AtomicUsize,
}

impl Pool {
    /// Creates a pool with the given byte capacity.
    pub fn new(capacity: usize) -> Self {
        Self(Arc::new(PoolCore {
            capacity,
            in_use: AtomicUsize::new(0),
        }))
    }

    /// Reserves `n_bytes` from the budget.
    ///
    /// Fails with [`CourierError::PoolExhausted`] when the remaining budget
    /// is insufficient; exhaustion is an expected overload condition and
    /// leaves the pool unchanged.
    pub fn reserve(&self, n_bytes: usize) -> CourierResult<Lease> {
        let mut current = self.0.in_use.load(Ordering::Relaxed);
        loop {
            let wanted = current
                .checked_add(n_bytes)
                .filter(|wanted| *wanted <= self.0.capacity)
                .ok_or(CourierError::PoolExhausted { requested: n_bytes })?;
            match self.0.in_use.compare_exchange_weak(
                current,
                wanted,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    trace!("Pool::reserve() granted {n_bytes} bytes ({wanted} in use)");
                    return Ok(Lease {
                        core: Arc::clone(&self.0),
                        n_bytes,
                    });
                }
                Err(seen) => current = seen,
            }
        }
    }

    /// Total byte capacity.
    pub fn capacity(&self) -> usize {
        self.0.capacity
    }

    /// Bytes currently reserved.
    pub fn in_use(&self) -> usize {
        self.0.in_use.load(Ordering::Acquire)
    }
}

/// Accounting guard for one reservation; returns its bytes to the pool
/// when dropped.
#[derive(Debug)]
pub struct Lease {
    core: Arc<PoolCore>,
    n_bytes: usize,
}

impl Lease {
    /// Number of bytes this lease holds.
    pub fn len(&self) -> usize {
        self.n_bytes
    }

    /// Whether the lease holds zero bytes.
    pub fn is_empty(&self) -> bool {
        self.n_bytes == 0
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.core.in_use.fetch_sub(self.n_bytes, Ordering::AcqRel);
    }
}
