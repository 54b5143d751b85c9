//! Binary concurrency gate for single-flight provider families.
//!
//! Some provider organizations enforce a hard ceiling of exactly one
//! in-flight request across the whole process. The gate is a single shared
//! flag plus a fixed-interval polling loop; release happens in the guard's
//! `Drop`, so it is unconditional on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a blocked caller waits between acquisition attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Process-wide binary gate. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGate {
    busy: Arc<AtomicBool>,
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block (polling at [`POLL_INTERVAL`]) until the gate is free, then
    /// take it. The returned guard releases on drop.
    pub async fn acquire(&self) -> GateGuard {
        loop {
            if self
                .busy
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return GateGuard {
                    busy: Arc::clone(&self.busy),
                };
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds the gate; dropping it releases.
#[derive(Debug)]
pub struct GateGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
