//! Synchronization primitives
//!
//! This module provides GPU synchronization objects.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::{Error, Result};

/// Semaphore for GPU-GPU synchronization
pub trait Semaphore: Send + Sync {
    /// Get semaphore handle ID
    fn handle(&self) -> usize;
}

/// Timeline semaphore for advanced synchronization
pub trait TimelineSemaphore: Semaphore {
    /// Get current counter value
    fn counter_value(&self) -> Result<u64>;

    /// Signal with a value
    ///
    /// The value must be strictly greater than the current counter value.
    fn signal(&self, value: u64) -> Result<()>;
}

/// Handle IDs start at 1 so that 0 stays a null handle.
static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(1);

/// Counter-backed timeline living entirely on the host.
///
/// Stands in for a device timeline when there is no device-side object to
/// signal. Dropping it destroys the timeline.
pub struct HostTimeline {
    handle: usize,
    counter: spin::Mutex<u64>,
}

impl HostTimeline {
    /// Create a timeline with an initial value of 0
    pub fn new() -> Self {
        Self::with_initial_value(0)
    }

    /// Create a timeline starting at `initial_value`
    pub fn with_initial_value(initial_value: u64) -> Self {
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "Creating host timeline {} (initial value {})",
            handle,
            initial_value
        );

        Self {
            handle,
            counter: spin::Mutex::new(initial_value),
        }
    }
}

impl Default for HostTimeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Semaphore for HostTimeline {
    fn handle(&self) -> usize {
        self.handle
    }
}

impl TimelineSemaphore for HostTimeline {
    fn counter_value(&self) -> Result<u64> {
        Ok(*self.counter.lock())
    }

    fn signal(&self, value: u64) -> Result<()> {
        let mut counter = self.counter.lock();
        if value <= *counter {
            log::warn!(
                "Host timeline {}: refusing to signal {} (current {})",
                self.handle,
                value,
                *counter
            );
            return Err(Error::InvalidParameter);
        }

        *counter = value;
        log::trace!("Host timeline {} signaled to {}", self.handle, value);
        Ok(())
    }
}

impl Drop for HostTimeline {
    fn drop(&mut self) {
        log::debug!("Destroying host timeline {}", self.handle);
    }
}

impl core::fmt::Debug for HostTimeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostTimeline")
            .field("handle", &self.handle)
            .field("value", &*self.counter.lock())
            .finish()
    }
}
