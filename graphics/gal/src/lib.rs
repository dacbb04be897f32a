//! Graphics Abstraction Layer (GAL)
//!
//! This crate provides the hardware-agnostic synchronization objects shared
//! by the graphics translation layers.
//!
//! # Usage
//!
//! ```ignore
//! use gal::{HostTimeline, TimelineSemaphore};
//!
//! let timeline = HostTimeline::new();
//! timeline.signal(5)?;
//! assert_eq!(timeline.counter_value()?, 5);
//! ```

#![no_std]

pub mod sync;

// Re-exports
pub use sync::{HostTimeline, Semaphore, TimelineSemaphore};

/// Result type for GAL operations
pub type Result<T> = core::result::Result<T, Error>;

/// GAL error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid parameter
    InvalidParameter,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidParameter => write!(f, "Invalid parameter"),
        }
    }
}
