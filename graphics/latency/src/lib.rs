//! Low-latency frame pacing translation for the graphics compatibility layer
//!
//! This crate maps vendor low-latency requests onto the pacing primitives of
//! the underlying driver stack:
//! - Frame id correlation between application and device timelines
//! - Marker type translation and duplicate suppression
//! - Per-device translation cache
//! - Emulated pacing when native entry points are absent

pub mod backend;
pub mod cache;
pub mod common;
pub mod config;
pub mod degradation;
pub mod frame_id;
pub mod low_latency;
pub mod marker;

pub use backend::{
    EmulatedBackend, MissingEntryPoints, NativeBackend, NativeEntryPoints, OutOfBandQueueKind,
    PacingBackend, PacingProbe, SleepMode,
};
pub use cache::{DeviceTranslationCache, EntryState, MarkOutcome, TimingHistory, TranslationEntry};
pub use common::{
    BackendError, BackendKind, DeviceHandle, FrameReport, LatencyError, LatencyReports,
    ProbeError, QueueHandle, Result, Status, FRAME_ID_WINDOW, LATENCY_REPORT_COUNT,
};
pub use config::LatencyConfig;
pub use degradation::DegradationState;
pub use frame_id::FrameIdGenerator;
pub use low_latency::LowLatencyFacade;
pub use marker::{MarkerTranslation, MarkerType, NativeMarker};

use std::sync::Arc;

/// Initialize the latency translation subsystem
pub fn init(config: LatencyConfig) -> Arc<DeviceTranslationCache> {
    log::info!("Initializing low latency translation subsystem");

    if config.force_emulation {
        log::info!("Native pacing disabled, all devices will be emulated");
    }

    Arc::new(DeviceTranslationCache::new(config))
}
