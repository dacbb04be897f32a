//! Low-latency request facade
//!
//! Entry-point-facing side of the subsystem: validates requests, resolves the
//! translation entry and drives marker translation and frame id correlation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{OutOfBandQueueKind, PacingProbe, SleepMode};
use crate::cache::{DeviceTranslationCache, MarkOutcome, TimingHistory, TranslationEntry};
use crate::common::{
    BackendKind, DeviceHandle, LatencyError, LatencyReports, QueueHandle, Result,
};
use crate::degradation::DegradationState;
use crate::marker::{self, MarkerTranslation, MarkerType};

/// Requests that log their first success
#[derive(Debug, Clone, Copy)]
enum Request {
    SetPacingMode,
    BlockUntilTarget,
    MarkPhase,
    QueryTimingHistory,
    NotifyOutOfBand,
}

impl Request {
    const COUNT: usize = 5;

    const fn name(self) -> &'static str {
        match self {
            Request::SetPacingMode => "SetPacingMode",
            Request::BlockUntilTarget => "BlockUntilTarget",
            Request::MarkPhase => "MarkPhase",
            Request::QueryTimingHistory => "QueryTimingHistory",
            Request::NotifyOutOfBand => "NotifyOutOfBand",
        }
    }
}

/// Low-latency facade for one backend kind
pub struct LowLatencyFacade {
    cache: Arc<DeviceTranslationCache>,
    probe: Arc<dyn PacingProbe>,
    logged_ok: [AtomicBool; Request::COUNT],
    logged_markers: Mutex<HashSet<MarkerType>>,
}

impl LowLatencyFacade {
    /// Create a facade translating devices of `probe`'s kind through `cache`
    pub fn new(cache: Arc<DeviceTranslationCache>, probe: Arc<dyn PacingProbe>) -> Self {
        log::info!("Creating {} low latency facade", probe.kind());

        Self {
            cache,
            probe,
            logged_ok: Default::default(),
            logged_markers: Mutex::new(HashSet::new()),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.probe.kind()
    }

    pub fn cache(&self) -> &Arc<DeviceTranslationCache> {
        &self.cache
    }

    /// Create (or look up) the entry for `device`
    pub fn initialize(&self, device: DeviceHandle) -> Result<DegradationState> {
        let entry = self.cache.get_or_create(device, self.probe.as_ref())?;
        Ok(entry.degradation())
    }

    /// Set the pacing mode, creating the entry if needed.
    ///
    /// `None` restores the defaults, which disables pacing.
    pub fn set_pacing_mode(&self, device: DeviceHandle, mode: Option<SleepMode>) -> Result<()> {
        let entry = self.cache.get_or_create(device, self.probe.as_ref())?;
        entry.set_sleep_mode(mode.as_ref())?;

        if let Some(mode) = mode {
            log::debug!(
                "{} device {:#x}: sleep mode {} (boost {}, {}us)",
                self.kind(),
                device.as_raw(),
                if mode.low_latency { "enabled" } else { "disabled" },
                mode.boost,
                mode.minimum_interval_us
            );
        }
        self.succeeded(Request::SetPacingMode);
        Ok(())
    }

    pub fn pacing_mode(&self, device: DeviceHandle) -> Result<bool> {
        self.entry(device)?.pacing_enabled()
    }

    /// Whether `device` runs on native pacing
    pub fn supports_low_latency(&self, device: DeviceHandle) -> Result<bool> {
        self.entry(device)?.supports_low_latency()
    }

    pub fn block_until_target(&self, device: DeviceHandle, target: u64) -> Result<()> {
        self.entry(device)?.sleep(target)?;
        self.succeeded(Request::BlockUntilTarget);
        Ok(())
    }

    /// Report a phase boundary for `frame_id`.
    ///
    /// Markers the native stack cannot express are accepted and dropped.
    pub fn mark_phase(
        &self,
        device: DeviceHandle,
        frame_id: u64,
        marker_type: u32,
    ) -> Result<MarkOutcome> {
        let entry = self.entry(device)?;

        let (marker, translation) = marker::translate_raw(marker_type).map_err(|err| {
            log::info!(
                "{}: unknown marker type {}",
                Request::MarkPhase.name(),
                marker::marker_name(marker_type)
            );
            err
        })?;

        let outcome = match translation {
            MarkerTranslation::Forward(native) => entry.set_marker(frame_id, marker, native)?,
            MarkerTranslation::Drop => {
                if self.logged_markers.lock().insert(marker) {
                    log::info!(
                        "Unsupported marker type {} ({}), ignoring",
                        marker,
                        marker.as_raw()
                    );
                }
                MarkOutcome::Dropped
            }
        };

        self.succeeded(Request::MarkPhase);
        Ok(outcome)
    }

    /// Report a phase boundary on a queue, applied to the queue's device
    pub fn mark_phase_on_queue(
        &self,
        queue: QueueHandle,
        frame_id: u64,
        marker_type: u32,
    ) -> Result<MarkOutcome> {
        if queue.is_null() {
            return Err(LatencyError::InvalidArgument);
        }

        let device = self
            .probe
            .owning_device(queue)
            .ok_or(LatencyError::NotInitialized)?;

        self.mark_phase(device, frame_id, marker_type)
    }

    /// Copy the timing history into `reports` with application frame ids.
    ///
    /// Missing data is not an error: the buffer comes back zeroed.
    pub fn query_timing_history(
        &self,
        device: DeviceHandle,
        reports: &mut LatencyReports,
    ) -> Result<TimingHistory> {
        let history = self.entry(device)?.latency_timings(reports)?;
        self.succeeded(Request::QueryTimingHistory);
        Ok(history)
    }

    pub fn notify_out_of_band(
        &self,
        device: DeviceHandle,
        queue: QueueHandle,
        kind: u32,
    ) -> Result<()> {
        if queue.is_null() {
            return Err(LatencyError::InvalidArgument);
        }
        let kind = OutOfBandQueueKind::from_raw(kind).ok_or(LatencyError::InvalidArgument)?;

        self.entry(device)?.notify_out_of_band(queue, kind)?;
        self.succeeded(Request::NotifyOutOfBand);
        Ok(())
    }

    /// Release every device and forget every degradation decision
    pub fn reset_subsystem(&self) {
        self.cache.reset();
        self.logged_markers.lock().clear();
    }

    fn entry(&self, device: DeviceHandle) -> Result<Arc<TranslationEntry>> {
        self.cache.get(device)
    }

    fn succeeded(&self, request: Request) {
        if !self.cache.config().log_first_success {
            return;
        }
        if !self.logged_ok[request as usize].swap(true, Ordering::Relaxed) {
            log::info!("{} ({}): OK", request.name(), self.kind());
        }
    }
}

impl core::fmt::Debug for LowLatencyFacade {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LowLatencyFacade")
            .field("kind", &self.kind())
            .field("devices", &self.cache.len())
            .finish()
    }
}
