//! Device translation cache
//!
//! Maps caller device handles to exactly one `TranslationEntry` each. The
//! handle map is guarded by one lock held across lookup-or-create, so a probe
//! runs at most once per handle. The degradation decisions sit behind their
//! own lock (always taken after the map lock), and every entry guards its
//! frame id state with a lock of its own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{OutOfBandQueueKind, PacingBackend, PacingProbe, SleepMode};
use crate::common::{
    clear_reports, BackendKind, DeviceHandle, FrameReport, LatencyError, LatencyReports,
    QueueHandle, Result,
};
use crate::config::LatencyConfig;
use crate::degradation::{DegradationState, DegradationTracker};
use crate::frame_id::FrameIdGenerator;
use crate::marker::{MarkerType, NativeMarker};

/// Pacing state of a translation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Initialized, pacing disabled
    Disabled,
    /// Initialized, pacing enabled
    Enabled,
    /// Torn down by a cache reset
    Released,
}

/// What happened to a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Forwarded to the backend under this device frame id
    Forwarded(u64),
    /// Same frame id as the previous marker of this type; not forwarded
    Duplicate,
    /// Marker type has no native equivalent; accepted and dropped
    Dropped,
}

/// What a timing history query produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingHistory {
    /// Every report was mapped back to an application frame id
    Resolved,
    /// At least one report fell outside the window or mapped to frame 0;
    /// buffer zeroed
    Masked,
    /// Backend has no timing data; buffer zeroed
    Unavailable,
}

/// Per-device translation state
#[derive(Debug)]
pub struct TranslationEntry {
    device: DeviceHandle,
    kind: BackendKind,
    degradation: DegradationState,
    backend: PacingBackend,
    /// Pacing enabled flag; held across the mode-set call
    pacing_enabled: Mutex<bool>,
    frames: Mutex<FrameIdGenerator>,
    released: AtomicBool,
}

impl TranslationEntry {
    fn new(
        device: DeviceHandle,
        kind: BackendKind,
        backend: PacingBackend,
        degradation: DegradationState,
    ) -> Self {
        Self {
            device,
            kind,
            degradation,
            backend,
            pacing_enabled: Mutex::new(false),
            frames: Mutex::new(FrameIdGenerator::new()),
            released: AtomicBool::new(false),
        }
    }

    pub fn device(&self) -> DeviceHandle {
        self.device
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn degradation(&self) -> DegradationState {
        self.degradation
    }

    pub fn backend(&self) -> &PacingBackend {
        &self.backend
    }

    pub fn state(&self) -> EntryState {
        if self.released.load(Ordering::Acquire) {
            EntryState::Released
        } else if *self.pacing_enabled.lock() {
            EntryState::Enabled
        } else {
            EntryState::Disabled
        }
    }

    pub fn pacing_enabled(&self) -> Result<bool> {
        self.ensure_live()?;
        Ok(*self.pacing_enabled.lock())
    }

    pub fn supports_low_latency(&self) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.backend.is_native())
    }

    /// Set or (with `None`) restore the pacing mode.
    ///
    /// The enabled flag only changes when the backend accepts the mode.
    pub fn set_sleep_mode(&self, mode: Option<&SleepMode>) -> Result<()> {
        self.ensure_live()?;

        let mut pacing_enabled = self.pacing_enabled.lock();
        self.backend.set_sleep_mode(mode)?;

        let enabled = mode.map_or(false, |mode| mode.low_latency);
        if *pacing_enabled != enabled {
            log::debug!(
                "Device {:#x}: low latency mode {} -> {}",
                self.device.as_raw(),
                *pacing_enabled,
                enabled
            );
        }
        *pacing_enabled = enabled;

        Ok(())
    }

    pub fn sleep(&self, target: u64) -> Result<()> {
        self.ensure_live()?;
        log::trace!("Device {:#x}: sleep until {}", self.device.as_raw(), target);
        self.backend.sleep(target)
    }

    /// Record a marker and forward it unless it repeats the previous one
    pub fn set_marker(
        &self,
        frame_id: u64,
        marker: MarkerType,
        native: NativeMarker,
    ) -> Result<MarkOutcome> {
        self.ensure_live()?;

        let device_frame_id = {
            let mut frames = self.frames.lock();
            if frames.is_duplicate_marker(frame_id, marker) {
                log::trace!(
                    "Device {:#x}: dropping repeated {} for frame {}",
                    self.device.as_raw(),
                    marker,
                    frame_id
                );
                return Ok(MarkOutcome::Duplicate);
            }
            frames.assign_or_reuse(frame_id)
        };

        log::trace!(
            "Device {:#x}: {} frame {} -> {}",
            self.device.as_raw(),
            marker,
            frame_id,
            device_frame_id
        );
        self.backend.set_marker(device_frame_id, native)?;

        Ok(MarkOutcome::Forwarded(device_frame_id))
    }

    /// Fetch timing history with frame ids mapped back to application ids.
    ///
    /// Either every filled report resolves to a nonzero application id or the
    /// whole buffer is zeroed.
    pub fn latency_timings(&self, reports: &mut LatencyReports) -> Result<TimingHistory> {
        self.ensure_live()?;
        clear_reports(reports);

        let filled = match self.backend.latency_timings(reports) {
            Ok(filled) => filled.min(reports.len()),
            Err(LatencyError::Unsupported) => {
                clear_reports(reports);
                return Ok(TimingHistory::Unavailable);
            }
            Err(err) => {
                clear_reports(reports);
                return Err(err);
            }
        };

        // Rows past the reported count are never surfaced
        reports[filled..].fill(FrameReport::ZERO);

        let frames = self.frames.lock();
        let mut stale = None;
        for report in reports[..filled].iter_mut() {
            match frames.resolve(report.frame_id) {
                Some(application_id) if application_id != 0 => report.frame_id = application_id,
                _ => {
                    stale = Some(report.frame_id);
                    break;
                }
            }
        }

        if let Some(device_frame_id) = stale {
            log::trace!(
                "Device {:#x}: frame {} unresolved, masking timings",
                self.device.as_raw(),
                device_frame_id
            );
            clear_reports(reports);
            return Ok(TimingHistory::Masked);
        }

        Ok(TimingHistory::Resolved)
    }

    pub fn notify_out_of_band(&self, queue: QueueHandle, kind: OutOfBandQueueKind) -> Result<()> {
        self.ensure_live()?;
        self.backend.notify_out_of_band(queue, kind)
    }

    /// Frame id correlation state
    pub fn with_frames<R>(&self, f: impl FnOnce(&FrameIdGenerator) -> R) -> R {
        f(&self.frames.lock())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released.load(Ordering::Acquire) {
            return Err(LatencyError::NotInitialized);
        }
        Ok(())
    }

    fn release(&self) {
        self.released.store(true, Ordering::Release);
        self.backend.release();
    }
}

/// Thread-safe handle -> entry cache
#[derive(Debug, Default)]
pub struct DeviceTranslationCache {
    entries: Mutex<HashMap<DeviceHandle, Arc<TranslationEntry>>>,
    degradation: DegradationTracker,
    config: LatencyConfig,
}

impl DeviceTranslationCache {
    pub fn new(config: LatencyConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            degradation: DegradationTracker::new(),
            config,
        }
    }

    pub fn config(&self) -> &LatencyConfig {
        &self.config
    }

    /// Entry for `device`, probing and creating it on first use
    pub fn get_or_create(
        &self,
        device: DeviceHandle,
        probe: &dyn PacingProbe,
    ) -> Result<Arc<TranslationEntry>> {
        if device.is_null() {
            return Err(LatencyError::InvalidArgument);
        }

        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&device) {
            return Ok(Arc::clone(entry));
        }

        let (backend, state) = self
            .degradation
            .select_backend(device, probe, &self.config)
            .map_err(|err| {
                log::warn!(
                    "{} device {:#x}: low latency initialization failed: {}",
                    probe.kind(),
                    device.as_raw(),
                    err
                );
                LatencyError::ProbeFailed(err)
            })?;

        log::info!(
            "{} device {:#x}: low latency initialized ({})",
            probe.kind(),
            device.as_raw(),
            state
        );

        let entry = Arc::new(TranslationEntry::new(device, probe.kind(), backend, state));
        entries.insert(device, Arc::clone(&entry));

        Ok(entry)
    }

    /// Entry for `device`, never creating one
    pub fn get(&self, device: DeviceHandle) -> Result<Arc<TranslationEntry>> {
        if device.is_null() {
            return Err(LatencyError::InvalidArgument);
        }

        self.entries
            .lock()
            .get(&device)
            .cloned()
            .ok_or(LatencyError::NotInitialized)
    }

    pub fn degradation_state(&self, kind: BackendKind) -> Option<DegradationState> {
        self.degradation.state(kind)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Release every entry and forget every degradation decision
    pub fn reset(&self) {
        let mut entries = self.entries.lock();
        let count = entries.len();

        for (_, entry) in entries.drain() {
            entry.release();
        }
        self.degradation.reset();

        log::info!("Low latency cache reset ({} device(s) released)", count);
    }
}
