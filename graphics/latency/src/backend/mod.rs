//! Pacing backends
//!
//! A device either has the complete native pacing entry point set, or it is
//! driven through an emulated backend built on a host timeline.

use std::fmt;

use bitflags::bitflags;
use gal::sync::{HostTimeline, Semaphore, TimelineSemaphore};
use parking_lot::Mutex;

use crate::common::{
    BackendError, BackendKind, DeviceHandle, LatencyError, LatencyReports, ProbeError,
    QueueHandle, Result,
};
use crate::marker::NativeMarker;

/// Low-latency sleep mode parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SleepMode {
    pub low_latency: bool,
    pub boost: bool,
    pub minimum_interval_us: u32,
}

impl SleepMode {
    pub const fn new(low_latency: bool, boost: bool, minimum_interval_us: u32) -> Self {
        Self {
            low_latency,
            boost,
            minimum_interval_us,
        }
    }
}

/// Queue family an out-of-band submission is made on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum OutOfBandQueueKind {
    Render = 0,
    Present = 1,
}

impl OutOfBandQueueKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(OutOfBandQueueKind::Render),
            1 => Some(OutOfBandQueueKind::Present),
            _ => None,
        }
    }
}

/// `None` restores the driver defaults
pub type SetSleepModeFn =
    Box<dyn Fn(Option<&SleepMode>) -> core::result::Result<(), BackendError> + Send + Sync>;
pub type SleepFn = Box<dyn Fn(u64) -> core::result::Result<(), BackendError> + Send + Sync>;
/// Fills the buffer and returns the number of reports written
pub type GetTimingsFn =
    Box<dyn Fn(&mut LatencyReports) -> core::result::Result<usize, BackendError> + Send + Sync>;
pub type SetMarkerFn =
    Box<dyn Fn(u64, NativeMarker) -> core::result::Result<(), BackendError> + Send + Sync>;
pub type NotifyOutOfBandFn = Box<
    dyn Fn(QueueHandle, OutOfBandQueueKind) -> core::result::Result<(), BackendError>
        + Send
        + Sync,
>;

bitflags! {
    /// Native entry points that failed to resolve
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MissingEntryPoints: u8 {
        const SET_SLEEP_MODE = 1 << 0;
        const SLEEP = 1 << 1;
        const GET_TIMINGS = 1 << 2;
        const SET_MARKER = 1 << 3;
        const NOTIFY_OUT_OF_BAND = 1 << 4;
    }
}

/// Native pacing entry points as resolved from the underlying stack
#[derive(Default)]
pub struct NativeEntryPoints {
    pub set_sleep_mode: Option<SetSleepModeFn>,
    pub sleep: Option<SleepFn>,
    pub get_timings: Option<GetTimingsFn>,
    pub set_marker: Option<SetMarkerFn>,
    pub notify_out_of_band: Option<NotifyOutOfBandFn>,
}

impl NativeEntryPoints {
    /// Entry point set with nothing resolved
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn missing(&self) -> MissingEntryPoints {
        let mut missing = MissingEntryPoints::empty();
        missing.set(MissingEntryPoints::SET_SLEEP_MODE, self.set_sleep_mode.is_none());
        missing.set(MissingEntryPoints::SLEEP, self.sleep.is_none());
        missing.set(MissingEntryPoints::GET_TIMINGS, self.get_timings.is_none());
        missing.set(MissingEntryPoints::SET_MARKER, self.set_marker.is_none());
        missing.set(
            MissingEntryPoints::NOTIFY_OUT_OF_BAND,
            self.notify_out_of_band.is_none(),
        );
        missing
    }

    /// Build a native backend if every entry point resolved
    pub fn into_backend(self) -> core::result::Result<NativeBackend, MissingEntryPoints> {
        match self {
            NativeEntryPoints {
                set_sleep_mode: Some(set_sleep_mode),
                sleep: Some(sleep),
                get_timings: Some(get_timings),
                set_marker: Some(set_marker),
                notify_out_of_band: Some(notify_out_of_band),
            } => Ok(NativeBackend {
                set_sleep_mode,
                sleep,
                get_timings,
                set_marker,
                notify_out_of_band,
            }),
            incomplete => Err(incomplete.missing()),
        }
    }
}

impl fmt::Debug for NativeEntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEntryPoints")
            .field("missing", &self.missing())
            .finish()
    }
}

/// Capability probe for one backend kind.
///
/// Asks the underlying stack what a device can do; never keeps the handle.
pub trait PacingProbe: Send + Sync {
    /// Backend kind this probe speaks for
    fn kind(&self) -> BackendKind;

    /// Resolve the native pacing entry points of `device`.
    ///
    /// An incomplete set means native pacing is unsupported; an error means
    /// the device itself could not be probed.
    fn resolve_native(&self, device: DeviceHandle)
        -> core::result::Result<NativeEntryPoints, ProbeError>;

    /// Create the timeline an emulated backend signals
    fn create_timeline(
        &self,
        _device: DeviceHandle,
    ) -> core::result::Result<Box<dyn TimelineSemaphore>, ProbeError> {
        Ok(Box::new(HostTimeline::new()))
    }

    /// Device owning `queue`, if the stack can tell
    fn owning_device(&self, _queue: QueueHandle) -> Option<DeviceHandle> {
        None
    }
}

/// Backend calling the native pacing entry points
pub struct NativeBackend {
    set_sleep_mode: SetSleepModeFn,
    sleep: SleepFn,
    get_timings: GetTimingsFn,
    set_marker: SetMarkerFn,
    notify_out_of_band: NotifyOutOfBandFn,
}

impl fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeBackend")
    }
}

/// Backend standing in for a stack without native pacing
pub struct EmulatedBackend {
    timeline: Mutex<Option<Box<dyn TimelineSemaphore>>>,
}

impl EmulatedBackend {
    pub fn new(timeline: Box<dyn TimelineSemaphore>) -> Self {
        log::debug!("Emulated pacing backend on timeline {}", timeline.handle());
        Self {
            timeline: Mutex::new(Some(timeline)),
        }
    }

    /// Advance the timeline to `target`; already-reached targets succeed.
    pub fn signal_to(&self, target: u64) -> Result<()> {
        let timeline = self.timeline.lock();
        let timeline = timeline.as_ref().ok_or(LatencyError::NotInitialized)?;

        let current = timeline.counter_value().map_err(LatencyError::Timeline)?;
        if target <= current {
            log::trace!(
                "Timeline {} already at {} (target {})",
                timeline.handle(),
                current,
                target
            );
            return Ok(());
        }

        timeline.signal(target).map_err(LatencyError::Timeline)
    }

    /// Current timeline value, `None` once destroyed
    pub fn timeline_value(&self) -> Option<u64> {
        self.timeline
            .lock()
            .as_ref()
            .and_then(|timeline| timeline.counter_value().ok())
    }

    /// Handle of the timeline, `None` once destroyed
    pub fn timeline_handle(&self) -> Option<usize> {
        self.timeline.lock().as_ref().map(|timeline| timeline.handle())
    }

    /// Destroy the timeline
    pub fn destroy(&self) {
        if let Some(timeline) = self.timeline.lock().take() {
            log::debug!("Releasing emulated timeline {}", timeline.handle());
        }
    }
}

impl fmt::Debug for EmulatedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedBackend")
            .field("timeline", &self.timeline_handle())
            .finish()
    }
}

/// Backend object resolved for a device
#[derive(Debug)]
pub enum PacingBackend {
    Native(NativeBackend),
    Emulated(EmulatedBackend),
}

impl PacingBackend {
    pub fn is_native(&self) -> bool {
        matches!(self, PacingBackend::Native(_))
    }

    /// Emulated mode accepts every mode and does nothing
    pub fn set_sleep_mode(&self, mode: Option<&SleepMode>) -> Result<()> {
        match self {
            PacingBackend::Native(native) => Ok((native.set_sleep_mode)(mode)?),
            PacingBackend::Emulated(_) => Ok(()),
        }
    }

    pub fn sleep(&self, target: u64) -> Result<()> {
        match self {
            PacingBackend::Native(native) => Ok((native.sleep)(target)?),
            PacingBackend::Emulated(emulated) => emulated.signal_to(target),
        }
    }

    /// Emulated mode has no timing data and reports `Unsupported`
    pub fn latency_timings(&self, reports: &mut LatencyReports) -> Result<usize> {
        match self {
            PacingBackend::Native(native) => Ok((native.get_timings)(reports)?),
            PacingBackend::Emulated(_) => Err(LatencyError::Unsupported),
        }
    }

    pub fn set_marker(&self, device_frame_id: u64, marker: NativeMarker) -> Result<()> {
        match self {
            PacingBackend::Native(native) => Ok((native.set_marker)(device_frame_id, marker)?),
            PacingBackend::Emulated(_) => Ok(()),
        }
    }

    pub fn notify_out_of_band(&self, queue: QueueHandle, kind: OutOfBandQueueKind) -> Result<()> {
        match self {
            PacingBackend::Native(native) => Ok((native.notify_out_of_band)(queue, kind)?),
            PacingBackend::Emulated(_) => Ok(()),
        }
    }

    /// Release backend resources
    pub fn release(&self) {
        if let PacingBackend::Emulated(emulated) = self {
            emulated.destroy();
        }
    }
}
