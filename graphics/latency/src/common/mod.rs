//! Common latency translation types

use core::fmt;

/// Number of application frame ids kept resolvable per device
pub const FRAME_ID_WINDOW: usize = 1000;

/// Number of frame reports in one timing history query
pub const LATENCY_REPORT_COUNT: usize = 64;

/// Number of duplicate-suppression slots (one per marker type)
pub const MARKER_SLOT_COUNT: usize = 16;

/// Opaque caller-owned device, device context or command queue identity.
///
/// Never dereferenced, only compared and hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(usize);

impl DeviceHandle {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Opaque caller-owned queue identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueHandle(usize);

impl QueueHandle {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Underlying stack family a device belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// D3D-style devices
    D3d,
    /// Vulkan-style devices
    Vulkan,
}

impl BackendKind {
    pub(crate) const fn index(self) -> usize {
        match self {
            BackendKind::D3d => 0,
            BackendKind::Vulkan => 1,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::D3d => write!(f, "D3D"),
            BackendKind::Vulkan => write!(f, "Vulkan"),
        }
    }
}

/// Per-frame timing report (timestamps in microseconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct FrameReport {
    pub frame_id: u64,
    pub input_sample_time: u64,
    pub sim_start_time: u64,
    pub sim_end_time: u64,
    pub render_submit_start_time: u64,
    pub render_submit_end_time: u64,
    pub present_start_time: u64,
    pub present_end_time: u64,
    pub driver_start_time: u64,
    pub driver_end_time: u64,
    pub os_render_queue_start_time: u64,
    pub os_render_queue_end_time: u64,
    pub gpu_render_start_time: u64,
    pub gpu_render_end_time: u64,
    pub gpu_active_render_time_us: u32,
    pub gpu_frame_time_us: u32,
}

impl FrameReport {
    /// Report with every field zeroed
    pub const ZERO: Self = Self {
        frame_id: 0,
        input_sample_time: 0,
        sim_start_time: 0,
        sim_end_time: 0,
        render_submit_start_time: 0,
        render_submit_end_time: 0,
        present_start_time: 0,
        present_end_time: 0,
        driver_start_time: 0,
        driver_end_time: 0,
        os_render_queue_start_time: 0,
        os_render_queue_end_time: 0,
        gpu_render_start_time: 0,
        gpu_render_end_time: 0,
        gpu_active_render_time_us: 0,
        gpu_frame_time_us: 0,
    };
}

/// Fixed-size timing history buffer
pub type LatencyReports = [FrameReport; LATENCY_REPORT_COUNT];

/// Zero every report in `reports`
pub fn clear_reports(reports: &mut LatencyReports) {
    reports.fill(FrameReport::ZERO);
}

/// Status code returned verbatim by a native pacing call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendError(pub i32);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native call returned {}", self.0)
    }
}

/// Failure of the creation path for a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The handle does not name a device the stack knows about
    InvalidDevice,
    /// The underlying stack could not be loaded
    StackUnavailable,
    /// Native entry points are missing on a backend already determined native
    Inconsistent,
    /// The stand-in timeline could not be created
    Timeline(gal::Error),
    /// Native call failed while setting the device up
    Backend(BackendError),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::InvalidDevice => write!(f, "Invalid device"),
            ProbeError::StackUnavailable => write!(f, "Underlying stack not available"),
            ProbeError::Inconsistent => {
                write!(f, "Native entry points missing on a native backend")
            }
            ProbeError::Timeline(err) => write!(f, "Timeline creation failed: {}", err),
            ProbeError::Backend(err) => write!(f, "Backend setup failed: {}", err),
        }
    }
}

/// Latency translation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatencyError {
    /// Device handle was never successfully initialized (or was reset)
    NotInitialized,
    /// Capability has no meaningful stand-in
    Unsupported,
    /// Marker type has no equivalent
    TranslationRejected(u32),
    /// Native call failed
    BackendFailure(BackendError),
    /// Null handle or out-of-range argument
    InvalidArgument,
    /// Creation path failed
    ProbeFailed(ProbeError),
    /// Stand-in timeline rejected a signal
    Timeline(gal::Error),
}

impl fmt::Display for LatencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencyError::NotInitialized => write!(f, "Device not initialized"),
            LatencyError::Unsupported => write!(f, "Not supported"),
            LatencyError::TranslationRejected(raw) => {
                write!(f, "Marker type {} has no equivalent", raw)
            }
            LatencyError::BackendFailure(err) => write!(f, "Backend failure: {}", err),
            LatencyError::InvalidArgument => write!(f, "Invalid argument"),
            LatencyError::ProbeFailed(err) => write!(f, "Probe failed: {}", err),
            LatencyError::Timeline(err) => write!(f, "Timeline error: {}", err),
        }
    }
}

impl std::error::Error for LatencyError {}

impl From<BackendError> for LatencyError {
    fn from(err: BackendError) -> Self {
        LatencyError::BackendFailure(err)
    }
}

impl From<ProbeError> for LatencyError {
    fn from(err: ProbeError) -> Self {
        LatencyError::ProbeFailed(err)
    }
}

/// Result type for latency translation operations
pub type Result<T> = core::result::Result<T, LatencyError>;

/// Coarse status reported by the entry-point layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    InvalidArgument,
    HandleInvalidated,
    NotSupported,
    Error,
}

impl Status {
    /// Map a request outcome onto an entry-point status
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(err) => Status::from(err),
        }
    }
}

impl From<&LatencyError> for Status {
    fn from(err: &LatencyError) -> Self {
        match err {
            LatencyError::NotInitialized => Status::HandleInvalidated,
            LatencyError::Unsupported => Status::NotSupported,
            LatencyError::InvalidArgument | LatencyError::TranslationRejected(_) => {
                Status::InvalidArgument
            }
            LatencyError::ProbeFailed(ProbeError::Inconsistent) => Status::NotSupported,
            LatencyError::BackendFailure(_)
            | LatencyError::ProbeFailed(_)
            | LatencyError::Timeline(_) => Status::Error,
        }
    }
}
