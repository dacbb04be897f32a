#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use latency_shim::{
    BackendError, BackendKind, DeviceHandle, FrameReport, LatencyReports, NativeEntryPoints,
    NativeMarker, OutOfBandQueueKind, PacingProbe, ProbeError, QueueHandle, SleepMode,
};

/// Call forwarded to a mock native entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    SetSleepMode(Option<SleepMode>),
    Sleep(u64),
    SetMarker(u64, NativeMarker),
    NotifyOutOfBand(QueueHandle, OutOfBandQueueKind),
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<Call>>,
    /// Device frame ids the timing query reports, newest last
    timing_frames: Mutex<Vec<u64>>,
    /// Row count the timing query reports, if not the number of rows written
    reported_rows: Mutex<Option<usize>>,
    sleep_error: Mutex<Option<BackendError>>,
}

/// Probe whose devices all resolve a complete native entry point set
pub struct NativeProbe {
    kind: BackendKind,
    shared: Arc<Shared>,
    resolves: AtomicUsize,
}

impl NativeProbe {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            shared: Arc::default(),
            resolves: AtomicUsize::new(0),
        }
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().clone()
    }

    pub fn markers(&self) -> Vec<(u64, NativeMarker)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetMarker(frame_id, marker) => Some((frame_id, marker)),
                _ => None,
            })
            .collect()
    }

    /// Device frame ids the next timing query reports, one row each
    pub fn set_timing_frames(&self, frames: Vec<u64>) {
        *self.shared.timing_frames.lock() = frames;
    }

    /// Report `rows` filled rows regardless of how many are written
    pub fn set_reported_rows(&self, rows: usize) {
        *self.shared.reported_rows.lock() = Some(rows);
    }

    pub fn fail_sleep_with(&self, error: BackendError) {
        *self.shared.sleep_error.lock() = Some(error);
    }
}

impl PacingProbe for NativeProbe {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn resolve_native(&self, _device: DeviceHandle) -> Result<NativeEntryPoints, ProbeError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);

        let set_sleep_mode = Arc::clone(&self.shared);
        let sleep = Arc::clone(&self.shared);
        let get_timings = Arc::clone(&self.shared);
        let set_marker = Arc::clone(&self.shared);
        let notify_out_of_band = Arc::clone(&self.shared);

        Ok(NativeEntryPoints {
            set_sleep_mode: Some(Box::new(move |mode: Option<&SleepMode>| {
                set_sleep_mode
                    .calls
                    .lock()
                    .push(Call::SetSleepMode(mode.copied()));
                Ok(())
            })),
            sleep: Some(Box::new(move |target| {
                if let Some(error) = *sleep.sleep_error.lock() {
                    return Err(error);
                }
                sleep.calls.lock().push(Call::Sleep(target));
                Ok(())
            })),
            get_timings: Some(Box::new(move |reports: &mut LatencyReports| {
                let frames = get_timings.timing_frames.lock();
                for (report, &frame_id) in reports.iter_mut().zip(frames.iter()) {
                    *report = FrameReport {
                        frame_id,
                        sim_start_time: frame_id * 10,
                        gpu_frame_time_us: 16_000,
                        ..FrameReport::ZERO
                    };
                }
                let written = frames.len().min(reports.len());
                Ok(get_timings.reported_rows.lock().unwrap_or(written))
            })),
            set_marker: Some(Box::new(move |frame_id, marker| {
                set_marker
                    .calls
                    .lock()
                    .push(Call::SetMarker(frame_id, marker));
                Ok(())
            })),
            notify_out_of_band: Some(Box::new(move |queue, kind| {
                notify_out_of_band
                    .calls
                    .lock()
                    .push(Call::NotifyOutOfBand(queue, kind));
                Ok(())
            })),
        })
    }
}

/// Probe whose devices never resolve native entry points
pub struct EmulatedProbe {
    kind: BackendKind,
    resolves: AtomicUsize,
}

impl EmulatedProbe {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            resolves: AtomicUsize::new(0),
        }
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

impl PacingProbe for EmulatedProbe {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn resolve_native(&self, _device: DeviceHandle) -> Result<NativeEntryPoints, ProbeError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(NativeEntryPoints::unresolved())
    }
}

/// A full history of 64 consecutive device frame ids ending at `last`
pub fn full_history(last: u64) -> Vec<u64> {
    let first = last + 1 - latency_shim::LATENCY_REPORT_COUNT as u64;
    (first..=last).collect()
}
