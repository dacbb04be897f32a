//! Native/emulated pacing selection
//!
//! The first device translated for a backend kind decides whether that kind
//! runs on the native entry points or on the emulated backend. The decision
//! holds until the cache is reset.

use core::fmt;

use parking_lot::Mutex;

use crate::backend::{EmulatedBackend, PacingBackend, PacingProbe};
use crate::common::{BackendKind, DeviceHandle, ProbeError};
use crate::config::LatencyConfig;

/// Whether a backend kind has native pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationState {
    /// Native entry points are called directly
    Native,
    /// A host timeline stands in for the native entry points
    Emulated,
}

impl fmt::Display for DegradationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradationState::Native => write!(f, "native"),
            DegradationState::Emulated => write!(f, "emulated"),
        }
    }
}

/// Process-wide degradation decisions, one per backend kind
#[derive(Debug, Default)]
pub struct DegradationTracker {
    states: Mutex<[Option<DegradationState>; 2]>,
}

impl DegradationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decision for `kind`, if one was made
    pub fn state(&self, kind: BackendKind) -> Option<DegradationState> {
        self.states.lock()[kind.index()]
    }

    /// Build the backend for `device`, deciding the state of the probe's kind
    /// if this is the first device of that kind.
    pub fn select_backend(
        &self,
        device: DeviceHandle,
        probe: &dyn PacingProbe,
        config: &LatencyConfig,
    ) -> Result<(PacingBackend, DegradationState), ProbeError> {
        let kind = probe.kind();
        let mut states = self.states.lock();

        let (backend, state) = match states[kind.index()] {
            Some(DegradationState::Emulated) => Self::emulated(device, probe)?,
            Some(DegradationState::Native) => {
                let entry_points = probe.resolve_native(device)?;
                match entry_points.into_backend() {
                    Ok(native) => (PacingBackend::Native(native), DegradationState::Native),
                    Err(missing) => {
                        log::warn!(
                            "{} device {:#x} lacks native pacing entry points {:?} on a native backend",
                            kind,
                            device.as_raw(),
                            missing
                        );
                        return Err(ProbeError::Inconsistent);
                    }
                }
            }
            None if config.force_emulation => {
                log::info!("{} low latency: emulation forced by configuration", kind);
                Self::emulated(device, probe)?
            }
            None => {
                let entry_points = probe.resolve_native(device)?;
                match entry_points.into_backend() {
                    Ok(native) => {
                        log::info!("{} low latency: native pacing available", kind);
                        (PacingBackend::Native(native), DegradationState::Native)
                    }
                    Err(missing) => {
                        log::warn!(
                            "{} low latency: native entry points {:?} not found, emulating pacing",
                            kind,
                            missing
                        );
                        Self::emulated(device, probe)?
                    }
                }
            }
        };

        if states[kind.index()].is_none() {
            states[kind.index()] = Some(state);
        }

        Ok((backend, state))
    }

    /// Forget every decision
    pub fn reset(&self) {
        *self.states.lock() = [None; 2];
    }

    fn emulated(
        device: DeviceHandle,
        probe: &dyn PacingProbe,
    ) -> Result<(PacingBackend, DegradationState), ProbeError> {
        let timeline = probe.create_timeline(device)?;
        Ok((
            PacingBackend::Emulated(EmulatedBackend::new(timeline)),
            DegradationState::Emulated,
        ))
    }
}
