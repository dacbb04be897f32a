//! Marker type translation
//!
//! The application-facing marker enumeration has a ping marker the native
//! enumeration lacks, so every out-of-band marker after it sits one value
//! lower on the native side.

use core::fmt;

use crate::common::{LatencyError, Result};

/// Application-facing latency marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MarkerType {
    SimulationStart = 0,
    SimulationEnd = 1,
    RenderSubmitStart = 2,
    RenderSubmitEnd = 3,
    PresentStart = 4,
    PresentEnd = 5,
    InputSample = 6,
    TriggerFlash = 7,
    PcLatencyPing = 8,
    OutOfBandRenderSubmitStart = 9,
    OutOfBandRenderSubmitEnd = 10,
    OutOfBandPresentStart = 11,
    OutOfBandPresentEnd = 12,
}

impl MarkerType {
    /// Decode a raw marker value
    pub fn from_raw(raw: u32) -> Option<Self> {
        let marker = match raw {
            0 => MarkerType::SimulationStart,
            1 => MarkerType::SimulationEnd,
            2 => MarkerType::RenderSubmitStart,
            3 => MarkerType::RenderSubmitEnd,
            4 => MarkerType::PresentStart,
            5 => MarkerType::PresentEnd,
            6 => MarkerType::InputSample,
            7 => MarkerType::TriggerFlash,
            8 => MarkerType::PcLatencyPing,
            9 => MarkerType::OutOfBandRenderSubmitStart,
            10 => MarkerType::OutOfBandRenderSubmitEnd,
            11 => MarkerType::OutOfBandPresentStart,
            12 => MarkerType::OutOfBandPresentEnd,
            _ => return None,
        };
        Some(marker)
    }

    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Duplicate-suppression slot for this marker
    pub const fn slot(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            MarkerType::SimulationStart => "SIMULATION_START",
            MarkerType::SimulationEnd => "SIMULATION_END",
            MarkerType::RenderSubmitStart => "RENDERSUBMIT_START",
            MarkerType::RenderSubmitEnd => "RENDERSUBMIT_END",
            MarkerType::PresentStart => "PRESENT_START",
            MarkerType::PresentEnd => "PRESENT_END",
            MarkerType::InputSample => "INPUT_SAMPLE",
            MarkerType::TriggerFlash => "TRIGGER_FLASH",
            MarkerType::PcLatencyPing => "PC_LATENCY_PING",
            MarkerType::OutOfBandRenderSubmitStart => "OUT_OF_BAND_RENDERSUBMIT_START",
            MarkerType::OutOfBandRenderSubmitEnd => "OUT_OF_BAND_RENDERSUBMIT_END",
            MarkerType::OutOfBandPresentStart => "OUT_OF_BAND_PRESENT_START",
            MarkerType::OutOfBandPresentEnd => "OUT_OF_BAND_PRESENT_END",
        }
    }
}

impl fmt::Display for MarkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name of a raw marker value, including unknown ones
pub fn marker_name(raw: u32) -> String {
    match MarkerType::from_raw(raw) {
        Some(marker) => marker.name().to_string(),
        None => format!("UNKNOWN_TYPE/{}", raw),
    }
}

/// Marker as understood by the native pacing entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeMarker {
    SimulationStart = 0,
    SimulationEnd = 1,
    RenderSubmitStart = 2,
    RenderSubmitEnd = 3,
    PresentStart = 4,
    PresentEnd = 5,
    InputSample = 6,
    TriggerFlash = 7,
    OutOfBandRenderSubmitStart = 8,
    OutOfBandRenderSubmitEnd = 9,
    OutOfBandPresentStart = 10,
    OutOfBandPresentEnd = 11,
}

impl NativeMarker {
    pub const fn as_raw(self) -> u32 {
        self as u32
    }
}

/// Outcome of translating a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerTranslation {
    /// Forward as this native marker
    Forward(NativeMarker),
    /// Native stack cannot express the marker; accept and drop it
    Drop,
}

/// Translate an application marker to its native equivalent.
///
/// Total over `MarkerType`; only `PcLatencyPing` has no native counterpart.
pub const fn translate(marker: MarkerType) -> MarkerTranslation {
    let native = match marker {
        MarkerType::SimulationStart => NativeMarker::SimulationStart,
        MarkerType::SimulationEnd => NativeMarker::SimulationEnd,
        MarkerType::RenderSubmitStart => NativeMarker::RenderSubmitStart,
        MarkerType::RenderSubmitEnd => NativeMarker::RenderSubmitEnd,
        MarkerType::PresentStart => NativeMarker::PresentStart,
        MarkerType::PresentEnd => NativeMarker::PresentEnd,
        MarkerType::InputSample => NativeMarker::InputSample,
        MarkerType::TriggerFlash => NativeMarker::TriggerFlash,
        MarkerType::PcLatencyPing => return MarkerTranslation::Drop,
        MarkerType::OutOfBandRenderSubmitStart => NativeMarker::OutOfBandRenderSubmitStart,
        MarkerType::OutOfBandRenderSubmitEnd => NativeMarker::OutOfBandRenderSubmitEnd,
        MarkerType::OutOfBandPresentStart => NativeMarker::OutOfBandPresentStart,
        MarkerType::OutOfBandPresentEnd => NativeMarker::OutOfBandPresentEnd,
    };
    MarkerTranslation::Forward(native)
}

/// Decode and translate a raw marker value.
///
/// Raw values outside the application enumeration are rejected.
pub fn translate_raw(raw: u32) -> Result<(MarkerType, MarkerTranslation)> {
    let marker = MarkerType::from_raw(raw).ok_or(LatencyError::TranslationRejected(raw))?;
    Ok((marker, translate(marker)))
}
