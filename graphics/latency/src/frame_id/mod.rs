//! Application/device frame id correlation
//!
//! Applications pick arbitrary 64-bit frame ids. The native timeline wants
//! compact, strictly increasing ones. `FrameIdGenerator` hands out device ids
//! starting at 1 and remembers the last `FRAME_ID_WINDOW` application ids so
//! that timing reports can be mapped back.

use std::collections::HashMap;

use crate::common::{FRAME_ID_WINDOW, MARKER_SLOT_COUNT};
use crate::marker::MarkerType;

/// Bounded correlation window plus per-marker duplicate suppression.
///
/// Not synchronized; the owning entry serializes access.
#[derive(Debug)]
pub struct FrameIdGenerator {
    /// Next device id to hand out
    next_device_id: u64,
    /// Application id -> device id for ids still in the window
    device_ids: HashMap<u64, u64>,
    /// Ring indexed by `(device_id - 1) % FRAME_ID_WINDOW`
    application_ids: Box<[u64]>,
    /// Last application frame id seen per marker slot
    last_frame_ids: [Option<u64>; MARKER_SLOT_COUNT],
}

impl FrameIdGenerator {
    pub fn new() -> Self {
        Self {
            next_device_id: 1,
            device_ids: HashMap::with_capacity(FRAME_ID_WINDOW),
            application_ids: vec![0; FRAME_ID_WINDOW].into_boxed_slice(),
            last_frame_ids: [None; MARKER_SLOT_COUNT],
        }
    }

    /// Device id for `application_id`, assigning a fresh one if it is not in
    /// the window.
    pub fn assign_or_reuse(&mut self, application_id: u64) -> u64 {
        if let Some(&device_id) = self.device_ids.get(&application_id) {
            return device_id;
        }

        let device_id = self.next_device_id;
        self.next_device_id += 1;

        let index = Self::ring_index(device_id);
        if device_id > FRAME_ID_WINDOW as u64 {
            let evicted = self.application_ids[index];
            self.device_ids.remove(&evicted);
            log::trace!(
                "Frame id window full, evicting application frame {}",
                evicted
            );
        }

        self.device_ids.insert(application_id, device_id);
        self.application_ids[index] = application_id;

        device_id
    }

    /// Whether `device_id` still maps back to an application id
    pub fn in_window(&self, device_id: u64) -> bool {
        device_id != 0
            && device_id < self.next_device_id
            && self.next_device_id - device_id <= FRAME_ID_WINDOW as u64
    }

    /// Application id behind `device_id`, if it is still in the window
    pub fn resolve(&self, device_id: u64) -> Option<u64> {
        if !self.in_window(device_id) {
            return None;
        }

        Some(self.application_ids[Self::ring_index(device_id)])
    }

    /// Check-and-record for duplicate marker suppression.
    ///
    /// Returns true if `frame_id` is the last value recorded for `marker`;
    /// nothing is recorded in that case.
    pub fn is_duplicate_marker(&mut self, frame_id: u64, marker: MarkerType) -> bool {
        let last = &mut self.last_frame_ids[marker.slot()];
        if *last == Some(frame_id) {
            return true;
        }

        *last = Some(frame_id);
        false
    }

    /// Device id the next newly-seen application id will receive
    pub fn next_device_id(&self) -> u64 {
        self.next_device_id
    }

    /// Number of application ids currently resolvable
    pub fn len(&self) -> usize {
        self.device_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.device_ids.is_empty()
    }

    fn ring_index(device_id: u64) -> usize {
        ((device_id - 1) % FRAME_ID_WINDOW as u64) as usize
    }
}

impl Default for FrameIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
