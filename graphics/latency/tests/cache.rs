mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use latency_shim::{
    BackendKind, DegradationState, DeviceHandle, DeviceTranslationCache, LatencyConfig,
    LatencyError, LowLatencyFacade, PacingProbe, SleepMode,
};

use common::{EmulatedProbe, NativeProbe};

const THREADS: usize = 8;

#[test]
fn test_concurrent_creation_yields_one_entry() {
    let cache = Arc::new(DeviceTranslationCache::new(LatencyConfig::default()));
    let probe = Arc::new(NativeProbe::new(BackendKind::D3d));
    let barrier = Arc::new(Barrier::new(THREADS));
    let device = DeviceHandle::from_raw(0xd3d);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let probe = Arc::clone(&probe);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_or_create(device, probe.as_ref()).unwrap()
            })
        })
        .collect();

    let entries: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert!(entries
        .iter()
        .all(|entry| Arc::ptr_eq(entry, &entries[0])));
    assert_eq!(probe.resolves(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_concurrent_marks_share_one_window() {
    let cache = Arc::new(DeviceTranslationCache::new(LatencyConfig::default()));
    let probe = Arc::new(NativeProbe::new(BackendKind::Vulkan));
    let facade = Arc::new(LowLatencyFacade::new(
        Arc::clone(&cache),
        Arc::clone(&probe) as Arc<dyn PacingProbe>,
    ));
    let device = DeviceHandle::from_raw(0x50);
    facade.initialize(device).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS as u64)
        .map(|thread_index| {
            let facade = Arc::clone(&facade);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for frame in 0..50 {
                    let frame_id = thread_index * 1_000 + frame;
                    facade.mark_phase(device, frame_id, 0).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let entry = cache.get(device).unwrap();
    entry.with_frames(|frames| {
        assert_eq!(frames.len(), THREADS * 50);
        assert_eq!(frames.next_device_id(), (THREADS * 50) as u64 + 1);
    });
}

#[test]
fn test_degradation_is_per_kind() {
    let cache = Arc::new(DeviceTranslationCache::new(LatencyConfig::default()));
    let d3d = LowLatencyFacade::new(
        Arc::clone(&cache),
        Arc::new(NativeProbe::new(BackendKind::D3d)),
    );
    let vulkan = LowLatencyFacade::new(
        Arc::clone(&cache),
        Arc::new(EmulatedProbe::new(BackendKind::Vulkan)),
    );

    assert_eq!(
        d3d.initialize(DeviceHandle::from_raw(1)),
        Ok(DegradationState::Native)
    );
    assert_eq!(
        vulkan.initialize(DeviceHandle::from_raw(2)),
        Ok(DegradationState::Emulated)
    );

    assert_eq!(d3d.supports_low_latency(DeviceHandle::from_raw(1)), Ok(true));
    assert_eq!(
        vulkan.supports_low_latency(DeviceHandle::from_raw(2)),
        Ok(false)
    );
    assert_eq!(
        cache.degradation_state(BackendKind::D3d),
        Some(DegradationState::Native)
    );
    assert_eq!(
        cache.degradation_state(BackendKind::Vulkan),
        Some(DegradationState::Emulated)
    );
}

#[test]
fn test_emulated_kind_is_sticky() {
    let cache = Arc::new(DeviceTranslationCache::new(LatencyConfig::default()));
    let emulated = EmulatedProbe::new(BackendKind::Vulkan);
    cache
        .get_or_create(DeviceHandle::from_raw(1), &emulated)
        .unwrap();

    let native = NativeProbe::new(BackendKind::Vulkan);
    let entry = cache
        .get_or_create(DeviceHandle::from_raw(2), &native)
        .unwrap();
    assert_eq!(entry.degradation(), DegradationState::Emulated);
    assert_eq!(native.resolves(), 0);
}

#[test]
fn test_forced_emulation_from_config() {
    let config = LatencyConfig::from_lookup(|name| {
        (name == latency_shim::config::FORCE_EMULATION_ENV).then(|| "1".to_string())
    });
    let cache = Arc::new(DeviceTranslationCache::new(config));
    let probe = Arc::new(NativeProbe::new(BackendKind::D3d));
    let facade = LowLatencyFacade::new(
        Arc::clone(&cache),
        Arc::clone(&probe) as Arc<dyn PacingProbe>,
    );

    assert_eq!(
        facade.initialize(DeviceHandle::from_raw(9)),
        Ok(DegradationState::Emulated)
    );
    assert_eq!(probe.resolves(), 0);
}

#[test]
fn test_reset_invalidates_devices() {
    let cache = latency_shim::init(LatencyConfig::default());
    let probe = Arc::new(NativeProbe::new(BackendKind::D3d));
    let facade = LowLatencyFacade::new(
        Arc::clone(&cache),
        Arc::clone(&probe) as Arc<dyn PacingProbe>,
    );
    let device = DeviceHandle::from_raw(0x1234);

    facade
        .set_pacing_mode(device, Some(SleepMode::new(true, false, 0)))
        .unwrap();
    let entry = cache.get(device).unwrap();

    facade.reset_subsystem();

    assert!(cache.is_empty());
    assert_eq!(cache.degradation_state(BackendKind::D3d), None);
    assert_eq!(facade.pacing_mode(device), Err(LatencyError::NotInitialized));
    assert_eq!(
        facade.mark_phase(device, 1, 0),
        Err(LatencyError::NotInitialized)
    );
    // Handles kept across the reset are dead too
    assert_eq!(entry.sleep(1), Err(LatencyError::NotInitialized));

    // Re-initialization probes again
    facade.initialize(device).unwrap();
    assert_eq!(probe.resolves(), 2);
    assert_eq!(facade.pacing_mode(device), Ok(false));
}
