use std::collections::HashMap;

use proptest::prelude::*;

use latency_shim::{FrameIdGenerator, FRAME_ID_WINDOW};

const WINDOW: u64 = FRAME_ID_WINDOW as u64;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_window_matches_model(application_ids in prop::collection::vec(0u64..1500, 0..3000)) {
        let mut generator = FrameIdGenerator::new();
        let mut latest: HashMap<u64, u64> = HashMap::new();
        let mut assigned = Vec::new();
        let mut next = 1u64;

        for application_id in application_ids {
            let expected = match latest.get(&application_id) {
                Some(&device_id) if next - device_id <= WINDOW => device_id,
                _ => {
                    let device_id = next;
                    next += 1;
                    latest.insert(application_id, device_id);
                    assigned.push(application_id);
                    device_id
                }
            };
            prop_assert_eq!(generator.assign_or_reuse(application_id), expected);
        }

        prop_assert_eq!(generator.next_device_id(), next);
        prop_assert_eq!(generator.resolve(0), None);
        prop_assert_eq!(generator.resolve(next), None);

        for device_id in 1..next {
            let expected = (next - device_id <= WINDOW)
                .then(|| assigned[(device_id - 1) as usize]);
            prop_assert_eq!(generator.resolve(device_id), expected);
        }
    }

    #[test]
    fn test_resolved_ids_are_recent(count in 1u64..2500) {
        let mut generator = FrameIdGenerator::new();
        for application_id in 0..count {
            generator.assign_or_reuse(application_id * 7 + 1);
        }

        prop_assert!(generator.len() <= FRAME_ID_WINDOW);
        let oldest = count.saturating_sub(WINDOW) + 1;
        prop_assert_eq!(generator.resolve(oldest), Some((oldest - 1) * 7 + 1));
        if oldest > 1 {
            prop_assert_eq!(generator.resolve(oldest - 1), None);
        }
    }
}
