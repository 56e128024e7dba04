//! Multi-hart bring-up handshake, driven from host threads
//!
//! Real harts are simulated with threads racing on the boot barrier; the
//! assertions are the bring-up contract: dense logical ids, arrival
//! before enumeration finishes, and platform state visible to every hart
//! that observes the ready flag.

use core::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use vireo_kernel::arch::sbi::SbiError;
use vireo_kernel::boot::{enumerate_secondary_harts, BootBarrier};

#[test]
fn dense_ids_and_full_arrival_before_ready() {
    let barrier = BootBarrier::new();
    let mut started = Vec::new();

    let barrier_ref = &barrier;
    thread::scope(|s| {
        // The boot hart arrives first.
        barrier_ref.mark_online();

        // Platform: boot hart has hartid 1; only hartids {0, 3, 4} of the
        // 6 configured exist.
        let present = [0usize, 3, 4];
        let online = enumerate_secondary_harts(1, 6, barrier_ref, |hartid, cpuid| {
            if !present.contains(&hartid) {
                return Err(SbiError(-2));
            }
            started.push((hartid, cpuid));
            s.spawn(move || {
                // A freshly started hart takes a while to check in.
                thread::sleep(Duration::from_millis(10));
                barrier_ref.mark_online();
            });
            Ok(())
        });

        // Dense ids 1..=3 over the sparse responding hartids.
        assert_eq!(started, vec![(0, 1), (3, 2), (4, 3)]);
        assert_eq!(online, 4);

        // All arrivals counted (boot hart included) before the ready flag
        // ever goes up.
        assert_eq!(barrier.online(), 4);
        assert!(!barrier.platform_ready());
        barrier.publish_platform_ready();
        assert!(barrier.platform_ready());
    });
}

#[test]
fn secondaries_see_platform_state_published_before_ready() {
    let barrier = BootBarrier::new();
    let platform_state = AtomicU64::new(0);

    thread::scope(|s| {
        let secondary = s.spawn(|| {
            barrier.mark_online();
            barrier.wait_platform_ready();
            platform_state.load(Ordering::Relaxed)
        });

        // Boot hart: wait for the arrival, initialize "the platform",
        // then open the gate.
        barrier.wait_online_past(0);
        platform_state.store(0xDEAD_BEEF, Ordering::Relaxed);
        barrier.publish_platform_ready();

        assert_eq!(secondary.join().unwrap(), 0xDEAD_BEEF);
    });
}

#[test]
fn a_platform_with_no_secondaries_boots_alone() {
    let barrier = BootBarrier::new();
    barrier.mark_online();

    let online = enumerate_secondary_harts(0, 4, &barrier, |_hartid, _cpuid| Err(SbiError(-2)));

    assert_eq!(online, 1);
    assert_eq!(barrier.online(), 1);
}
