//! Tick timer
//!
//! The platform timer is a one-shot deadline: it fires exactly once and
//! stays silent until reprogrammed. Preemption therefore hangs on a
//! two-party loop - this module arms a deadline `TICKS_PER_INTERVAL`
//! cycles out, the trap dispatcher calls [`set_next_tick`] again on every
//! fire. A hart running kernel or user code is preempted purely because
//! that deadline eventually fires.

use crate::arch::{self, sbi};
use crate::config::{CPU_FREQ, TICKS_PER_INTERVAL};

/// Read the free-running cycle counter.
///
/// Monotonic for the platform's lifetime, modulo 64-bit wraparound.
pub fn get_cycle() -> u64 {
    arch::read_cycle()
}

/// Per-hart timer bring-up: unmask the timer interrupt source and arm the
/// first deadline. Called once on every hart.
pub fn init() {
    arch::enable_timer_irq();
    set_next_tick();
}

/// Arm the next one-shot deadline, `TICKS_PER_INTERVAL` cycles from now.
///
/// The trap dispatcher must call this on every timer interrupt or the
/// tick - and preemption with it - stops.
pub fn set_next_tick() {
    sbi::set_timer(get_cycle().wrapping_add(TICKS_PER_INTERVAL));
}

/// Does the delay loop in [`busy_wait_millis`] have more waiting to do?
///
/// A wrapped reading (`now < start`) counts as still waiting, which is
/// only right while `delta` is small against the counter's wrap period.
/// Known limitation, kept deliberately.
fn still_waiting(start: u64, now: u64, delta: u64) -> bool {
    now.wrapping_sub(start) < delta || now < start
}

/// Spin for at least `ms` milliseconds of counter time.
///
/// Usable from any context: no scheduler, no interrupts, just the
/// counter. Burns the hart for the whole duration.
pub fn busy_wait_millis(ms: u64) {
    let start = get_cycle();
    let delta = ms * CPU_FREQ / 1000;
    loop {
        let now = get_cycle();
        if !still_waiting(start, now, delta) {
            break;
        }
        core::hint::spin_loop();
    }
}
