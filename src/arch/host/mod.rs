//! Mock platform for host builds
//!
//! Mirrors the API surface of `arch::riscv64` with plain state instead of
//! CSRs, so the boot, console and timer logic can be driven from `cargo
//! test` on the build host. Test-only control knobs live next to the state
//! they script.

pub mod sbi;

use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

static INTR_ENABLED: AtomicBool = AtomicBool::new(false);
static CPU_ID: AtomicUsize = AtomicUsize::new(0);
static TIMER_IRQ_ENABLED: AtomicBool = AtomicBool::new(false);

/// Simulated free-running counter, plus how far each read advances it.
static CYCLES: AtomicU64 = AtomicU64::new(0);
static CYCLE_STEP: AtomicU64 = AtomicU64::new(0);

/// Logical id of the executing "hart".
#[inline(always)]
pub fn cpu_id() -> usize {
    CPU_ID.load(Ordering::Relaxed)
}

/// Record the logical id of the executing "hart".
///
/// # Safety
/// Mirrors the hardware contract; no actual unsafety on the host.
#[inline(always)]
pub unsafe fn set_cpu_id(id: usize) {
    CPU_ID.store(id, Ordering::Relaxed);
}

/// Are simulated local interrupts enabled?
#[inline(always)]
pub fn intr_get() -> bool {
    INTR_ENABLED.load(Ordering::Relaxed)
}

/// Disable simulated local interrupts, returning the prior state.
#[inline(always)]
pub fn intr_off() -> bool {
    INTR_ENABLED.swap(false, Ordering::Relaxed)
}

/// Enable simulated local interrupts.
#[inline(always)]
pub fn intr_on() {
    INTR_ENABLED.store(true, Ordering::Relaxed);
}

/// Read the simulated cycle counter, advancing it by the configured step.
pub fn read_cycle() -> u64 {
    CYCLES.fetch_add(CYCLE_STEP.load(Ordering::Relaxed), Ordering::Relaxed)
}

/// Record that the timer interrupt source was unmasked.
pub fn enable_timer_irq() {
    TIMER_IRQ_ENABLED.store(true, Ordering::Relaxed);
}

// --- test controls -------------------------------------------------------

/// Pin the simulated counter to `value`.
pub fn mock_set_cycles(value: u64) {
    CYCLES.store(value, Ordering::Relaxed);
}

/// Advance the counter by `step` on every read (0 freezes it).
pub fn mock_set_cycle_step(step: u64) {
    CYCLE_STEP.store(step, Ordering::Relaxed);
}

/// Current counter value, without advancing it.
pub fn mock_cycles_now() -> u64 {
    CYCLES.load(Ordering::Relaxed)
}

/// Was the timer interrupt source unmasked?
pub fn mock_timer_irq_enabled() -> bool {
    TIMER_IRQ_ENABLED.load(Ordering::Relaxed)
}

/// Reset the whole mock platform between tests.
pub fn mock_reset() {
    INTR_ENABLED.store(false, Ordering::Relaxed);
    CPU_ID.store(0, Ordering::Relaxed);
    TIMER_IRQ_ENABLED.store(false, Ordering::Relaxed);
    CYCLES.store(0, Ordering::Relaxed);
    CYCLE_STEP.store(0, Ordering::Relaxed);
    sbi::mock_reset();
}
