//! RISC-V (rv64) supervisor-mode support
//!
//! Thin wrappers over the CSRs this layer needs: local interrupt masking,
//! the per-hart identity register (`tp` holds the logical cpu id), the
//! free-running `time` counter and the supervisor timer interrupt enable.

pub mod registers;
pub mod sbi;

use registers::{
    r_sie, r_sstatus, r_time, r_tp, w_sie, w_sstatus, w_tp, SIE_STIE, SSTATUS_SIE,
};

/// Logical id of the executing hart.
///
/// Valid only after the boot path has stored the id into `tp`; callers must
/// keep interrupts off around uses that would break if the task migrated.
#[inline(always)]
pub fn cpu_id() -> usize {
    r_tp()
}

/// Record the logical id of the executing hart in `tp`.
///
/// # Safety
/// Must be called exactly once per hart, before anything reads `cpu_id()`.
#[inline(always)]
pub unsafe fn set_cpu_id(id: usize) {
    w_tp(id);
}

/// Are local device interrupts currently enabled?
#[inline(always)]
pub fn intr_get() -> bool {
    r_sstatus() & SSTATUS_SIE != 0
}

/// Disable local device interrupts, returning whether they were enabled.
///
/// The return value feeds `intr_on` so short critical sections restore the
/// state they found.
#[inline(always)]
pub fn intr_off() -> bool {
    let was_on = intr_get();
    unsafe { w_sstatus(r_sstatus() & !SSTATUS_SIE) };
    was_on
}

/// Enable local device interrupts.
#[inline(always)]
pub fn intr_on() {
    unsafe { w_sstatus(r_sstatus() | SSTATUS_SIE) };
}

/// Read the free-running cycle counter (the `time` CSR).
///
/// Monotonic for the lifetime of the platform, modulo 64-bit wraparound.
#[inline(always)]
pub fn read_cycle() -> u64 {
    r_time()
}

/// Unmask the supervisor timer interrupt source for this hart.
pub fn enable_timer_irq() {
    unsafe { w_sie(r_sie() | SIE_STIE) };
}
