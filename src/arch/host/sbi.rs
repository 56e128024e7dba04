//! Mock SBI firmware
//!
//! Same signatures as `arch::riscv64::sbi`, backed by recorded state: the
//! raw console output is captured for inspection, timer deadlines are
//! remembered instead of armed, and there are no startable harts.

use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

/// Error returned by the (mock) firmware for a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbiError(pub isize);

/// SBI_ERR_NOT_SUPPORTED, the code a hartless platform hands back.
const ERR_NOT_SUPPORTED: isize = -2;

const RAW_CAPTURE_CAP: usize = 4096;

struct RawCapture {
    buf: [u8; RAW_CAPTURE_CAP],
    len: usize,
}

static RAW_OUTPUT: Mutex<RawCapture> = Mutex::new(RawCapture {
    buf: [0; RAW_CAPTURE_CAP],
    len: 0,
});

static LAST_DEADLINE: AtomicU64 = AtomicU64::new(0);
static DEADLINES_ARMED: AtomicU64 = AtomicU64::new(0);

/// The mock platform has no secondary harts to start.
pub fn hart_start(_hartid: usize, _entry: usize, _opaque: usize) -> Result<(), SbiError> {
    Err(SbiError(ERR_NOT_SUPPORTED))
}

/// Remember the requested deadline instead of arming hardware.
pub fn set_timer(deadline: u64) {
    LAST_DEADLINE.store(deadline, Ordering::Relaxed);
    DEADLINES_ARMED.fetch_add(1, Ordering::Relaxed);
}

/// Capture firmware-level console output.
pub fn console_putchar(c: u8) {
    let mut out = RAW_OUTPUT.lock();
    if out.len < RAW_CAPTURE_CAP {
        let at = out.len;
        out.buf[at] = c;
        out.len += 1;
    }
}

// --- test controls -------------------------------------------------------

/// Most recently "armed" timer deadline.
pub fn mock_last_deadline() -> u64 {
    LAST_DEADLINE.load(Ordering::Relaxed)
}

/// How many times `set_timer` was called.
pub fn mock_deadlines_armed() -> u64 {
    DEADLINES_ARMED.load(Ordering::Relaxed)
}

/// Move captured raw-path output into `dst`, returning the byte count.
pub fn mock_drain_raw_output(dst: &mut [u8]) -> usize {
    let mut out = RAW_OUTPUT.lock();
    let n = out.len.min(dst.len());
    dst[..n].copy_from_slice(&out.buf[..n]);
    out.len = 0;
    n
}

/// Clear all recorded firmware state.
pub fn mock_reset() {
    RAW_OUTPUT.lock().len = 0;
    LAST_DEADLINE.store(0, Ordering::Relaxed);
    DEADLINES_ARMED.store(0, Ordering::Relaxed);
}
