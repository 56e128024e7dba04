//! Console driver
//!
//! Two independent paths share one serial device:
//!
//! - **Transmit** is synchronous and polling. `put_char` masks local
//!   interrupts, spins until the device reports transmit-idle and writes
//!   the byte. Before the device is initialized - and forever after a
//!   panic - output transparently falls back to the firmware's raw
//!   single-character primitive, so a panicking kernel can always speak.
//! - **Receive** is interrupt-driven. `handle_interrupt` drains every
//!   pending byte and feeds each one to the line discipline, which edits
//!   an input line in place (erase, kill-line, echo) and publishes it to
//!   the blocked reader once a terminator arrives or the buffer fills.
//!
//! The line buffer is the only state shared between the interrupt path
//! (any hart) and the reader drain path; both serialize on its mutex.

use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

use crate::arch;
use crate::config::{self, INPUT_BUF_SIZE};
use crate::services;

pub mod ns16550;
pub mod null;

#[cfg(not(target_arch = "riscv64"))]
pub mod mock;

/// Console device interface
///
/// Implemented by the NS16550 driver, the null console and the host mock.
/// The device owns register-level access; everything above it (fallback
/// path, interrupt masking, line discipline) is device-independent.
pub trait ConsoleDevice: Send + Sync {
    /// Program the device: baud rate, framing, FIFOs, receive interrupts.
    fn init(&self);

    /// Blocking single-byte transmit. Spins until the device accepts it.
    fn putc(&self, c: u8);

    /// Non-blocking receive: one pending input byte, if any.
    fn try_getc(&self) -> Option<u8>;
}

/// Pseudo-character: visually erase one terminal column.
const BACKSPACE: u16 = 0x100;

/// Control-x
const fn ctrl(c: u8) -> u8 {
    c - b'@'
}

/// Kill the current uncommitted line.
const CTRL_KILL: u8 = ctrl(b'U');
/// End of input: publish the line without a newline.
const CTRL_EOT: u8 = ctrl(b'D');
/// Diagnostic: dump the process table.
const CTRL_PROCS: u8 = ctrl(b'P');
/// Diagnostic: dump allocator / queue status.
const CTRL_PAGES: u8 = ctrl(b'Q');
/// Delete key: erase one character.
const DEL: u8 = 0x7f;

static UART_INITED: AtomicBool = AtomicBool::new(false);

/// One-way panic flag; once set, all output takes the firmware path.
static PANICKED: AtomicBool = AtomicBool::new(false);

/// Transmit-side device lock.
#[allow(dead_code)]
static UART_TX_LOCK: Mutex<()> = Mutex::new(());

/// Edited input line plus the three indices of the ring.
///
/// The indices are logically unbounded counters reduced mod
/// `INPUT_BUF_SIZE` for storage; `read_idx <= published_idx <= edit_idx`
/// and `edit_idx - read_idx <= INPUT_BUF_SIZE` hold at all times.
struct LineBuffer {
    buf: [u8; INPUT_BUF_SIZE],
    /// Consumed by the reader.
    read_idx: usize,
    /// Committed: visible to the reader.
    published_idx: usize,
    /// Edit position: bytes in `published_idx..edit_idx` are still erasable.
    edit_idx: usize,
}

impl LineBuffer {
    const fn new() -> Self {
        Self {
            buf: [0; INPUT_BUF_SIZE],
            read_idx: 0,
            published_idx: 0,
            edit_idx: 0,
        }
    }
}

static CONS: Mutex<LineBuffer> = Mutex::new(LineBuffer::new());

/// Wake key for the blocked-reader contract: the buffer's identity.
pub fn wake_channel() -> usize {
    &CONS as *const _ as usize
}

/// Record that the kernel panicked; console output degrades to the
/// firmware path from here on. Never reset.
pub fn note_panic() {
    PANICKED.store(true, Ordering::Release);
}

/// Console output with the backspace pseudo-character expanded.
fn consputc(c: u16) {
    if !UART_INITED.load(Ordering::Acquire) || PANICKED.load(Ordering::Relaxed) {
        // Pre-init or mid-panic: the driver cannot be trusted, the
        // firmware output always can.
        if c == BACKSPACE {
            arch::sbi::console_putchar(0x08);
            arch::sbi::console_putchar(b' ');
            arch::sbi::console_putchar(0x08);
        } else {
            arch::sbi::console_putchar(c as u8);
        }
    } else if c == BACKSPACE {
        uart_putc(0x08);
        uart_putc(b' ');
        uart_putc(0x08);
    } else {
        uart_putc(c as u8);
    }
}

/// Driver transmit: mask local interrupts around the poll-and-write so the
/// receive handler cannot interleave register access on this hart.
fn uart_putc(c: u8) {
    let was_on = arch::intr_off();
    config::uart().putc(c);
    if was_on {
        arch::intr_on();
    }
}

/// Write one character to the console.
pub fn put_char(c: u8) {
    consputc(c as u16);
}

/// Initialize the console device and enable its receive interrupt.
///
/// Called once by the boot hart during platform init. A second call is a
/// fatal usage error.
pub fn init() {
    assert!(
        !UART_INITED.load(Ordering::Acquire),
        "console: device already initialized"
    );
    config::uart().init();
    UART_INITED.store(true, Ordering::Release);
}

/// Receive interrupt handler.
///
/// Drains every byte the device has pending in this one invocation and
/// runs each through the line discipline. Entered from the trap
/// dispatcher on whichever hart took the interrupt.
pub fn handle_interrupt() {
    while let Some(c) = config::uart().try_getc() {
        intr(c);
    }
}

/// Line discipline: one input byte against the shared line buffer.
fn intr(c: u8) {
    let mut cons = CONS.lock();

    match c {
        CTRL_PROCS => services::services().print_procs(),
        CTRL_PAGES => services::services().print_page_stats(),
        CTRL_KILL => {
            // Erase back to the published boundary, but never a committed
            // newline.
            while cons.edit_idx != cons.published_idx
                && cons.buf[(cons.edit_idx - 1) % INPUT_BUF_SIZE] != b'\n'
            {
                cons.edit_idx -= 1;
                consputc(BACKSPACE);
            }
        }
        DEL => {
            if cons.edit_idx != cons.published_idx {
                cons.edit_idx -= 1;
                consputc(BACKSPACE);
            }
        }
        _ => {
            if c != 0 && cons.edit_idx - cons.read_idx < INPUT_BUF_SIZE {
                let c = if c == b'\r' { b'\n' } else { c };

                // Echo back to the user.
                consputc(c as u16);

                let at = cons.edit_idx % INPUT_BUF_SIZE;
                cons.buf[at] = c;
                cons.edit_idx += 1;

                if c == b'\n' || c == CTRL_EOT || cons.edit_idx - cons.read_idx == INPUT_BUF_SIZE {
                    // A whole line (or end-of-input, or a full buffer) has
                    // arrived; commit it and wake the blocked reader.
                    cons.published_idx = cons.edit_idx;
                    services::services().wakeup(wake_channel());
                }
            }
            // No room: the byte is dropped. That is the backpressure
            // policy, not an error.
        }
    }
}

/// Reader drain: copy committed bytes into `dst`, consuming them.
///
/// Returns how many bytes were copied. The blocking half of the reader
/// (sleeping until `wakeup` fires on `wake_channel()`) lives outside this
/// layer.
pub fn read_published(dst: &mut [u8]) -> usize {
    let mut cons = CONS.lock();
    let mut n = 0;
    while n < dst.len() && cons.read_idx != cons.published_idx {
        let at = cons.read_idx % INPUT_BUF_SIZE;
        dst[n] = cons.buf[at];
        cons.read_idx += 1;
        n += 1;
    }
    n
}

// --- host-side test access ------------------------------------------------

/// Reset every piece of console state between tests.
#[cfg(not(target_arch = "riscv64"))]
pub fn reset_for_tests() {
    let mut cons = CONS.lock();
    *cons = LineBuffer::new();
    drop(cons);
    UART_INITED.store(false, Ordering::Release);
    PANICKED.store(false, Ordering::Release);
    config::UART.mock_clear();
}

/// Snapshot of `(read_idx, published_idx, edit_idx)`.
#[cfg(not(target_arch = "riscv64"))]
pub fn buffer_indices() -> (usize, usize, usize) {
    let cons = CONS.lock();
    (cons.read_idx, cons.published_idx, cons.edit_idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::host;
    use crate::test_support;

    fn feed(bytes: &[u8]) {
        config::UART.push_rx(bytes);
        handle_interrupt();
    }

    fn raw_output() -> std::string::String {
        let mut buf = [0u8; 512];
        let n = host::sbi::mock_drain_raw_output(&mut buf);
        core::str::from_utf8(&buf[..n]).unwrap().into()
    }

    fn assert_invariant() {
        let (r, w, e) = buffer_indices();
        assert!(r <= w, "read {} > published {}", r, w);
        assert!(w <= e, "published {} > edit {}", w, e);
        assert!(e - r <= INPUT_BUF_SIZE, "buffer overcommitted: {} .. {}", r, e);
    }

    #[test]
    fn line_publishes_once_and_wakes_reader() {
        let _guard = test_support::setup();
        let wakes = test_support::wake_count();

        feed(b"abc\n");
        assert_invariant();
        assert_eq!(test_support::wake_count(), wakes + 1);
        assert_eq!(test_support::last_wake_chan(), wake_channel());

        let mut line = [0u8; 16];
        let n = read_published(&mut line);
        assert_eq!(&line[..n], b"abc\n");

        let (r, _, _) = buffer_indices();
        assert_eq!(r, 4);
        assert_invariant();
    }

    #[test]
    fn carriage_return_normalizes_to_newline() {
        let _guard = test_support::setup();

        feed(b"hi\r");
        let mut line = [0u8; 16];
        let n = read_published(&mut line);
        assert_eq!(&line[..n], b"hi\n");
    }

    #[test]
    fn echo_goes_to_firmware_path_before_init() {
        let _guard = test_support::setup();
        let _ = raw_output();

        feed(b"ok");
        assert_eq!(raw_output(), "ok");
    }

    #[test]
    fn kill_line_erases_uncommitted_input_only() {
        let _guard = test_support::setup();

        feed(b"abc");
        let _ = raw_output();
        feed(&[CTRL_KILL]);
        assert_invariant();

        let (_, w, e) = buffer_indices();
        assert_eq!(e, w, "kill-line must rewind to the published boundary");
        // One visual erase per killed column.
        assert_eq!(raw_output(), "\x08 \x08\x08 \x08\x08 \x08");
    }

    #[test]
    fn kill_line_stops_at_published_newline() {
        let _guard = test_support::setup();

        feed(b"done\n");
        feed(b"xy");
        feed(&[CTRL_KILL]);

        let mut line = [0u8; 16];
        let n = read_published(&mut line);
        assert_eq!(&line[..n], b"done\n", "committed line must survive kill-line");
        let (r, w, e) = buffer_indices();
        assert_eq!(r, 5);
        assert_eq!(w, e);
    }

    #[test]
    fn delete_erases_exactly_one_character() {
        let _guard = test_support::setup();

        feed(b"ab");
        let _ = raw_output();
        feed(&[DEL]);

        let (_, w, e) = buffer_indices();
        assert_eq!(e - w, 1);
        assert_eq!(raw_output(), "\x08 \x08");

        // Nothing uncommitted left after the second delete; a third is a no-op.
        feed(&[DEL]);
        feed(&[DEL]);
        let (_, w, e) = buffer_indices();
        assert_eq!(e, w);
        assert_invariant();
    }

    #[test]
    fn end_of_input_publishes_without_newline() {
        let _guard = test_support::setup();
        let wakes = test_support::wake_count();

        feed(b"partial");
        assert_eq!(test_support::wake_count(), wakes);
        feed(&[CTRL_EOT]);
        assert_eq!(test_support::wake_count(), wakes + 1);

        let mut line = [0u8; 16];
        let n = read_published(&mut line);
        assert_eq!(&line[..n - 1], b"partial");
        assert_eq!(line[n - 1], CTRL_EOT);
    }

    #[test]
    fn overflow_retains_capacity_and_drops_the_rest() {
        let _guard = test_support::setup();
        let wakes = test_support::wake_count();

        for i in 0..(INPUT_BUF_SIZE + 10) {
            feed(&[b'a' + (i % 26) as u8]);
        }
        assert_invariant();

        // The moment the buffer filled it was published, waking the reader
        // exactly once; everything past capacity was dropped.
        assert_eq!(test_support::wake_count(), wakes + 1);
        let (r, w, e) = buffer_indices();
        assert_eq!(e - r, INPUT_BUF_SIZE);
        assert_eq!(w, e);

        let mut line = [0u8; 2 * INPUT_BUF_SIZE];
        let n = read_published(&mut line);
        assert_eq!(n, INPUT_BUF_SIZE);
        assert_eq!(line[0], b'a');
    }

    #[test]
    fn nul_bytes_are_ignored() {
        let _guard = test_support::setup();

        feed(&[0, 0, 0]);
        let (r, w, e) = buffer_indices();
        assert_eq!((r, w, e), (0, 0, 0));
    }

    #[test]
    fn diagnostic_codes_call_the_registered_hooks() {
        let _guard = test_support::setup();
        let procs = test_support::proc_dump_count();
        let pages = test_support::page_dump_count();

        feed(&[CTRL_PROCS, CTRL_PAGES, CTRL_PAGES]);
        assert_eq!(test_support::proc_dump_count(), procs + 1);
        assert_eq!(test_support::page_dump_count(), pages + 2);
    }

    #[test]
    fn initialized_device_carries_the_transmit_path() {
        let _guard = test_support::setup();

        init();
        put_char(b'x');

        let mut buf = [0u8; 16];
        let n = config::UART.drain_tx(&mut buf);
        assert_eq!(&buf[..n], b"x");
    }

    #[test]
    #[should_panic(expected = "already initialized")]
    fn double_init_is_fatal() {
        let _guard = test_support::setup();
        init();
        init();
    }

    #[test]
    fn panicked_kernel_writes_through_the_firmware_path() {
        let _guard = test_support::setup();

        init();
        note_panic();
        let _ = raw_output();
        put_char(b'!');

        assert_eq!(raw_output(), "!");
        let mut buf = [0u8; 16];
        assert_eq!(config::UART.drain_tx(&mut buf), 0);
    }
}
