//! End-to-end console tests over the mock platform
//!
//! These drive the public driver surface the way the kernel does at
//! runtime: scripted receive bytes, the interrupt entry point, the
//! reader drain, and the firmware fallback for output.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use vireo_kernel::arch::host;
use vireo_kernel::components::console;
use vireo_kernel::config;
use vireo_kernel::services::{self, KernelServices};

struct TestKernel {
    wakeups: AtomicUsize,
    last_chan: AtomicUsize,
}

impl KernelServices for TestKernel {
    fn trap_init(&self) {}
    fn plic_init(&self) {}
    fn plic_init_hart(&self) {}
    fn page_allocator_init(&self) {}
    fn proc_init(&self) {}
    fn spawn_init_thread(&self) {}

    fn scheduler(&self) -> ! {
        panic!("scheduler entered under test");
    }

    fn wakeup(&self, chan: usize) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
        self.last_chan.store(chan, Ordering::Relaxed);
    }

    fn print_procs(&self) {}
    fn print_page_stats(&self) {}
}

static KERNEL: TestKernel = TestKernel {
    wakeups: AtomicUsize::new(0),
    last_chan: AtomicUsize::new(0),
};

static LOCK: Mutex<()> = Mutex::new(());

fn setup() -> MutexGuard<'static, ()> {
    let guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    services::install(&KERNEL);
    host::mock_reset();
    console::reset_for_tests();
    guard
}

fn wakeups() -> usize {
    KERNEL.wakeups.load(Ordering::Relaxed)
}

fn raw_output() -> String {
    let mut buf = [0u8; 1024];
    let n = host::sbi::mock_drain_raw_output(&mut buf);
    String::from_utf8(buf[..n].to_vec()).unwrap()
}

#[test]
fn full_line_flow() {
    let _guard = setup();
    let before = wakeups();

    config::UART.push_rx(b"echo hi\r");
    console::handle_interrupt();

    assert_eq!(wakeups(), before + 1);
    assert_eq!(
        KERNEL.last_chan.load(Ordering::Relaxed),
        console::wake_channel()
    );

    let mut line = [0u8; 32];
    let n = console::read_published(&mut line);
    assert_eq!(&line[..n], b"echo hi\n");

    // Every accepted byte was echoed, CR already normalized.
    assert_eq!(raw_output(), "echo hi\n");
}

#[test]
fn one_interrupt_drains_every_pending_byte() {
    let _guard = setup();
    let before = wakeups();

    config::UART.push_rx(b"one\ntwo\nthree\n");
    console::handle_interrupt();

    assert_eq!(wakeups(), before + 3);

    let mut lines = [0u8; 64];
    let n = console::read_published(&mut lines);
    assert_eq!(&lines[..n], b"one\ntwo\nthree\n");
}

#[test]
fn interactive_editing_session() {
    let _guard = setup();

    // Mistype, erase two characters, fix, commit.
    config::UART.push_rx(b"mkae");
    console::handle_interrupt();
    config::UART.push_rx(&[0x7f, 0x7f, 0x7f]);
    console::handle_interrupt();
    config::UART.push_rx(b"ake\n");
    console::handle_interrupt();

    let mut line = [0u8; 32];
    let n = console::read_published(&mut line);
    assert_eq!(&line[..n], b"make\n");

    let (r, w, e) = console::buffer_indices();
    assert!(r <= w && w <= e);
    assert_eq!(r, w);
}

#[test]
fn initialized_device_owns_the_transmit_path() {
    let _guard = setup();

    console::init();
    assert!(config::UART.inited());

    config::UART.push_rx(b"x");
    console::handle_interrupt();

    // The echo now goes through the device, not the firmware.
    let mut tx = [0u8; 16];
    let n = config::UART.drain_tx(&mut tx);
    assert_eq!(&tx[..n], b"x");
    assert_eq!(raw_output(), "");
}

#[test]
fn kprintln_works_before_device_init() {
    let _guard = setup();

    vireo_kernel::kprintln!("hart {} of {}", 0, 4);
    assert_eq!(raw_output(), "hart 0 of 4\n");
}
