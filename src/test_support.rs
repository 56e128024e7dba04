//! Shared fixtures for unit tests
//!
//! The console, boot barrier and mock platform are process-wide
//! singletons, so tests that touch them serialize on one lock and start
//! from a clean slate via [`setup`].

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::services::{self, KernelServices};

/// Counting no-op implementation of the kernel service boundary.
pub struct MockServices {
    wakeups: AtomicUsize,
    last_wake_chan: AtomicUsize,
    proc_dumps: AtomicUsize,
    page_dumps: AtomicUsize,
}

impl KernelServices for MockServices {
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
        self.last_wake_chan.store(chan, Ordering::Relaxed);
    }

    fn print_procs(&self) {
        self.proc_dumps.fetch_add(1, Ordering::Relaxed);
    }

    fn print_page_stats(&self) {
        self.page_dumps.fetch_add(1, Ordering::Relaxed);
    }
}

static SERVICES: MockServices = MockServices {
    wakeups: AtomicUsize::new(0),
    last_wake_chan: AtomicUsize::new(0),
    proc_dumps: AtomicUsize::new(0),
    page_dumps: AtomicUsize::new(0),
};

static LOCK: Mutex<()> = Mutex::new(());

/// Serialize the test, install the mock services and reset all global
/// state. Hold the returned guard for the test's whole body.
pub fn setup() -> MutexGuard<'static, ()> {
    let guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    services::install(&SERVICES);
    crate::arch::host::mock_reset();
    crate::components::console::reset_for_tests();
    guard
}

/// Total wake notifications delivered so far (monotonic; diff it).
pub fn wake_count() -> usize {
    SERVICES.wakeups.load(Ordering::Relaxed)
}

/// Channel of the most recent wake notification.
pub fn last_wake_chan() -> usize {
    SERVICES.last_wake_chan.load(Ordering::Relaxed)
}

/// Total ^P process-table dumps requested so far.
pub fn proc_dump_count() -> usize {
    SERVICES.proc_dumps.load(Ordering::Relaxed)
}

/// Total ^Q allocator/queue dumps requested so far.
pub fn page_dump_count() -> usize {
    SERVICES.page_dumps.load(Ordering::Relaxed)
}
