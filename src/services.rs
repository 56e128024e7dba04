//! Kernel subsystem boundary
//!
//! Bring-up owns only the first phase of the kernel's life: hart boot, the
//! tick, and the console. Everything it has to call but must not own - trap
//! vectors, the PLIC, the page allocator, processes, the scheduler - sits
//! behind this trait. The boot core installs the implementation before it
//! starts any secondary hart, so every later reader (secondary harts, the
//! console interrupt path) finds it present.

use spin::Once;

/// Subsystems provided by the rest of the kernel.
///
/// One implementation exists per kernel image. Methods are called in the
/// order fixed by the boot sequence; `scheduler` is entered once per hart
/// and must not return.
pub trait KernelServices: Send + Sync {
    /// Install the trap vector for the calling hart.
    fn trap_init(&self);

    /// Platform-wide interrupt-controller initialization (boot hart only).
    fn plic_init(&self);

    /// Route and enable device interrupts for the calling hart.
    fn plic_init_hart(&self);

    /// Bootstrap the physical page allocator (boot hart only).
    fn page_allocator_init(&self);

    /// Initialize the process subsystem (boot hart only).
    fn proc_init(&self);

    /// Create the first kernel thread (boot hart only).
    fn spawn_init_thread(&self);

    /// Enter the per-hart scheduler loop. Must not return.
    fn scheduler(&self) -> !;

    /// Wake any reader blocked on `chan` (console line completion).
    fn wakeup(&self, chan: usize);

    /// Console diagnostic: dump the process table (^P).
    fn print_procs(&self);

    /// Console diagnostic: dump allocator / queue status (^Q).
    fn print_page_stats(&self);
}

static SERVICES: Once<&'static dyn KernelServices> = Once::new();

/// Install the kernel's service implementation.
///
/// Called by the boot hart before secondary harts are started. Later calls
/// are ignored; the first installation wins.
pub fn install(services: &'static dyn KernelServices) {
    SERVICES.call_once(|| services);
}

/// The installed services.
///
/// Panics if bring-up reaches a point that needs a subsystem before the
/// boot hart installed one; that is a fatal mis-assembly of the kernel.
pub fn services() -> &'static dyn KernelServices {
    *SERVICES.get().expect("kernel services not installed")
}

/// Has an implementation been installed yet?
pub fn installed() -> bool {
    SERVICES.get().is_some()
}
