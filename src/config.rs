//! Kernel configuration and component composition
//!
//! Platform constants for the QEMU `virt` machine plus compile-time
//! selection of the console device component based on cargo features.

use crate::components::console::ConsoleDevice;

/// Maximum number of harts the kernel is configured for.
///
/// The platform may expose fewer; bring-up probes hartids `0..NCPU` and
/// skips the ones firmware refuses to start.
pub const NCPU: usize = 4;

/// Timebase frequency of the free-running counter, in Hz (QEMU virt).
pub const CPU_FREQ: u64 = 10_000_000;

/// Scheduler tick rate, in interrupts per second.
pub const TICKS_PER_SEC: u64 = 100;

/// Cycles between two timer deadlines.
pub const TICKS_PER_INTERVAL: u64 = CPU_FREQ / TICKS_PER_SEC;

/// Size of one page, used as the stack-alignment unit.
pub const PGSIZE: usize = 4096;

/// Per-hart early boot stack size. Must stay a power of two: the secondary
/// entry stub computes its stack slot with a shift.
pub const BOOT_STACK_SIZE: usize = PGSIZE;

/// log2(BOOT_STACK_SIZE), for the entry stub.
pub const BOOT_STACK_SHIFT: usize = 12;

/// Per-hart kernel stack size.
pub const KSTACK_SIZE: usize = 4 * PGSIZE;

/// Console input line buffer capacity. Power of two so the logically
/// unbounded indices reduce to storage offsets with a mask.
pub const INPUT_BUF_SIZE: usize = 128;

static_assertions::const_assert!(INPUT_BUF_SIZE.is_power_of_two());
static_assertions::const_assert!(BOOT_STACK_SIZE == 1 << BOOT_STACK_SHIFT);

/// NS16550 UART register block on QEMU virt.
pub const UART0_BASE: usize = 0x1000_0000;

/// Console device selection (compile-time)
///
/// Cargo features pick the device component, mirroring runtime component
/// composition at compile time:
/// - `console-ns16550`: NS16550 UART (default for QEMU virt)
/// - `console-null`: discard all output (production builds)
///
/// On a non-riscv64 host the mock device is substituted unconditionally so
/// the driver stack is exercisable under `cargo test`.
#[cfg(all(target_arch = "riscv64", feature = "console-ns16550", not(feature = "console-null")))]
pub static UART: crate::components::console::ns16550::Ns16550 =
    crate::components::console::ns16550::Ns16550::new(UART0_BASE);

#[cfg(all(target_arch = "riscv64", feature = "console-null"))]
pub static UART: crate::components::console::null::NullUart =
    crate::components::console::null::NullUart::new();

#[cfg(all(target_arch = "riscv64", not(any(feature = "console-ns16550", feature = "console-null"))))]
pub static UART: crate::components::console::ns16550::Ns16550 =
    crate::components::console::ns16550::Ns16550::new(UART0_BASE);

#[cfg(not(target_arch = "riscv64"))]
pub static UART: crate::components::console::mock::MockUart =
    crate::components::console::mock::MockUart::new();

/// Get the console device component.
pub fn uart() -> &'static impl ConsoleDevice {
    &UART
}
