//! Architecture-specific code
//!
//! The kernel targets RISC-V (rv64, supervisor mode on top of OpenSBI).
//! Any other build target gets the mock platform instead, which lets the
//! driver and boot logic above this line run under `cargo test` on a
//! development host.

#[cfg(target_arch = "riscv64")]
pub mod riscv64;

#[cfg(not(target_arch = "riscv64"))]
pub mod host;

#[cfg(target_arch = "riscv64")]
pub use riscv64::{cpu_id, intr_get, intr_off, intr_on, read_cycle, set_cpu_id, enable_timer_irq, sbi};

#[cfg(not(target_arch = "riscv64"))]
pub use host::{cpu_id, intr_get, intr_off, intr_on, read_cycle, set_cpu_id, enable_timer_irq, sbi};
