//! Multi-hart boot orchestration
//!
//! Brings the machine from "one hart, firmware stack, nothing initialized"
//! to "every available hart spinning in the scheduler". Each hart walks
//! the same ladder: raw entry, one-way relocation onto its private kernel
//! stack, barrier-gated initialization, scheduler.
//!
//! Two facts cannot be learned from one counter, so the barrier has two
//! parts. The boot hart must know how many harts *arrived* before it can
//! finish enumerating candidates (`online`), while secondary harts must
//! know when platform-wide state is *ready* before touching any of it
//! (`platform_ready`). Collapsing the two would race a freshly started
//! hart into a console or allocator that does not exist yet.
//!
//! Hartids come from firmware and may be sparse or start anywhere; logical
//! cpu ids are handed out densely in arrival order. The two id spaces are
//! never assumed to coincide.
//!
//! No scheduler or lock infrastructure exists during any of this; all
//! cross-hart agreement is spin-waiting on the two atomics, with
//! acquire/release ordering at exactly the points noted below. A platform
//! that accepts a hart-start and never brings the hart online hangs the
//! boot hart forever - deliberately, as there is nothing sane to do
//! instead.

pub mod stack;

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::arch::{self, sbi};
use crate::config::NCPU;

#[cfg(target_arch = "riscv64")]
use crate::services::KernelServices;

/// Per-hart identity, written once by the owning hart during its entry
/// and read only by itself afterwards.
pub struct Cpu {
    /// Dense kernel-assigned id; indexes every per-cpu structure.
    pub cpuid: usize,
    /// Firmware-reported hart id; only meaningful to the platform.
    pub hartid: usize,
}

struct CpuTable {
    cpus: [UnsafeCell<Cpu>; NCPU],
}

// Each slot is only ever touched by the hart it belongs to.
unsafe impl Sync for CpuTable {}

const EMPTY_CPU: UnsafeCell<Cpu> = UnsafeCell::new(Cpu { cpuid: 0, hartid: 0 });

static CPUS: CpuTable = CpuTable {
    cpus: [EMPTY_CPU; NCPU],
};

/// Logical id of the executing hart.
pub fn cpu_id() -> usize {
    arch::cpu_id()
}

/// The executing hart's identity record.
///
/// # Safety
/// The caller must be past the point where its entry path stored the
/// logical id, and must not hold the reference across a migration point.
pub unsafe fn mycpu() -> &'static mut Cpu {
    &mut *CPUS.cpus[arch::cpu_id()].get()
}

/// The two-phase bring-up barrier.
///
/// `online` counts harts that have completed low-level arrival and is
/// monotonically non-decreasing; `platform_ready` flips false to true
/// exactly once, after which every hart may touch platform-wide state.
pub struct BootBarrier {
    online: AtomicUsize,
    platform_ready: AtomicBool,
}

impl BootBarrier {
    pub const fn new() -> Self {
        Self {
            online: AtomicUsize::new(0),
            platform_ready: AtomicBool::new(false),
        }
    }

    /// Harts that have arrived so far.
    pub fn online(&self) -> usize {
        self.online.load(Ordering::Acquire)
    }

    /// Announce this hart's arrival. Release ordering makes the hart's
    /// earlier writes (its identity record) visible to whoever observes
    /// the new count.
    pub fn mark_online(&self) {
        self.online.fetch_add(1, Ordering::Release);
    }

    /// Spin until the arrival count moves past `seen`, the value sampled
    /// just before the start request.
    pub fn wait_online_past(&self, seen: usize) {
        while self.online() == seen {
            spin_loop();
        }
    }

    /// Declare platform-wide initialization finished. Release ordering
    /// publishes everything written before this point to every hart that
    /// subsequently observes the flag.
    pub fn publish_platform_ready(&self) {
        self.platform_ready.store(true, Ordering::Release);
    }

    /// Has platform-wide initialization finished?
    pub fn platform_ready(&self) -> bool {
        self.platform_ready.load(Ordering::Acquire)
    }

    /// Spin until platform-wide initialization has finished. The acquire
    /// read pairs with [`publish_platform_ready`]; after this returns the
    /// hart may touch any platform-wide state.
    pub fn wait_platform_ready(&self) {
        while !self.platform_ready() {
            spin_loop();
        }
    }
}

static BARRIER: BootBarrier = BootBarrier::new();

/// Harts that have completed arrival, the boot hart included.
pub fn harts_online() -> usize {
    BARRIER.online()
}

/// Start every secondary hart the platform will give us.
///
/// Probes hartids `0..max_harts`, skipping the boot hart's own. Each
/// accepted start request is followed by a spin on the arrival count -
/// only then is the next dense logical id consumed, so ids come out
/// gap-free no matter which hartids actually exist. A refused hartid
/// costs nothing: firmware configured for fewer harts than `max_harts`
/// is normal, not an error.
///
/// Returns the number of harts online, the boot hart included.
pub fn enumerate_secondary_harts<S>(
    boot_hart: usize,
    max_harts: usize,
    barrier: &BootBarrier,
    mut start: S,
) -> usize
where
    S: FnMut(usize, usize) -> Result<(), sbi::SbiError>,
{
    let mut cpuid = 1;
    for hartid in 0..max_harts {
        if hartid == boot_hart {
            continue;
        }

        let seen = barrier.online();
        crate::kprintln!(
            "- starting hart {}: hart_start(pc=_entry_secondary, opaque={})",
            hartid,
            cpuid
        );
        match start(hartid, cpuid) {
            Ok(()) => {
                barrier.wait_online_past(seen);
                cpuid += 1;
            }
            Err(err) => {
                crate::kprintln!("  skipped hart {}: {:?}", hartid, err);
            }
        }
    }
    cpuid
}

/// First Rust code on the boot hart, still on the early boot stack.
///
/// Zeroes `.bss`, installs the kernel's service implementation (so every
/// hart and interrupt path after this can find it), records identity as
/// logical cpu 0 and transfers onto the private kernel stack. Invoked by
/// the stub [`boot_entry!`] emits; never returns.
#[cfg(target_arch = "riscv64")]
pub fn bootcpu_entry(hartid: usize, services: &'static dyn KernelServices) -> ! {
    crate::kprintln!();
    crate::kprintln!("vireo kernel booting");
    crate::kprintln!();

    unsafe { clear_bss() };

    crate::services::install(services);

    // The boot hart is always logical cpu 0, whatever its hartid.
    unsafe {
        arch::set_cpu_id(0);
        let cpu = mycpu();
        cpu.cpuid = 0;
        cpu.hartid = hartid;
    }
    crate::kinfo!("boot hartid {}, relocating onto kernel stack", hartid);

    unsafe { stack::run_on_stack(bootcpu_init, stack::kstack_top(0)) }
}

/// Boot hart, phase two: on the kernel stack, bring up the world.
#[cfg(target_arch = "riscv64")]
fn bootcpu_init() -> ! {
    BARRIER.mark_online();

    let boot_hart = unsafe { mycpu().hartid };
    let online = enumerate_secondary_harts(boot_hart, NCPU, &BARRIER, |hartid, cpuid| {
        sbi::hart_start(hartid, _entry_secondary as usize, cpuid)
    });
    crate::kinfo!("{} cpus online", online);

    // Platform-wide initialization, exactly once, boot hart only.
    let services = crate::services::services();
    services.trap_init();
    crate::components::console::init();
    crate::kinfo!("UART inited");
    services.plic_init();
    services.page_allocator_init();
    services.proc_init();
    crate::timer::init();
    services.plic_init_hart();
    services.spawn_init_thread();

    // Everything the other harts are waiting to see is written; open the
    // gate.
    BARRIER.publish_platform_ready();

    crate::kinfo!("start scheduler");
    services.scheduler()
}

/// First Rust code on a secondary hart, on its early boot stack slot.
///
/// `cpuid` arrives as the opaque argument the boot hart passed to the
/// start request; it is this hart's dense logical id.
#[cfg(target_arch = "riscv64")]
extern "C" fn secondarycpu_entry(hartid: usize, cpuid: usize) -> ! {
    unsafe {
        arch::set_cpu_id(cpuid);
        let cpu = mycpu();
        cpu.cpuid = cpuid;
        cpu.hartid = hartid;
    }
    crate::kprintln!("cpu {} (hartid {}) booting, relocating", cpuid, hartid);

    unsafe { stack::run_on_stack(secondarycpu_init, stack::kstack_top(cpuid)) }
}

/// Secondary hart, phase two: announce arrival, wait for the platform,
/// then do only the hart-local share of initialization.
#[cfg(target_arch = "riscv64")]
fn secondarycpu_init() -> ! {
    crate::kprintln!("cpu {} online", cpu_id());

    // Identity is written; the release in mark_online publishes it.
    BARRIER.mark_online();
    BARRIER.wait_platform_ready();

    let services = crate::services::services();
    services.trap_init();
    crate::timer::init();
    services.plic_init_hart();

    crate::kinfo!("start scheduler");
    services.scheduler()
}

#[cfg(target_arch = "riscv64")]
extern "C" {
    /// Entry stub handed to the firmware's hart-start call.
    fn _entry_secondary();
    static mut __bss_start: u8;
    static mut __bss_end: u8;
}

/// Zero the uninitialized-data region. Must run before anything reads a
/// static that lives there.
#[cfg(target_arch = "riscv64")]
unsafe fn clear_bss() {
    let start = core::ptr::addr_of_mut!(__bss_start);
    let end = core::ptr::addr_of_mut!(__bss_end);
    core::ptr::write_bytes(start, 0, end as usize - start as usize);
}

// Secondary harts begin here, started by the firmware with a0 = hartid
// and a1 = the opaque logical id. Point sp at this hart's boot stack
// slot, then continue in Rust.
#[cfg(target_arch = "riscv64")]
core::arch::global_asm!(
    ".section .text._entry_secondary",
    ".global _entry_secondary",
    "_entry_secondary:",
    "    la sp, {boot_stack}",
    "    addi t0, a1, 1",
    "    slli t0, t0, {shift}",
    "    add sp, sp, t0",
    "    j {entry}",
    boot_stack = sym stack::BOOT_STACK,
    shift = const crate::config::BOOT_STACK_SHIFT,
    entry = sym secondarycpu_entry,
);

/// Emit the kernel image's entry point.
///
/// The argument is the kernel's [`KernelServices`] implementation, a
/// `&'static` expression. The generated `_entry` stub lands the boot hart
/// on its boot stack slot and hands control to [`bootcpu_entry`] with the
/// firmware-provided hartid.
///
/// ```ignore
/// static KERNEL: MyKernel = MyKernel::new();
/// vireo_kernel::boot_entry!(&KERNEL);
/// ```
#[macro_export]
macro_rules! boot_entry {
    ($services:expr) => {
        ::core::arch::global_asm!(
            ".section .text._entry",
            ".global _entry",
            "_entry:",
            "    la sp, {boot_stack}",
            "    li t0, {size}",
            "    add sp, sp, t0",
            "    j {shim}",
            boot_stack = sym $crate::boot::stack::BOOT_STACK,
            size = const $crate::config::BOOT_STACK_SIZE,
            shim = sym __vireo_boot_shim,
        );

        #[no_mangle]
        extern "C" fn __vireo_boot_shim(hartid: usize) -> ! {
            $crate::boot::bootcpu_entry(hartid, $services)
        }
    };
}
