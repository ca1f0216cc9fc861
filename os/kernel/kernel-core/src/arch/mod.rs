//! Bare-metal x86-64 backend: the real [`Cpu`](crate::Cpu), the
//! context-switch routines and the interrupt trampolines that feed the
//! installed [`KernelCore`].
//!
//! IDT programming and LAPIC timer setup belong to the platform layer; it
//! points the timer vector at [`lapic_timer_entry`] and vector 14 at
//! [`page_fault_entry`].

mod context;
mod cpu;
mod interrupts;

pub use cpu::X86Cpu;
pub use interrupts::{lapic_timer_entry, page_fault_entry};

use crate::boot;
use crate::cpu::Cpu;
use crate::error::KernelError;
use crate::kernel::KernelCore;
use kernel_alloc::{BitmapMemoryManager, KERNEL_HEAP, MemoryDescriptor};
use kernel_qemu::QemuLogger;
use kernel_sync::{SpinLock, SyncOnceCell};
use kernel_vmem::{IdentityMap, IdentityPhysMapper};
use log::{LevelFilter, warn};

pub type Kernel = KernelCore<'static, X86Cpu, IdentityPhysMapper, BitmapMemoryManager>;

static FRAMES: SpinLock<BitmapMemoryManager> = SpinLock::new(BitmapMemoryManager::new());
static mut IDENTITY_MAP: IdentityMap = IdentityMap::new();
static KERNEL: SyncOnceCell<Kernel> = SyncOnceCell::new();

/// The installed kernel core, if [`init`] has run.
#[must_use]
pub fn kernel() -> Option<&'static Kernel> {
    KERNEL.get()
}

/// Bring up logging, memory and the scheduler, and install the result for
/// the interrupt trampolines. The caller becomes the main task.
///
/// # Errors
/// - [`KernelError::Alloc`] if the heap cannot be reserved or was set up before.
/// - [`KernelError::AlreadyInstalled`] on a second call.
///
/// # Safety
/// Call once, with interrupts masked, while the firmware's page tables
/// still identity map low memory.
pub unsafe fn init(
    memory_map: &[MemoryDescriptor],
    log_level: LevelFilter,
) -> Result<&'static Kernel, KernelError> {
    if QemuLogger::new(log_level).init().is_err() {
        warn!("logger was installed before kernel init");
    }

    let identity = unsafe { &mut *(&raw mut IDENTITY_MAP) };
    let region = unsafe { boot::init_memory(&X86Cpu, &FRAMES, memory_map, identity) }?;
    unsafe { KERNEL_HEAP.init(region) }?;

    KERNEL
        .set(KernelCore::new(X86Cpu, IdentityPhysMapper, &FRAMES, idle_main))
        .map_err(|_| KernelError::AlreadyInstalled)?;
    KERNEL.get().ok_or(KernelError::AlreadyInstalled)
}

extern "C" fn idle_main(_task_id: u64, _arg: i64) {
    loop {
        X86Cpu.halt();
    }
}

/// Stop this CPU for good.
pub fn halt_forever() -> ! {
    kernel_sync::irq::disable();
    loop {
        X86Cpu.halt();
    }
}
