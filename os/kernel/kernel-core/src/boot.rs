//! Memory bring-up, in the order the rest of the kernel depends on it.

use crate::cpu::Cpu;
use crate::error::KernelError;
use kernel_alloc::{BitmapFrameAllocator, HeapRegion, MemoryDescriptor};
use kernel_sync::SpinLock;
use kernel_vmem::IdentityMap;
use log::info;

/// Seed `frames` from the firmware memory map, switch to the identity map
/// and reserve the kernel heap.
///
/// The heap region is returned rather than installed so the caller decides
/// which allocator serves it.
///
/// # Errors
/// [`KernelError::Alloc`] if the heap cannot be reserved.
///
/// # Safety
/// `identity` must live at an identity-mapped address for as long as it is
/// the active page table, and the code, stack and data in use must lie
/// within the identity-mapped range.
pub unsafe fn init_memory<C: Cpu, const LINES: usize>(
    cpu: &C,
    frames: &SpinLock<BitmapFrameAllocator<LINES>>,
    memory_map: &[MemoryDescriptor],
    identity: &mut IdentityMap,
) -> Result<HeapRegion, KernelError> {
    let mut frames = frames.lock_irq();
    frames.init_from_memory_map(memory_map);

    let root = identity.build();
    unsafe { cpu.write_cr3(root) };
    info!("identity map active, cr3 {root:#x}");

    Ok(HeapRegion::bootstrap(&mut *frames)?)
}
