//! # Memory Layout

/// Size of one physical frame and of one 4 KiB page.
pub const BYTES_PER_FRAME: u64 = 4 * 1024;

/// Highest physical address (exclusive) the frame allocator can track.
pub const MAX_PHYSICAL_MEMORY_BYTES: u64 = 128 * 1024 * 1024 * 1024;

/// Number of frames covered by the allocation bitmap.
pub const FRAME_COUNT: usize = (MAX_PHYSICAL_MEMORY_BYTES / BYTES_PER_FRAME) as usize;

/// Size of a 2 MiB page used by the boot identity map.
pub const BYTES_PER_LARGE_PAGE: u64 = 512 * BYTES_PER_FRAME;

/// Size of the region one page directory covers (512 large pages).
pub const BYTES_PER_PAGE_DIRECTORY: u64 = 512 * BYTES_PER_LARGE_PAGE;

/// Number of statically allocated page directories in the identity map.
///
/// Each directory covers 1 GiB, so the identity map spans 64 GiB.
pub const PAGE_DIRECTORY_COUNT: usize = 64;

/// Virtual addresses below this value are identity mapped after boot.
pub const IDENTITY_MAP_END: u64 = PAGE_DIRECTORY_COUNT as u64 * BYTES_PER_PAGE_DIRECTORY;

/// Number of frames requested once at boot to back the kernel heap (128 MiB).
pub const HEAP_FRAMES: usize = 64 * 512;

/// First virtual address of the region tasks grow into on demand.
///
/// This is the first address of the canonical upper half; PML4 slots
/// `256..512` belong to tasks and are never shared with the identity map.
pub const DEMAND_PAGING_BASE: u64 = 0xffff_8000_0000_0000;

/// Size of the UEFI memory-map page unit.
pub const UEFI_PAGE_SIZE: u64 = 4 * 1024;

const _: () = {
    assert!(BYTES_PER_FRAME.is_power_of_two());
    assert!(FRAME_COUNT.is_multiple_of(64));
    assert!(IDENTITY_MAP_END <= MAX_PHYSICAL_MEMORY_BYTES);
    assert!(PAGE_DIRECTORY_COUNT <= 512);
    assert!(DEMAND_PAGING_BASE > IDENTITY_MAP_END);
};
