//! # Physical Memory Management
//!
//! Everything the kernel knows about physical memory lives here:
//!
//! ```text
//! firmware memory map ──► BitmapFrameAllocator ──► page tables (kernel-vmem)
//!                                  │
//!                                  └──► HeapRegion ──► KernelHeap (GlobalAlloc)
//! ```
//!
//! * [`BitmapFrameAllocator`] tracks every 4 KiB frame below the supported
//!   physical ceiling with one bit and hands out contiguous runs first-fit.
//! * [`MemoryDescriptor`] and
//!   [`init_from_memory_map`](BitmapFrameAllocator::init_from_memory_map)
//!   seed the allocator from the firmware memory map.
//! * [`HeapRegion`] reserves the kernel heap once at boot, and
//!   [`KernelHeap`] serves `alloc` from it through a free list.
//!
//! Code that needs frames is generic over [`FrameAlloc`], so tests can use a
//! small allocator over simulated memory.
//!
//! ```
//! use kernel_alloc::{BitmapFrameAllocator, FrameAlloc, FrameId};
//!
//! let mut frames = BitmapFrameAllocator::<4>::new();
//! frames.free(FrameId::new(0), 256);
//! frames.set_memory_range(FrameId::new(1), FrameId::new(256));
//!
//! let first = frames.allocate(8).unwrap();
//! assert_eq!(first, FrameId::new(1));
//! frames.free(first, 8);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod bitmap;
mod frame;
mod free_list;
mod heap;
mod memory_map;

pub use bitmap::{
    BITS_PER_MAP_LINE, BitmapFrameAllocator, BitmapMemoryManager, MAP_LINES, MemoryStat,
};
pub use frame::{AllocError, FrameAlloc, FrameId};
pub use free_list::FreeListHeap;
pub use heap::{HeapRegion, KERNEL_HEAP, KernelHeap};
pub use memory_map::{MemoryDescriptor, MemoryType};
