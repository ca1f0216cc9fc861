//! # Kernel Heap
//!
//! The heap is carved out of physical memory exactly once during boot:
//! [`HeapRegion::bootstrap`] asks the frame allocator for
//! [`HEAP_FRAMES`] contiguous frames, and [`KernelHeap::init`] hands that
//! region to a [`FreeListHeap`]. Because low physical memory is identity
//! mapped, the region's physical addresses are also valid pointers.

use crate::free_list::FreeListHeap;
use crate::frame::{AllocError, FrameAlloc, FrameId};
use core::alloc::{GlobalAlloc, Layout};
use kernel_info::memory::{BYTES_PER_FRAME, HEAP_FRAMES};
use kernel_sync::SpinLock;
use log::{error, info};

/// A physically contiguous range of frames reserved for the heap.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HeapRegion {
    first: FrameId,
    frames: usize,
}

impl HeapRegion {
    /// Reserve the boot heap from `frames`.
    ///
    /// # Errors
    /// Propagates the allocator's failure.
    pub fn bootstrap<A: FrameAlloc + ?Sized>(frames: &mut A) -> Result<Self, AllocError> {
        Self::with_frames(frames, HEAP_FRAMES)
    }

    /// Reserve a heap of `count` frames.
    ///
    /// # Errors
    /// Propagates the allocator's failure.
    pub fn with_frames<A: FrameAlloc + ?Sized>(
        frames: &mut A,
        count: usize,
    ) -> Result<Self, AllocError> {
        let first = frames.allocate(count).inspect_err(|e| {
            error!("cannot reserve kernel heap: {e}");
        })?;
        let region = Self {
            first,
            frames: count,
        };
        info!(
            "kernel heap at [{:#x}, {:#x})",
            region.start(),
            region.end()
        );
        Ok(region)
    }

    #[must_use]
    pub const fn start(&self) -> u64 {
        self.first.addr()
    }

    #[must_use]
    pub const fn end(&self) -> u64 {
        self.start() + self.len()
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.frames as u64 * BYTES_PER_FRAME
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.frames == 0
    }

    #[must_use]
    pub const fn first_frame(&self) -> FrameId {
        self.first
    }
}

/// `GlobalAlloc` front of the free-list heap.
pub struct KernelHeap {
    inner: SpinLock<FreeListHeap>,
}

impl Default for KernelHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelHeap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: SpinLock::new(FreeListHeap::new()),
        }
    }

    /// Give the heap its memory. Only the first call takes effect.
    ///
    /// # Errors
    /// [`AllocError::HeapAlreadyInitialized`] on any later call.
    ///
    /// # Safety
    /// `[region.start(), region.end())` must be mapped at the same virtual
    /// address, writable and owned by the heap from now on.
    #[allow(clippy::cast_possible_truncation)]
    pub unsafe fn init(&self, region: HeapRegion) -> Result<(), AllocError> {
        self.inner.with_lock(|heap| {
            if heap.is_initialized() {
                return Err(AllocError::HeapAlreadyInitialized);
            }
            unsafe { heap.init(region.start() as usize, region.len() as usize) };
            Ok(())
        })
    }

    #[must_use]
    pub fn free_bytes(&self) -> usize {
        self.inner.with_lock(|heap| heap.free_bytes())
    }
}

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.inner.with_lock(|heap| {
            if !heap.is_initialized() {
                return core::ptr::null_mut();
            }
            unsafe { heap.allocate(layout.size(), layout.align()) }
        })
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner
            .with_lock(|heap| unsafe { heap.deallocate(ptr, layout.size()) });
    }
}

/// The kernel's heap. Registered as the global allocator on bare metal only;
/// hosted builds and tests keep the platform allocator.
#[cfg_attr(target_os = "none", global_allocator)]
pub static KERNEL_HEAP: KernelHeap = KernelHeap::new();
