use core::ptr::{self, null_mut};

/// Granule of the heap; every block start and length is a multiple of it.
const BLOCK_ALIGN: usize = 16;

/// Header stored at the beginning of every **free** block.
///
/// ```text
/// +----------------------+-------------------------+
/// | ListNode (header)    |   rest of the block     |
/// +----------------------+-------------------------+
/// ^ block_addr                        block_addr + size ^
/// ```
///
/// `size` is the length of the whole block, header included. Free blocks are
/// kept sorted by address so neighbors can be merged on insertion.
#[repr(C)]
struct ListNode {
    size: usize,
    next: *mut ListNode,
}

const _: () = assert!(size_of::<ListNode>() <= BLOCK_ALIGN);

#[inline]
const fn align_up(addr: usize, align: usize) -> usize {
    (addr + (align - 1)) & !(align - 1)
}

#[inline]
const fn block_size(size: usize) -> usize {
    align_up(if size == 0 { 1 } else { size }, BLOCK_ALIGN)
}

/// First-fit, split-and-coalesce free-list over one contiguous region.
///
/// # Invariants
/// - Free blocks are non-overlapping, lie within the region and are sorted.
/// - Every block start and size is a multiple of 16, so any remainder left by
///   a split is either empty or large enough for a header.
/// - No two free blocks are adjacent; they would have been merged.
pub struct FreeListHeap {
    /// Sentinel; the first real block is `head.next`.
    head: ListNode,
    initialized: bool,
}

// Safety: only used behind a lock; the raw pointers refer to the heap region.
unsafe impl Send for FreeListHeap {}

impl Default for FreeListHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl FreeListHeap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: ListNode {
                size: 0,
                next: null_mut(),
            },
            initialized: false,
        }
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Hand `[start, start + size)` to the heap as one free block.
    ///
    /// The region is trimmed inward to 16-byte boundaries.
    ///
    /// # Safety
    /// The range must be valid, writable, unused by anything else and stay so
    /// for the lifetime of the heap. Must be called at most once.
    pub unsafe fn init(&mut self, start: usize, size: usize) {
        let begin = align_up(start, BLOCK_ALIGN);
        let end = start.saturating_add(size) & !(BLOCK_ALIGN - 1);
        self.initialized = true;
        if end > begin {
            unsafe { self.insert(begin, end - begin) };
        }
    }

    /// Total bytes currently in free blocks.
    #[must_use]
    pub fn free_bytes(&self) -> usize {
        let mut total = 0;
        let mut current = self.head.next;
        while !current.is_null() {
            unsafe {
                total += (*current).size;
                current = (*current).next;
            }
        }
        total
    }

    /// Carve `size` bytes aligned to `align` out of the first block that fits.
    ///
    /// Returns null when nothing fits.
    ///
    /// # Safety
    /// The heap must have been initialized and must not be accessed concurrently.
    pub unsafe fn allocate(&mut self, size: usize, align: usize) -> *mut u8 {
        let size = block_size(size);
        let align = align.max(BLOCK_ALIGN);

        let mut prev = &raw mut self.head;
        let mut current = unsafe { (*prev).next };
        while !current.is_null() {
            let block_start = current as usize;
            let block_end = block_start + unsafe { (*current).size };
            let alloc_start = align_up(block_start, align);
            let alloc_end = alloc_start.saturating_add(size);

            if alloc_end <= block_end {
                unsafe { (*prev).next = (*current).next };
                if alloc_start > block_start {
                    unsafe { self.insert(block_start, alloc_start - block_start) };
                }
                if block_end > alloc_end {
                    unsafe { self.insert(alloc_end, block_end - alloc_end) };
                }
                return alloc_start as *mut u8;
            }

            prev = current;
            current = unsafe { (*current).next };
        }
        null_mut()
    }

    /// Return a block obtained from [`allocate`](Self::allocate).
    ///
    /// # Safety
    /// `ptr` and `size` must match an earlier allocation that has not been
    /// freed yet. No concurrent access.
    pub unsafe fn deallocate(&mut self, ptr: *mut u8, size: usize) {
        if ptr.is_null() {
            return;
        }
        unsafe { self.insert(ptr as usize, block_size(size)) };
    }

    /// Insert `[addr, addr + size)` in address order and merge with neighbors.
    unsafe fn insert(&mut self, addr: usize, size: usize) {
        debug_assert!(addr.is_multiple_of(BLOCK_ALIGN) && size.is_multiple_of(BLOCK_ALIGN));

        let mut prev = &raw mut self.head;
        let mut current = unsafe { (*prev).next };
        while !current.is_null() && (current as usize) < addr {
            prev = current;
            current = unsafe { (*current).next };
        }

        let new = addr as *mut ListNode;
        unsafe {
            ptr::write(new, ListNode { size, next: current });
            (*prev).next = new;
        }

        // merge with the following block
        if !current.is_null() && addr + size == current as usize {
            unsafe {
                (*new).size += (*current).size;
                (*new).next = (*current).next;
            }
        }

        // merge into the preceding block; the sentinel is not a block
        if !ptr::eq(prev, &raw const self.head) {
            let prev_end = prev as usize + unsafe { (*prev).size };
            if prev_end == addr {
                unsafe {
                    (*prev).size += (*new).size;
                    (*prev).next = (*new).next;
                }
            }
        }
    }
}
