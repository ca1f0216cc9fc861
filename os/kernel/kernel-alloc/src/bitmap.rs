//! # Bitmap Frame Allocator
//!
//! One bit per physical frame, packed into `u64` lines. A set bit means the
//! frame is allocated or reserved; a clear bit means it is free.
//!
//! The allocator starts out with every frame allocated. Boot code clears the
//! frames the firmware reports as usable (see
//! [`init_from_memory_map`](BitmapFrameAllocator::init_from_memory_map)) and
//! then narrows the search window with
//! [`set_memory_range`](BitmapFrameAllocator::set_memory_range).
//!
//! Allocation is first-fit: the scan walks the window from the front and, on
//! hitting an allocated frame, restarts right after it.

use crate::frame::{AllocError, FrameAlloc, FrameId};
use kernel_info::memory::FRAME_COUNT;
use log::{trace, warn};

/// Number of frames tracked by a single bitmap line.
pub const BITS_PER_MAP_LINE: usize = u64::BITS as usize;

/// Number of bitmap lines needed to cover the supported physical ceiling.
pub const MAP_LINES: usize = FRAME_COUNT / BITS_PER_MAP_LINE;

/// The kernel's frame allocator, covering the whole supported physical range.
///
/// This is 4 MiB of bitmap; keep it in a `static`, never on the stack.
pub type BitmapMemoryManager = BitmapFrameAllocator<MAP_LINES>;

/// Frame usage counts over the managed range.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MemoryStat {
    pub allocated_frames: usize,
    pub total_frames: usize,
}

impl MemoryStat {
    #[inline]
    #[must_use]
    pub const fn free_frames(&self) -> usize {
        self.total_frames - self.allocated_frames
    }
}

/// Bitmap allocator over `LINES * 64` frames.
pub struct BitmapFrameAllocator<const LINES: usize> {
    alloc_map: [u64; LINES],
    range_begin: FrameId,
    range_end: FrameId,
}

impl<const LINES: usize> Default for BitmapFrameAllocator<LINES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const LINES: usize> BitmapFrameAllocator<LINES> {
    /// Number of frames this allocator can track.
    pub const CAPACITY: usize = LINES * BITS_PER_MAP_LINE;

    /// All frames allocated, window `[0, CAPACITY)`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            alloc_map: [u64::MAX; LINES],
            range_begin: FrameId::new(0),
            range_end: FrameId::new(Self::CAPACITY),
        }
    }

    /// Restrict allocation to `[begin, end)`. `end` is clamped to the capacity.
    pub fn set_memory_range(&mut self, begin: FrameId, end: FrameId) {
        let end = FrameId::new(end.id().min(Self::CAPACITY));
        debug_assert!(begin <= end, "inverted frame range");
        self.range_begin = begin;
        self.range_end = end;
    }

    /// The current search window `[begin, end)`.
    #[inline]
    #[must_use]
    pub const fn range(&self) -> (FrameId, FrameId) {
        (self.range_begin, self.range_end)
    }

    /// Reserve `num_frames` frames at `start` regardless of their state.
    ///
    /// Frames beyond the capacity are ignored.
    pub fn mark_allocated(&mut self, start: FrameId, num_frames: usize) {
        for id in Self::clamp(start, num_frames) {
            self.set_bit(id, true);
        }
    }

    #[must_use]
    pub fn is_allocated(&self, frame: FrameId) -> bool {
        frame.id() >= Self::CAPACITY || self.get_bit(frame.id())
    }

    /// Count allocated frames in the current window.
    #[must_use]
    pub fn stat(&self) -> MemoryStat {
        let (begin, end) = (self.range_begin.id(), self.range_end.id());
        let allocated_frames = (begin..end).filter(|&id| self.get_bit(id)).count();
        MemoryStat {
            allocated_frames,
            total_frames: end.saturating_sub(begin),
        }
    }

    fn clamp(start: FrameId, num_frames: usize) -> core::ops::Range<usize> {
        let begin = start.id().min(Self::CAPACITY);
        let end = start.id().saturating_add(num_frames).min(Self::CAPACITY);
        begin..end
    }

    #[inline]
    const fn get_bit(&self, id: usize) -> bool {
        let line = id / BITS_PER_MAP_LINE;
        let bit = id % BITS_PER_MAP_LINE;
        self.alloc_map[line] & (1 << bit) != 0
    }

    #[inline]
    const fn set_bit(&mut self, id: usize, allocated: bool) {
        let line = id / BITS_PER_MAP_LINE;
        let bit = id % BITS_PER_MAP_LINE;
        if allocated {
            self.alloc_map[line] |= 1 << bit;
        } else {
            self.alloc_map[line] &= !(1 << bit);
        }
    }
}

impl<const LINES: usize> FrameAlloc for BitmapFrameAllocator<LINES> {
    fn allocate(&mut self, num_frames: usize) -> Result<FrameId, AllocError> {
        if num_frames == 0 {
            return Err(AllocError::EmptyRequest);
        }

        let end = self.range_end.id();
        let mut start = self.range_begin.id();
        loop {
            let mut i = 0;
            while i < num_frames {
                if start + i >= end {
                    warn!("frame allocation of {num_frames} frames failed");
                    return Err(AllocError::OutOfMemory {
                        requested: num_frames,
                    });
                }
                if self.get_bit(start + i) {
                    break;
                }
                i += 1;
            }

            if i == num_frames {
                let first = FrameId::new(start);
                self.mark_allocated(first, num_frames);
                trace!("allocated {num_frames} frames at {:#x}", first.addr());
                return Ok(first);
            }

            // frame `start + i` is taken; no run can include it
            start += i + 1;
        }
    }

    fn free(&mut self, start: FrameId, num_frames: usize) {
        for id in Self::clamp(start, num_frames) {
            self.set_bit(id, false);
        }
    }
}
