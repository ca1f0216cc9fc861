//! # Physical Frames

use kernel_info::memory::BYTES_PER_FRAME;

/// Index of a 4 KiB physical frame.
///
/// Frame `n` starts at physical address `n * BYTES_PER_FRAME`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FrameId(usize);

impl FrameId {
    #[inline]
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn id(self) -> usize {
        self.0
    }

    /// Physical address of the first byte of this frame.
    #[inline]
    #[must_use]
    pub const fn addr(self) -> u64 {
        self.0 as u64 * BYTES_PER_FRAME
    }

    /// The frame containing `addr` (rounds down).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn containing(addr: u64) -> Self {
        Self((addr / BYTES_PER_FRAME) as usize)
    }

    /// The first frame starting at or after `addr` (rounds up).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn at_or_after(addr: u64) -> Self {
        Self(addr.div_ceil(BYTES_PER_FRAME) as usize)
    }

    #[inline]
    #[must_use]
    pub const fn offset(self, frames: usize) -> Self {
        Self(self.0 + frames)
    }
}

/// Failure of a physical memory request.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AllocError {
    /// No run of `requested` consecutive free frames exists in the managed range.
    #[error("out of physical memory ({requested} contiguous frames requested)")]
    OutOfMemory { requested: usize },
    /// A request for zero frames.
    #[error("zero-sized frame request")]
    EmptyRequest,
    /// The kernel heap was already handed its region.
    #[error("kernel heap already initialized")]
    HeapAlreadyInitialized,
}

/// Source of contiguous physical frames.
///
/// Page-table code is generic over this so tests can hand it any allocator.
pub trait FrameAlloc {
    /// Reserve `num_frames` consecutive frames and return the first.
    ///
    /// # Errors
    /// [`AllocError::OutOfMemory`] if no such run exists; the allocator is left unchanged.
    fn allocate(&mut self, num_frames: usize) -> Result<FrameId, AllocError>;

    /// Return `num_frames` frames starting at `start`. Freeing a free frame is a no-op.
    fn free(&mut self, start: FrameId, num_frames: usize);
}

impl<A: FrameAlloc + ?Sized> FrameAlloc for &mut A {
    #[inline]
    fn allocate(&mut self, num_frames: usize) -> Result<FrameId, AllocError> {
        (**self).allocate(num_frames)
    }

    #[inline]
    fn free(&mut self, start: FrameId, num_frames: usize) {
        (**self).free(start, num_frames);
    }
}
