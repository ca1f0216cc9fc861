#![allow(dead_code)]

use core::cell::UnsafeCell;
use kernel_alloc::{BitmapFrameAllocator, FrameAlloc, FrameId};
use kernel_vmem::{PageMap, PageMapEntry, PhysMapper};

/// Frames of simulated physical memory.
pub const FRAMES: usize = 256;

pub type Frames = BitmapFrameAllocator<{ FRAMES / 64 }>;

/// Simulated RAM: physical address `n * 4096` is frame `n` of the vector.
pub struct TestPhys {
    frames: Vec<UnsafeCell<PageMap>>,
}

impl TestPhys {
    pub fn new() -> Self {
        Self {
            frames: (0..FRAMES).map(|_| UnsafeCell::new(PageMap::new())).collect(),
        }
    }

    /// Fill every frame with junk so tests can tell whether frames get zeroed.
    pub fn scribble(&self) {
        for frame in &self.frames {
            let map = unsafe { &mut *frame.get() };
            for entry in map.iter_mut() {
                *entry = PageMapEntry::from(0xdead_beef_dead_beef);
            }
        }
    }

    pub fn is_zeroed(&self, phys: u64) -> bool {
        let map = unsafe { &*self.frames[frame_index(phys)].get() };
        map.iter().all(|e| e.into_bits() == 0)
    }

    pub fn entry(&self, table: u64, index: usize) -> PageMapEntry {
        unsafe { (&(*self.frames[frame_index(table)].get()))[index] }
    }
}

fn frame_index(phys: u64) -> usize {
    usize::try_from(phys >> 12).unwrap()
}

impl PhysMapper for TestPhys {
    unsafe fn page_map<'a>(&self, phys: u64) -> &'a mut PageMap {
        // page tables always start on a frame boundary
        assert_eq!(phys & 0xfff, 0);
        unsafe { &mut *self.frames[frame_index(phys)].get() }
    }
}

/// An allocator owning all simulated frames except frame 0.
pub fn frames() -> Frames {
    let mut frames = Frames::new();
    frames.free(FrameId::new(0), FRAMES);
    frames.set_memory_range(FrameId::new(1), FrameId::new(FRAMES));
    frames
}

/// A zeroed PML4 taken from `frames`.
pub fn new_root(phys: &TestPhys, frames: &mut Frames) -> u64 {
    let root = frames.allocate(1).unwrap().addr();
    unsafe { phys.page_map(root) }.clear();
    root
}

pub fn allocated(frames: &Frames) -> usize {
    frames.stat().allocated_frames
}
