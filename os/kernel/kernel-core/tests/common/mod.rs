#![allow(dead_code)]

use core::cell::{Cell, RefCell, UnsafeCell};
use kernel_alloc::{BitmapFrameAllocator, FrameAlloc, FrameId};
use kernel_core::Cpu;
use kernel_task::TaskContext;
use kernel_vmem::{PageMap, PhysMapper};

/// Records what the core asked the processor to do.
#[derive(Default)]
pub struct MockCpu {
    pub cr3: Cell<u64>,
    pub eois: Cell<usize>,
    pub halts: Cell<usize>,
    pub switches: RefCell<Vec<(*const TaskContext, *mut TaskContext)>>,
    pub restores: RefCell<Vec<*const TaskContext>>,
}

impl MockCpu {
    pub fn with_cr3(cr3: u64) -> Self {
        let cpu = Self::default();
        cpu.cr3.set(cr3);
        cpu
    }
}

impl Cpu for MockCpu {
    fn read_cr3(&self) -> u64 {
        self.cr3.get()
    }

    unsafe fn write_cr3(&self, root: u64) {
        self.cr3.set(root);
    }

    fn notify_end_of_interrupt(&self) {
        self.eois.set(self.eois.get() + 1);
    }

    unsafe fn switch_context(&self, next: *const TaskContext, current: *mut TaskContext) {
        self.switches.borrow_mut().push((next, current));
    }

    unsafe fn restore_context(&self, next: *const TaskContext) {
        self.restores.borrow_mut().push(next);
    }

    fn halt(&self) {
        self.halts.set(self.halts.get() + 1);
    }
}

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
}

impl PhysMapper for &TestPhys {
    unsafe fn page_map<'a>(&self, phys: u64) -> &'a mut PageMap {
        let index = usize::try_from(phys >> 12).unwrap();
        unsafe { &mut *self.frames[index].get() }
    }
}

/// An allocator owning all simulated frames except frame 0.
pub fn frames() -> Frames {
    let mut frames = Frames::new();
    frames.free(FrameId::new(0), FRAMES);
    frames.set_memory_range(FrameId::new(1), FrameId::new(FRAMES));
    frames
}

pub extern "C" fn idle(_: u64, _: i64) {}

pub extern "C" fn worker(_: u64, _: i64) {}
