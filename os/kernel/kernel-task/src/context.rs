use core::mem::offset_of;
use kernel_info::cpu::{KERNEL_CS, KERNEL_SS, RFLAGS_IF};
use kernel_info::sched::DEFAULT_MXCSR;

/// Entry point of a task: `entry(task_id, arg)`.
pub type TaskEntry = extern "C" fn(task_id: u64, arg: i64);

/// Byte offset of MXCSR inside the FXSAVE image.
const FXSAVE_MXCSR_OFFSET: usize = 24;

/// 512-byte `fxsave64` image.
#[derive(Clone, Debug)]
#[repr(C, align(16))]
pub struct FxSaveArea(pub [u8; 512]);

impl FxSaveArea {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; 512])
    }

    #[must_use]
    pub fn mxcsr(&self) -> u32 {
        let mut raw = [0; 4];
        raw.copy_from_slice(&self.0[FXSAVE_MXCSR_OFFSET..FXSAVE_MXCSR_OFFSET + 4]);
        u32::from_le_bytes(raw)
    }

    pub fn set_mxcsr(&mut self, value: u32) {
        self.0[FXSAVE_MXCSR_OFFSET..FXSAVE_MXCSR_OFFSET + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Saved CPU state of a task.
///
/// The context-switch and interrupt trampolines address these fields by
/// fixed offsets; the `const` block below pins them.
#[derive(Clone, Debug)]
#[repr(C, align(16))]
pub struct TaskContext {
    pub cr3: u64,
    pub rip: u64,
    pub rflags: u64,
    pub reserved1: u64,
    pub cs: u64,
    pub ss: u64,
    pub fs: u64,
    pub gs: u64,
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rsp: u64,
    pub rbp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub fxsave_area: FxSaveArea,
}

const _: () = {
    assert!(offset_of!(TaskContext, cr3) == 0x00);
    assert!(offset_of!(TaskContext, rip) == 0x08);
    assert!(offset_of!(TaskContext, rflags) == 0x10);
    assert!(offset_of!(TaskContext, cs) == 0x20);
    assert!(offset_of!(TaskContext, ss) == 0x28);
    assert!(offset_of!(TaskContext, fs) == 0x30);
    assert!(offset_of!(TaskContext, gs) == 0x38);
    assert!(offset_of!(TaskContext, rax) == 0x40);
    assert!(offset_of!(TaskContext, rdi) == 0x60);
    assert!(offset_of!(TaskContext, rsi) == 0x68);
    assert!(offset_of!(TaskContext, rsp) == 0x70);
    assert!(offset_of!(TaskContext, rbp) == 0x78);
    assert!(offset_of!(TaskContext, r8) == 0x80);
    assert!(offset_of!(TaskContext, r15) == 0xb8);
    assert!(offset_of!(TaskContext, fxsave_area) == 0xc0);
    assert!(size_of::<TaskContext>() == 0x2c0);
};

impl Default for TaskContext {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl TaskContext {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            cr3: 0,
            rip: 0,
            rflags: 0,
            reserved1: 0,
            cs: 0,
            ss: 0,
            fs: 0,
            gs: 0,
            rax: 0,
            rbx: 0,
            rcx: 0,
            rdx: 0,
            rdi: 0,
            rsi: 0,
            rsp: 0,
            rbp: 0,
            r8: 0,
            r9: 0,
            r10: 0,
            r11: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            fxsave_area: FxSaveArea::zeroed(),
        }
    }

    /// A context that starts `entry(task_id, arg)` on the stack ending at
    /// `stack_end`, with interrupts enabled, kernel segments and the given
    /// page-table root.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn primed(entry: TaskEntry, task_id: u64, arg: i64, stack_end: u64, cr3: u64) -> Self {
        let mut ctx = Self::zeroed();
        ctx.rip = entry as usize as u64;
        ctx.rdi = task_id;
        ctx.rsi = arg as u64;
        ctx.cr3 = cr3;
        ctx.rflags = RFLAGS_IF;
        ctx.cs = u64::from(KERNEL_CS);
        ctx.ss = u64::from(KERNEL_SS);
        // as if `entry` had just been called: rsp + 8 is 16-byte aligned
        ctx.rsp = (stack_end & !0xf) - 8;
        ctx.fxsave_area.set_mxcsr(DEFAULT_MXCSR);
        ctx
    }
}
