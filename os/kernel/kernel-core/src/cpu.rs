use kernel_task::TaskContext;

/// The privileged operations the core needs from the processor.
pub trait Cpu {
    /// Physical address of the active PML4 (CR3, flag bits included).
    fn read_cr3(&self) -> u64;

    /// Load a new page-table root.
    ///
    /// # Safety
    /// `root` must point at a valid PML4 that maps the running code, its
    /// stack and every static the kernel touches afterwards.
    unsafe fn write_cr3(&self, root: u64);

    /// Signal end-of-interrupt to the local APIC.
    fn notify_end_of_interrupt(&self);

    /// Save the running registers into `current` and resume `next`.
    /// Returns once something switches back to `current`.
    ///
    /// # Safety
    /// Both pointers must reference live contexts, and `next` must hold a
    /// resumable state. Interrupts must be masked.
    unsafe fn switch_context(&self, next: *const TaskContext, current: *mut TaskContext);

    /// Resume `next`, abandoning the running register state.
    ///
    /// On hardware this never returns.
    ///
    /// # Safety
    /// As for [`switch_context`](Self::switch_context).
    unsafe fn restore_context(&self, next: *const TaskContext);

    /// Wait for the next interrupt.
    fn halt(&self);
}
