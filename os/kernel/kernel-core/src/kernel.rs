use crate::cpu::Cpu;
use core::ops::Range;
use kernel_alloc::FrameAlloc;
use kernel_sync::{IrqGuard, SpinLock};
use kernel_task::{
    ContextSwitch, Message, Task, TaskContext, TaskEntry, TaskError, TaskId, TaskManager, Timer,
    TimerManager,
};
use kernel_vmem::{AddressSpace, PageFaultErrorCode, PagingError, PhysMapper, handle_page_fault};
use log::{info, warn};

/// Low CR3 bits carry PCID/caching flags, not address bits.
const CR3_FLAGS_MASK: u64 = 0xfff;

/// The scheduler, the timers and the frame allocator, wired to one CPU.
///
/// Methods meant for task code mask interrupts for as long as they hold a
/// lock; the `on_*` handlers expect to be called from an interrupt gate
/// (interrupts already masked). Locks are always taken timers first, then
/// tasks, then frames.
pub struct KernelCore<'k, C: Cpu, M: PhysMapper, A: FrameAlloc> {
    cpu: C,
    mapper: M,
    frames: &'k SpinLock<A>,
    tasks: SpinLock<TaskManager>,
    timers: SpinLock<TimerManager>,
}

impl<'k, C: Cpu, M: PhysMapper, A: FrameAlloc> KernelCore<'k, C, M, A> {
    /// Adopt the calling code as the main task and create the idle task.
    ///
    /// Both inherit the page tables active right now; the preemption timer
    /// is armed for the main task.
    pub fn new(cpu: C, mapper: M, frames: &'k SpinLock<A>, idle_entry: TaskEntry) -> Self {
        let cr3 = cpu.read_cr3();
        let tasks = TaskManager::new(idle_entry, cr3);
        let main = tasks.current_task();
        info!(
            "kernel core up: main {main}, idle {}, cr3 {cr3:#x}",
            tasks.idle_task()
        );
        Self {
            cpu,
            mapper,
            frames,
            tasks: SpinLock::new(tasks),
            timers: SpinLock::new(TimerManager::new(main)),
        }
    }

    #[must_use]
    pub const fn cpu(&self) -> &C {
        &self.cpu
    }

    /// Run `f` on the scheduler state with interrupts masked.
    pub fn with_tasks<R>(&self, f: impl FnOnce(&mut TaskManager) -> R) -> R {
        f(&mut self.tasks.lock_irq())
    }

    /// Run `f` on the frame allocator with interrupts masked.
    pub fn with_frames<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut self.frames.lock_irq())
    }

    #[must_use]
    pub fn current_task(&self) -> TaskId {
        self.tasks.lock_irq().current_task()
    }

    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.timers.lock_irq().current_tick()
    }

    /// A new sleeping task; see [`TaskManager::new_task`].
    #[must_use]
    pub fn new_task(&self) -> TaskId {
        self.tasks.lock_irq().new_task()
    }

    /// Prime `id` to start at `entry(id, arg)` with the current page tables.
    ///
    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn init_context(&self, id: TaskId, entry: TaskEntry, arg: i64) -> Result<(), TaskError> {
        let cr3 = self.cpu.read_cr3();
        self.tasks.lock_irq().init_context(id, entry, arg, cr3)
    }

    /// Create, prime and wake a task in one go.
    ///
    /// # Errors
    /// [`TaskError::InvalidLevel`] if `level` is out of range. The task
    /// exists but stays asleep then.
    pub fn spawn(
        &self,
        entry: TaskEntry,
        arg: i64,
        level: Option<usize>,
    ) -> Result<TaskId, TaskError> {
        let cr3 = self.cpu.read_cr3();
        let mut tasks = self.tasks.lock_irq();
        let id = tasks.new_task();
        tasks.init_context(id, entry, arg, cr3)?;
        tasks.wakeup(id, level)?;
        Ok(id)
    }

    /// # Errors
    /// See [`TaskManager::wakeup`].
    pub fn wakeup(&self, id: TaskId, level: Option<usize>) -> Result<(), TaskError> {
        self.tasks.lock_irq().wakeup(id, level)
    }

    /// Put `id` to sleep. If it is the calling task, this returns only
    /// after someone woke it and the scheduler picked it again.
    ///
    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn sleep(&self, id: TaskId) -> Result<(), TaskError> {
        let _irq = IrqGuard::new();
        let switch = self.tasks.lock().sleep(id)?;
        if let Some(switch) = switch {
            unsafe { self.switch(&switch) };
        }
        Ok(())
    }

    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown receiver.
    pub fn send_message(&self, id: TaskId, message: Message) -> Result<(), TaskError> {
        self.tasks.lock_irq().send_message(id, message)
    }

    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn receive_message(&self, id: TaskId) -> Result<Option<Message>, TaskError> {
        self.tasks.lock_irq().receive_message(id)
    }

    /// Take the next message for the calling task `id`, sleeping while its
    /// mailbox is empty.
    ///
    /// The emptiness check and the sleep happen under one interrupt mask,
    /// so a message arriving in between cannot be missed. Returns `None`
    /// only if `id` could not be suspended (it is not the executing task,
    /// or it is the idle task).
    ///
    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn receive_or_sleep(&self, id: TaskId) -> Result<Option<Message>, TaskError> {
        loop {
            let _irq = IrqGuard::new();
            let switch = {
                let mut tasks = self.tasks.lock();
                if let Some(message) = tasks.receive_message(id)? {
                    return Ok(Some(message));
                }
                tasks.sleep(id)?
            };
            let Some(switch) = switch else {
                return Ok(None);
            };
            unsafe { self.switch(&switch) };
        }
    }

    /// Arm a one-shot timer `ticks` from now that sends `value` to `task`.
    pub fn add_timer(&self, ticks: u64, value: i32, task: TaskId) {
        let mut timers = self.timers.lock_irq();
        let timeout = timers.current_tick() + ticks;
        timers.add_timer(Timer::new(timeout, value, task));
    }

    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn set_dpaging_window(&self, id: TaskId, window: Range<u64>) -> Result<(), TaskError> {
        self.tasks.lock_irq().set_dpaging_window(id, window)
    }

    /// LAPIC timer tick. `saved` is the interrupted task's register image,
    /// built on the interrupt stack by the trampoline.
    ///
    /// Returns normally if the interrupted task keeps the CPU; otherwise
    /// the CPU resumes the next task and (on hardware) never comes back.
    pub fn on_timer_interrupt(&self, saved: &TaskContext) {
        let preempt = {
            let mut timers = self.timers.lock();
            let mut tasks = self.tasks.lock();
            timers.tick(&mut tasks)
        };
        self.cpu.notify_end_of_interrupt();

        if !preempt {
            return;
        }
        let switch = self.tasks.lock().switch_task(saved);
        if let Some(switch) = switch {
            unsafe { self.cpu.restore_context(switch.next_context()) };
        }
    }

    /// Page fault at `addr`. Resolved only for a non-present page inside
    /// the executing task's demand-paging window.
    ///
    /// # Errors
    /// See [`handle_page_fault`]. The fault is fatal to the task then.
    pub fn on_page_fault(&self, error_code: u64, addr: u64) -> Result<(), PagingError> {
        let error_code = PageFaultErrorCode::from(error_code);
        let window = {
            let tasks = self.tasks.lock();
            let current = tasks.current_task();
            tasks.task(current).map_or(0..0, Task::dpaging_window)
        };
        let root = self.cpu.read_cr3() & !CR3_FLAGS_MASK;
        let space = AddressSpace::from_root(&self.mapper, root);
        let mut frames = self.frames.lock();
        handle_page_fault(&space, &mut *frames, error_code, addr, window).inspect_err(|e| {
            warn!("unresolved page fault at {addr:#x} ({}): {e}", error_code.explain());
        })
    }

    /// Idle loop body for the idle task.
    pub fn idle(&self) {
        self.cpu.halt();
    }

    unsafe fn switch(&self, switch: &ContextSwitch) {
        unsafe {
            self.cpu
                .switch_context(switch.next_context(), switch.current_context());
        }
    }
}
