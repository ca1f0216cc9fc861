use crate::context::{TaskContext, TaskEntry};
use crate::message::Message;
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;
use kernel_info::sched::{DEFAULT_LEVEL, TASK_STACK_BYTES};

/// Identity of a task. Assigned from 1 upward and never reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TaskId(u64);

impl TaskId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Position in the task arena.
    pub(crate) fn index(self) -> Option<usize> {
        usize::try_from(self.0.checked_sub(1)?).ok()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One schedulable unit.
///
/// The context lives in its own allocation so its address stays fixed while
/// the arena grows; the trampolines hold raw pointers to it across a switch.
pub struct Task {
    id: TaskId,
    level: usize,
    running: bool,
    has_context: bool,
    stack: Vec<u64>,
    context: Box<TaskContext>,
    mailbox: VecDeque<Message>,
    dpaging: Range<u64>,
}

impl Task {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            id,
            level: DEFAULT_LEVEL,
            running: false,
            has_context: false,
            stack: Vec::new(),
            context: Box::new(TaskContext::zeroed()),
            mailbox: VecDeque::new(),
            dpaging: 0..0,
        }
    }

    /// Give the task a fresh stack and a context that starts at `entry`.
    pub(crate) fn init_context(&mut self, entry: TaskEntry, arg: i64, cr3: u64) {
        self.stack = vec![0; TASK_STACK_BYTES / size_of::<u64>()];
        let stack_end = self.stack.as_ptr_range().end as u64;
        *self.context = TaskContext::primed(entry, self.id.get(), arg, stack_end, cr3);
        self.has_context = true;
    }

    /// Take over the code that is already executing. Its registers are
    /// saved on the first switch away from it.
    pub(crate) const fn adopt(&mut self) {
        self.has_context = true;
    }

    /// Whether the task has something to resume: a primed context or the
    /// adopted boot flow.
    #[must_use]
    pub const fn has_context(&self) -> bool {
        self.has_context
    }

    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    pub(crate) const fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    #[must_use]
    pub const fn running(&self) -> bool {
        self.running
    }

    pub(crate) const fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    #[must_use]
    pub fn context(&self) -> &TaskContext {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut TaskContext {
        &mut self.context
    }

    pub(crate) fn context_ptr(&mut self) -> *mut TaskContext {
        &raw mut *self.context
    }

    /// Address range of the private stack; empty before `init_context`.
    #[must_use]
    pub fn stack_range(&self) -> Range<u64> {
        let range = self.stack.as_ptr_range();
        range.start as u64..range.end as u64
    }

    pub(crate) fn push_message(&mut self, message: Message) {
        self.mailbox.push_back(message);
    }

    pub(crate) fn pop_message(&mut self) -> Option<Message> {
        self.mailbox.pop_front()
    }

    #[must_use]
    pub fn pending_messages(&self) -> usize {
        self.mailbox.len()
    }

    /// Addresses this task may grow into through page faults.
    #[must_use]
    pub fn dpaging_window(&self) -> Range<u64> {
        self.dpaging.clone()
    }

    pub(crate) fn set_dpaging_window(&mut self, window: Range<u64>) {
        self.dpaging = window;
    }
}
