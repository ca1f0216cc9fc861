//! # Multilevel Run Queues
//!
//! One FIFO queue per level. The executing task is always the head of the
//! queue at `current_level`, which is the highest level with a runnable task
//! once any pending re-scan has been done.
//!
//! ```text
//! level 7  [main]
//! level 2  [A] [B]
//! level 0  [idle]
//! ```
//!
//! Nothing here touches the CPU. Operations that must transfer control
//! return a [`ContextSwitch`] and the caller performs it after releasing its
//! lock.

use crate::context::{TaskContext, TaskEntry};
use crate::error::TaskError;
use crate::message::Message;
use crate::task::{Task, TaskId};
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::ops::Range;
use kernel_info::sched::{IDLE_LEVEL, MAX_LEVEL};
use log::{debug, trace, warn};

/// A transfer of control from `current` to `next`.
///
/// The pointers stay valid for as long as the task manager lives; tasks are
/// never destroyed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ContextSwitch {
    pub current: TaskId,
    pub next: TaskId,
    current_context: *mut TaskContext,
    next_context: *const TaskContext,
}

impl ContextSwitch {
    /// Where the outgoing task's registers are to be saved.
    #[must_use]
    pub const fn current_context(&self) -> *mut TaskContext {
        self.current_context
    }

    /// The registers to load.
    #[must_use]
    pub const fn next_context(&self) -> *const TaskContext {
        self.next_context
    }
}

/// Owns every task and decides which one runs.
pub struct TaskManager {
    tasks: Vec<Task>,
    running: [VecDeque<TaskId>; MAX_LEVEL + 1],
    current_level: usize,
    level_changed: bool,
    idle: TaskId,
}

// Safety: the context pointers handed out in `ContextSwitch` are only
// dereferenced by the single CPU with interrupts masked.
unsafe impl Send for TaskManager {}

impl TaskManager {
    /// Adopt the code calling this as the first task (at [`MAX_LEVEL`]) and
    /// create the idle task at level 0, both running.
    ///
    /// `cr3` is the page-table root the idle task runs with.
    #[must_use]
    pub fn new(idle_entry: TaskEntry, cr3: u64) -> Self {
        let mut manager = Self {
            tasks: Vec::new(),
            running: core::array::from_fn(|_| VecDeque::new()),
            current_level: MAX_LEVEL,
            level_changed: false,
            idle: TaskId::new(0),
        };

        let main = manager.new_task();
        if let Some(task) = manager.tasks.last_mut() {
            task.adopt();
        }
        manager.enqueue_new(main, MAX_LEVEL);

        let idle = manager.new_task();
        if let Some(task) = manager.tasks.last_mut() {
            task.init_context(idle_entry, 0, cr3);
        }
        manager.enqueue_new(idle, IDLE_LEVEL);
        manager.idle = idle;

        debug!("task manager ready: main {main}, idle {idle}");
        manager
    }

    fn enqueue_new(&mut self, id: TaskId, level: usize) {
        if let Ok(task) = self.task_mut(id) {
            task.set_level(level);
            task.set_running(true);
            self.running[level].push_back(id);
        }
    }

    /// A new sleeping task with an empty mailbox. It has no stack until
    /// [`init_context`](Self::init_context).
    pub fn new_task(&mut self) -> TaskId {
        let id = TaskId::new(self.tasks.len() as u64 + 1);
        self.tasks.push(Task::new(id));
        trace!("created task {id}");
        id
    }

    /// Prime `id` to start at `entry(id, arg)` on its own stack.
    ///
    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn init_context(
        &mut self,
        id: TaskId,
        entry: TaskEntry,
        arg: i64,
        cr3: u64,
    ) -> Result<(), TaskError> {
        self.task_mut(id)?.init_context(entry, arg, cr3);
        Ok(())
    }

    pub fn task(&self, id: TaskId) -> Result<&Task, TaskError> {
        id.index()
            .and_then(|i| self.tasks.get(i))
            .ok_or(TaskError::NoSuchTask(id))
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, TaskError> {
        id.index()
            .and_then(|i| self.tasks.get_mut(i))
            .ok_or(TaskError::NoSuchTask(id))
    }

    /// The executing task.
    #[must_use]
    pub fn current_task(&self) -> TaskId {
        self.running[self.current_level]
            .front()
            .copied()
            .unwrap_or(self.idle)
    }

    #[must_use]
    pub const fn idle_task(&self) -> TaskId {
        self.idle
    }

    #[must_use]
    pub const fn current_level(&self) -> usize {
        self.current_level
    }

    /// Whether the next switch re-scans for the highest runnable level.
    #[must_use]
    pub const fn level_change_pending(&self) -> bool {
        self.level_changed
    }

    /// Stop running `id`.
    ///
    /// Returns the switch to perform if `id` is the executing task. The idle
    /// task cannot sleep.
    ///
    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn sleep(&mut self, id: TaskId) -> Result<Option<ContextSwitch>, TaskError> {
        let idle = self.idle;
        let task = self.task_mut(id)?;
        if !task.running() {
            return Ok(None);
        }
        if id == idle {
            warn!("refusing to put the idle task to sleep");
            return Ok(None);
        }
        task.set_running(false);
        let level = task.level();

        if self.running[self.current_level].front() == Some(&id) {
            let current = self.rotate_current_run_queue(true);
            return Ok(self.plan_switch(current));
        }

        self.running[level].retain(|&t| t != id);
        Ok(None)
    }

    /// Make `id` runnable, or move it to `level` if it already is.
    ///
    /// Without a level a sleeping task resumes at the level it had before.
    ///
    /// # Errors
    /// - [`TaskError::NoSuchTask`] for an unknown id.
    /// - [`TaskError::InvalidLevel`] for a level above [`MAX_LEVEL`].
    /// - [`TaskError::NotInitialized`] if `id` never got a context.
    pub fn wakeup(&mut self, id: TaskId, level: Option<usize>) -> Result<(), TaskError> {
        if let Some(level) = level.filter(|&l| l > MAX_LEVEL) {
            return Err(TaskError::InvalidLevel(level));
        }

        let task = self.task_mut(id)?;
        if task.running() {
            if let Some(level) = level {
                self.change_level_running(id, level);
            }
            return Ok(());
        }
        if !task.has_context() {
            return Err(TaskError::NotInitialized(id));
        }

        let level = level.unwrap_or(task.level());
        task.set_level(level);
        task.set_running(true);
        self.running[level].push_back(id);
        if level > self.current_level {
            self.level_changed = true;
        }
        trace!("woke {id} at level {level}");
        Ok(())
    }

    fn change_level_running(&mut self, id: TaskId, level: usize) {
        let Ok(task) = self.task_mut(id) else {
            return;
        };
        let old = task.level();
        if level == old {
            return;
        }
        task.set_level(level);

        if self.running[self.current_level].front() != Some(&id) {
            self.running[old].retain(|&t| t != id);
            self.running[level].push_back(id);
            if level > self.current_level {
                self.level_changed = true;
            }
            return;
        }

        // the executing task changes its own level and keeps its turn
        self.running[self.current_level].pop_front();
        self.running[level].push_front(id);
        if level < self.current_level {
            self.level_changed = true;
        }
        self.current_level = level;
        debug!("{id} moved itself from level {old} to {level}");
    }

    /// Deliver `message` to `id` and wake it.
    ///
    /// A task without a context keeps the message but stays asleep until it
    /// is primed and woken explicitly.
    ///
    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn send_message(&mut self, id: TaskId, message: Message) -> Result<(), TaskError> {
        let task = self.task_mut(id)?;
        task.push_message(message);
        if !task.has_context() {
            warn!("{id} has no context yet, message queued without waking it");
            return Ok(());
        }
        self.wakeup(id, None)
    }

    /// Take the oldest message of `id`, if any. Never blocks.
    ///
    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn receive_message(&mut self, id: TaskId) -> Result<Option<Message>, TaskError> {
        Ok(self.task_mut(id)?.pop_message())
    }

    /// Preempt the executing task.
    ///
    /// `saved` is what the interrupt entry captured for it. Returns the
    /// context to restore if another task is due.
    pub fn switch_task(&mut self, saved: &TaskContext) -> Option<ContextSwitch> {
        let executing = self.current_task();
        if let Ok(task) = self.task_mut(executing) {
            task.context_mut().clone_from(saved);
        }
        let current = self.rotate_current_run_queue(false);
        self.plan_switch(current)
    }

    /// Pop the head of the current level, append it again unless it went to
    /// sleep, and re-scan the levels if needed. Returns the former head.
    fn rotate_current_run_queue(&mut self, current_sleep: bool) -> TaskId {
        let queue = &mut self.running[self.current_level];
        let current = queue.pop_front().unwrap_or(self.idle);
        if !current_sleep {
            queue.push_back(current);
        }
        if queue.is_empty() {
            self.level_changed = true;
        }

        if self.level_changed {
            self.level_changed = false;
            if let Some(level) = (0..=MAX_LEVEL).rev().find(|&l| !self.running[l].is_empty()) {
                self.current_level = level;
            }
        }
        current
    }

    fn plan_switch(&mut self, current: TaskId) -> Option<ContextSwitch> {
        let next = self.current_task();
        if next == current {
            return None;
        }
        let current_context = self.task_mut(current).ok()?.context_ptr();
        let next_context = self.task_mut(next).ok()?.context_ptr().cast_const();
        trace!("switch {current} -> {next}");
        Some(ContextSwitch {
            current,
            next,
            current_context,
            next_context,
        })
    }

    /// Raw pointer to the saved context of `id`.
    ///
    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn context_ptr(&mut self, id: TaskId) -> Result<*mut TaskContext, TaskError> {
        Ok(self.task_mut(id)?.context_ptr())
    }

    /// Allow `id` to fault in pages within `window`.
    ///
    /// # Errors
    /// [`TaskError::NoSuchTask`] for an unknown id.
    pub fn set_dpaging_window(&mut self, id: TaskId, window: Range<u64>) -> Result<(), TaskError> {
        self.task_mut(id)?.set_dpaging_window(window);
        Ok(())
    }

    /// Queue contents of `level`, head first.
    pub fn run_queue(&self, level: usize) -> impl Iterator<Item = TaskId> + '_ {
        self.running
            .get(level)
            .into_iter()
            .flat_map(|queue| queue.iter().copied())
    }
}
