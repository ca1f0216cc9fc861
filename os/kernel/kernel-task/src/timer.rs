//! # Timer Manager
//!
//! Counts timer interrupts and fires software timers. One timer is special:
//! the preemption timer, created by [`TimerManager::new`] and nowhere else,
//! re-arms itself every [`TASK_TIMER_PERIOD`] ticks and makes
//! [`TimerManager::tick`] report that a task switch is due. Every other timer
//! is one-shot and expires into a [`Message::TimerTimeout`] in its owner's
//! mailbox, whatever its value.

use crate::manager::TaskManager;
use crate::message::Message;
use crate::task::TaskId;
use alloc::collections::BinaryHeap;
use core::cmp::Reverse;
use kernel_info::sched::{TASK_TIMER_PERIOD, TASK_TIMER_VALUE};
use log::warn;

/// A one-shot timer expiring at tick `timeout`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Timer {
    timeout: u64,
    value: i32,
    task: TaskId,
    preemption: bool,
}

impl Timer {
    /// `value` is handed back in the timeout message.
    #[must_use]
    pub const fn new(timeout: u64, value: i32, task: TaskId) -> Self {
        Self {
            timeout,
            value,
            task,
            preemption: false,
        }
    }

    const fn preemption(timeout: u64, task: TaskId) -> Self {
        Self {
            timeout,
            value: TASK_TIMER_VALUE,
            task,
            preemption: true,
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> u64 {
        self.timeout
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.value
    }

    #[must_use]
    pub const fn task(&self) -> TaskId {
        self.task
    }

    #[must_use]
    pub const fn is_preemption(&self) -> bool {
        self.preemption
    }
}

/// Tick counter plus a min-heap of pending timers.
pub struct TimerManager {
    tick: u64,
    timers: BinaryHeap<Reverse<Timer>>,
}

impl TimerManager {
    /// Starts at tick 0 with the preemption timer armed for `owner`.
    #[must_use]
    pub fn new(owner: TaskId) -> Self {
        let mut timers = BinaryHeap::new();
        timers.push(Reverse(Timer::preemption(TASK_TIMER_PERIOD, owner)));
        Self { tick: 0, timers }
    }

    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn add_timer(&mut self, timer: Timer) {
        self.timers.push(Reverse(timer));
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Advance by one tick and fire every timer that is due.
    ///
    /// Returns whether the preemption timer expired.
    pub fn tick(&mut self, tasks: &mut TaskManager) -> bool {
        self.tick += 1;

        let mut task_timer_timeout = false;
        while let Some(&Reverse(timer)) = self.timers.peek() {
            if timer.timeout > self.tick {
                break;
            }
            self.timers.pop();

            if timer.is_preemption() {
                task_timer_timeout = true;
                self.timers.push(Reverse(Timer::preemption(
                    self.tick + TASK_TIMER_PERIOD,
                    timer.task,
                )));
                continue;
            }

            let message = Message::TimerTimeout {
                timeout: timer.timeout,
                value: timer.value,
            };
            if let Err(e) = tasks.send_message(timer.task, message) {
                warn!("dropping timeout {}: {e}", timer.value);
            }
        }
        task_timer_timeout
    }
}
