//! # Tasks and Scheduling
//!
//! A preemptive, multilevel round-robin scheduler for a single CPU.
//!
//! * [`TaskManager`] owns every [`Task`] in an arena indexed by [`TaskId`]
//!   and keeps one FIFO run queue per priority level.
//! * [`TaskContext`] is the register image the context-switch code saves
//!   and restores; its layout is fixed.
//! * Each task has a mailbox of [`Message`]s. Sending wakes the receiver.
//! * [`TimerManager`] turns timer interrupts into preemption decisions and
//!   [`Message::TimerTimeout`] deliveries.
//!
//! The scheduler never switches by itself. [`TaskManager::sleep`] and
//! [`TaskManager::switch_task`] return a [`ContextSwitch`] that the
//! architecture layer carries out once scheduler state is unlocked.
//!
//! ```
//! use kernel_task::{Message, TaskManager};
//!
//! extern "C" fn idle(_: u64, _: i64) {}
//! extern "C" fn worker(_: u64, _: i64) {}
//!
//! let mut tasks = TaskManager::new(idle, 0x1000);
//! let w = tasks.new_task();
//! tasks.init_context(w, worker, 42, 0x1000).unwrap();
//! tasks.send_message(w, Message::InterruptXhci).unwrap();
//!
//! assert!(tasks.task(w).unwrap().running());
//! assert_eq!(tasks.receive_message(w).unwrap(), Some(Message::InterruptXhci));
//! assert_eq!(tasks.receive_message(w).unwrap(), None);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod context;
mod error;
mod manager;
mod message;
mod task;
mod timer;

pub use context::{FxSaveArea, TaskContext, TaskEntry};
pub use error::TaskError;
pub use manager::{ContextSwitch, TaskManager};
pub use message::{LayerOperation, Message};
pub use task::{Task, TaskId};
pub use timer::{Timer, TimerManager};
