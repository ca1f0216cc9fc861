//! # Kernel Core
//!
//! Glue between the hardware-independent subsystems and the CPU:
//!
//! ```text
//!  LAPIC timer ──► on_timer_interrupt ──► TimerManager::tick ──► TaskManager::switch_task
//!                                                                        │
//!  #PF ─────────► on_page_fault ──► handle_page_fault (current task's window)
//!                                                                        ▼
//!  task code ───► sleep / receive_or_sleep ──────────────────► Cpu::switch_context
//! ```
//!
//! [`KernelCore`] owns the scheduler and timer state behind spin locks and
//! borrows the frame allocator. Every privileged instruction goes through
//! the [`Cpu`] trait, so the whole core runs in host tests against a mock;
//! the real implementation lives in `arch` and is only built for the
//! bare-metal x86-64 target.
//!
//! [`boot::init_memory`] performs the memory part of early boot: seed the
//! frame allocator from the firmware map, switch to the identity map and
//! reserve the heap.

#![cfg_attr(not(any(test, doctest)), no_std)]

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod arch;
pub mod boot;
mod cpu;
mod error;
mod kernel;

pub use cpu::Cpu;
pub use error::KernelError;
pub use kernel::KernelCore;
