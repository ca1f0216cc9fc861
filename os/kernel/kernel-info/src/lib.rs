//! # Kernel Configuration
//!
//! Compile-time constants shared by the frame allocator, the paging code and
//! the scheduler. Every subsystem reads its sizes and limits from here so the
//! numbers cannot drift apart.
//!
//! ## Modules
//!
//! ### Memory Layout ([`memory`])
//! * **Frames**: physical frame size and the supported physical ceiling
//! * **Identity Map**: how much of the physical space is mapped 1:1 at boot
//! * **Heap**: how many frames back the kernel heap
//! * **Demand Paging**: where per-task, lazily mapped memory begins
//!
//! ### Scheduling ([`sched`])
//! * **Levels**: number of priority levels and the idle level
//! * **Stacks**: size of a task's private stack
//! * **Timer**: tick frequency and the preemption period
//!
//! ### CPU ([`cpu`])
//! * **Selectors**: kernel code and stack segment selectors used when
//!   priming a task's first context
//!
//! ```text
//! Physical frames (4 KiB each):
//! 0            1                                   available_end    FRAME_COUNT
//! ┌────────────┬───────────────────────────────────┬────────────────┐
//! │ never used │   managed by the frame allocator  │ reserved / n.a │
//! └────────────┴───────────────────────────────────┴────────────────┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod cpu;
pub mod memory;
pub mod sched;
