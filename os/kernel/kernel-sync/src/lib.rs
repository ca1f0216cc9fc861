//! # Kernel synchronization primitives
//!
//! The kernel runs on a single CPU, so the only source of concurrency is an
//! interrupt arriving in the middle of a critical section. Shared state is
//! therefore guarded by masking interrupts ([`IrqGuard`]) around a
//! [`SpinLock`]; the spin lock itself only ever contends if an interrupt
//! handler touches state that task code forgot to protect.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;
mod sync_once_cell;

pub use irq::{IrqGuard, without_interrupts};
pub use spin_lock::{IrqSpinLockGuard, SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
