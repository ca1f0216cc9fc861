//! # CPU Selectors

/// Kernel code segment selector (GDT index 1, RPL 0).
pub const KERNEL_CS: u16 = 0x08;

/// Kernel stack segment selector (GDT index 2, RPL 0).
pub const KERNEL_SS: u16 = 0x10;

/// `RFLAGS.IF`: maskable interrupts enabled.
pub const RFLAGS_IF: u64 = 1 << 9;
