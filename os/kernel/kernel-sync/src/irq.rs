//! # Interrupt masking
//!
//! On bare metal this issues `cli`/`sti` and reads `RFLAGS.IF` via
//! `pushfq; pop`. Hosted builds (unit tests, tooling) emulate the IF flag
//! with an atomic so the same critical-section code runs unchanged.

/// Bit 9 of `RFLAGS`.
const RFLAGS_IF: u64 = 1 << 9;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod hw {
    #[inline]
    pub fn cli() {
        unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
    }

    #[inline]
    pub fn sti() {
        unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
    }

    #[inline]
    pub fn rflags() -> u64 {
        let r: u64;
        unsafe { core::arch::asm!("pushfq; pop {}", out(reg) r, options(nostack, preserves_flags)) }
        r
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
mod hw {
    use super::RFLAGS_IF;
    use core::sync::atomic::{AtomicBool, Ordering};

    static IF: AtomicBool = AtomicBool::new(true);

    #[inline]
    pub fn cli() {
        IF.store(false, Ordering::SeqCst);
    }

    #[inline]
    pub fn sti() {
        IF.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn rflags() -> u64 {
        if IF.load(Ordering::SeqCst) { RFLAGS_IF } else { 0 }
    }
}

/// Disables maskable interrupts (`cli`).
///
/// Only legal at CPL0.
#[inline]
pub fn disable() {
    hw::cli();
}

/// Enables maskable interrupts (`sti`).
#[inline]
pub fn enable() {
    hw::sti();
}

/// Returns the current `RFLAGS` value.
#[inline]
#[must_use]
pub fn rflags() -> u64 {
    hw::rflags()
}

/// Whether maskable interrupts are currently enabled.
#[inline]
#[must_use]
pub fn are_enabled() -> bool {
    rflags() & RFLAGS_IF != 0
}

/// RAII guard that masks interrupts and restores the previous state on drop.
///
/// Nesting is safe: an inner guard sees interrupts already disabled and
/// leaves them disabled when it goes away.
///
/// ```
/// use kernel_sync::IrqGuard;
///
/// {
///     let _irq = IrqGuard::new();
///     assert!(!kernel_sync::irq::are_enabled());
/// }
/// ```
pub struct IrqGuard {
    were_enabled: bool,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let enabled = are_enabled();
        if enabled {
            disable();
        }
        Self {
            were_enabled: enabled,
        }
    }

    /// Whether this guard will re-enable interrupts when dropped.
    #[inline]
    #[must_use]
    pub const fn restores(&self) -> bool {
        self.were_enabled
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.were_enabled {
            enable();
        }
    }
}

/// Runs `f` with interrupts masked.
#[inline]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let _irq = IrqGuard::new();
    f()
}
