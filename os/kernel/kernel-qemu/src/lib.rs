//! # QEMU debug console
//!
//! Early, allocation-free diagnostic output for the kernel. Text written with
//! [`qemu_trace!`] goes byte by byte to QEMU's debug port (`0x402`), which
//! the host captures with `-debugcon stdio` or `-debugcon file:debug.log`.
//!
//! [`QemuLogger`] plugs the same sink into the `log` facade so the frame
//! allocator, the paging code and the scheduler can use `info!`, `warn!`
//! and friends without knowing where the output ends up.
//!
//! ```rust,no_run
//! use kernel_qemu::QemuLogger;
//! use log::{LevelFilter, info};
//!
//! QemuLogger::new(LevelFilter::Debug).init().expect("logger installed once");
//! info!("frame allocator ready");
//! ```
//!
//! ## Features
//! * `enabled` (default): compile the port writes in. Without it, every
//!   trace is a no-op. Hosted builds never touch the port.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::QemuLogger;

#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    /// QEMU's `-debugcon` I/O port.
    #[cfg(all(feature = "enabled", target_arch = "x86_64", target_os = "none"))]
    const QEMU_DEBUG_PORT: u16 = 0x402;

    #[cfg(all(feature = "enabled", target_arch = "x86_64", target_os = "none"))]
    #[inline]
    fn putc(c: u8) {
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") QEMU_DEBUG_PORT,
                in("al") c,
                options(nomem, nostack, preserves_flags)
            );
        }
    }

    #[cfg(not(all(feature = "enabled", target_arch = "x86_64", target_os = "none")))]
    #[inline]
    const fn putc(_c: u8) {}

    /// `fmt::Write` sink over the debug port.
    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            s.bytes().for_each(putc);
            Ok(())
        }
    }

    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // Best effort; there is nowhere to report a failed debug write.
        let _ = QemuSink.write_fmt(args);
    }
}

/// `format!`-style output to the QEMU debug console.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
