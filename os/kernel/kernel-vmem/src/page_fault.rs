//! # Page-Fault Policy

use crate::address_space::AddressSpace;
use crate::error::PagingError;
use crate::phys_mapper::PhysMapper;
use bitfield_struct::bitfield;
use core::ops::Range;
use kernel_alloc::FrameAlloc;
use log::trace;

/// Page-fault error code layout (x86-64).
///
/// Each bit describes the condition that caused the page fault.
/// Reference: Intel SDM Vol. 3A, §6.15.1 "Page-Fault Exception (#PF)".
#[bitfield(u64)]
pub struct PageFaultErrorCode {
    /// 0 = non-present page.
    /// 1 = protection violation (page present but access disallowed).
    pub present: bool, // bit 0

    /// 0 = read or execute.
    /// 1 = write access.
    pub write: bool, // bit 1

    /// 0 = supervisor (CPL 0–2).
    /// 1 = user mode (CPL 3).
    pub user: bool, // bit 2

    /// 1 = caused by reserved bit set in a paging structure.
    pub reserved_bit: bool, // bit 3

    /// 1 = instruction fetch (execute access).
    pub instruction_fetch: bool, // bit 4

    /// 1 = protection-key violation (if CR4.PKE=1).
    pub protection_key: bool, // bit 5

    /// 1 = shadow stack access (if CET-SS enabled).
    pub shadow_stack: bool, // bit 6

    #[bits(57)]
    __: u64,
}

impl PageFaultErrorCode {
    #[must_use]
    pub const fn explain(&self) -> &'static str {
        if !self.present() {
            "Non-present page (page not mapped or swapped out)"
        } else if self.instruction_fetch() {
            if self.user() {
                "User-mode instruction fetch on protected page (likely NX or SMEP)"
            } else {
                "Kernel instruction fetch on protected page"
            }
        } else if self.write() {
            "Write access to protected page"
        } else {
            "Read access to protected page"
        }
    }
}

/// Resolve a page fault at `addr` by mapping one fresh page, if allowed.
///
/// Only faults on non-present pages inside `window` (the faulting task's
/// demand-paging range) are resolved.
///
/// # Errors
/// - [`PagingError::ProtectionViolation`] if the page was present.
/// - [`PagingError::AddressOutOfRange`] if `addr` is outside `window`.
/// - whatever [`AddressSpace::setup_page_maps`] reports.
pub fn handle_page_fault<M: PhysMapper, A: FrameAlloc + ?Sized>(
    space: &AddressSpace<'_, M>,
    alloc: &mut A,
    error_code: PageFaultErrorCode,
    addr: u64,
    window: Range<u64>,
) -> Result<(), PagingError> {
    if error_code.present() {
        return Err(PagingError::ProtectionViolation { addr });
    }
    if !window.contains(&addr) {
        return Err(PagingError::AddressOutOfRange { addr });
    }
    trace!("demand paging {addr:#x}: {}", error_code.explain());
    space.setup_page_maps(alloc, addr, 1)
}
