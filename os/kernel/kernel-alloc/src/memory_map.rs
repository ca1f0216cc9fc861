//! # Boot Memory Map
//!
//! The firmware hands the kernel a list of descriptors, each naming a
//! physically contiguous run of 4 KiB UEFI pages and what it is used for.
//! Only boot-services memory and conventional memory may be reused by the
//! kernel; everything else stays reserved.

use crate::bitmap::BitmapFrameAllocator;
use crate::frame::{FrameAlloc, FrameId};
use kernel_info::memory::UEFI_PAGE_SIZE;
use log::{debug, info};

/// UEFI memory types, by their firmware encoding.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryType {
    Reserved,
    LoaderCode,
    LoaderData,
    BootServicesCode,
    BootServicesData,
    RuntimeServicesCode,
    RuntimeServicesData,
    Conventional,
    Unusable,
    AcpiReclaim,
    AcpiNvs,
    MemoryMappedIo,
    MemoryMappedIoPortSpace,
    PalCode,
    Persistent,
    /// A type code this kernel does not know.
    Other(u32),
}

impl MemoryType {
    /// Whether frames of this type may be handed to the frame allocator.
    #[inline]
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(
            self,
            Self::BootServicesCode | Self::BootServicesData | Self::Conventional
        )
    }
}

impl From<u32> for MemoryType {
    fn from(raw: u32) -> Self {
        match raw {
            0 => Self::Reserved,
            1 => Self::LoaderCode,
            2 => Self::LoaderData,
            3 => Self::BootServicesCode,
            4 => Self::BootServicesData,
            5 => Self::RuntimeServicesCode,
            6 => Self::RuntimeServicesData,
            7 => Self::Conventional,
            8 => Self::Unusable,
            9 => Self::AcpiReclaim,
            10 => Self::AcpiNvs,
            11 => Self::MemoryMappedIo,
            12 => Self::MemoryMappedIoPortSpace,
            13 => Self::PalCode,
            14 => Self::Persistent,
            other => Self::Other(other),
        }
    }
}

/// One entry of the boot memory map.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryDescriptor {
    pub ty: MemoryType,
    pub physical_start: u64,
    /// Length in UEFI pages (4 KiB each).
    pub number_of_pages: u64,
}

impl MemoryDescriptor {
    #[must_use]
    pub const fn new(ty: MemoryType, physical_start: u64, number_of_pages: u64) -> Self {
        Self {
            ty,
            physical_start,
            number_of_pages,
        }
    }

    /// Physical end address (exclusive).
    #[inline]
    #[must_use]
    pub const fn physical_end(&self) -> u64 {
        self.physical_start
            .saturating_add(self.number_of_pages.saturating_mul(UEFI_PAGE_SIZE))
    }

    /// Frames fully covered by this descriptor.
    fn frames(&self) -> (FrameId, usize) {
        let first = FrameId::at_or_after(self.physical_start);
        let last = FrameId::containing(self.physical_end());
        (first, last.id().saturating_sub(first.id()))
    }
}

impl<const LINES: usize> BitmapFrameAllocator<LINES> {
    /// Seed the allocator from the firmware memory map.
    ///
    /// Frames of available descriptors are cleared, then every other
    /// descriptor is marked allocated again so that overlapping reports err on
    /// the side of "reserved". The window becomes `[1, available_end)`; frame 0
    /// is never handed out.
    pub fn init_from_memory_map(&mut self, descriptors: &[MemoryDescriptor]) {
        let mut available_end = 0;
        let mut available_frames = 0;

        for desc in descriptors.iter().filter(|d| d.ty.is_available()) {
            let (first, count) = desc.frames();
            debug!(
                "usable {:?} [{:#x}, {:#x})",
                desc.ty,
                desc.physical_start,
                desc.physical_end()
            );
            self.free(first, count);
            available_frames += count;
            available_end = available_end.max(first.offset(count).id());
        }

        for desc in descriptors.iter().filter(|d| !d.ty.is_available()) {
            let (first, count) = desc.frames();
            self.mark_allocated(first, count);
        }

        self.set_memory_range(FrameId::new(1), FrameId::new(available_end));
        let stat = self.stat();
        info!(
            "memory map: {available_frames} usable frames, {} free in window [1, {:#x})",
            stat.free_frames(),
            self.range().1.addr()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_types_decode() {
        assert_eq!(MemoryType::from(7), MemoryType::Conventional);
        assert_eq!(MemoryType::from(3), MemoryType::BootServicesCode);
        assert_eq!(MemoryType::from(99), MemoryType::Other(99));
        assert!(!MemoryType::from(99).is_available());
        assert!(!MemoryType::LoaderData.is_available());
    }

    #[test]
    fn partial_pages_are_not_counted() {
        let d = MemoryDescriptor::new(MemoryType::Conventional, 0x1800, 2);
        // [0x1800, 0x3800) only fully covers frame 2
        assert_eq!(d.frames(), (FrameId::new(2), 1));
    }
}
