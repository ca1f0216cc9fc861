use crate::addresses::ENTRIES_PER_TABLE;
use bitfield_struct::bitfield;
use core::ops::{Index, IndexMut};

/// One 64-bit slot of a paging structure, at any of the four levels.
///
/// | Bits   | Name        | Meaning |
/// |--------|-------------|---------|
/// | 0      | `P`         | Present |
/// | 1      | `RW`        | Writable |
/// | 2      | `US`        | User-mode accessible |
/// | 3      | `PWT`       | Write-through caching |
/// | 4      | `PCD`       | Cache disable |
/// | 5      | `A`         | Accessed |
/// | 6      | `D`         | Dirty (leaf only) |
/// | 7      | `PS`        | Huge page (PDPTE: 1 GiB, PDE: 2 MiB) |
/// | 8      | `G`         | Global (leaf only) |
/// | 9–11   | OS          | Ignored by hardware |
/// | 12–51  | `addr`      | Physical address bits [51:12] |
/// | 52–62  | OS          | Ignored by hardware |
/// | 63     | `NX`        | Execute disable |
///
/// An entry whose `present` bit is clear is never followed.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageMapEntry {
    pub present: bool,
    pub writable: bool,
    pub user: bool,
    pub write_through: bool,
    pub cache_disable: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub huge_page: bool,
    pub global: bool,
    #[bits(3)]
    pub available_low: u8,
    #[bits(40)]
    address: u64,
    #[bits(11)]
    pub available_high: u16,
    pub no_execute: bool,
}

const ADDRESS_MASK: u64 = (1 << 40) - 1;

impl PageMapEntry {
    /// Physical address of the next-level table or of the mapped page.
    #[inline]
    #[must_use]
    pub const fn pointer(&self) -> u64 {
        self.address() << 12
    }

    /// Store a 4 KiB-aligned physical address; the low 12 bits are dropped.
    #[inline]
    pub fn set_pointer(&mut self, phys: u64) {
        self.set_address((phys >> 12) & ADDRESS_MASK);
    }

    #[inline]
    #[must_use]
    pub const fn with_pointer(self, phys: u64) -> Self {
        self.with_address((phys >> 12) & ADDRESS_MASK)
    }
}

/// A 4 KiB paging structure: PML4, PDPT, page directory or page table.
#[derive(Clone)]
#[repr(C, align(4096))]
pub struct PageMap {
    entries: [PageMapEntry; ENTRIES_PER_TABLE],
}

const _: () = assert!(size_of::<PageMap>() == 4096);

impl Default for PageMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PageMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [PageMapEntry::new(); ENTRIES_PER_TABLE],
        }
    }

    pub fn clear(&mut self) {
        self.entries.fill(PageMapEntry::new());
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageMapEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PageMapEntry> {
        self.entries.iter_mut()
    }
}

impl Index<usize> for PageMap {
    type Output = PageMapEntry;

    #[inline]
    fn index(&self, index: usize) -> &PageMapEntry {
        &self.entries[index]
    }
}

impl IndexMut<usize> for PageMap {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut PageMapEntry {
        &mut self.entries[index]
    }
}
