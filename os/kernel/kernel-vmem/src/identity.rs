//! # Boot Identity Map
//!
//! Maps `[0, IDENTITY_MAP_END)` onto itself with 2 MiB pages so that the
//! kernel can keep using physical addresses as pointers once it owns CR3.
//! The tables live in one statically sized structure and are never touched
//! again after [`IdentityMap::build`].

use crate::page_entry_bits::{PageMap, PageMapEntry};
use kernel_info::memory::{BYTES_PER_LARGE_PAGE, BYTES_PER_PAGE_DIRECTORY, PAGE_DIRECTORY_COUNT};

/// PML4, one PDPT and [`PAGE_DIRECTORY_COUNT`] page directories.
#[repr(C, align(4096))]
pub struct IdentityMap {
    pml4: PageMap,
    pdpt: PageMap,
    dirs: [PageMap; PAGE_DIRECTORY_COUNT],
}

impl Default for IdentityMap {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityMap {
    /// Empty tables. Usable as a `static` initializer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pml4: PageMap::new(),
            pdpt: PageMap::new(),
            dirs: [const { PageMap::new() }; PAGE_DIRECTORY_COUNT],
        }
    }

    /// Fill in the tables and return the value to load into CR3.
    ///
    /// The tables reference each other by address, so `self` must sit at an
    /// identity-mapped location and must not move afterwards.
    pub fn build(&mut self) -> u64 {
        let kernel_table = PageMapEntry::new().with_present(true).with_writable(true);

        let pdpt = (&raw const self.pdpt) as u64;
        self.pml4[0] = kernel_table.with_pointer(pdpt);

        for (i, dir) in self.dirs.iter_mut().enumerate() {
            let dir_addr = (&raw const *dir) as u64;
            self.pdpt[i] = kernel_table.with_pointer(dir_addr);

            let dir_base = i as u64 * BYTES_PER_PAGE_DIRECTORY;
            for (j, entry) in dir.iter_mut().enumerate() {
                *entry = kernel_table
                    .with_huge_page(true)
                    .with_pointer(dir_base + j as u64 * BYTES_PER_LARGE_PAGE);
            }
        }

        log::info!(
            "identity map: {PAGE_DIRECTORY_COUNT} GiB with 2 MiB pages, root {:#x}",
            self.root()
        );
        self.root()
    }

    /// Physical address of the PML4.
    #[must_use]
    pub fn root(&self) -> u64 {
        (&raw const self.pml4) as u64
    }
}
