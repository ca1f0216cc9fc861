//! # Address Space (x86-64, PML4-rooted)
//!
//! A handle to one tree of paging structures plus the operations that grow
//! and shrink it on demand:
//!
//! - [`AddressSpace::setup_page_maps`] walks the tree from the root and
//!   creates whatever tables and pages are missing for a run of 4 KiB pages.
//! - [`AddressSpace::clean_page_maps`] tears down everything below one PML4
//!   slot and returns the frames.
//! - [`AddressSpace::query`] translates an address (4 KiB, 2 MiB and 1 GiB
//!   leaves).
//! - [`AddressSpace::new_user_space`] / [`AddressSpace::free_user_space`]
//!   create and destroy a task's private tree sharing the kernel's lower half.
//!
//! Tables created here are marked writable and user-accessible at every
//! level; the leaf decides the effective permission. New frames are zeroed.
//!
//! ## Safety
//!
//! Changing a live mapping needs TLB maintenance. Demand paging only ever
//! adds entries for addresses that faulted (and so have no TLB entry), so it
//! needs none; tearing down mappings of the active tree requires a CR3 reload.

use crate::addresses::{ENTRIES_PER_TABLE, LinearAddress4Level};
use crate::error::PagingError;
use crate::page_entry_bits::PageMapEntry;
use crate::phys_mapper::PhysMapper;
use kernel_alloc::{FrameAlloc, FrameId};
use log::trace;

/// First PML4 slot of the upper (per-task) half.
pub const USER_PML4_FIRST: usize = ENTRIES_PER_TABLE / 2;

/// Handle to a single, concrete address space.
pub struct AddressSpace<'m, M: PhysMapper> {
    root: u64,
    mapper: &'m M,
}

impl<'m, M: PhysMapper> AddressSpace<'m, M> {
    /// Wrap an existing PML4 at physical address `root`.
    #[inline]
    pub const fn from_root(mapper: &'m M, root: u64) -> Self {
        Self { root, mapper }
    }

    /// Physical address of the PML4 (the CR3 value).
    #[inline]
    #[must_use]
    pub const fn root(&self) -> u64 {
        self.root
    }

    /// Make sure `num_pages` 4 KiB pages starting at the page containing
    /// `addr` are backed by zeroed frames.
    ///
    /// Present pages are left as they are, so calling this twice for the same
    /// range allocates nothing the second time.
    ///
    /// # Errors
    /// - [`PagingError::OutOfMemory`] if a frame could not be obtained. Tables
    ///   created up to that point stay in place.
    /// - [`PagingError::AddressOutOfRange`] if the run extends past the last
    ///   PML4 slot.
    /// - [`PagingError::HugePageInTheWay`] if a huge page covers part of the run.
    pub fn setup_page_maps<A: FrameAlloc + ?Sized>(
        &self,
        alloc: &mut A,
        addr: u64,
        num_pages: usize,
    ) -> Result<(), PagingError> {
        let start = LinearAddress4Level::from(addr);
        let left = self.setup_page_map(alloc, self.root, 4, start, num_pages)?;
        if left > 0 {
            return Err(PagingError::AddressOutOfRange { addr });
        }
        Ok(())
    }

    /// Returns the number of pages still to be mapped once the end of `table`
    /// was reached.
    fn setup_page_map<A: FrameAlloc + ?Sized>(
        &self,
        alloc: &mut A,
        table: u64,
        level: usize,
        mut addr: LinearAddress4Level,
        mut num_pages: usize,
    ) -> Result<usize, PagingError> {
        let map = unsafe { self.mapper.page_map(table) };
        while num_pages > 0 {
            let index = addr.part(level);
            let entry = &mut map[index];
            if level > 1 && entry.present() && entry.huge_page() {
                return Err(PagingError::HugePageInTheWay {
                    addr: addr.canonical().into_bits(),
                });
            }

            let child = self.child_or_new(alloc, entry)?;
            entry.set_writable(true);
            entry.set_user(true);

            if level == 1 {
                num_pages -= 1;
            } else {
                num_pages = self.setup_page_map(alloc, child, level - 1, addr, num_pages)?;
            }

            if index == ENTRIES_PER_TABLE - 1 {
                break;
            }
            addr.set_part(level, index + 1);
            for lower in 1..level {
                addr.set_part(lower, 0);
            }
        }
        Ok(num_pages)
    }

    fn child_or_new<A: FrameAlloc + ?Sized>(
        &self,
        alloc: &mut A,
        entry: &mut PageMapEntry,
    ) -> Result<u64, PagingError> {
        if entry.present() {
            return Ok(entry.pointer());
        }
        let frame = alloc.allocate(1)?.addr();
        unsafe { self.mapper.page_map(frame) }.clear();
        entry.set_pointer(frame);
        entry.set_present(true);
        trace!("new paging frame {frame:#x}");
        Ok(frame)
    }

    /// Free every table and page below the PML4 slot covering `addr`, then
    /// the PDPT itself, and clear the slot. An absent slot is a no-op.
    pub fn clean_page_maps<A: FrameAlloc + ?Sized>(&self, alloc: &mut A, addr: u64) {
        let index = LinearAddress4Level::from(addr).part(4);
        let pml4 = unsafe { self.mapper.page_map(self.root) };
        let entry = &mut pml4[index];
        if !entry.present() {
            return;
        }
        let pdpt = entry.pointer();
        *entry = PageMapEntry::new();

        self.clean_page_map(alloc, pdpt, 3);
        alloc.free(FrameId::containing(pdpt), 1);
    }

    fn clean_page_map<A: FrameAlloc + ?Sized>(&self, alloc: &mut A, table: u64, level: usize) {
        let map = unsafe { self.mapper.page_map(table) };
        for entry in map.iter_mut() {
            if !entry.present() {
                continue;
            }
            // huge pages are never created here; unhook them but keep the memory
            if !entry.huge_page() {
                if level > 1 {
                    self.clean_page_map(alloc, entry.pointer(), level - 1);
                }
                alloc.free(FrameId::containing(entry.pointer()), 1);
            }
            *entry = PageMapEntry::new();
        }
    }

    /// Translate `addr` to a physical address, or `None` if unmapped.
    #[must_use]
    pub fn query(&self, addr: u64) -> Option<u64> {
        let la = LinearAddress4Level::from(addr);
        let mut table = self.root;
        for level in (1..=4).rev() {
            let map = unsafe { self.mapper.page_map(table) };
            let entry = map[la.part(level)];
            if !entry.present() {
                return None;
            }
            let leaf = level == 1 || (entry.huge_page() && level <= 3);
            if leaf {
                let page_bytes = 1u64 << (12 + 9 * (level - 1));
                return Some(entry.pointer() + (addr & (page_bytes - 1)));
            }
            table = entry.pointer();
        }
        None
    }

    /// A fresh tree whose lower half (PML4 slots `0..256`) aliases this one's.
    ///
    /// # Errors
    /// [`PagingError::OutOfMemory`] if no frame is left for the new PML4.
    pub fn new_user_space<A: FrameAlloc + ?Sized>(
        &self,
        alloc: &mut A,
    ) -> Result<Self, PagingError> {
        let root = alloc.allocate(1)?.addr();
        let template = unsafe { self.mapper.page_map(self.root) };
        let pml4 = unsafe { self.mapper.page_map(root) };
        pml4.clear();
        for index in 0..USER_PML4_FIRST {
            pml4[index] = template[index];
        }
        trace!("new address space {root:#x}");
        Ok(Self::from_root(self.mapper, root))
    }

    /// Tear down the upper half and release the PML4.
    ///
    /// The shared lower half is left alone.
    pub fn free_user_space<A: FrameAlloc + ?Sized>(self, alloc: &mut A) {
        for index in USER_PML4_FIRST..ENTRIES_PER_TABLE {
            let addr = LinearAddress4Level::from_parts(index, 0, 0, 0, 0).into_bits();
            self.clean_page_maps(alloc, addr);
        }
        alloc.free(FrameId::containing(self.root), 1);
    }
}
