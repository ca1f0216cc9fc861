use crate::page_entry_bits::PageMap;

/// Turns the physical address of a paging structure into a usable reference.
///
/// The kernel identity-maps low physical memory, so there this is a cast;
/// tests back "physical memory" with a vector of frames.
pub trait PhysMapper {
    /// # Safety
    /// - `phys` must be the 4 KiB-aligned address of a frame that holds (or
    ///   is about to hold) a [`PageMap`] and is writable in the current
    ///   address space.
    /// - The caller must not create two live references to the same frame.
    unsafe fn page_map<'a>(&self, phys: u64) -> &'a mut PageMap;
}

/// Physical address == virtual address.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityPhysMapper;

impl PhysMapper for IdentityPhysMapper {
    #[inline]
    unsafe fn page_map<'a>(&self, phys: u64) -> &'a mut PageMap {
        debug_assert!(phys.is_multiple_of(4096));
        unsafe { &mut *(phys as *mut PageMap) }
    }
}
