use kernel_alloc::AllocError;

/// Failure of a paging operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PagingError {
    /// No frame was left for a table or a page.
    #[error(transparent)]
    OutOfMemory(#[from] AllocError),
    /// The faulting page is present; the access itself was not allowed.
    #[error("protection violation at {addr:#x}")]
    ProtectionViolation { addr: u64 },
    /// The address lies outside the range that may be paged in on demand,
    /// or the request ran past the last PML4 slot.
    #[error("address {addr:#x} out of demand-paging range")]
    AddressOutOfRange { addr: u64 },
    /// A 1 GiB or 2 MiB page already covers the address.
    #[error("huge page in the way at {addr:#x}")]
    HugePageInTheWay { addr: u64 },
}
