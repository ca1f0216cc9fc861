//! # Virtual Memory Support
//!
//! x86-64 4-level paging for the kernel: the boot identity map, demand
//! paging and the page-fault policy.
//!
//! ## x86-64 Virtual Address → Physical Address Walk
//!
//! Each 48-bit virtual address is divided into five fields:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! The CPU uses these fields as **indices** into four levels of page tables,
//! each level containing 512 (2⁹) entries of 8 bytes (64 bits) each.
//!
//! ```text
//!  PML4  →  PDPT  →  PD  →  PT  →  Physical Page
//!   │        │        │        │
//!   │        │        │        └───► PTE   → maps 4 KiB page
//!   │        │        └────────────► PDE   → PS=1 → 2 MiB page
//!   │        └─────────────────────► PDPTE → PS=1 → 1 GiB page
//!   └──────────────────────────────► PML4E
//! ```
//!
//! ## What you get
//! - [`LinearAddress4Level`]: an address viewed as its four table indices.
//! - [`PageMapEntry`] / [`PageMap`]: one slot and one 4 KiB table.
//! - [`PhysMapper`]: how to reach a table from its physical address.
//! - [`IdentityMap`]: the boot-time 1:1 map of low physical memory.
//! - [`AddressSpace`]: demand paging over a PML4-rooted tree.
//! - [`handle_page_fault`]: decides whether a fault may be resolved.
//!
//! Frames come from any [`kernel_alloc::FrameAlloc`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
mod addresses;
mod error;
pub mod identity;
mod page_entry_bits;
mod page_fault;
mod phys_mapper;

pub use crate::address_space::{AddressSpace, USER_PML4_FIRST};
pub use crate::addresses::{ENTRIES_PER_TABLE, LinearAddress4Level};
pub use crate::error::PagingError;
pub use crate::identity::IdentityMap;
pub use crate::page_entry_bits::{PageMap, PageMapEntry};
pub use crate::page_fault::{PageFaultErrorCode, handle_page_fault};
pub use crate::phys_mapper::{IdentityPhysMapper, PhysMapper};

/// Re-export constants as info module.
pub use kernel_info::memory as info;
