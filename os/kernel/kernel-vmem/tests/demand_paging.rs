mod common;

use common::{TestPhys, allocated, frames, new_root};
use kernel_alloc::{AllocError, BitmapFrameAllocator, FrameAlloc, FrameId};
use kernel_vmem::{AddressSpace, LinearAddress4Level, PagingError};

const UPPER: u64 = 0xffff_8000_0000_0000;

#[test]
fn maps_one_page_with_fresh_tables() {
    let phys = TestPhys::new();
    let mut frames = frames();
    let root = new_root(&phys, &mut frames);
    phys.scribble();
    unsafe { kernel_vmem::PhysMapper::page_map(&phys, root) }.clear();
    let space = AddressSpace::from_root(&phys, root);

    let addr = UPPER + 0x5123;
    space.setup_page_maps(&mut frames, addr, 1).unwrap();

    // pdpt, pd, pt, page
    assert_eq!(allocated(&frames), 1 + 4);
    let pa = space.query(addr).unwrap();
    assert_eq!(pa & 0xfff, 0x123);
    assert!(phys.is_zeroed(pa & !0xfff));

    let pml4e = phys.entry(root, 256);
    assert!(pml4e.present() && pml4e.writable() && pml4e.user());
    assert_eq!(space.query(addr + 0x1000), None);
}

#[test]
fn setup_is_idempotent() {
    let phys = TestPhys::new();
    let mut frames = frames();
    let root = new_root(&phys, &mut frames);
    let space = AddressSpace::from_root(&phys, root);

    space.setup_page_maps(&mut frames, UPPER, 3).unwrap();
    let before = allocated(&frames);
    let pa = space.query(UPPER + 0x2000);

    space.setup_page_maps(&mut frames, UPPER, 3).unwrap();
    space.setup_page_maps(&mut frames, UPPER + 0x1000, 1).unwrap();
    assert_eq!(allocated(&frames), before);
    assert_eq!(space.query(UPPER + 0x2000), pa);
}

#[test]
fn run_crosses_page_table_boundary() {
    let phys = TestPhys::new();
    let mut frames = frames();
    let root = new_root(&phys, &mut frames);
    let space = AddressSpace::from_root(&phys, root);

    let start = LinearAddress4Level::from_parts(256, 0, 0, 510, 0).into_bits();
    space.setup_page_maps(&mut frames, start, 4).unwrap();

    // pdpt, pd, two page tables, four pages
    assert_eq!(allocated(&frames), 1 + 1 + 1 + 2 + 4);
    for i in 0..4 {
        assert!(space.query(start + i * 0x1000).is_some(), "page {i}");
    }
    assert!(space.query(start + 4 * 0x1000).is_none());
}

#[test]
fn run_crosses_directory_and_pdpt_boundaries() {
    let phys = TestPhys::new();
    let mut frames = frames();
    let root = new_root(&phys, &mut frames);
    let space = AddressSpace::from_root(&phys, root);

    let start = LinearAddress4Level::from_parts(256, 511, 511, 511, 0).into_bits();
    space.setup_page_maps(&mut frames, start, 2).unwrap();

    let next = LinearAddress4Level::from_parts(257, 0, 0, 0, 0).into_bits();
    assert_eq!(next, start + 0x1000);
    assert!(space.query(start).is_some());
    assert!(space.query(next).is_some());
    // two full chains of pdpt, pd, pt, page
    assert_eq!(allocated(&frames), 1 + 2 * 4);
}

#[test]
fn pages_past_last_pml4_slot_are_refused() {
    let phys = TestPhys::new();
    let mut frames = frames();
    let root = new_root(&phys, &mut frames);
    let space = AddressSpace::from_root(&phys, root);

    let last = LinearAddress4Level::from_parts(511, 511, 511, 511, 0).into_bits();
    assert_eq!(last, 0xffff_ffff_ffff_f000);
    assert_eq!(
        space.setup_page_maps(&mut frames, last, 2),
        Err(PagingError::AddressOutOfRange { addr: last })
    );
    assert!(space.query(last).is_some());
}

#[test]
fn clean_returns_every_frame() {
    let phys = TestPhys::new();
    let mut frames = frames();
    let root = new_root(&phys, &mut frames);
    let space = AddressSpace::from_root(&phys, root);

    space.setup_page_maps(&mut frames, UPPER, 5).unwrap();
    space
        .setup_page_maps(&mut frames, UPPER + 0x4000_0000, 2)
        .unwrap();
    assert!(allocated(&frames) > 1);

    space.clean_page_maps(&mut frames, UPPER + 0x1234);
    assert_eq!(allocated(&frames), 1);
    assert!(!phys.entry(root, 256).present());
    assert_eq!(space.query(UPPER), None);

    // nothing left to clean
    space.clean_page_maps(&mut frames, UPPER);
    assert_eq!(allocated(&frames), 1);
}

#[test]
fn out_of_memory_is_reported() {
    let phys = TestPhys::new();
    let mut frames = BitmapFrameAllocator::<{ common::FRAMES / 64 }>::new();
    frames.free(FrameId::new(1), 3);
    frames.set_memory_range(FrameId::new(1), FrameId::new(4));
    let root = frames.allocate(1).unwrap().addr();
    unsafe { kernel_vmem::PhysMapper::page_map(&phys, root) }.clear();
    let space = AddressSpace::from_root(&phys, root);

    // needs four frames, two are left
    assert_eq!(
        space.setup_page_maps(&mut frames, UPPER, 1),
        Err(PagingError::OutOfMemory(AllocError::OutOfMemory {
            requested: 1
        }))
    );

    // the partial chain is still reclaimable
    space.clean_page_maps(&mut frames, UPPER);
    assert_eq!(frames.stat().allocated_frames, 1);
}

#[test]
fn user_space_shares_lower_half() {
    let phys = TestPhys::new();
    let mut frames = frames();
    let root = new_root(&phys, &mut frames);
    let kernel = AddressSpace::from_root(&phys, root);
    kernel.setup_page_maps(&mut frames, 0x20_0000, 1).unwrap();
    let kernel_frames = allocated(&frames);
    let shared = kernel.query(0x20_0000);

    let user = kernel.new_user_space(&mut frames).unwrap();
    assert_ne!(user.root(), kernel.root());
    assert_eq!(user.query(0x20_0000), shared);

    user.setup_page_maps(&mut frames, UPPER, 4).unwrap();
    assert_eq!(kernel.query(UPPER), None);

    user.free_user_space(&mut frames);
    assert_eq!(allocated(&frames), kernel_frames);
    assert_eq!(kernel.query(0x20_0000), shared);
}
