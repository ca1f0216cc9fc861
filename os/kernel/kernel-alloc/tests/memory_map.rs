use kernel_alloc::{BitmapFrameAllocator, FrameAlloc, FrameId, MemoryDescriptor, MemoryType};

type Frames = BitmapFrameAllocator<16>;

#[test]
fn only_allow_listed_types_become_free() {
    let map = [
        MemoryDescriptor::new(MemoryType::Conventional, 0, 16),
        MemoryDescriptor::new(MemoryType::LoaderData, 0x10000, 16),
        MemoryDescriptor::new(MemoryType::BootServicesData, 0x20000, 16),
        MemoryDescriptor::new(MemoryType::AcpiReclaim, 0x30000, 16),
        MemoryDescriptor::new(MemoryType::BootServicesCode, 0x40000, 16),
    ];

    let mut frames = Frames::new();
    frames.init_from_memory_map(&map);

    assert_eq!(frames.range(), (FrameId::new(1), FrameId::new(0x50)));
    // frame 0 is outside the window even though it is conventional memory
    assert_eq!(frames.stat().total_frames, 0x4f);
    assert_eq!(frames.stat().free_frames(), 15 + 16 + 16);

    assert!(!frames.is_allocated(FrameId::new(1)));
    assert!(frames.is_allocated(FrameId::new(0x10)));
    assert!(!frames.is_allocated(FrameId::new(0x20)));
    assert!(frames.is_allocated(FrameId::new(0x3f)));
    assert!(!frames.is_allocated(FrameId::new(0x4f)));
}

#[test]
fn window_ends_at_highest_available_descriptor() {
    let map = [
        MemoryDescriptor::new(MemoryType::Conventional, 0x1000, 4),
        MemoryDescriptor::new(MemoryType::MemoryMappedIo, 0x80_0000, 16),
    ];
    let mut frames = Frames::new();
    frames.init_from_memory_map(&map);

    assert_eq!(frames.range().1, FrameId::new(5));
    assert_eq!(frames.allocate(4), Ok(FrameId::new(1)));
    assert!(frames.allocate(1).is_err());
}

#[test]
fn descriptors_beyond_capacity_are_clamped() {
    let map = [MemoryDescriptor::new(
        MemoryType::Conventional,
        0x1000,
        1 << 20,
    )];
    let mut frames = Frames::new();
    frames.init_from_memory_map(&map);

    assert_eq!(frames.range(), (FrameId::new(1), FrameId::new(Frames::CAPACITY)));
    assert_eq!(frames.stat().free_frames(), Frames::CAPACITY - 1);
}

#[test]
fn reserved_overlap_wins() {
    let map = [
        MemoryDescriptor::new(MemoryType::Conventional, 0, 32),
        MemoryDescriptor::new(MemoryType::Reserved, 0x8000, 2),
    ];
    let mut frames = Frames::new();
    frames.init_from_memory_map(&map);

    assert!(frames.is_allocated(FrameId::new(8)));
    assert!(frames.is_allocated(FrameId::new(9)));
    assert!(!frames.is_allocated(FrameId::new(10)));
}
