use bitfield_struct::bitfield;

/// Number of entries in every paging structure.
pub const ENTRIES_PER_TABLE: usize = 512;

/// A 48-bit linear address split into its 4-level paging indices.
///
/// ```text
/// | 63‒48 | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
/// |  sign |  PML4 |  PDPT |   PD  |   PT  | Offset |
/// ```
///
/// Levels are numbered from the leaf up: level 1 is the page-table index,
/// level 4 the PML4 index.
///
/// ```
/// # use kernel_vmem::LinearAddress4Level;
/// let a = LinearAddress4Level::from(0xffff_8000_0020_1abc);
/// assert_eq!(a.part(4), 256);
/// assert_eq!(a.part(2), 1);
/// assert_eq!(a.part(1), 1);
/// assert_eq!(a.offset(), 0xabc);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct LinearAddress4Level {
    #[bits(12)]
    pub offset: u16,
    #[bits(9)]
    pub page: u16,
    #[bits(9)]
    pub dir: u16,
    #[bits(9)]
    pub pdp: u16,
    #[bits(9)]
    pub pml4: u16,
    #[bits(16)]
    pub sign: u16,
}

impl LinearAddress4Level {
    /// Compose an address from its indices, sign-extending bit 47.
    #[must_use]
    pub const fn from_parts(pml4: usize, pdp: usize, dir: usize, page: usize, offset: u16) -> Self {
        let raw = ((pml4 as u64 & 0x1ff) << 39)
            | ((pdp as u64 & 0x1ff) << 30)
            | ((dir as u64 & 0x1ff) << 21)
            | ((page as u64 & 0x1ff) << 12)
            | (offset as u64 & 0xfff);
        Self::from_bits(raw).canonical()
    }

    /// The table index for `level` (1..=4). Other levels yield 0.
    #[must_use]
    pub const fn part(self, level: usize) -> usize {
        match level {
            1 => self.page() as usize,
            2 => self.dir() as usize,
            3 => self.pdp() as usize,
            4 => self.pml4() as usize,
            _ => 0,
        }
    }

    /// Replace the table index for `level` (1..=4); the value is taken modulo 512.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_part(&mut self, level: usize, value: usize) {
        let value = (value % ENTRIES_PER_TABLE) as u16;
        match level {
            1 => self.set_page(value),
            2 => self.set_dir(value),
            3 => self.set_pdp(value),
            4 => self.set_pml4(value),
            _ => {}
        }
    }

    /// Copy bit 47 into bits 48..=63.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub const fn canonical(self) -> Self {
        Self::from_bits((((self.into_bits() << 16) as i64) >> 16) as u64)
    }

    #[must_use]
    pub const fn is_canonical(self) -> bool {
        self.into_bits() == self.canonical().into_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_round_trip() {
        for raw in [
            0u64,
            0x0000_7fff_ffff_ffff,
            0xffff_8000_0000_0000,
            0x0000_1234_5678_9abc,
            0xffff_ffff_ffff_f000,
        ] {
            let a = LinearAddress4Level::from(raw);
            let b = LinearAddress4Level::from_parts(
                a.part(4),
                a.part(3),
                a.part(2),
                a.part(1),
                a.offset(),
            );
            assert_eq!(b.into_bits(), raw, "{raw:#x}");
        }
    }

    #[test]
    fn parts_round_trip_at_index_edges() {
        const EDGES: [usize; 4] = [0, 1, 510, 511];
        for pml4 in EDGES.into_iter().chain([255, 256]) {
            for pdp in EDGES {
                for dir in EDGES {
                    for page in EDGES {
                        for offset in [0u16, 0xfff] {
                            let a = LinearAddress4Level::from_parts(pml4, pdp, dir, page, offset);
                            assert!(a.is_canonical(), "{:#x}", a.into_bits());
                            assert_eq!(
                                [a.part(4), a.part(3), a.part(2), a.part(1)],
                                [pml4, pdp, dir, page]
                            );
                            assert_eq!(a.offset(), offset);

                            let upper = pml4 >= 256;
                            assert_eq!(a.sign() == 0xffff, upper, "{:#x}", a.into_bits());
                            assert_eq!(a.sign() == 0, !upper, "{:#x}", a.into_bits());

                            let raw = a.into_bits();
                            assert_eq!(LinearAddress4Level::from(raw).into_bits(), raw);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn upper_half_is_sign_extended() {
        let a = LinearAddress4Level::from_parts(256, 0, 0, 0, 0);
        assert_eq!(a.into_bits(), 0xffff_8000_0000_0000);
        assert!(a.is_canonical());
        assert!(!LinearAddress4Level::from(0x0000_8000_0000_0000).is_canonical());
    }

    #[test]
    fn set_part_rolls_indices() {
        let mut a = LinearAddress4Level::from(0x20_1000);
        assert_eq!((a.part(2), a.part(1)), (1, 1));
        a.set_part(2, 2);
        a.set_part(1, 0);
        assert_eq!(a.into_bits(), 0x40_0000);
        a.set_part(0, 7);
        a.set_part(5, 7);
        assert_eq!(a.into_bits(), 0x40_0000);
        assert_eq!(a.part(0), 0);
    }
}
