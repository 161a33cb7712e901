//! Packed operand words.
//!
//! Several 8-bit fields share one `u32`. Field 0 lives in bits 0..8, field 1
//! in bits 8..16, field 2 in bits 16..24 and field 3 in bits 24..32. Decoding
//! returns the fields in the order they were encoded.

/// Pack three bytes into one word.
#[inline]
pub const fn pack_uchar3(x: u8, y: u8, z: u8) -> u32 {
    (x as u32) | ((y as u32) << 8) | ((z as u32) << 16)
}

/// Unpack a word built by [`pack_uchar3`]. Bits 24..32 are ignored.
#[inline]
pub const fn unpack_uchar3(word: u32) -> (u32, u32, u32) {
    (word & 0xFF, (word >> 8) & 0xFF, (word >> 16) & 0xFF)
}

/// Pack four bytes into one word.
#[inline]
pub const fn pack_uchar4(x: u8, y: u8, z: u8, w: u8) -> u32 {
    pack_uchar3(x, y, z) | ((w as u32) << 24)
}

/// Unpack a word built by [`pack_uchar4`].
#[inline]
pub const fn unpack_uchar4(word: u32) -> (u32, u32, u32, u32) {
    let (x, y, z) = unpack_uchar3(word);
    (x, y, z, word >> 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn field_order_is_low_to_high() {
        assert_eq!(pack_uchar3(1, 2, 3), 0x0003_0201);
        assert_eq!(pack_uchar4(1, 2, 3, 4), 0x0403_0201);
    }

    #[test]
    fn uchar3_ignores_top_byte() {
        assert_eq!(unpack_uchar3(0xFF03_0201), (1, 2, 3));
    }

    proptest! {
        #[test]
        fn uchar3_lossless(x: u8, y: u8, z: u8) {
            prop_assert_eq!(unpack_uchar3(pack_uchar3(x, y, z)), (x as u32, y as u32, z as u32));
        }

        #[test]
        fn uchar4_lossless(x: u8, y: u8, z: u8, w: u8) {
            prop_assert_eq!(
                unpack_uchar4(pack_uchar4(x, y, z, w)),
                (x as u32, y as u32, z as u32, w as u32)
            );
        }
    }
}
