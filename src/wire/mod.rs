//! Management attribute codecs.
//!
//! Every attribute is a `#[repr(C)]` image of its network-order wire layout
//! built from single bytes and byte arrays, with accessor methods that do the
//! byte swapping and bit masking. Getters are pure, setters only touch the
//! bits of their own field, and out-of-range values are masked rather than
//! rejected. The only failure at this layer is a buffer that is too short to
//! hold the attribute.

#[macro_use]
mod macros;

mod class_port_info;
mod ext_port_info;
mod mad;
mod node_info;
mod port_info;
mod state;
mod virt;

use std::ops::{BitAnd, BitOr, Not, Shl, Shr};

use thiserror::Error;

pub use self::class_port_info::*;
pub use self::ext_port_info::*;
pub use self::mad::*;
pub use self::node_info::*;
pub use self::port_info::*;
pub use self::state::*;
pub use self::virt::*;

/// Attribute codec error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The buffer is shorter than the attribute layout.
    #[error("truncated {what}: need {need} bytes, got {got}")]
    Truncated {
        what: &'static str,
        need: usize,
        got: usize,
    },

    /// The attribute identifier is not interpreted by the port model.
    #[error("unsupported attribute id {0:#06x}")]
    UnknownAttribute(u16),
}

/// An unsigned machine word stored in network byte order inside an attribute.
pub(crate) trait Word:
    Copy
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
    + Shl<u32, Output = Self>
    + Shr<u32, Output = Self>
{
    /// Byte representation of the word inside the attribute.
    type Raw: Copy;

    fn load(raw: Self::Raw) -> Self;
    fn store(self) -> Self::Raw;
}

impl Word for u8 {
    type Raw = u8;

    #[inline(always)]
    fn load(raw: u8) -> Self {
        raw
    }

    #[inline(always)]
    fn store(self) -> u8 {
        self
    }
}

macro_rules! impl_word {
    ($($t:ty)*) => ($(
        impl Word for $t {
            type Raw = [u8; ::std::mem::size_of::<$t>()];

            #[inline(always)]
            fn load(raw: Self::Raw) -> Self {
                <$t>::from_be_bytes(raw)
            }

            #[inline(always)]
            fn store(self) -> Self::Raw {
                self.to_be_bytes()
            }
        }
    )*)
}

impl_word!(u16 u32 u64);

/// Extract the sub-field selected by a host-order `mask`.
#[inline(always)]
pub(crate) fn get_bits<T: Word>(word: T, mask: T, shift: u32) -> T {
    (word & mask) >> shift
}

/// Replace the sub-field selected by a host-order `mask`, preserving all
/// other bits. Value bits that fall outside the mask are dropped.
#[inline(always)]
pub(crate) fn set_bits<T: Word>(word: T, mask: T, shift: u32, val: T) -> T {
    (word & !mask) | ((val << shift) & mask)
}

#[cfg(test)]
pub(crate) mod test_util {
    /// Assert that the only bits that differ between `before` and `after`
    /// are those in the `region` byte mask.
    pub fn assert_only_region_changed(before: &[u8], after: &[u8], region: &[u8]) {
        for (i, ((b, a), m)) in before.iter().zip(after).zip(region).enumerate() {
            assert_eq!((b ^ a) & !m, 0, "byte {} changed outside of its field", i);
        }
    }

    /// A bit-packed accessor pair and the bytes it occupies.
    pub struct BitField<T> {
        pub name: &'static str,
        pub set: fn(&mut T, u32),
        pub get: fn(&T) -> u32,
        pub max: u32,
        pub offset: usize,
        /// Byte-image mask of the field, starting at `offset`.
        pub mask: &'static [u8],
    }

    /// Build a [`BitField`] from an accessor pair of `$ty`.
    macro_rules! bit_field {
        ($ty:ty: $get:ident, $set:ident as $val:ty, $max:expr, $offset:expr, [$($mask:expr),+ $(,)?]) => {
            $crate::wire::test_util::BitField::<$ty> {
                name: stringify!($get),
                set: |a: &mut $ty, v: u32| a.$set(v as $val),
                get: |a: &$ty| a.$get() as u32,
                max: $max,
                offset: $offset,
                mask: &[$($mask),+],
            }
        };
    }
    pub(crate) use bit_field;

    /// Check that every field round-trips its values, only touches its own
    /// bits whatever the surrounding bytes hold, and masks values that do
    /// not fit.
    pub fn check_bit_fields<T, const N: usize>(
        from_bytes: fn([u8; N]) -> T,
        as_bytes: fn(&T) -> [u8; N],
        fields: &[BitField<T>],
    ) {
        for f in fields {
            let values = if f.max <= 0xFF {
                (0..=f.max).collect::<Vec<_>>()
            } else {
                vec![0, 1, f.max, f.max & 0x5555_5555, f.max & 0xAAAA_AAAA]
            };
            let mut region = [0u8; N];
            region[f.offset..f.offset + f.mask.len()].copy_from_slice(f.mask);

            for start in [0x00u8, 0xFF, 0xA5] {
                let mut attr = from_bytes([start; N]);
                for &v in &values {
                    let before = as_bytes(&attr);
                    (f.set)(&mut attr, v);
                    assert_eq!((f.get)(&attr), v, "{} = {:#x}", f.name, v);
                    assert_only_region_changed(&before, &as_bytes(&attr), &region);
                }

                let before = as_bytes(&attr);
                (f.set)(&mut attr, f.max + 1);
                assert_eq!((f.get)(&attr), 0, "{} out of range", f.name);
                assert_only_region_changed(&before, &as_bytes(&attr), &region);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_helpers_mask_values() {
        assert_eq!(get_bits(0xA5u8, 0xF0, 4), 0xA);
        assert_eq!(set_bits(0xA5u8, 0xF0, 4, 0x3), 0x35);
        // Value bits beyond the field are dropped, not carried.
        assert_eq!(set_bits(0x00u8, 0x07, 0, 0xFF), 0x07);
        assert_eq!(set_bits(0xFFFF_FFFFu32, 0xE000_0000, 29, 0), 0x1FFF_FFFF);
    }
}
