/// Implement the fixed-size byte conversions of a wire attribute.
///
/// The type must be `#[repr(C)]` and consist only of `u8` and `[u8; N]`
/// fields, so that it has alignment 1, no padding, and every bit pattern is
/// a valid value.
macro_rules! impl_wire_layout {
    ($ty:ident, $size:expr, $what:expr) => {
        const _: () = assert!(::std::mem::size_of::<$ty>() == $size);
        const _: () = assert!(::std::mem::align_of::<$ty>() == 1);

        impl $ty {
            /// Size of this attribute on the wire, in bytes.
            pub const SIZE: usize = $size;

            /// Create an all-zero attribute.
            #[inline]
            pub fn new() -> Self {
                Self::from_bytes([0; $size])
            }

            /// Reinterpret a network-order byte image as this attribute.
            #[inline]
            pub fn from_bytes(raw: [u8; $size]) -> Self {
                // SAFETY: POD type of identical size, alignment 1, no invalid bit patterns.
                unsafe { ::std::mem::transmute::<[u8; $size], Self>(raw) }
            }

            /// Get the network-order byte image of this attribute.
            #[inline]
            pub fn as_bytes(&self) -> [u8; $size] {
                // SAFETY: POD type of identical size, alignment 1, no padding.
                unsafe { ::std::mem::transmute::<Self, [u8; $size]>(*self) }
            }

            /// Decode this attribute from the head of `raw`.
            /// Trailing bytes are ignored, short buffers are rejected.
            pub fn from_slice(raw: &[u8]) -> Result<Self, $crate::wire::WireError> {
                let head: [u8; $size] = raw
                    .get(..$size)
                    .and_then(|s| s.try_into().ok())
                    .ok_or($crate::wire::WireError::Truncated {
                        what: $what,
                        need: $size,
                        got: raw.len(),
                    })?;
                Ok(Self::from_bytes(head))
            }
        }

        impl Default for $ty {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// Generate getter/setter pairs for whole network-order fields.
macro_rules! wire_fields {
    ($( $(#[$doc:meta])* $field:ident, $set:ident: $ty:ty; )+) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $field(&self) -> $ty {
                <$ty as $crate::wire::Word>::load(self.$field)
            }

            #[inline]
            pub fn $set(&mut self, val: $ty) {
                self.$field = <$ty as $crate::wire::Word>::store(val);
            }
        )+
    };
}

/// Generate getter/setter pairs for bit-packed sub-fields.
///
/// `mask` is expressed in host order and applied after the byte swap;
/// setters mask the value and leave all other bits untouched.
macro_rules! wire_bits {
    ($( $(#[$doc:meta])* $get:ident, $set:ident: $field:ident as $ty:ty [$mask:expr, $shift:expr]; )+) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $get(&self) -> $ty {
                $crate::wire::get_bits(<$ty as $crate::wire::Word>::load(self.$field), $mask, $shift)
            }

            #[inline]
            pub fn $set(&mut self, val: $ty) {
                let word = <$ty as $crate::wire::Word>::load(self.$field);
                self.$field = <$ty as $crate::wire::Word>::store(
                    $crate::wire::set_bits(word, $mask, $shift, val),
                );
            }
        )+
    };
}
