//! Element codecs consumed by the array engine.
//!
//! The engine in [`crate::array`] never touches the wire itself; it drives a
//! per-element capability bundle, the [`ArrayTraits`]. A schema compiler
//! emits one traits value per array field, usually one of the built-in
//! codecs below or a thin wrapper over a generated compound type (see
//! [`crate::rt::RecordArrayTraits`]). Codecs whose behavior depends on the
//! enclosing compound (a dynamic bitfield whose width lives in a sibling
//! field, a parameterized element type) capture that state when the
//! generated caller constructs them.
//!
//! Three capability layers:
//!
//! - [`ArrayTraits`]: size / offset-initialization / read / write for one
//!   element, plus an optional constant-size declaration.
//! - [`FixedSizeArrayTraits`]: marker for codecs whose elements always
//!   occupy the same number of bits; implicit-length arrays require it.
//! - [`DeltaPackable`]: integral element values the delta-packing context
//!   can difference; packed arrays require it.

use crate::buffer::BitBuffer;
use crate::error::{BitwireError, Result};
use crate::reader::BitReader;
use crate::size::{
    bit_size_of_bytes, bit_size_of_string, bit_size_of_varint, bit_size_of_varint16,
    bit_size_of_varint32, bit_size_of_varint64, bit_size_of_varsize, bit_size_of_varuint,
    bit_size_of_varuint16, bit_size_of_varuint32, bit_size_of_varuint64, convert_size_to_u32,
};
use crate::writer::BitWriter;

/// Per-element codec driven by the array engine.
///
/// `bit_position` parameters exist for codecs whose size depends on
/// alignment (compounds containing aligned members); scalar codecs ignore
/// them.
pub trait ArrayTraits {
    /// The element value type.
    type Element;

    /// Returns the bit size of `element` when written at `bit_position`.
    fn bit_size_of(&self, bit_position: usize, element: &Self::Element) -> Result<usize>;

    /// Resolves offset fields inside `element` and returns the bit position
    /// just past it.
    ///
    /// Scalar codecs simply advance by the element size; compound codecs
    /// recurse.
    fn initialize_offsets(&self, bit_position: usize, element: &mut Self::Element) -> Result<usize> {
        let size = self.bit_size_of(bit_position, element)?;
        Ok(bit_position + size)
    }

    /// Reads the element at array index `index`.
    ///
    /// The index is forwarded so codecs for parameterized elements can
    /// evaluate index-dependent arguments; most codecs ignore it.
    fn read(&self, reader: &mut BitReader<'_>, index: usize) -> Result<Self::Element>;

    /// Writes `element`.
    fn write(&self, writer: &mut BitWriter<'_>, element: &Self::Element) -> Result<()>;

    /// The element bit size when it is the same for every element, `None`
    /// otherwise.
    fn constant_bit_size(&self) -> Option<usize> {
        None
    }
}

/// Marker for codecs with a constant element bit size.
///
/// Implementors promise that [`ArrayTraits::constant_bit_size`] returns
/// `Some`. Implicit-length arrays are only readable through codecs carrying
/// this marker, which is what keeps variable-size elements out of implicit
/// arrays at compile time.
pub trait FixedSizeArrayTraits: ArrayTraits {}

/// Integral element values understood by the delta-packing context.
///
/// Conversion runs through the `u64` domain in two's complement, so signed
/// values survive the round trip by truncating casts.
pub trait DeltaPackable: Copy + PartialOrd {
    /// Widens the value into the packing domain.
    fn to_packing(self) -> u64;
    /// Narrows a packing-domain value back, truncating.
    fn from_packing(value: u64) -> Self;
}

macro_rules! impl_delta_packable {
    ($($ty:ty),*) => {
        $(
            impl DeltaPackable for $ty {
                #[inline]
                fn to_packing(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_packing(value: u64) -> Self {
                    value as $ty
                }
            }
        )*
    }
}

impl_delta_packable!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Unsigned integer element types usable with [`UnsignedBitFieldTraits`].
pub trait UnsignedElement: DeltaPackable {
    /// Width of the native type in bits.
    const TYPE_BITS: u8;
}

/// Signed integer element types usable with [`SignedBitFieldTraits`].
pub trait SignedElement: DeltaPackable {
    /// Width of the native type in bits.
    const TYPE_BITS: u8;
    /// Widens to the 64-bit signed domain.
    fn widen(self) -> i64;
    /// Narrows from the 64-bit signed domain, truncating.
    fn narrow(value: i64) -> Self;
}

macro_rules! impl_unsigned_element {
    ($($ty:ty),*) => {
        $(
            impl UnsignedElement for $ty {
                const TYPE_BITS: u8 = <$ty>::BITS as u8;
            }
        )*
    }
}

impl_unsigned_element!(u8, u16, u32, u64);

macro_rules! impl_signed_element {
    ($($ty:ty),*) => {
        $(
            impl SignedElement for $ty {
                const TYPE_BITS: u8 = <$ty>::BITS as u8;

                #[inline]
                fn widen(self) -> i64 {
                    self as i64
                }

                #[inline]
                fn narrow(value: i64) -> Self {
                    value as $ty
                }
            }
        )*
    }
}

impl_signed_element!(i8, i16, i32, i64);

/// Codec for unsigned bitfields of a fixed width, 1 to 64 bits.
///
/// Covers both schema bitfields (`bit:5`) and full-width standard integers
/// (`uint32` is a 32-bit field over `u32`). Dynamic-width bitfields are the
/// same codec constructed with a width taken from a sibling field.
///
/// ## Examples
///
/// ```rust
/// use bitwire::{Array, Normal, UnsignedBitFieldTraits};
///
/// let array: Array<_, Normal> =
///     Array::from_elements(UnsignedBitFieldTraits::<u8>::new(3), vec![1, 5, 7]);
/// assert_eq!(array.bit_size_of(0)?, 9);
/// # Ok::<(), bitwire::BitwireError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct UnsignedBitFieldTraits<T> {
    num_bits: u8,
    _element: std::marker::PhantomData<T>,
}

impl<T: UnsignedElement> UnsignedBitFieldTraits<T> {
    /// Creates a codec for fields of `num_bits` bits.
    pub fn new(num_bits: u8) -> Self {
        Self {
            num_bits,
            _element: std::marker::PhantomData,
        }
    }

    /// Creates a codec for the element type's full width.
    pub fn full_width() -> Self {
        Self::new(T::TYPE_BITS)
    }
}

impl<T: UnsignedElement> ArrayTraits for UnsignedBitFieldTraits<T> {
    type Element = T;

    fn bit_size_of(&self, _bit_position: usize, _element: &T) -> Result<usize> {
        Ok(self.num_bits as usize)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<T> {
        if self.num_bits > T::TYPE_BITS {
            return Err(BitwireError::InvalidNumBits);
        }
        Ok(T::from_packing(reader.read_bits_64(self.num_bits)?))
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &T) -> Result<()> {
        if self.num_bits > T::TYPE_BITS {
            return Err(BitwireError::InvalidNumBits);
        }
        writer.write_bits_64(element.to_packing(), self.num_bits)
    }

    fn constant_bit_size(&self) -> Option<usize> {
        Some(self.num_bits as usize)
    }
}

impl<T: UnsignedElement> FixedSizeArrayTraits for UnsignedBitFieldTraits<T> {}

/// Codec for signed bitfields of a fixed width, 1 to 64 bits.
#[derive(Debug, Clone, Copy)]
pub struct SignedBitFieldTraits<T> {
    num_bits: u8,
    _element: std::marker::PhantomData<T>,
}

impl<T: SignedElement> SignedBitFieldTraits<T> {
    /// Creates a codec for fields of `num_bits` bits.
    pub fn new(num_bits: u8) -> Self {
        Self {
            num_bits,
            _element: std::marker::PhantomData,
        }
    }

    /// Creates a codec for the element type's full width.
    pub fn full_width() -> Self {
        Self::new(T::TYPE_BITS)
    }
}

impl<T: SignedElement> ArrayTraits for SignedBitFieldTraits<T> {
    type Element = T;

    fn bit_size_of(&self, _bit_position: usize, _element: &T) -> Result<usize> {
        Ok(self.num_bits as usize)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<T> {
        if self.num_bits > T::TYPE_BITS {
            return Err(BitwireError::InvalidNumBits);
        }
        Ok(T::narrow(reader.read_signed_bits_64(self.num_bits)?))
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &T) -> Result<()> {
        if self.num_bits > T::TYPE_BITS {
            return Err(BitwireError::InvalidNumBits);
        }
        writer.write_signed_bits_64(element.widen(), self.num_bits)
    }

    fn constant_bit_size(&self) -> Option<usize> {
        Some(self.num_bits as usize)
    }
}

impl<T: SignedElement> FixedSizeArrayTraits for SignedBitFieldTraits<T> {}

macro_rules! varint_traits {
    ($(#[$doc:meta])* $name:ident, $element:ty, $size_fn:ident, $read_fn:ident, $write_fn:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl ArrayTraits for $name {
            type Element = $element;

            fn bit_size_of(&self, _bit_position: usize, element: &$element) -> Result<usize> {
                $size_fn(*element)
            }

            fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<$element> {
                reader.$read_fn()
            }

            fn write(&self, writer: &mut BitWriter<'_>, element: &$element) -> Result<()> {
                writer.$write_fn(*element)
            }
        }
    };
}

varint_traits!(
    /// Codec for `varint16` elements.
    VarInt16Traits, i16, bit_size_of_varint16, read_varint16, write_varint16
);
varint_traits!(
    /// Codec for `varint32` elements.
    VarInt32Traits, i32, bit_size_of_varint32, read_varint32, write_varint32
);
varint_traits!(
    /// Codec for `varint64` elements.
    VarInt64Traits, i64, bit_size_of_varint64, read_varint64, write_varint64
);
varint_traits!(
    /// Codec for `varint` elements (up to 9 bytes, negative-zero shortcut).
    VarIntTraits, i64, bit_size_of_varint, read_varint, write_varint
);
varint_traits!(
    /// Codec for `varuint16` elements.
    VarUInt16Traits, u16, bit_size_of_varuint16, read_varuint16, write_varuint16
);
varint_traits!(
    /// Codec for `varuint32` elements.
    VarUInt32Traits, u32, bit_size_of_varuint32, read_varuint32, write_varuint32
);
varint_traits!(
    /// Codec for `varuint64` elements.
    VarUInt64Traits, u64, bit_size_of_varuint64, read_varuint64, write_varuint64
);
varint_traits!(
    /// Codec for `varuint` elements (up to 9 bytes).
    VarUIntTraits, u64, bit_size_of_varuint, read_varuint, write_varuint
);
varint_traits!(
    /// Codec for `varsize` elements (at most `2^31 - 1`).
    VarSizeTraits, u32, bit_size_of_varsize, read_varsize, write_varsize
);

/// Codec for single-bit bool elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolTraits;

impl ArrayTraits for BoolTraits {
    type Element = bool;

    fn bit_size_of(&self, _bit_position: usize, _element: &bool) -> Result<usize> {
        Ok(1)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<bool> {
        reader.read_bool()
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &bool) -> Result<()> {
        writer.write_bool(*element)
    }

    fn constant_bit_size(&self) -> Option<usize> {
        Some(1)
    }
}

impl FixedSizeArrayTraits for BoolTraits {}

/// Codec for half-precision float elements (16 bits on the wire).
#[derive(Debug, Clone, Copy, Default)]
pub struct Float16Traits;

impl ArrayTraits for Float16Traits {
    type Element = f32;

    fn bit_size_of(&self, _bit_position: usize, _element: &f32) -> Result<usize> {
        Ok(16)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<f32> {
        reader.read_float16()
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &f32) -> Result<()> {
        writer.write_float16(*element)
    }

    fn constant_bit_size(&self) -> Option<usize> {
        Some(16)
    }
}

impl FixedSizeArrayTraits for Float16Traits {}

/// Codec for single-precision float elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float32Traits;

impl ArrayTraits for Float32Traits {
    type Element = f32;

    fn bit_size_of(&self, _bit_position: usize, _element: &f32) -> Result<usize> {
        Ok(32)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<f32> {
        reader.read_float32()
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &f32) -> Result<()> {
        writer.write_float32(*element)
    }

    fn constant_bit_size(&self) -> Option<usize> {
        Some(32)
    }
}

impl FixedSizeArrayTraits for Float32Traits {}

/// Codec for double-precision float elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float64Traits;

impl ArrayTraits for Float64Traits {
    type Element = f64;

    fn bit_size_of(&self, _bit_position: usize, _element: &f64) -> Result<usize> {
        Ok(64)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<f64> {
        reader.read_float64()
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &f64) -> Result<()> {
        writer.write_float64(*element)
    }

    fn constant_bit_size(&self) -> Option<usize> {
        Some(64)
    }
}

impl FixedSizeArrayTraits for Float64Traits {}

/// Codec for length-prefixed UTF-8 string elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringTraits;

impl ArrayTraits for StringTraits {
    type Element = String;

    fn bit_size_of(&self, _bit_position: usize, element: &String) -> Result<usize> {
        bit_size_of_string(element)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<String> {
        reader.read_string()
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &String) -> Result<()> {
        writer.write_string(element)
    }
}

/// Codec for length-prefixed raw byte elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesTraits;

impl ArrayTraits for BytesTraits {
    type Element = Vec<u8>;

    fn bit_size_of(&self, _bit_position: usize, element: &Vec<u8>) -> Result<usize> {
        bit_size_of_bytes(element)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<Vec<u8>> {
        reader.read_bytes()
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &Vec<u8>) -> Result<()> {
        writer.write_bytes(element)
    }
}

/// Codec for bit-length-prefixed [`BitBuffer`] elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitBufferTraits;

impl ArrayTraits for BitBufferTraits {
    type Element = BitBuffer;

    fn bit_size_of(&self, _bit_position: usize, element: &BitBuffer) -> Result<usize> {
        let bit_size = element.bit_size();
        let prefix = bit_size_of_varsize(convert_size_to_u32(bit_size)?)?;
        Ok(prefix + bit_size)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<BitBuffer> {
        reader.read_bit_buffer()
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &BitBuffer) -> Result<()> {
        writer.write_bit_buffer(element)
    }
}
