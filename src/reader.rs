//! The read side of the wire codec: unaligned bit consumption.
//!
//! [`BitReader`] consumes an immutable byte span at bit granularity. Every
//! compound that a schema compiler emits funnels its field reads through
//! this type, so the hot path is organized around a word-sized bit cache:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ byte span  .. b4 b5 b6 b7 b8 b9 ..            │
//! ├───────────────────────────────────────────────┤
//! │ cache: up to 64 bits, loaded big-endian       │
//! │        refilled whenever a read drains it     │
//! ├───────────────────────────────────────────────┤
//! │ read_bits(n): shift/mask against the cache,   │
//! │        at most one refill per call            │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Bit order is MSB-first within each byte and all multi-byte scalars are
//! big-endian, so a reader over bytes `0xFF 0x12 0x34` yields `0x7F` for a
//! 7-bit read followed by `1` for a 1-bit read.
//!
//! ## Contract
//!
//! Every read returns [`Result`] and advances the bit index by exactly the
//! consumed width on success. Before touching the stream an operation
//! validates that the span can back the declared bit size, that the
//! requested width fits the operation's type, and that enough bits remain,
//! failing with [`WrongBufferBitSize`], [`InvalidNumBits`] and
//! [`EndOfStream`] respectively. After a failure the reader must be
//! discarded; the source span itself is never modified.
//!
//! ## Sharing
//!
//! A reader borrows its span immutably. Any number of readers over the same
//! bytes may run on any number of threads.
//!
//! [`WrongBufferBitSize`]: crate::BitwireError::WrongBufferBitSize
//! [`InvalidNumBits`]: crate::BitwireError::InvalidNumBits
//! [`EndOfStream`]: crate::BitwireError::EndOfStream

use crate::buffer::BitBuffer;
use crate::error::{BitwireError, Result};
use crate::float;
use crate::size::VARSIZE_MAX;

// Largest supported span; keeps `len * 8` and the cache lookahead exact.
const MAX_BUFFER_SIZE: usize = usize::MAX / 8 - 4;

const CACHE_BITS: u8 = 64;

// First-byte layout of the signed varint families.
const VARINT_SIGN_1: u8 = 0x80;
const VARINT_BYTE_1: u8 = 0x3F;
const VARINT_HAS_NEXT_1: u8 = 0x40;

// Payload layout of unsigned varint bytes and signed continuation bytes.
const VARNUM_BYTE_N: u8 = 0x7F;
const VARNUM_HAS_NEXT_N: u8 = 0x80;

#[inline]
const fn bit_mask(num_bits: u8) -> u64 {
    if num_bits == 0 {
        0
    } else {
        u64::MAX >> (64 - num_bits as u32)
    }
}

/// Sequential bit-granular reader over a borrowed byte span.
///
/// ## Examples
///
/// ```rust
/// use bitwire::BitReader;
///
/// let data = [0xFF, 0x12, 0x34];
/// let mut reader = BitReader::new(&data);
/// assert_eq!(reader.read_bits(7)?, 127);
/// assert!(reader.read_bool()?);
/// assert_eq!(reader.read_bits(16)?, 0x1234);
/// # Ok::<(), bitwire::BitwireError>(())
/// ```
#[derive(Debug)]
pub struct BitReader<'a> {
    buffer: &'a [u8],
    buffer_bit_size: usize,
    cache: u64,
    cache_num_bits: u8,
    bit_index: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over a whole byte span (`8 * buffer.len()` bits).
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_bit_size(buffer, buffer.len() * 8)
    }

    /// Creates a reader over a span with an exact bit size.
    ///
    /// The bit size may be smaller than `8 * buffer.len()`; consistency is
    /// validated by each read, not here, so construction never fails.
    pub fn with_bit_size(buffer: &'a [u8], buffer_bit_size: usize) -> Self {
        Self {
            buffer,
            buffer_bit_size,
            cache: 0,
            cache_num_bits: 0,
            bit_index: 0,
        }
    }

    /// Creates a reader over the contents of a [`BitBuffer`].
    pub fn from_buffer(bit_buffer: &'a BitBuffer) -> Self {
        Self::with_bit_size(bit_buffer.data(), bit_buffer.bit_size())
    }

    /// Reads up to 32 unsigned bits, MSB first.
    ///
    /// `num_bits == 0` yields zero without advancing the stream.
    pub fn read_bits(&mut self, num_bits: u8) -> Result<u32> {
        self.validate_buffer()?;
        if num_bits > 32 {
            return Err(BitwireError::InvalidNumBits);
        }
        self.ensure_available(num_bits.into())?;
        Ok(self.read_bits_unchecked(num_bits) as u32)
    }

    /// Reads up to 64 unsigned bits, MSB first.
    pub fn read_bits_64(&mut self, num_bits: u8) -> Result<u64> {
        self.validate_buffer()?;
        if num_bits > 64 {
            return Err(BitwireError::InvalidNumBits);
        }
        self.ensure_available(num_bits.into())?;
        Ok(self.read_bits_unchecked(num_bits))
    }

    /// Reads up to 32 signed bits.
    ///
    /// The value sign-extends from the top bit of the field unless the field
    /// is exactly 32 bits wide.
    pub fn read_signed_bits(&mut self, num_bits: u8) -> Result<i32> {
        self.validate_buffer()?;
        if num_bits > 32 {
            return Err(BitwireError::InvalidNumBits);
        }
        self.ensure_available(num_bits.into())?;
        Ok(self.read_signed_bits_unchecked(num_bits) as i32)
    }

    /// Reads up to 64 signed bits.
    pub fn read_signed_bits_64(&mut self, num_bits: u8) -> Result<i64> {
        self.validate_buffer()?;
        if num_bits > 64 {
            return Err(BitwireError::InvalidNumBits);
        }
        self.ensure_available(num_bits.into())?;
        Ok(self.read_signed_bits_unchecked(num_bits))
    }

    /// Reads a single bit as a bool.
    pub fn read_bool(&mut self) -> Result<bool> {
        self.validate_buffer()?;
        self.ensure_available(1)?;
        Ok(self.read_bits_unchecked(1) != 0)
    }

    /// Reads a `varint16` (up to 2 bytes).
    pub fn read_varint16(&mut self) -> Result<i16> {
        self.validate_buffer()?;
        let (magnitude, sign, _) = self.read_var_num(2, true)?;
        let magnitude = magnitude as i16;
        Ok(if sign { -magnitude } else { magnitude })
    }

    /// Reads a `varint32` (up to 4 bytes).
    pub fn read_varint32(&mut self) -> Result<i32> {
        self.validate_buffer()?;
        let (magnitude, sign, _) = self.read_var_num(4, true)?;
        let magnitude = magnitude as i32;
        Ok(if sign { -magnitude } else { magnitude })
    }

    /// Reads a `varint64` (up to 8 bytes).
    pub fn read_varint64(&mut self) -> Result<i64> {
        self.validate_buffer()?;
        let (magnitude, sign, _) = self.read_var_num(8, true)?;
        let magnitude = magnitude as i64;
        Ok(if sign { -magnitude } else { magnitude })
    }

    /// Reads a `varint` (up to 9 bytes).
    ///
    /// The single byte `0x80` (sign set, zero magnitude, no continuation)
    /// decodes to `i64::MIN`.
    pub fn read_varint(&mut self) -> Result<i64> {
        self.validate_buffer()?;
        let (magnitude, sign, bytes_read) = self.read_var_num(9, true)?;
        if sign && bytes_read == 1 && magnitude == 0 {
            return Ok(i64::MIN);
        }
        let magnitude = magnitude as i64;
        Ok(if sign { -magnitude } else { magnitude })
    }

    /// Reads a `varuint16` (up to 2 bytes).
    pub fn read_varuint16(&mut self) -> Result<u16> {
        self.validate_buffer()?;
        let (value, _, _) = self.read_var_num(2, false)?;
        Ok(value as u16)
    }

    /// Reads a `varuint32` (up to 4 bytes).
    pub fn read_varuint32(&mut self) -> Result<u32> {
        self.validate_buffer()?;
        let (value, _, _) = self.read_var_num(4, false)?;
        Ok(value as u32)
    }

    /// Reads a `varuint64` (up to 8 bytes).
    pub fn read_varuint64(&mut self) -> Result<u64> {
        self.validate_buffer()?;
        let (value, _, _) = self.read_var_num(8, false)?;
        Ok(value)
    }

    /// Reads a `varuint` (up to 9 bytes).
    pub fn read_varuint(&mut self) -> Result<u64> {
        self.validate_buffer()?;
        let (value, _, _) = self.read_var_num(9, false)?;
        Ok(value)
    }

    /// Reads a `varsize` (up to 5 bytes).
    ///
    /// Decoded values above `2^31 - 1` fail with
    /// [`OutOfRange`](BitwireError::OutOfRange).
    pub fn read_varsize(&mut self) -> Result<u32> {
        self.validate_buffer()?;
        let (value, _, _) = self.read_var_num(5, false)?;
        if value > u64::from(VARSIZE_MAX) {
            return Err(BitwireError::OutOfRange);
        }
        Ok(value as u32)
    }

    /// Reads 16 bits and reinterprets them as an IEEE 754 half-precision
    /// value widened to `f32`.
    pub fn read_float16(&mut self) -> Result<f32> {
        self.validate_buffer()?;
        self.ensure_available(16)?;
        Ok(float::f32_from_f16_bits(self.read_bits_unchecked(16) as u16))
    }

    /// Reads 32 bits and reinterprets them as an IEEE 754 single-precision
    /// value.
    pub fn read_float32(&mut self) -> Result<f32> {
        self.validate_buffer()?;
        self.ensure_available(32)?;
        Ok(f32::from_bits(self.read_bits_unchecked(32) as u32))
    }

    /// Reads 64 bits and reinterprets them as an IEEE 754 double-precision
    /// value.
    pub fn read_float64(&mut self) -> Result<f64> {
        self.validate_buffer()?;
        self.ensure_available(64)?;
        Ok(f64::from_bits(self.read_bits_unchecked(64)))
    }

    /// Reads a varsize length prefix followed by that many raw bytes.
    ///
    /// When the reader is byte-aligned the payload is copied wholesale;
    /// otherwise it is pulled byte-by-byte through the bit cache.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varsize()? as usize;

        if self.bit_index % 8 != 0 {
            let mut value = Vec::with_capacity(len);
            for _ in 0..len {
                value.push(self.next_byte()?);
            }
            return Ok(value);
        }

        // A payload that would cross the end of the stream fails the same
        // way the byte-by-byte slow path does.
        self.ensure_available(len * 8)?;
        let begin = self.bit_index / 8;
        self.set_bit_position(self.bit_index + len * 8)?;
        Ok(self.buffer[begin..begin + len].to_vec())
    }

    /// Reads a varsize length prefix followed by that many UTF-8 code units.
    ///
    /// The runtime expects well-formed UTF-8 on the wire but a stream written
    /// by another producer may violate that, so the payload is validated and
    /// malformed text fails with [`InvalidValue`](BitwireError::InvalidValue).
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| BitwireError::InvalidValue)
    }

    /// Reads a varsize *bit* length prefix followed by that many bits into an
    /// owned [`BitBuffer`].
    ///
    /// For a sub-byte tail the final `len % 8` bits land in the high bits of
    /// the final byte, with the low bits cleared.
    pub fn read_bit_buffer(&mut self) -> Result<BitBuffer> {
        let bit_size = self.read_varsize()? as usize;
        let num_bytes = bit_size / 8;
        let rest_bits = (bit_size % 8) as u8;

        let mut bit_buffer = BitBuffer::new(bit_size);
        let begin = self.bit_index;
        if begin % 8 != 0 {
            for index in 0..num_bytes {
                bit_buffer.data_mut()[index] = self.next_byte()?;
            }
        } else {
            self.ensure_available(num_bytes * 8)?;
            self.set_bit_position(begin + num_bytes * 8)?;
            let source = &self.buffer[begin / 8..begin / 8 + num_bytes];
            bit_buffer.data_mut()[..num_bytes].copy_from_slice(source);
        }

        if rest_bits > 0 {
            let bits = self.read_bits(rest_bits)? as u8;
            bit_buffer.data_mut()[num_bytes] = bits << (8 - rest_bits);
        }

        Ok(bit_buffer)
    }

    /// Returns the current bit position.
    #[inline]
    pub fn bit_position(&self) -> usize {
        self.bit_index
    }

    /// Moves the reader to an absolute bit position.
    ///
    /// Positions beyond the buffer bit size fail with
    /// [`InvalidBitPosition`](BitwireError::InvalidBitPosition). The cache is
    /// invalidated and any sub-byte residue of the position is re-consumed
    /// through it.
    pub fn set_bit_position(&mut self, position: usize) -> Result<()> {
        if position > self.buffer_bit_size {
            return Err(BitwireError::InvalidBitPosition);
        }

        self.bit_index = position / 8 * 8;
        self.cache_num_bits = 0;
        let skip = (position - self.bit_index) as u8;
        if skip != 0 {
            self.ensure_available(skip.into())?;
            let _ = self.read_bits_unchecked(skip);
        }
        Ok(())
    }

    /// Advances the reader to the next multiple of `alignment` bits.
    ///
    /// Already-aligned positions are left untouched at zero cost.
    pub fn align_to(&mut self, alignment: usize) -> Result<()> {
        if alignment == 0 {
            return Err(BitwireError::InvalidAlignment);
        }
        let offset = self.bit_index % alignment;
        if offset != 0 {
            let skip = alignment - offset;
            if skip > 64 {
                return Err(BitwireError::InvalidParameter);
            }
            self.ensure_available(skip)?;
            let _ = self.read_bits_unchecked(skip as u8);
        }
        Ok(())
    }

    /// Returns the bit size of the underlying stream.
    #[inline]
    pub fn buffer_bit_size(&self) -> usize {
        self.buffer_bit_size
    }

    // --- INTERNALS ---

    fn validate_buffer(&self) -> Result<()> {
        if self.buffer.len() > MAX_BUFFER_SIZE {
            return Err(BitwireError::BufferSizeExceeded);
        }
        if self.buffer.len() < (self.buffer_bit_size + 7) / 8 {
            return Err(BitwireError::WrongBufferBitSize);
        }
        Ok(())
    }

    #[inline]
    fn ensure_available(&self, num_bits: usize) -> Result<()> {
        if self.bit_index + num_bits > self.buffer_bit_size {
            return Err(BitwireError::EndOfStream);
        }
        Ok(())
    }

    /// Refills the cache from the span. The bit index is byte aligned and the
    /// cache is empty whenever this runs.
    fn load_cache(&mut self, num_bits: u8) {
        let byte_index = self.bit_index / 8;
        if self.buffer_bit_size >= self.bit_index + CACHE_BITS as usize {
            self.cache = parse_be(&self.buffer[byte_index..byte_index + 8]);
            self.cache_num_bits = CACHE_BITS;
        } else {
            // Callers validated that num_bits more bits exist, so the tail of
            // the span backs at least that much.
            debug_assert!(self.bit_index + num_bits as usize <= self.buffer_bit_size);

            self.cache_num_bits = (self.buffer_bit_size - self.bit_index) as u8;
            let aligned_num_bits = (self.cache_num_bits + 7) & !7;
            let num_bytes = aligned_num_bits as usize / 8;
            self.cache = parse_be(&self.buffer[byte_index..byte_index + num_bytes]);
            self.cache >>= aligned_num_bits - self.cache_num_bits;
        }
    }

    /// Core read. Callers have already validated the width and availability.
    fn read_bits_unchecked(&mut self, num_bits: u8) -> u64 {
        let mut num_bits = num_bits;
        let mut value = 0u64;
        if self.cache_num_bits < num_bits {
            // Drain the cache, refill, then take the remainder.
            value = self.cache & bit_mask(self.cache_num_bits);
            self.bit_index += self.cache_num_bits as usize;
            num_bits -= self.cache_num_bits;

            self.load_cache(num_bits);

            // A full 64-bit remainder means the drained part was empty.
            if num_bits < CACHE_BITS {
                value <<= num_bits;
            }
        }
        value |= (self.cache >> (self.cache_num_bits - num_bits)) & bit_mask(num_bits);
        self.cache_num_bits -= num_bits;
        self.bit_index += num_bits as usize;

        value
    }

    fn read_signed_bits_unchecked(&mut self, num_bits: u8) -> i64 {
        let mut value = self.read_bits_unchecked(num_bits);

        // Sign-extend from the field's top bit; a full-width field is already
        // in two's complement form.
        if num_bits != 0 && num_bits < 64 && value >= 1 << (num_bits - 1) {
            value = value.wrapping_sub(1 << num_bits);
        }

        value as i64
    }

    #[inline]
    fn next_byte(&mut self) -> Result<u8> {
        self.ensure_available(8)?;
        Ok(self.read_bits_unchecked(8) as u8)
    }

    /// Shared varint decoder. Returns the accumulated magnitude, the sign bit
    /// of signed families, and how many bytes were consumed.
    fn read_var_num(&mut self, max_bytes: usize, signed: bool) -> Result<(u64, bool, usize)> {
        let byte = self.next_byte()?;
        let (mut value, sign, mut has_next) = if signed {
            (
                u64::from(byte & VARINT_BYTE_1),
                byte & VARINT_SIGN_1 != 0,
                byte & VARINT_HAS_NEXT_1 != 0,
            )
        } else {
            (
                u64::from(byte & VARNUM_BYTE_N),
                false,
                byte & VARNUM_HAS_NEXT_N != 0,
            )
        };

        let mut bytes_read = 1;
        while has_next {
            let byte = self.next_byte()?;
            bytes_read += 1;
            if bytes_read == max_bytes {
                // The final byte of a maximal encoding has no continuation
                // bit and carries all eight bits.
                value = value << 8 | u64::from(byte);
                has_next = false;
            } else {
                value = value << 7 | u64::from(byte & VARNUM_BYTE_N);
                has_next = byte & VARNUM_HAS_NEXT_N != 0;
            }
        }

        Ok((value, sign, bytes_read))
    }
}

#[inline]
fn parse_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &byte| acc << 8 | u64::from(byte))
}
