//! The write side of the wire codec: unaligned bit emission.
//!
//! [`BitWriter`] emits bits into a caller-owned mutable byte span, or runs in
//! *measurement mode* with no span at all, in which case every write
//! advances the bit index without touching memory. Measurement mode is how
//! `bit_size_of` composes: generated code replays its write sequence against
//! a measuring writer and reads off the final position.
//!
//! Encoding mirrors the reader exactly: MSB-first within each byte,
//! big-endian across bytes, two's complement for signed scalars. Partial
//! bytes are updated read-modify-write so alignment padding never disturbs
//! previously written neighbors.
//!
//! ## Contract
//!
//! Every write first checks capacity (`bit_index + width` must not exceed
//! the declared buffer bit size) and fails with
//! [`BufferOverflow`](crate::BitwireError::BufferOverflow) otherwise.
//! Capacity is enforced in measurement mode too, so a measuring writer
//! doubles as a size guard with a fixed upper bound. A failed write leaves
//! the buffer partially populated; callers must treat it as garbage.

use crate::buffer::BitBuffer;
use crate::error::{BitwireError, Result};
use crate::float;
use crate::size::{
    bit_size_of_varint, bit_size_of_varint16, bit_size_of_varint32, bit_size_of_varint64,
    bit_size_of_varsize, bit_size_of_varuint, bit_size_of_varuint16, bit_size_of_varuint32,
    bit_size_of_varuint64, convert_size_to_u32,
};

/// Sequential bit-granular writer over a borrowed mutable byte span.
///
/// ## Examples
///
/// ```rust
/// use bitwire::BitWriter;
///
/// let mut data = [0u8; 3];
/// let mut writer = BitWriter::new(&mut data);
/// writer.write_bits(0x7F, 7)?;
/// writer.write_bool(true)?;
/// writer.write_bits(0x1234, 16)?;
/// assert_eq!(data, [0xFF, 0x12, 0x34]);
/// # Ok::<(), bitwire::BitwireError>(())
/// ```
///
/// Measuring the same sequence without a buffer:
///
/// ```rust
/// use bitwire::BitWriter;
///
/// let mut writer = BitWriter::measuring(24);
/// writer.write_bits(0x7F, 7)?;
/// writer.write_bool(true)?;
/// writer.write_bits(0x1234, 16)?;
/// assert_eq!(writer.bit_position(), 24);
/// # Ok::<(), bitwire::BitwireError>(())
/// ```
#[derive(Debug)]
pub struct BitWriter<'a> {
    buffer: Option<&'a mut [u8]>,
    bit_index: usize,
    buffer_bit_size: usize,
}

impl<'a> BitWriter<'a> {
    /// Creates a writer over a whole byte span (`8 * buffer.len()` bits).
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let buffer_bit_size = buffer.len() * 8;
        Self {
            buffer: Some(buffer),
            bit_index: 0,
            buffer_bit_size,
        }
    }

    /// Creates a writer over a span with an exact bit size.
    ///
    /// Fails with [`WrongBufferBitSize`](BitwireError::WrongBufferBitSize)
    /// when the span cannot back the declared size.
    pub fn with_bit_size(buffer: &'a mut [u8], buffer_bit_size: usize) -> Result<Self> {
        if buffer.len() < (buffer_bit_size + 7) / 8 {
            return Err(BitwireError::WrongBufferBitSize);
        }
        Ok(Self {
            buffer: Some(buffer),
            bit_index: 0,
            buffer_bit_size,
        })
    }

    /// Creates a writer over the storage of a [`BitBuffer`].
    pub fn from_buffer(bit_buffer: &'a mut BitBuffer) -> Self {
        let buffer_bit_size = bit_buffer.bit_size();
        Self {
            buffer: Some(bit_buffer.data_mut()),
            bit_index: 0,
            buffer_bit_size,
        }
    }

    /// Creates a measurement-mode writer with the given capacity.
    ///
    /// All writes succeed as no-ops (capacity permitting) and only move the
    /// bit index. Use `usize::MAX` for an effectively unbounded measurement.
    pub fn measuring(buffer_bit_size: usize) -> Self {
        Self {
            buffer: None,
            bit_index: 0,
            buffer_bit_size,
        }
    }

    /// Writes the low `num_bits` bits of `value`, MSB first, up to 32.
    pub fn write_bits(&mut self, value: u32, num_bits: u8) -> Result<()> {
        if num_bits > 32 {
            return Err(BitwireError::InvalidNumBits);
        }
        self.check_capacity(num_bits)?;
        self.write_bits_unchecked(value.into(), num_bits);
        Ok(())
    }

    /// Writes the low `num_bits` bits of `value`, MSB first, up to 64.
    pub fn write_bits_64(&mut self, value: u64, num_bits: u8) -> Result<()> {
        if num_bits > 64 {
            return Err(BitwireError::InvalidNumBits);
        }
        self.check_capacity(num_bits)?;
        self.write_bits_unchecked(value, num_bits);
        Ok(())
    }

    /// Writes a signed value as a two's complement field of `num_bits` bits,
    /// up to 32.
    pub fn write_signed_bits(&mut self, value: i32, num_bits: u8) -> Result<()> {
        if num_bits > 32 {
            return Err(BitwireError::InvalidNumBits);
        }
        self.write_signed_bits_64(value.into(), num_bits)
    }

    /// Writes a signed value as a two's complement field of `num_bits` bits,
    /// up to 64.
    pub fn write_signed_bits_64(&mut self, value: i64, num_bits: u8) -> Result<()> {
        if num_bits > 64 {
            return Err(BitwireError::InvalidNumBits);
        }
        self.check_capacity(num_bits)?;
        let mask = if num_bits == 64 {
            u64::MAX
        } else if num_bits == 0 {
            0
        } else {
            (1u64 << num_bits) - 1
        };
        self.write_bits_unchecked(value as u64 & mask, num_bits);
        Ok(())
    }

    /// Writes a bool as a single bit.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.check_capacity(1)?;
        self.write_bits_unchecked(u64::from(value), 1);
        Ok(())
    }

    /// Writes a `varint16` (1 to 2 bytes).
    pub fn write_varint16(&mut self, value: i16) -> Result<()> {
        let num_bytes = bit_size_of_varint16(value)? / 8;
        self.write_var_num(u64::from(value.unsigned_abs()), true, value < 0, num_bytes, 2)
    }

    /// Writes a `varint32` (1 to 4 bytes).
    pub fn write_varint32(&mut self, value: i32) -> Result<()> {
        let num_bytes = bit_size_of_varint32(value)? / 8;
        self.write_var_num(u64::from(value.unsigned_abs()), true, value < 0, num_bytes, 4)
    }

    /// Writes a `varint64` (1 to 8 bytes).
    pub fn write_varint64(&mut self, value: i64) -> Result<()> {
        let num_bytes = bit_size_of_varint64(value)? / 8;
        self.write_var_num(value.unsigned_abs(), true, value < 0, num_bytes, 8)
    }

    /// Writes a `varint` (1 to 9 bytes).
    ///
    /// `i64::MIN` is encoded as the single negative-zero byte `0x80`.
    pub fn write_varint(&mut self, value: i64) -> Result<()> {
        if value == i64::MIN {
            self.check_capacity(8)?;
            self.write_bits_unchecked(0x80, 8);
            return Ok(());
        }
        let num_bytes = bit_size_of_varint(value)? / 8;
        self.write_var_num(value.unsigned_abs(), true, value < 0, num_bytes, 9)
    }

    /// Writes a `varuint16` (1 to 2 bytes).
    pub fn write_varuint16(&mut self, value: u16) -> Result<()> {
        let num_bytes = bit_size_of_varuint16(value)? / 8;
        self.write_var_num(value.into(), false, false, num_bytes, 2)
    }

    /// Writes a `varuint32` (1 to 4 bytes).
    pub fn write_varuint32(&mut self, value: u32) -> Result<()> {
        let num_bytes = bit_size_of_varuint32(value)? / 8;
        self.write_var_num(value.into(), false, false, num_bytes, 4)
    }

    /// Writes a `varuint64` (1 to 8 bytes).
    pub fn write_varuint64(&mut self, value: u64) -> Result<()> {
        let num_bytes = bit_size_of_varuint64(value)? / 8;
        self.write_var_num(value, false, false, num_bytes, 8)
    }

    /// Writes a `varuint` (1 to 9 bytes).
    pub fn write_varuint(&mut self, value: u64) -> Result<()> {
        let num_bytes = bit_size_of_varuint(value)? / 8;
        self.write_var_num(value, false, false, num_bytes, 9)
    }

    /// Writes a `varsize` (1 to 5 bytes).
    ///
    /// Values above `2^31 - 1` fail with
    /// [`OutOfRange`](BitwireError::OutOfRange) before anything is emitted.
    pub fn write_varsize(&mut self, value: u32) -> Result<()> {
        let num_bytes = bit_size_of_varsize(value)? / 8;
        self.write_var_num(value.into(), false, false, num_bytes, 5)
    }

    /// Writes an `f32` narrowed to IEEE 754 half precision (16 bits).
    pub fn write_float16(&mut self, value: f32) -> Result<()> {
        self.check_capacity(16)?;
        self.write_bits_unchecked(u64::from(float::f16_bits_from_f32(value)), 16);
        Ok(())
    }

    /// Writes an `f32` as its IEEE 754 single-precision bits (32 bits).
    pub fn write_float32(&mut self, value: f32) -> Result<()> {
        self.check_capacity(32)?;
        self.write_bits_unchecked(u64::from(value.to_bits()), 32);
        Ok(())
    }

    /// Writes an `f64` as its IEEE 754 double-precision bits (64 bits).
    pub fn write_float64(&mut self, value: f64) -> Result<()> {
        self.check_capacity(64)?;
        self.write_bits_unchecked(value.to_bits(), 64);
        Ok(())
    }

    /// Writes a varsize length prefix followed by the raw bytes.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_varsize(convert_size_to_u32(value.len())?)?;
        self.write_payload(value)
    }

    /// Writes a varsize length prefix followed by the string's UTF-8 bytes.
    ///
    /// The prefix counts code units, not code points.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Writes a varsize *bit* length prefix followed by the buffer's bits.
    ///
    /// For a sub-byte tail the high `len % 8` bits of the final byte are
    /// emitted.
    pub fn write_bit_buffer(&mut self, bit_buffer: &BitBuffer) -> Result<()> {
        let bit_size = bit_buffer.bit_size();
        self.write_varsize(convert_size_to_u32(bit_size)?)?;

        let num_bytes = bit_size / 8;
        let rest_bits = (bit_size % 8) as u8;
        self.write_payload(&bit_buffer.data()[..num_bytes])?;

        if rest_bits > 0 {
            let last = bit_buffer.data()[num_bytes];
            self.check_capacity(rest_bits)?;
            self.write_bits_unchecked(u64::from(last >> (8 - rest_bits)), rest_bits);
        }
        Ok(())
    }

    /// Returns the current bit position.
    #[inline]
    pub fn bit_position(&self) -> usize {
        self.bit_index
    }

    /// Moves the writer to an absolute bit position.
    ///
    /// Positions beyond the buffer bit size fail with
    /// [`InvalidBitPosition`](BitwireError::InvalidBitPosition).
    pub fn set_bit_position(&mut self, position: usize) -> Result<()> {
        if position > self.buffer_bit_size {
            return Err(BitwireError::InvalidBitPosition);
        }
        self.bit_index = position;
        Ok(())
    }

    /// Advances the writer to the next multiple of `alignment` bits.
    ///
    /// Padding bits are left undefined; neighboring written bits are never
    /// disturbed.
    pub fn align_to(&mut self, alignment: usize) -> Result<()> {
        if alignment == 0 {
            return Err(BitwireError::InvalidAlignment);
        }
        let offset = self.bit_index % alignment;
        if offset != 0 {
            let skip = alignment - offset;
            if self.bit_index + skip > self.buffer_bit_size {
                return Err(BitwireError::BufferOverflow);
            }
            self.bit_index += skip;
        }
        Ok(())
    }

    /// Returns true when a destination buffer is attached (not measuring).
    #[inline]
    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    /// Returns the declared capacity in bits.
    #[inline]
    pub fn buffer_bit_size(&self) -> usize {
        self.buffer_bit_size
    }

    // --- INTERNALS ---

    #[inline]
    fn check_capacity(&self, num_bits: u8) -> Result<()> {
        if self.bit_index + num_bits as usize > self.buffer_bit_size {
            return Err(BitwireError::BufferOverflow);
        }
        Ok(())
    }

    /// Core write. Capacity has been checked; only the low `num_bits` bits
    /// of `value` are consumed. Partial bytes are merged read-modify-write.
    fn write_bits_unchecked(&mut self, value: u64, num_bits: u8) {
        let Some(buffer) = self.buffer.as_deref_mut() else {
            self.bit_index += num_bits as usize;
            return;
        };

        let mut remaining = num_bits as usize;
        while remaining > 0 {
            let byte_index = self.bit_index / 8;
            let used = self.bit_index % 8;
            let free = 8 - used;
            let chunk = remaining.min(free);

            let chunk_bits = ((value >> (remaining - chunk)) & ((1u64 << chunk) - 1)) as u8;
            let dest_shift = free - chunk;
            let mask = (((1u16 << chunk) - 1) as u8) << dest_shift;
            buffer[byte_index] = (buffer[byte_index] & !mask) | (chunk_bits << dest_shift);

            self.bit_index += chunk;
            remaining -= chunk;
        }
    }

    /// Emits a varint body: `num_bytes` bytes big-endian with continuation
    /// bits, the sign in bit 7 of the first byte for signed families, and a
    /// full 8-bit final byte when the encoding uses the family's maximum.
    fn write_var_num(
        &mut self,
        value: u64,
        has_sign: bool,
        is_negative: bool,
        num_bytes: usize,
        max_bytes: usize,
    ) -> Result<()> {
        self.check_capacity_bits(num_bytes * 8)?;

        let has_max_byte_range = num_bytes == max_bytes;
        for index in 0..num_bytes {
            let has_next_byte = index < num_bytes - 1;
            let has_sign_bit = has_sign && index == 0;

            let mut byte = 0u8;
            let mut num_bits = 8u8;
            if has_sign_bit {
                if is_negative {
                    byte |= 0x80;
                }
                num_bits -= 1;
            }
            if has_next_byte {
                num_bits -= 1;
                byte |= 1u8 << num_bits; // continuation bit
            } else if !has_max_byte_range {
                // The last byte keeps its continuation slot (cleared) unless
                // the encoding spans the family's full byte budget.
                num_bits -= 1;
            }

            let shift = (num_bytes - index - 1) * 7
                + usize::from(has_max_byte_range && has_next_byte);
            byte |= ((value >> shift) & ((1u64 << num_bits) - 1)) as u8;
            self.write_bits_unchecked(u64::from(byte), 8);
        }
        Ok(())
    }

    fn check_capacity_bits(&self, num_bits: usize) -> Result<()> {
        if self.bit_index + num_bits > self.buffer_bit_size {
            return Err(BitwireError::BufferOverflow);
        }
        Ok(())
    }

    /// Byte-payload writer shared by bytes, strings and bit buffers:
    /// wholesale copy when byte-aligned, bit-cache slow path otherwise.
    fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.check_capacity_bits(payload.len() * 8)?;

        if self.bit_index % 8 != 0 {
            for &byte in payload {
                self.write_bits_unchecked(u64::from(byte), 8);
            }
            return Ok(());
        }

        let begin = self.bit_index / 8;
        if let Some(buffer) = self.buffer.as_deref_mut() {
            buffer[begin..begin + payload.len()].copy_from_slice(payload);
        }
        self.bit_index += payload.len() * 8;
        Ok(())
    }
}
