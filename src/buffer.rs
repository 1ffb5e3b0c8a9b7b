//! Owned bit-precise storage.
//!
//! A [`BitBuffer`] is the (bit-size, byte-storage) pair the wire format uses
//! wherever a payload is measured in bits rather than bytes: the top-level
//! image of a serialized compound, and `extern`-typed fields carried opaquely
//! inside another stream.
//!
//! The storage always spans `⌈bit_size / 8⌉` bytes. When `bit_size` is not a
//! multiple of eight the final byte stores its `bit_size % 8` valid bits in
//! the most significant positions; the low bits are undefined, ignored by
//! comparison and hashing, and zeroed by the reader when such a buffer comes
//! off the wire.

use std::hash::{Hash, Hasher};

use crate::error::{BitwireError, Result};

/// Owned bit storage with an exact bit length.
///
/// ## Examples
///
/// ```rust
/// use bitwire::BitBuffer;
///
/// // Eleven bits: one full byte plus three bits in the high end of byte two.
/// let buffer = BitBuffer::from_bits(vec![0xAB, 0xE0], 11)?;
/// assert_eq!(buffer.byte_size(), 2);
/// // The five undefined low bits do not participate in equality.
/// assert_eq!(buffer, BitBuffer::from_bits(vec![0xAB, 0xFF], 11)?);
/// # Ok::<(), bitwire::BitwireError>(())
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitBuffer {
    buffer: Vec<u8>,
    bit_size: usize,
}

impl BitBuffer {
    /// Creates a zero-filled buffer of `bit_size` bits.
    pub fn new(bit_size: usize) -> Self {
        Self {
            buffer: vec![0; (bit_size + 7) / 8],
            bit_size,
        }
    }

    /// Takes ownership of whole bytes; the bit size is `8 * bytes.len()`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let bit_size = bytes.len() * 8;
        Self {
            buffer: bytes,
            bit_size,
        }
    }

    /// Takes ownership of byte storage holding exactly `bit_size` bits.
    ///
    /// Fails with [`WrongBufferBitSize`](BitwireError::WrongBufferBitSize)
    /// unless the storage spans exactly `⌈bit_size / 8⌉` bytes.
    pub fn from_bits(bytes: Vec<u8>, bit_size: usize) -> Result<Self> {
        if bytes.len() != (bit_size + 7) / 8 {
            return Err(BitwireError::WrongBufferBitSize);
        }
        Ok(Self {
            buffer: bytes,
            bit_size,
        })
    }

    /// Returns the length in bits. Fixed for the buffer's lifetime.
    #[inline]
    pub fn bit_size(&self) -> usize {
        self.bit_size
    }

    /// Returns the storage size in bytes, `⌈bit_size / 8⌉`.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the byte storage.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns the byte storage mutably.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Consumes the buffer and returns its byte storage.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    // Valid bits of the final byte; a partial byte is masked down to its
    // high `bit_size % 8` bits.
    fn masked_last_byte(&self) -> Option<u8> {
        let last = *self.buffer.last()?;
        let rest_bits = self.bit_size % 8;
        if rest_bits == 0 {
            Some(last)
        } else {
            Some(last & (0xFFu8 << (8 - rest_bits)))
        }
    }
}

impl PartialEq for BitBuffer {
    fn eq(&self, other: &Self) -> bool {
        if self.bit_size != other.bit_size {
            return false;
        }
        let full_bytes = self.buffer.len().saturating_sub(1);
        self.buffer[..full_bytes] == other.buffer[..full_bytes]
            && self.masked_last_byte() == other.masked_last_byte()
    }
}

impl Eq for BitBuffer {}

impl Hash for BitBuffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bit_size.hash(state);
        let full_bytes = self.buffer.len().saturating_sub(1);
        self.buffer[..full_bytes].hash(state);
        self.masked_last_byte().hash(state);
    }
}
