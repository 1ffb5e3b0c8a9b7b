//! High-level serialize/deserialize entry points.
//!
//! The functions here are convenience wrappers over the [`Record`] contract
//! for callers that do not manage buffers themselves. Serialization runs in
//! two passes: a measurement pass (`initialize_children` then
//! `initialize_offsets(0)`, which both sizes the value and resolves its
//! offset fields) and a write pass into an exactly-sized [`BitBuffer`]. The
//! size-prediction law makes the second pass infallible in practice: the
//! writer finishes at precisely the measured position.
//!
//! The file helpers round a serialized image through the filesystem. The
//! read path memory-maps the file when the `mmap` feature is enabled and
//! falls back to an in-memory read otherwise; either way the deserializer
//! sees a plain byte span.

use std::path::Path;

use crate::buffer::BitBuffer;
use crate::error::{BitwireError, Result};
use crate::reader::BitReader;
use crate::rt::Record;
use crate::writer::BitWriter;

/// Serializes a record into an exactly-sized [`BitBuffer`].
///
/// Runs `initialize_children` and `initialize_offsets` first, so offset
/// fields come out resolved.
///
/// ## Examples
///
/// ```rust
/// use bitwire::{BitReader, BitWriter, Record, Result};
///
/// struct Point {
///     x: u32,
///     y: u32,
/// }
///
/// impl Record for Point {
///     fn read(reader: &mut BitReader<'_>) -> Result<Self> {
///         Ok(Self {
///             x: reader.read_bits(32)?,
///             y: reader.read_bits(32)?,
///         })
///     }
///
///     fn write(&self, writer: &mut BitWriter<'_>) -> Result<()> {
///         writer.write_bits(self.x, 32)?;
///         writer.write_bits(self.y, 32)
///     }
///
///     fn bit_size_of(&self, _bit_position: usize) -> Result<usize> {
///         Ok(64)
///     }
/// }
///
/// let mut point = Point { x: 1, y: 2 };
/// let buffer = bitwire::serialize(&mut point)?;
/// assert_eq!(buffer.bit_size(), 64);
///
/// let read_back: Point = bitwire::deserialize(&buffer)?;
/// assert_eq!(read_back.x, 1);
/// # Ok::<(), bitwire::BitwireError>(())
/// ```
pub fn serialize<T: Record>(record: &mut T) -> Result<BitBuffer> {
    record.initialize_children()?;
    let bit_size = record.initialize_offsets(0)?;

    let mut buffer = BitBuffer::new(bit_size);
    let mut writer = BitWriter::from_buffer(&mut buffer);
    record.write(&mut writer)?;
    Ok(buffer)
}

/// Serializes a record into whole bytes.
///
/// The final byte is zero-padded when the record's bit size is not a
/// multiple of eight.
pub fn serialize_to_bytes<T: Record>(record: &mut T) -> Result<Vec<u8>> {
    Ok(serialize(record)?.into_bytes())
}

/// Deserializes a record from a [`BitBuffer`].
pub fn deserialize<T: Record>(buffer: &BitBuffer) -> Result<T> {
    let mut reader = BitReader::from_buffer(buffer);
    T::read(&mut reader)
}

/// Deserializes a record from a byte span.
pub fn deserialize_from_bytes<T: Record>(bytes: &[u8]) -> Result<T> {
    let mut reader = BitReader::new(bytes);
    T::read(&mut reader)
}

/// Serializes a record and writes the image to a file.
pub fn serialize_to_file<T: Record>(record: &mut T, path: impl AsRef<Path>) -> Result<()> {
    let buffer = serialize(record)?;
    std::fs::write(path, buffer.data()).map_err(|_| BitwireError::FileWriteFailed)
}

/// Reads a file and deserializes a record from its contents.
///
/// With the `mmap` feature the file is memory-mapped and decoded in place;
/// otherwise it is read into memory first.
pub fn deserialize_from_file<T: Record>(path: impl AsRef<Path>) -> Result<T> {
    let source = FileSource::open(path.as_ref())?;
    deserialize_from_bytes(&source)
}

// Where the bytes of a file-backed read live. Mirrors the two read
// strategies: a mapped region shared with the page cache, or a plain copy.
enum FileSource {
    #[cfg(feature = "mmap")]
    Mapped(memmap2::Mmap),
    #[cfg(not(feature = "mmap"))]
    Memory(Vec<u8>),
}

impl FileSource {
    #[cfg(feature = "mmap")]
    #[allow(unsafe_code)]
    fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|_| BitwireError::FileOpenFailed)?;
        // Safety contract of mapping a file: the image must not be mutated
        // externally while mapped. Deserialization is a single pass over an
        // immutable snapshot, the same assumption every mmap reader makes.
        match unsafe { memmap2::Mmap::map(&file) } {
            Ok(mapped) => Ok(Self::Mapped(mapped)),
            Err(_) => Err(BitwireError::FileReadFailed),
        }
    }

    #[cfg(not(feature = "mmap"))]
    fn open(path: &Path) -> Result<Self> {
        std::fs::read(path)
            .map(Self::Memory)
            .map_err(|_| BitwireError::FileReadFailed)
    }
}

impl std::ops::Deref for FileSource {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(feature = "mmap")]
            Self::Mapped(mapped) => mapped,
            #[cfg(not(feature = "mmap"))]
            Self::Memory(bytes) => bytes,
        }
    }
}
