//! # bitwire
//!
//! The runtime half of a schema-driven binary serialization toolchain: a
//! bit-granular wire codec plus the array engine that turns generated
//! in-memory records into a compact bit stream and back.
//!
//! ## Overview
//!
//! A schema compiler describes structures, choices, enums, bitmasks, arrays
//! and offsets, and emits per-type Rust glue. That glue never touches bytes
//! itself; every field funnels through this crate:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ generated record types (out of scope, emitted per schema) │
//! ├───────────────────────────────────────────────────────────┤
//! │ rt: Record / WireEnum contracts    api: (de)serialize     │
//! ├──────────────────────────────┬────────────────────────────┤
//! │ array: five shapes, offsets  │ delta: packing context     │
//! ├──────────────────────────────┴────────────────────────────┤
//! │ traits: per-element codecs (bitfields, varints, floats,   │
//! │         bool, string, bytes, bit buffer)                  │
//! ├───────────────────────────────────────────────────────────┤
//! │ reader / writer: cached unaligned bit streams             │
//! │ buffer: owned bit storage   size / float: codec math      │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire format
//!
//! There is no envelope, magic number or framing: the image of a top-level
//! compound is the concatenation of its fields. Bit order is MSB-first
//! within each byte; multi-byte scalars are big-endian; floats are IEEE 754
//! (16-bit fields use half precision); strings are UTF-8 with a `varsize`
//! code-unit count prefix. Nine variable-length integer families cover 16
//! to 72 bit encodings, each spending the first byte's top bits on sign and
//! continuation. Packed arrays prepend a one-bit flag plus a six-bit delta
//! width and store successors as signed deltas when that is smaller than
//! the verbatim form.
//!
//! ## Using the runtime directly
//!
//! Generated code is the primary caller, but the streams stand alone:
//!
//! ```rust
//! use bitwire::{BitReader, BitWriter};
//!
//! let mut data = [0u8; 6];
//! let mut writer = BitWriter::new(&mut data);
//! writer.write_bits(0b101, 3)?;
//! writer.write_varuint32(40_000)?;
//! writer.write_bool(true)?;
//!
//! let mut reader = bitwire::BitReader::new(&data);
//! assert_eq!(reader.read_bits(3)?, 0b101);
//! assert_eq!(reader.read_varuint32()?, 40_000);
//! assert!(reader.read_bool()?);
//! # Ok::<(), bitwire::BitwireError>(())
//! ```
//!
//! Arrays pair a shape with an element codec:
//!
//! ```rust
//! use bitwire::{Array, Auto, BitWriter, VarUInt64Traits};
//!
//! let ids: Array<_, Auto> =
//!     Array::from_elements(VarUInt64Traits, vec![7, 8, 9]);
//! let mut data = [0u8; 8];
//! let mut writer = BitWriter::new(&mut data);
//! ids.write(&mut writer)?;
//! # Ok::<(), bitwire::BitwireError>(())
//! ```
//!
//! ## Error handling
//!
//! Every fallible operation returns [`Result`]; there are no panics and no
//! partial-write rollback. See [`error`] for the taxonomy and the
//! propagation rules.
//!
//! ## Concurrency
//!
//! Operations are synchronous and run on the caller's thread. A
//! [`BitReader`] borrows its bytes immutably, so any number of readers may
//! share a span across threads; a [`BitWriter`] holds an exclusive borrow
//! and is not shareable. There is no global mutable state.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod array;
pub mod buffer;
pub mod delta;
pub mod error;
pub mod float;
pub mod reader;
pub mod rt;
pub mod size;
pub mod traits;
pub mod writer;

// --- RE-EXPORTS ---

pub use api::{
    deserialize, deserialize_from_bytes, deserialize_from_file, serialize, serialize_to_bytes,
    serialize_to_file,
};
pub use array::{
    Aligned, AlignedAuto, Array, ArrayExpressions, ArrayKind, Auto, Implicit, NoExpressions,
    Normal, PackableKind,
};
pub use buffer::BitBuffer;
pub use delta::DeltaContext;
pub use error::{BitwireError, Result};
pub use reader::BitReader;
pub use rt::{EnumTraits, Record, RecordArrayTraits, WireEnum};
pub use traits::{
    ArrayTraits, BitBufferTraits, BoolTraits, BytesTraits, DeltaPackable, FixedSizeArrayTraits,
    Float16Traits, Float32Traits, Float64Traits, SignedBitFieldTraits, SignedElement,
    StringTraits, UnsignedBitFieldTraits, UnsignedElement, VarInt16Traits, VarInt32Traits,
    VarInt64Traits, VarIntTraits, VarSizeTraits, VarUInt16Traits, VarUInt32Traits,
    VarUInt64Traits, VarUIntTraits,
};
pub use writer::BitWriter;
