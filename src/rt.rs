//! Runtime utilities for generated code.
//!
//! A schema compiler emits one Rust type per schema compound and wires it to
//! the runtime through the contracts in this module. Nothing here is useful
//! on its own; it is the seam between generated glue and the codec core.
//!
//! A generated compound implements [`Record`]: fields are read and written
//! in declaration order, sizes are measured by replaying the write sequence,
//! and offset fields are resolved by a measurement pass before the real
//! write. Compounds that contain other compounds forward
//! `initialize_children` downward so parameters reach every nested value
//! before any wire operation runs.

use std::marker::PhantomData;

use crate::error::Result;
use crate::reader::BitReader;
use crate::traits::ArrayTraits;
use crate::writer::BitWriter;

/// Contract between a generated compound type and the runtime.
///
/// The four wire operations correspond one-to-one with what the array
/// engine and the [serialize facade](crate::serialize) drive. Field order on
/// the wire is exactly declaration order; `read` must consume exactly the
/// bits `write` produces and `bit_size_of` predicts.
///
/// Records with type parameters additionally expose an `initialize` method
/// taking the actual arguments; records containing parameterized members
/// override [`initialize_children`](Self::initialize_children) to forward
/// themselves downward. Both are invoked by the facade before any wire
/// operation.
pub trait Record: Sized {
    /// Reads a value field-by-field from the stream.
    fn read(reader: &mut BitReader<'_>) -> Result<Self>;

    /// Writes the value field-by-field to the stream.
    fn write(&self, writer: &mut BitWriter<'_>) -> Result<()>;

    /// Returns the bit size of the value when written at `bit_position`.
    fn bit_size_of(&self, bit_position: usize) -> Result<usize>;

    /// Resolves offset fields against `bit_position` and returns the
    /// position just past the value.
    ///
    /// The default covers records without offset members: size equals
    /// advance.
    fn initialize_offsets(&mut self, bit_position: usize) -> Result<usize> {
        let size = self.bit_size_of(bit_position)?;
        Ok(bit_position + size)
    }

    /// Propagates parameters into nested compounds.
    ///
    /// The default covers records without parameterized members.
    fn initialize_children(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapter exposing a [`Record`] type as an array element codec.
///
/// Generated code uses this for arrays of parameterless compounds; arrays
/// of parameterized compounds get a hand-emitted codec that captures the
/// actual arguments instead.
pub struct RecordArrayTraits<R> {
    _record: PhantomData<R>,
}

impl<R> RecordArrayTraits<R> {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<R> Default for RecordArrayTraits<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for RecordArrayTraits<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecordArrayTraits")
    }
}

impl<R> Clone for RecordArrayTraits<R> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<R: Record> ArrayTraits for RecordArrayTraits<R> {
    type Element = R;

    fn bit_size_of(&self, bit_position: usize, element: &R) -> Result<usize> {
        element.bit_size_of(bit_position)
    }

    fn initialize_offsets(&self, bit_position: usize, element: &mut R) -> Result<usize> {
        element.initialize_offsets(bit_position)
    }

    fn read(&self, reader: &mut BitReader<'_>, _index: usize) -> Result<R> {
        R::read(reader)
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &R) -> Result<()> {
        element.write(writer)
    }
}

/// Contract between a generated schema enumeration and the runtime.
///
/// Generated enums store their wire representation as `Raw` and convert
/// with [`from_raw`](Self::from_raw), failing with
/// [`InvalidEnumValue`](crate::BitwireError::InvalidEnumValue) on values
/// the schema does not name.
pub trait WireEnum: Sized + Copy {
    /// The underlying wire value type.
    type Raw: Copy;

    /// Returns the wire value.
    fn to_raw(self) -> Self::Raw;

    /// Converts a wire value back, rejecting unknown values.
    fn from_raw(raw: Self::Raw) -> Result<Self>;
}

/// Adapter exposing a [`WireEnum`] as an array element codec over its
/// underlying value codec.
#[derive(Debug, Clone, Copy)]
pub struct EnumTraits<E, T> {
    underlying: T,
    _element: PhantomData<E>,
}

impl<E, T> EnumTraits<E, T> {
    /// Creates the adapter over the enum's underlying value codec.
    pub fn new(underlying: T) -> Self {
        Self {
            underlying,
            _element: PhantomData,
        }
    }
}

impl<E, T> ArrayTraits for EnumTraits<E, T>
where
    E: WireEnum,
    T: ArrayTraits<Element = E::Raw>,
{
    type Element = E;

    fn bit_size_of(&self, bit_position: usize, element: &E) -> Result<usize> {
        self.underlying.bit_size_of(bit_position, &element.to_raw())
    }

    fn read(&self, reader: &mut BitReader<'_>, index: usize) -> Result<E> {
        E::from_raw(self.underlying.read(reader, index)?)
    }

    fn write(&self, writer: &mut BitWriter<'_>, element: &E) -> Result<()> {
        self.underlying.write(writer, &element.to_raw())
    }

    fn constant_bit_size(&self) -> Option<usize> {
        self.underlying.constant_bit_size()
    }
}
