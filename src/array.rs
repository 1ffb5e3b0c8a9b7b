//! The array engine: five shapes, plain or delta-packed.
//!
//! [`Array`] owns the raw element vector and drives an element codec
//! ([`ArrayTraits`]) across it for the four operations every generated
//! compound needs (`bit_size_of`, `initialize_offsets`, `read`, `write`),
//! plus their packed counterparts. The shape is a type parameter, so each
//! (codec, shape) pair monomorphizes separately and shape-illegal
//! operations simply do not exist:
//!
//! | Shape | Length source | Element alignment | Packable |
//! |---|---|---|---|
//! | [`Normal`] | caller-supplied | none | yes |
//! | [`Implicit`] | remaining bits ÷ element size | none | no |
//! | [`Aligned`] | caller-supplied | byte per element | yes |
//! | [`Auto`] | varsize prefix | none | yes |
//! | [`AlignedAuto`] | varsize prefix | byte per element | yes |
//!
//! Implicit arrays additionally require a constant-size codec
//! ([`FixedSizeArrayTraits`]), enforced by the bound on their `read`.
//!
//! ## Offset hooks
//!
//! Aligned shapes interleave byte alignment with the optional
//! [`ArrayExpressions`] hooks: the offset-initialization pass records each
//! element's byte position into the owner via `initialize_offset`, and both
//! read and write verify the recorded positions via `check_offset`. Arrays
//! without hooks pass [`NoExpressions`].
//!
//! ## Packed operations
//!
//! The packed variants run the two-pass protocol of
//! [`DeltaContext`](crate::DeltaContext): one init pass over all elements,
//! then the emit (or size, or offset) pass, both sharing a single context
//! created for that operation.

use std::marker::PhantomData;

use crate::delta::DeltaContext;
use crate::error::{BitwireError, Result};
use crate::reader::BitReader;
use crate::size::{align_to, bit_size_of_varsize, convert_size_to_u32};
use crate::traits::{ArrayTraits, DeltaPackable, FixedSizeArrayTraits};
use crate::writer::BitWriter;

/// Shape marker: caller-supplied length, no inter-element alignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normal;

/// Shape marker: length inferred from the remaining whole elements in the
/// stream. Requires a constant-size element codec and cannot be packed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Implicit;

/// Shape marker: caller-supplied length, each element byte-aligned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aligned;

/// Shape marker: varsize length prefix, no inter-element alignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Auto;

/// Shape marker: varsize length prefix, each element byte-aligned.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignedAuto;

/// Compile-time description of an array shape.
pub trait ArrayKind {
    /// True when every element starts on a byte boundary.
    const IS_ALIGNED: bool;
    /// True when the length travels as a varsize prefix.
    const HAS_LENGTH_PREFIX: bool;
}

/// Shapes whose arrays may be delta-packed (every shape except implicit).
pub trait PackableKind: ArrayKind {}

impl ArrayKind for Normal {
    const IS_ALIGNED: bool = false;
    const HAS_LENGTH_PREFIX: bool = false;
}
impl PackableKind for Normal {}

impl ArrayKind for Implicit {
    const IS_ALIGNED: bool = false;
    const HAS_LENGTH_PREFIX: bool = false;
}

impl ArrayKind for Aligned {
    const IS_ALIGNED: bool = true;
    const HAS_LENGTH_PREFIX: bool = false;
}
impl PackableKind for Aligned {}

impl ArrayKind for Auto {
    const IS_ALIGNED: bool = false;
    const HAS_LENGTH_PREFIX: bool = true;
}
impl PackableKind for Auto {}

impl ArrayKind for AlignedAuto {
    const IS_ALIGNED: bool = true;
    const HAS_LENGTH_PREFIX: bool = true;
}
impl PackableKind for AlignedAuto {}

/// Optional per-array hooks for offset bookkeeping and cross-field element
/// initialization.
///
/// Implementors capture whatever owner state the hooks need; generated code
/// constructs them per call over the enclosing compound's fields. All hooks
/// default to no-ops, so an implementor overrides only what its schema
/// declares.
pub trait ArrayExpressions<E> {
    /// Propagates owner parameters into `element` (the
    /// `initialize_elements` phase).
    fn initialize_element(&mut self, element: &mut E, index: usize) -> Result<()> {
        let _ = (element, index);
        Ok(())
    }

    /// Records the byte offset of element `index` into the owner.
    fn initialize_offset(&mut self, index: usize, byte_offset: usize) -> Result<()> {
        let _ = (index, byte_offset);
        Ok(())
    }

    /// Verifies the recorded byte offset of element `index`.
    ///
    /// A mismatch fails with [`InvalidOffset`](BitwireError::InvalidOffset).
    fn check_offset(&self, index: usize, byte_offset: usize) -> Result<()> {
        let _ = (index, byte_offset);
        Ok(())
    }
}

/// The empty hook set for arrays without offset or parameter expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExpressions;

impl<E> ArrayExpressions<E> for NoExpressions {}

/// A schema array: raw elements plus the codec and shape that put them on
/// the wire.
///
/// ## Examples
///
/// ```rust
/// use bitwire::{Array, Auto, BitReader, BitWriter, VarUInt32Traits};
///
/// let array: Array<_, Auto> =
///     Array::from_elements(VarUInt32Traits, vec![1, 100, 10_000]);
///
/// let mut data = [0u8; 16];
/// let mut writer = BitWriter::new(&mut data);
/// array.write(&mut writer)?;
///
/// let mut read_back: Array<_, Auto> = Array::new(VarUInt32Traits);
/// let mut reader = BitReader::new(&data);
/// read_back.read(&mut reader)?;
/// assert_eq!(read_back.elements(), array.elements());
/// # Ok::<(), bitwire::BitwireError>(())
/// ```
pub struct Array<T: ArrayTraits, K: ArrayKind = Normal> {
    traits: T,
    elements: Vec<T::Element>,
    _kind: PhantomData<K>,
}

impl<T, K> Clone for Array<T, K>
where
    T: ArrayTraits + Clone,
    T::Element: Clone,
    K: ArrayKind,
{
    fn clone(&self) -> Self {
        Self {
            traits: self.traits.clone(),
            elements: self.elements.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T, K> std::fmt::Debug for Array<T, K>
where
    T: ArrayTraits,
    T::Element: std::fmt::Debug,
    K: ArrayKind,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.elements.iter()).finish()
    }
}

impl<T: ArrayTraits, K: ArrayKind> Array<T, K> {
    /// Creates an empty array over the given element codec.
    pub fn new(traits: T) -> Self {
        Self {
            traits,
            elements: Vec::new(),
            _kind: PhantomData,
        }
    }

    /// Creates an array from existing elements.
    pub fn from_elements(traits: T, elements: Vec<T::Element>) -> Self {
        Self {
            traits,
            elements,
            _kind: PhantomData,
        }
    }

    /// Returns the elements.
    #[inline]
    pub fn elements(&self) -> &[T::Element] {
        &self.elements
    }

    /// Returns the elements mutably.
    #[inline]
    pub fn elements_mut(&mut self) -> &mut Vec<T::Element> {
        &mut self.elements
    }

    /// Consumes the array and returns its elements.
    pub fn into_elements(self) -> Vec<T::Element> {
        self.elements
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true when the array holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Runs the element-initialization phase: `initialize_element` for every
    /// element in order.
    ///
    /// Called by the enclosing compound after its parameters are set, before
    /// any of the four wire operations.
    pub fn initialize_elements<X>(&mut self, expressions: &mut X) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        for (index, element) in self.elements.iter_mut().enumerate() {
            expressions.initialize_element(element, index)?;
        }
        Ok(())
    }

    /// Returns the bit size of the array when written at `bit_position`.
    pub fn bit_size_of(&self, bit_position: usize) -> Result<usize> {
        let mut end_position = bit_position;
        self.add_length_prefix_size(&mut end_position)?;

        if self.elements.is_empty() {
            return Ok(end_position - bit_position);
        }

        if let Some(element_bit_size) = self.traits.constant_bit_size() {
            end_position += Self::const_elements_bit_size(
                end_position,
                self.elements.len(),
                element_bit_size,
            );
            return Ok(end_position - bit_position);
        }

        for element in &self.elements {
            if K::IS_ALIGNED {
                end_position = align_to(8, end_position);
            }
            end_position += self.traits.bit_size_of(end_position, element)?;
        }
        Ok(end_position - bit_position)
    }

    /// Resolves offsets through the array without hooks and returns the end
    /// bit position.
    pub fn initialize_offsets(&mut self, bit_position: usize) -> Result<usize> {
        self.initialize_offsets_with(bit_position, &mut NoExpressions)
    }

    /// Resolves offsets through the array, recording each element's byte
    /// position via `initialize_offset` on aligned shapes, and returns the
    /// end bit position.
    pub fn initialize_offsets_with<X>(
        &mut self,
        bit_position: usize,
        expressions: &mut X,
    ) -> Result<usize>
    where
        X: ArrayExpressions<T::Element>,
    {
        let mut end_position = bit_position;
        self.add_length_prefix_size(&mut end_position)?;

        for (index, element) in self.elements.iter_mut().enumerate() {
            if K::IS_ALIGNED {
                end_position = align_to(8, end_position);
                expressions.initialize_offset(index, end_position / 8)?;
            }
            end_position = self.traits.initialize_offsets(end_position, element)?;
        }
        Ok(end_position)
    }

    /// Writes the array without hooks.
    pub fn write(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        self.write_with(writer, &mut NoExpressions)
    }

    /// Writes the array, verifying recorded offsets on aligned shapes.
    pub fn write_with<X>(&self, writer: &mut BitWriter<'_>, expressions: &mut X) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        self.write_length_prefix(writer)?;
        for (index, element) in self.elements.iter().enumerate() {
            Self::align_and_check(writer.bit_position(), index, expressions)?;
            if K::IS_ALIGNED {
                writer.align_to(8)?;
            }
            self.traits.write(writer, element)?;
        }
        Ok(())
    }

    // --- SHARED HELPERS ---

    fn add_length_prefix_size(&self, bit_position: &mut usize) -> Result<()> {
        if K::HAS_LENGTH_PREFIX {
            let length = convert_size_to_u32(self.elements.len())?;
            *bit_position += bit_size_of_varsize(length)?;
        }
        Ok(())
    }

    fn write_length_prefix(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        if K::HAS_LENGTH_PREFIX {
            writer.write_varsize(convert_size_to_u32(self.elements.len())?)?;
        }
        Ok(())
    }

    // Alignment bookkeeping shared by read and write: the offset check runs
    // against the position the element will actually start at.
    fn align_and_check<X>(bit_position: usize, index: usize, expressions: &X) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        if K::IS_ALIGNED {
            let aligned = align_to(8, bit_position);
            expressions.check_offset(index, aligned / 8)?;
        }
        Ok(())
    }

    // Closed-form size of `length` constant-size elements; aligned shapes
    // pad every element after the first to a byte multiple.
    fn const_elements_bit_size(bit_position: usize, length: usize, element_bit_size: usize) -> usize {
        if K::IS_ALIGNED {
            let start = align_to(8, bit_position);
            let end = start + element_bit_size + (length - 1) * align_to(8, element_bit_size);
            end - bit_position
        } else {
            length * element_bit_size
        }
    }

    fn read_elements<X>(
        &mut self,
        reader: &mut BitReader<'_>,
        length: usize,
        expressions: &mut X,
    ) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        self.elements.clear();
        self.elements.reserve(length);
        for index in 0..length {
            Self::align_and_check(reader.bit_position(), index, expressions)?;
            if K::IS_ALIGNED {
                reader.align_to(8)?;
            }
            let element = self.traits.read(reader, index)?;
            self.elements.push(element);
        }
        Ok(())
    }
}

// Packed operation set; absent for Implicit by the PackableKind bound.
impl<T, K> Array<T, K>
where
    T: ArrayTraits,
    T::Element: DeltaPackable,
    K: PackableKind,
{
    /// Returns the bit size of the delta-packed array when written at
    /// `bit_position`.
    pub fn bit_size_of_packed(&self, bit_position: usize) -> Result<usize> {
        let mut end_position = bit_position;
        self.add_length_prefix_size(&mut end_position)?;

        if !self.elements.is_empty() {
            let mut context = DeltaContext::new();
            for element in &self.elements {
                context.init(&self.traits, element)?;
            }
            for element in &self.elements {
                if K::IS_ALIGNED {
                    end_position = align_to(8, end_position);
                }
                end_position += context.bit_size_of(&self.traits, element)?;
            }
        }
        Ok(end_position - bit_position)
    }

    /// Resolves offsets through the delta-packed array without hooks.
    pub fn initialize_offsets_packed(&mut self, bit_position: usize) -> Result<usize> {
        self.initialize_offsets_packed_with(bit_position, &mut NoExpressions)
    }

    /// Resolves offsets through the delta-packed array, recording element
    /// byte positions on aligned shapes.
    pub fn initialize_offsets_packed_with<X>(
        &mut self,
        bit_position: usize,
        expressions: &mut X,
    ) -> Result<usize>
    where
        X: ArrayExpressions<T::Element>,
    {
        let mut end_position = bit_position;
        self.add_length_prefix_size(&mut end_position)?;

        if !self.elements.is_empty() {
            let mut context = DeltaContext::new();
            for element in &self.elements {
                context.init(&self.traits, element)?;
            }
            for (index, element) in self.elements.iter().enumerate() {
                if K::IS_ALIGNED {
                    end_position = align_to(8, end_position);
                    expressions.initialize_offset(index, end_position / 8)?;
                }
                end_position += context.bit_size_of(&self.traits, element)?;
            }
        }
        Ok(end_position)
    }

    /// Writes the delta-packed array without hooks.
    pub fn write_packed(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        self.write_packed_with(writer, &mut NoExpressions)
    }

    /// Writes the delta-packed array, verifying recorded offsets on aligned
    /// shapes.
    pub fn write_packed_with<X>(
        &self,
        writer: &mut BitWriter<'_>,
        expressions: &mut X,
    ) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        self.write_length_prefix(writer)?;

        if !self.elements.is_empty() {
            let mut context = DeltaContext::new();
            for element in &self.elements {
                context.init(&self.traits, element)?;
            }
            for (index, element) in self.elements.iter().enumerate() {
                Self::align_and_check(writer.bit_position(), index, expressions)?;
                if K::IS_ALIGNED {
                    writer.align_to(8)?;
                }
                context.write(&self.traits, writer, element)?;
            }
        }
        Ok(())
    }

    fn read_elements_packed<X>(
        &mut self,
        reader: &mut BitReader<'_>,
        length: usize,
        expressions: &mut X,
    ) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        self.elements.clear();
        if length == 0 {
            return Ok(());
        }
        self.elements.reserve(length);

        let mut context = DeltaContext::new();
        for index in 0..length {
            Self::align_and_check(reader.bit_position(), index, expressions)?;
            if K::IS_ALIGNED {
                reader.align_to(8)?;
            }
            let element = context.read(&self.traits, reader)?;
            self.elements.push(element);
        }
        Ok(())
    }
}

impl<T: ArrayTraits> Array<T, Normal> {
    /// Reads `length` elements.
    pub fn read(&mut self, reader: &mut BitReader<'_>, length: usize) -> Result<()> {
        self.read_elements(reader, length, &mut NoExpressions)
    }

    /// Reads `length` elements with hooks.
    pub fn read_with<X>(
        &mut self,
        reader: &mut BitReader<'_>,
        length: usize,
        expressions: &mut X,
    ) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        self.read_elements(reader, length, expressions)
    }
}

impl<T: ArrayTraits> Array<T, Normal>
where
    T::Element: DeltaPackable,
{
    /// Reads `length` delta-packed elements.
    pub fn read_packed(&mut self, reader: &mut BitReader<'_>, length: usize) -> Result<()> {
        self.read_elements_packed(reader, length, &mut NoExpressions)
    }
}

impl<T: ArrayTraits> Array<T, Aligned> {
    /// Reads `length` byte-aligned elements.
    pub fn read(&mut self, reader: &mut BitReader<'_>, length: usize) -> Result<()> {
        self.read_elements(reader, length, &mut NoExpressions)
    }

    /// Reads `length` byte-aligned elements, verifying recorded offsets.
    pub fn read_with<X>(
        &mut self,
        reader: &mut BitReader<'_>,
        length: usize,
        expressions: &mut X,
    ) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        self.read_elements(reader, length, expressions)
    }
}

impl<T: ArrayTraits> Array<T, Aligned>
where
    T::Element: DeltaPackable,
{
    /// Reads `length` byte-aligned delta-packed elements.
    pub fn read_packed(&mut self, reader: &mut BitReader<'_>, length: usize) -> Result<()> {
        self.read_elements_packed(reader, length, &mut NoExpressions)
    }

    /// Reads `length` byte-aligned delta-packed elements, verifying recorded
    /// offsets.
    pub fn read_packed_with<X>(
        &mut self,
        reader: &mut BitReader<'_>,
        length: usize,
        expressions: &mut X,
    ) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        self.read_elements_packed(reader, length, expressions)
    }
}

impl<T: ArrayTraits> Array<T, Auto> {
    /// Reads the varsize length prefix and that many elements.
    pub fn read(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let length = reader.read_varsize()? as usize;
        self.read_elements(reader, length, &mut NoExpressions)
    }
}

impl<T: ArrayTraits> Array<T, Auto>
where
    T::Element: DeltaPackable,
{
    /// Reads the varsize length prefix and that many delta-packed elements.
    pub fn read_packed(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let length = reader.read_varsize()? as usize;
        self.read_elements_packed(reader, length, &mut NoExpressions)
    }
}

impl<T: ArrayTraits> Array<T, AlignedAuto> {
    /// Reads the varsize length prefix and that many byte-aligned elements.
    pub fn read(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let length = reader.read_varsize()? as usize;
        self.read_elements(reader, length, &mut NoExpressions)
    }

    /// Reads the varsize length prefix and that many byte-aligned elements,
    /// verifying recorded offsets.
    pub fn read_with<X>(&mut self, reader: &mut BitReader<'_>, expressions: &mut X) -> Result<()>
    where
        X: ArrayExpressions<T::Element>,
    {
        let length = reader.read_varsize()? as usize;
        self.read_elements(reader, length, expressions)
    }
}

impl<T: ArrayTraits> Array<T, AlignedAuto>
where
    T::Element: DeltaPackable,
{
    /// Reads the varsize length prefix and that many byte-aligned
    /// delta-packed elements.
    pub fn read_packed(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let length = reader.read_varsize()? as usize;
        self.read_elements_packed(reader, length, &mut NoExpressions)
    }
}

impl<T: FixedSizeArrayTraits> Array<T, Implicit> {
    /// Reads as many whole elements as the stream still holds.
    ///
    /// Available only for constant-size element codecs; a zero-bit element
    /// size fails with [`DivisionByZero`](BitwireError::DivisionByZero).
    pub fn read(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let element_bit_size = self
            .traits
            .constant_bit_size()
            .ok_or(BitwireError::InvalidParameter)?;
        if element_bit_size == 0 {
            return Err(BitwireError::DivisionByZero);
        }
        let remaining_bits = reader.buffer_bit_size() - reader.bit_position();
        let length = remaining_bits / element_bit_size;
        self.read_elements(reader, length, &mut NoExpressions)
    }
}
