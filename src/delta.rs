//! Delta packing for packed arrays.
//!
//! A packed array stores a one-bit `is_packed` flag, and when set a 6-bit
//! `max_bit_number`, followed by the first element unpacked and every later
//! element as a signed delta of `max_bit_number + 1` bits:
//!
//! ```text
//! ┌───────────┬────────────────┬───────────────┬────────┬─────┐
//! │ is_packed │ max_bit_number │ first element │ delta₁ │ ... │
//! │   1 bit   │     6 bits     │   unpacked    │ n+1 b  │     │
//! └───────────┴────────────────┴───────────────┴────────┴─────┘
//! ```
//!
//! [`DeltaContext`] is the per-array state machine behind this layout. One
//! context is created per packed-array operation and driven in two passes:
//! an *init* pass that feeds every element through [`DeltaContext::init`] to
//! find the widest delta and the unpacked cost, then a *processing* pass
//! that sizes, reads or writes each element in the same order. The first
//! processing call seals the packing decision: if the packed form would not
//! be smaller than the unpacked form, the context falls back to emitting
//! elements verbatim behind a cleared flag bit.
//!
//! The total on-wire length of a packed array always equals the sum the
//! context predicts, which is what lets offset-bearing packed arrays run as
//! one measurement pass followed by one write pass.

use crate::error::Result;
use crate::reader::BitReader;
use crate::traits::{ArrayTraits, DeltaPackable};
use crate::writer::BitWriter;

// Descriptor field width and the widest storable delta exponent.
const MAX_BIT_NUMBER_BITS: u8 = 6;
const MAX_BIT_NUMBER_LIMIT: u8 = 62;

const INIT_STARTED_FLAG: u8 = 0x01;
const IS_PACKED_FLAG: u8 = 0x02;
const PROCESSING_STARTED_FLAG: u8 = 0x04;

// Bit length of the absolute difference, in the element's two's complement
// domain; comparison happens in the element domain so sign survives.
fn delta_bit_length<E: DeltaPackable>(lhs: E, rhs: E) -> u8 {
    let abs_delta = if lhs > rhs {
        lhs.to_packing().wrapping_sub(rhs.to_packing())
    } else {
        rhs.to_packing().wrapping_sub(lhs.to_packing())
    };
    (64 - abs_delta.leading_zeros()) as u8
}

/// Per-packed-array delta compression state.
///
/// Created fresh for each packed-array operation; after the init pass,
/// exactly one of [`bit_size_of`](Self::bit_size_of), [`read`](Self::read)
/// or [`write`](Self::write) may be called repeatedly for the same element
/// sequence.
#[derive(Debug, Clone, Default)]
pub struct DeltaContext {
    previous_element: u64,
    max_bit_number: u8,
    flags: u8,
    first_element_bit_size: u8,
    num_elements: u32,
    unpacked_bit_size: usize,
}

impl DeltaContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one element through the initialization pass.
    pub fn init<T>(&mut self, traits: &T, element: &T::Element) -> Result<()>
    where
        T: ArrayTraits,
        T::Element: DeltaPackable,
    {
        self.num_elements += 1;
        let element_bit_size = traits.bit_size_of(0, element)?;
        self.unpacked_bit_size += element_bit_size;

        if !self.is_flag_set(INIT_STARTED_FLAG) {
            self.set_flag(INIT_STARTED_FLAG);
            self.previous_element = element.to_packing();
            self.first_element_bit_size = element_bit_size as u8;
        } else if self.max_bit_number <= MAX_BIT_NUMBER_LIMIT {
            self.set_flag(IS_PACKED_FLAG);
            let previous = T::Element::from_packing(self.previous_element);
            let max_bit_number = delta_bit_length(*element, previous);
            if max_bit_number > self.max_bit_number {
                self.max_bit_number = max_bit_number;
                if self.max_bit_number > MAX_BIT_NUMBER_LIMIT {
                    self.reset_flag(IS_PACKED_FLAG);
                }
            }
            self.previous_element = element.to_packing();
        }
        Ok(())
    }

    /// Returns the on-wire bit length of the next element slot.
    ///
    /// The first call after init contributes the descriptor and the unpacked
    /// first element.
    pub fn bit_size_of<T>(&mut self, traits: &T, element: &T::Element) -> Result<usize>
    where
        T: ArrayTraits,
        T::Element: DeltaPackable,
    {
        if !self.is_flag_set(PROCESSING_STARTED_FLAG) {
            self.set_flag(PROCESSING_STARTED_FLAG);
            self.finish_init();
            Ok(self.descriptor_bit_size() + traits.bit_size_of(0, element)?)
        } else if !self.is_flag_set(IS_PACKED_FLAG) {
            traits.bit_size_of(0, element)
        } else {
            Ok(self.delta_bit_size())
        }
    }

    /// Reads the next element slot.
    pub fn read<T>(&mut self, traits: &T, reader: &mut BitReader<'_>) -> Result<T::Element>
    where
        T: ArrayTraits,
        T::Element: DeltaPackable,
    {
        if !self.is_flag_set(PROCESSING_STARTED_FLAG) {
            self.set_flag(PROCESSING_STARTED_FLAG);
            self.read_descriptor(reader)?;
            self.read_unpacked(traits, reader)
        } else if !self.is_flag_set(IS_PACKED_FLAG) {
            self.read_unpacked(traits, reader)
        } else {
            if self.max_bit_number > 0 {
                let delta = reader.read_signed_bits_64(self.max_bit_number + 1)?;
                self.previous_element = self.previous_element.wrapping_add(delta as u64);
            }
            Ok(T::Element::from_packing(self.previous_element))
        }
    }

    /// Writes the next element slot.
    pub fn write<T>(
        &mut self,
        traits: &T,
        writer: &mut BitWriter<'_>,
        element: &T::Element,
    ) -> Result<()>
    where
        T: ArrayTraits,
        T::Element: DeltaPackable,
    {
        if !self.is_flag_set(PROCESSING_STARTED_FLAG) {
            self.set_flag(PROCESSING_STARTED_FLAG);
            self.finish_init();
            self.write_descriptor(writer)?;
            self.write_unpacked(traits, writer, element)
        } else if !self.is_flag_set(IS_PACKED_FLAG) {
            self.write_unpacked(traits, writer, element)
        } else {
            if self.max_bit_number > 0 {
                // The init pass proved every delta fits the field width.
                let delta = element.to_packing().wrapping_sub(self.previous_element) as i64;
                writer.write_signed_bits_64(delta, self.max_bit_number + 1)?;
                self.previous_element = element.to_packing();
            }
            Ok(())
        }
    }

    // Seals the packing decision: packed must beat unpacked or the flag is
    // withdrawn. Both costs include their descriptor.
    fn finish_init(&mut self) {
        if self.is_flag_set(IS_PACKED_FLAG) {
            let packed_bit_size = 1 + MAX_BIT_NUMBER_BITS as usize
                + self.first_element_bit_size as usize
                + (self.num_elements as usize - 1) * self.delta_bit_size();
            let unpacked_bit_size = 1 + self.unpacked_bit_size;
            if packed_bit_size >= unpacked_bit_size {
                self.reset_flag(IS_PACKED_FLAG);
            }
        }
    }

    // Bits per delta slot; zero when every element is equal.
    fn delta_bit_size(&self) -> usize {
        self.max_bit_number as usize + usize::from(self.max_bit_number > 0)
    }

    fn descriptor_bit_size(&self) -> usize {
        if self.is_flag_set(IS_PACKED_FLAG) {
            1 + MAX_BIT_NUMBER_BITS as usize
        } else {
            1
        }
    }

    fn read_descriptor(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        if reader.read_bool()? {
            self.set_flag(IS_PACKED_FLAG);
            self.max_bit_number = reader.read_bits(MAX_BIT_NUMBER_BITS)? as u8;
        } else {
            self.reset_flag(IS_PACKED_FLAG);
        }
        Ok(())
    }

    fn write_descriptor(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        let is_packed = self.is_flag_set(IS_PACKED_FLAG);
        writer.write_bool(is_packed)?;
        if is_packed {
            writer.write_bits(self.max_bit_number.into(), MAX_BIT_NUMBER_BITS)?;
        }
        Ok(())
    }

    fn read_unpacked<T>(&mut self, traits: &T, reader: &mut BitReader<'_>) -> Result<T::Element>
    where
        T: ArrayTraits,
        T::Element: DeltaPackable,
    {
        let element = traits.read(reader, 0)?;
        self.previous_element = element.to_packing();
        Ok(element)
    }

    fn write_unpacked<T>(
        &mut self,
        traits: &T,
        writer: &mut BitWriter<'_>,
        element: &T::Element,
    ) -> Result<()>
    where
        T: ArrayTraits,
        T::Element: DeltaPackable,
    {
        self.previous_element = element.to_packing();
        traits.write(writer, element)
    }

    fn set_flag(&mut self, mask: u8) {
        self.flags |= mask;
    }

    fn reset_flag(&mut self, mask: u8) {
        self.flags &= !mask;
    }

    fn is_flag_set(&self, mask: u8) -> bool {
        self.flags & mask != 0
    }
}
